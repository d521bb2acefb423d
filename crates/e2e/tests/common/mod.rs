//! Scripted in-memory stand-in for the Playwright driver

#![allow(dead_code)]

use std::collections::VecDeque;

use async_trait::async_trait;
use serde_json::{json, Value};

use sheetprobe_e2e::protocol::{
    DriverCommand, DriverFailure, FailureKind, MouseButton, Point, Response,
};
use sheetprobe_e2e::{DriverTransport, E2eResult};

/// Page handle the fake hands out for the app tab
pub const APP_PAGE: u32 = 2;

pub enum ClipboardReply {
    Text(&'static str),
    Denied,
}

#[derive(Default)]
pub struct FakeBrowser {
    pub log: Vec<DriverCommand>,
    pub clipboard: VecDeque<ClipboardReply>,
    pub popup_visible: bool,
    /// Fail the n-th (1-based) command with this op name
    pub failures: Vec<(&'static str, usize, FailureKind)>,
}

impl FakeBrowser {
    pub fn with_clipboard(samples: &[&'static str]) -> Self {
        Self {
            clipboard: samples.iter().copied().map(ClipboardReply::Text).collect(),
            ..Default::default()
        }
    }

    pub fn fail(mut self, op: &'static str, nth: usize, kind: FailureKind) -> Self {
        self.failures.push((op, nth, kind));
        self
    }

    pub fn count(&self, op: &str) -> usize {
        self.log.iter().filter(|c| op_name(c) == op).count()
    }

    pub fn pressed_keys(&self) -> Vec<String> {
        self.log
            .iter()
            .filter_map(|c| match c {
                DriverCommand::Press { key, .. } => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clicks(&self) -> Vec<(String, MouseButton, Option<Point>)> {
        self.log
            .iter()
            .filter_map(|c| match c {
                DriverCommand::Click {
                    target,
                    button,
                    position,
                    ..
                } => Some((target.locator.to_string(), *button, *position)),
                _ => None,
            })
            .collect()
    }

    fn failure_for(&self, command: &DriverCommand) -> Option<FailureKind> {
        let op = op_name(command);
        let seen = self.count(&op);
        self.failures
            .iter()
            .find(|(name, nth, _)| *name == op && *nth == seen)
            .map(|(_, _, kind)| *kind)
    }
}

pub fn op_name(command: &DriverCommand) -> String {
    serde_json::to_value(command)
        .ok()
        .and_then(|v| v.get("op").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default()
}

fn failed(kind: FailureKind, message: &str) -> E2eResult<Value> {
    Response {
        id: 0,
        ok: false,
        value: Value::Null,
        error: Some(DriverFailure {
            kind,
            message: message.to_string(),
        }),
    }
    .into_result("fake")
}

#[async_trait]
impl DriverTransport for FakeBrowser {
    async fn execute(&mut self, command: DriverCommand) -> E2eResult<Value> {
        self.log.push(command.clone());

        if let Some(kind) = self.failure_for(&command) {
            return failed(kind, "injected failure");
        }

        match command {
            DriverCommand::ClickExpectPage { .. } => Ok(json!(APP_PAGE)),
            DriverCommand::IsVisible { .. } => Ok(json!(self.popup_visible)),
            DriverCommand::ReadClipboard { .. } => match self.clipboard.pop_front() {
                Some(ClipboardReply::Text(text)) => Ok(json!(text)),
                Some(ClipboardReply::Denied) => failed(
                    FailureKind::Permission,
                    "NotAllowedError: Read permission denied.",
                ),
                None => Ok(json!("")),
            },
            _ => Ok(Value::Null),
        }
    }
}
