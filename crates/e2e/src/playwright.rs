//! Playwright browser automation
//!
//! Playwright runs under Node as a child process executing a generated
//! driver script. The script launches the browser once and then serves
//! [`DriverCommand`]s read line by line from stdin, answering each with one
//! JSON line on stdout.

use std::path::PathBuf;
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::driver::DriverTransport;
use crate::error::{E2eError, E2eResult};
use crate::protocol::{DriverCommand, ReadyLine, Request, Response};

const DRIVER_SCRIPT: &str = r#"
const { chromium, firefox, webkit } = require(require.resolve('playwright', { paths: [process.cwd()] }));
const readline = require('readline');

const browserType = { chromium, firefox, webkit }['__BROWSER__'];
const launchOptions = __LAUNCH_OPTIONS__;
const contextOptions = __CONTEXT_OPTIONS__;

const emit = (message) => process.stdout.write(JSON.stringify(message) + '\n');
const describe = (error) => String((error && error.message) || error);

function classify(error) {
  const message = describe(error);
  if (error && error.name === 'TimeoutError') return 'timeout';
  if (/NotAllowedError|permission denied|not allowed/i.test(message)) return 'permission';
  if (/has been closed|Target closed|unknown page/i.test(message)) return 'closed';
  return 'failed';
}

function locate(root, loc) {
  switch (loc.kind) {
    case 'css': return root.locator(loc.selector);
    case 'xpath': return root.locator('xpath=' + loc.expression);
    case 'role': return root.getByRole(loc.role, { name: loc.name });
    case 'test_id': return root.getByTestId(loc.id);
    case 'text': return root.getByText(loc.text);
    case 'first': return locate(root, loc.inner).first();
    default: throw new Error('unknown locator kind ' + loc.kind);
  }
}

(async () => {
  let browser;
  let context;
  const pages = new Map();
  let nextPageId = 1;

  const register = (page) => {
    const id = nextPageId++;
    pages.set(id, page);
    page.on('close', () => pages.delete(id));
    return id;
  };
  const pageOf = (id) => {
    const page = pages.get(id);
    if (!page) throw new Error('unknown page ' + id + ' (page has been closed)');
    return page;
  };
  const resolve = (target) => {
    let root = pageOf(target.page);
    for (const frame of target.frames || []) root = root.frameLocator(frame);
    return locate(root, target.locator);
  };

  try {
    browser = await browserType.launch(launchOptions);
    context = await browser.newContext(contextOptions);
    register(await context.newPage());
  } catch (error) {
    emit({ ready: false, error: describe(error) });
    process.exit(1);
  }
  emit({ ready: true });

  const done = () => null;
  const handlers = {
    goto: (c) => pageOf(c.page).goto(c.url, { timeout: c.timeout_ms }).then(done),
    wait_visible: (c) => resolve(c.target).waitFor({ state: 'visible', timeout: c.timeout_ms }).then(done),
    is_visible: (c) => resolve(c.target).isVisible().catch((error) => {
      if (classify(error) === 'closed') throw error;
      return false;
    }),
    click: (c) => resolve(c.target)
      .click({ button: c.button, position: c.position, timeout: c.timeout_ms })
      .then(done),
    fill: (c) => resolve(c.target).fill(c.value, { timeout: c.timeout_ms }).then(done),
    press: (c) => pageOf(c.page).keyboard.press(c.key).then(done),
    type: (c) => pageOf(c.page).keyboard.type(c.text).then(done),
    click_expect_page: async (c) => {
      const [page] = await Promise.all([
        context.waitForEvent('page', { timeout: c.timeout_ms }),
        resolve(c.target).click({ timeout: c.timeout_ms }),
      ]);
      return register(page);
    },
    wait_for_load_state: (c) => pageOf(c.page).waitForLoadState(c.state, { timeout: c.timeout_ms }).then(done),
    read_clipboard: (c) => pageOf(c.page).evaluate(() => navigator.clipboard.readText()),
    screenshot: (c) => pageOf(c.page).screenshot({ path: c.path, fullPage: true }).then(done),
    close: async () => null,
  };

  const lines = readline.createInterface({ input: process.stdin, crlfDelay: Infinity });
  for await (const line of lines) {
    if (!line.trim()) continue;
    let command;
    try {
      command = JSON.parse(line);
    } catch (error) {
      emit({ id: 0, ok: false, error: { kind: 'failed', message: 'bad request: ' + describe(error) } });
      continue;
    }
    try {
      const handler = handlers[command.op];
      if (!handler) throw new Error('unknown op ' + command.op);
      const value = await handler(command);
      emit({ id: command.id, ok: true, value: value === undefined ? null : value });
    } catch (error) {
      emit({ id: command.id, ok: false, error: { kind: classify(error), message: describe(error) } });
    }
    if (command.op === 'close') break;
  }

  await context.close().catch(() => {});
  await browser.close().catch(() => {});
})();
"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(format!("unknown browser '{}'", other)),
        }
    }
}

/// Configuration for the browser session
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,

    /// Installed browser channel such as `chrome` or `msedge`
    pub channel: Option<String>,

    pub headless: bool,

    /// Start maximized with the viewport following the window
    pub maximized: bool,

    /// Fixed viewport, used when not maximized
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Context permissions, e.g. `clipboard-read`
    pub permissions: Vec<String>,

    /// Record a video of every page into this directory
    pub video_dir: Option<PathBuf>,

    /// Directory whose `node_modules` provides `playwright`
    pub working_dir: PathBuf,

    pub node_binary: PathBuf,

    /// Browser launch and context creation
    pub startup_timeout: Duration,

    /// Slack on top of each command's own timeout before the driver is
    /// considered hung
    pub request_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            channel: Some("chrome".to_string()),
            headless: false,
            maximized: true,
            viewport_width: 1280,
            viewport_height: 720,
            permissions: vec!["clipboard-read".to_string(), "clipboard-write".to_string()],
            video_dir: Some(PathBuf::from("test-results/videos")),
            working_dir: PathBuf::from("."),
            node_binary: PathBuf::from("node"),
            startup_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Running Playwright driver process
pub struct PlaywrightHandle {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    request_timeout: Duration,
    _script_dir: TempDir,
}

impl PlaywrightHandle {
    /// Launch the browser and wait until the driver reports ready.
    pub async fn spawn(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(&config).await?;

        if let Some(dir) = &config.video_dir {
            std::fs::create_dir_all(dir)?;
        }

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, Self::build_driver_script(&config))?;

        info!(
            "Launching {} (headless: {})",
            config.browser.as_str(),
            config.headless
        );

        let mut child = TokioCommand::new(&config.node_binary)
            .arg(&script_path)
            .current_dir(&config.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                E2eError::Playwright(format!(
                    "Failed to spawn {}: {}",
                    config.node_binary.display(),
                    e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("driver stdout unavailable".to_string()))?;

        let mut handle = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            request_timeout: config.request_timeout,
            _script_dir: script_dir,
        };

        timeout(config.startup_timeout, handle.wait_ready())
            .await
            .map_err(|_| E2eError::Timeout("browser launch".to_string()))??;

        info!("Browser is ready");
        Ok(handle)
    }

    /// Check if Playwright is installed
    async fn check_playwright_installed(config: &PlaywrightConfig) -> E2eResult<()> {
        let status = TokioCommand::new("npx")
            .args(["playwright", "--version"])
            .current_dir(&config.working_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Build the Node driver script for `config`
    pub fn build_driver_script(config: &PlaywrightConfig) -> String {
        let mut args = Vec::new();
        if config.maximized {
            args.push("--start-maximized");
        }

        let mut launch = json!({
            "headless": config.headless,
            "args": args,
        });
        if let Some(channel) = &config.channel {
            launch["channel"] = json!(channel);
        }

        let mut context = json!({
            "permissions": config.permissions,
        });
        context["viewport"] = if config.maximized {
            Value::Null
        } else {
            json!({ "width": config.viewport_width, "height": config.viewport_height })
        };
        if let Some(dir) = &config.video_dir {
            context["recordVideo"] = json!({ "dir": dir.to_string_lossy() });
        }

        DRIVER_SCRIPT
            .replace("__BROWSER__", config.browser.as_str())
            .replace("__LAUNCH_OPTIONS__", &launch.to_string())
            .replace("__CONTEXT_OPTIONS__", &context.to_string())
    }

    async fn wait_ready(&mut self) -> E2eResult<()> {
        while let Some(line) = self.stdout.next_line().await? {
            match serde_json::from_str::<ReadyLine>(&line) {
                Ok(ReadyLine { ready: true, .. }) => return Ok(()),
                Ok(ReadyLine { error, .. }) => {
                    return Err(E2eError::Playwright(format!(
                        "Browser launch failed: {}",
                        error.unwrap_or_else(|| "unknown error".to_string())
                    )))
                }
                Err(_) => debug!("driver: {}", line),
            }
        }
        Err(E2eError::Playwright(
            "Driver exited before the browser was ready".to_string(),
        ))
    }

    async fn read_response(&mut self, id: u64) -> E2eResult<Response> {
        while let Some(line) = self.stdout.next_line().await? {
            match serde_json::from_str::<Response>(&line) {
                Ok(response) => {
                    if let Some(result) = match_response(response, id) {
                        return result;
                    }
                }
                Err(_) => debug!("driver: {}", line),
            }
        }
        Err(E2eError::Playwright("Driver exited unexpectedly".to_string()))
    }

    /// Close the browser (flushing any video) and stop the driver.
    pub async fn shutdown(mut self) -> E2eResult<()> {
        if let Err(e) = self.execute(DriverCommand::Close).await {
            warn!("Driver close failed: {}", e);
        }

        if timeout(Duration::from_secs(10), self.child.wait()).await.is_err() {
            warn!("Driver did not exit, terminating");

            // Try graceful shutdown first
            #[cfg(unix)]
            if let Some(pid) = self.child.id() {
                use nix::sys::signal::{kill, Signal};
                use nix::unistd::Pid;

                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
            }

            let _ = self.child.kill().await;
        }

        Ok(())
    }
}

#[async_trait]
impl DriverTransport for PlaywrightHandle {
    async fn execute(&mut self, command: DriverCommand) -> E2eResult<Value> {
        let id = self.next_id;
        self.next_id += 1;

        let what = command.describe();
        debug!("-> #{} {}", id, what);

        let mut line = serde_json::to_string(&Request {
            id,
            command: &command,
        })?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let allowance = self.request_timeout + Duration::from_millis(command.timeout_ms());
        let response = timeout(allowance, self.read_response(id))
            .await
            .map_err(|_| E2eError::Timeout(format!("driver response to {}", what)))??;

        debug!("<- #{} ok={}", id, response.ok);
        response.into_result(&what)
    }
}

/// Decide what a response line means for the request `id` in flight.
///
/// The driver answers a request it could not parse with id 0; that failure
/// belongs to the request in flight. Other ids are stale and skipped.
fn match_response(response: Response, id: u64) -> Option<E2eResult<Response>> {
    if response.id == id {
        return Some(Ok(response));
    }
    if response.id == 0 && !response.ok {
        let message = response
            .error
            .map(|failure| failure.message)
            .unwrap_or_else(|| "unreadable request".to_string());
        return Some(Err(E2eError::Protocol(format!(
            "driver rejected request #{}: {}",
            id, message
        ))));
    }
    warn!("Ignoring stale driver response #{}", response.id);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{DriverFailure, FailureKind};

    fn response(id: u64, ok: bool) -> Response {
        Response {
            id,
            ok,
            value: Value::Null,
            error: (!ok).then(|| DriverFailure {
                kind: FailureKind::Failed,
                message: "bad request: Unexpected token".to_string(),
            }),
        }
    }

    #[test]
    fn unparsed_request_fails_the_pending_call() {
        match match_response(response(0, false), 7) {
            Some(Err(E2eError::Protocol(message))) => {
                assert!(message.contains("#7"));
                assert!(message.contains("Unexpected token"));
            }
            other => panic!("expected protocol error, got {:?}", other),
        }
    }

    #[test]
    fn responses_for_other_requests_are_skipped() {
        assert!(match_response(response(3, true), 7).is_none());
        assert!(match_response(response(3, false), 7).is_none());
        assert!(matches!(
            match_response(response(7, false), 7),
            Some(Ok(Response { id: 7, ok: false, .. }))
        ));
    }

    #[test]
    fn maximized_chrome_script() {
        let script = PlaywrightHandle::build_driver_script(&PlaywrightConfig::default());

        assert!(script.contains("['chromium']"));
        assert!(script.contains(r#""channel":"chrome""#));
        assert!(script.contains("--start-maximized"));
        assert!(script.contains(r#""viewport":null"#));
        assert!(script.contains("clipboard-read"));
        assert!(script.contains("clipboard-write"));
        assert!(script.contains("recordVideo"));
        assert!(!script.contains("__LAUNCH_OPTIONS__"));
        assert!(!script.contains("__CONTEXT_OPTIONS__"));
    }

    #[test]
    fn fixed_viewport_headless_script() {
        let config = PlaywrightConfig {
            browser: Browser::Firefox,
            channel: None,
            headless: true,
            maximized: false,
            video_dir: None,
            ..Default::default()
        };
        let script = PlaywrightHandle::build_driver_script(&config);

        assert!(script.contains("['firefox']"));
        assert!(script.contains(r#""headless":true"#));
        assert!(script.contains(r#""width":1280"#));
        assert!(script.contains(r#""height":720"#));
        assert!(!script.contains(r#""viewport":null"#));
        assert!(!script.contains("--start-maximized"));
        assert!(!script.contains("channel\":"));
        assert!(!script.contains("recordVideo"));
    }

    #[test]
    fn parses_browser_names() {
        assert_eq!("Chromium".parse::<Browser>(), Ok(Browser::Chromium));
        assert_eq!("webkit".parse::<Browser>(), Ok(Browser::Webkit));
        assert!("netscape".parse::<Browser>().is_err());
    }
}
