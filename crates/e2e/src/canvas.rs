//! Pointer and keyboard interaction with a canvas-rendered surface
//!
//! The grid has no content tree: cells are reached by clicking at pixel
//! offsets and by keyboard shortcuts. Offsets come from [`SheetLayout`] and
//! are tied to the application's layout, so a redesign of the app can break
//! them without any error other than a missing context-menu entry.

use std::time::Duration;

use tracing::debug;

use crate::driver::DriverTransport;
use crate::error::E2eResult;
use crate::layout::{SheetLayout, Timings};
use crate::protocol::{Locator, MouseButton, PageId, Point, Target};

/// A canvas inside a (possibly nested) frame of one tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractiveSurface {
    page: PageId,
    frames: Vec<String>,
    canvas: Locator,
}

impl InteractiveSurface {
    pub fn new(page: PageId, frames: Vec<String>, canvas: Locator) -> Self {
        Self {
            page,
            frames,
            canvas,
        }
    }

    pub fn page(&self) -> PageId {
        self.page
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// The canvas element itself
    pub fn target(&self) -> Target {
        Target::in_frames(self.page, self.frames.clone(), self.canvas.clone())
    }

    /// Another element in the same frame as the canvas
    pub fn sibling(&self, locator: Locator) -> Target {
        Target::in_frames(self.page, self.frames.clone(), locator)
    }
}

/// Issues pointer and keyboard commands against an [`InteractiveSurface`]
#[derive(Debug, Clone)]
pub struct CanvasInteractor {
    focus_anchor: Option<Point>,
    origin_shortcut: String,
    settle: Duration,
    action_timeout: Duration,
}

impl CanvasInteractor {
    pub fn new(layout: &SheetLayout, timings: &Timings) -> Self {
        Self {
            focus_anchor: layout.focus_anchor,
            origin_shortcut: layout.origin_shortcut.clone(),
            settle: timings.input_settle(),
            action_timeout: timings.action_timeout(),
        }
    }

    /// Click the surface to give it keyboard focus, then jump to the
    /// top-left cell.
    pub async fn focus_and_move_to_origin<D: DriverTransport>(
        &self,
        driver: &mut D,
        surface: &InteractiveSurface,
    ) -> E2eResult<()> {
        debug!("Focusing {} and moving to origin", surface.target());
        driver
            .click(
                &surface.target(),
                MouseButton::Left,
                self.focus_anchor,
                self.action_timeout,
            )
            .await?;
        driver.press(surface.page(), &self.origin_shortcut).await
    }

    /// Type raw text into whatever has focus.
    pub async fn type_text<D: DriverTransport>(
        &self,
        driver: &mut D,
        surface: &InteractiveSurface,
        text: &str,
    ) -> E2eResult<()> {
        driver.type_text(surface.page(), text).await?;
        self.settle().await;
        Ok(())
    }

    /// Press a single key or chord such as `Enter` or `Control+C`.
    pub async fn press_key<D: DriverTransport>(
        &self,
        driver: &mut D,
        surface: &InteractiveSurface,
        key: &str,
    ) -> E2eResult<()> {
        driver.press(surface.page(), key).await?;
        self.settle().await;
        Ok(())
    }

    /// Secondary-click at `offset` from the surface's top-left corner.
    pub async fn open_context_menu_at<D: DriverTransport>(
        &self,
        driver: &mut D,
        surface: &InteractiveSurface,
        offset: Point,
    ) -> E2eResult<()> {
        debug!("Opening context menu at ({}, {})", offset.x, offset.y);
        driver
            .click(
                &surface.target(),
                MouseButton::Right,
                Some(offset),
                self.action_timeout,
            )
            .await
    }

    /// Click the context-menu entry whose visible text is `label`.
    pub async fn select_menu_item_by_text<D: DriverTransport>(
        &self,
        driver: &mut D,
        surface: &InteractiveSurface,
        label: &str,
    ) -> E2eResult<()> {
        debug!("Selecting menu item {:?}", label);
        driver
            .click(
                &surface.sibling(Locator::text(label)),
                MouseButton::Left,
                None,
                self.action_timeout,
            )
            .await?;
        self.settle().await;
        Ok(())
    }

    async fn settle(&self) {
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_shares_frame_path() {
        let surface = InteractiveSurface::new(
            PageId(3),
            vec!["iframe#outer".to_string(), "iframe#inner".to_string()],
            Locator::css("canvas").first(),
        );
        let menu = surface.sibling(Locator::text("AutoFit"));
        assert_eq!(menu.page, PageId(3));
        assert_eq!(menu.frames, surface.frames());
        assert_eq!(menu.locator, Locator::text("AutoFit"));
        assert_eq!(surface.target().locator, Locator::css("canvas").first());
    }
}
