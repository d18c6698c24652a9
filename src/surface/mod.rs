//! Authorization windows.
//!
//! A [`SurfaceLauncher`] opens a window on the authorization target and hands
//! back a [`Surface`] the attempt can poll for liveness. A launcher that
//! returns `Ok(None)`, or a surface that is already closed right after it was
//! opened, means the window was blocked.

pub mod browser;
#[cfg(test)]
pub(crate) mod fake;
pub mod process;

pub use browser::BrowserLauncher;
pub use process::ProcessLauncher;

use async_trait::async_trait;
use reqwest::Url;
use std::io;

pub const DEFAULT_WIDTH: u32 = 600;
pub const DEFAULT_HEIGHT: u32 = 700;
pub const DEFAULT_SCREEN: (u32, u32) = (1920, 1080);

/// Size and position of an authorization window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceGeometry {
    pub width: u32,
    pub height: u32,
    pub left: u32,
    pub top: u32,
}

impl SurfaceGeometry {
    /// Center a `width` x `height` window on a screen of `(screen_width, screen_height)`.
    pub fn centered(screen: (u32, u32), width: u32, height: u32) -> Self {
        let (screen_width, screen_height) = screen;
        Self {
            width,
            height,
            left: screen_width.saturating_sub(width) / 2,
            top: screen_height.saturating_sub(height) / 2,
        }
    }
}

impl Default for SurfaceGeometry {
    fn default() -> Self {
        Self::centered(DEFAULT_SCREEN, DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

/// Handle to an open authorization window.
#[async_trait]
pub trait Surface: Send {
    /// The user (or the system) closed the window.
    fn is_closed(&mut self) -> bool;

    /// Tear the window down. Safe to call on a window that is already gone.
    async fn close(&mut self);
}

#[async_trait]
pub trait SurfaceLauncher: Send + Sync {
    async fn open(&self, url: &Url, geometry: SurfaceGeometry)
    -> io::Result<Option<Box<dyn Surface>>>;
}
