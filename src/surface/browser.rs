//! Windows handed to the system browser.
//!
//! The browser owns the tab once it is opened, so closure cannot be observed.
//! Attempts on these surfaces resolve through the callback channel or the
//! configured attempt timeout.

use async_trait::async_trait;
use reqwest::Url;
use std::io;
use tracing::info;

use super::{Surface, SurfaceGeometry, SurfaceLauncher};

#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserLauncher;

#[async_trait]
impl SurfaceLauncher for BrowserLauncher {
    async fn open(
        &self,
        url: &Url,
        _geometry: SurfaceGeometry,
    ) -> io::Result<Option<Box<dyn Surface>>> {
        let target = url.to_string();
        tokio::task::spawn_blocking(move || open::that(target))
            .await
            .map_err(io::Error::other)??;

        info!(url = %url, "Opened authorization page in system browser");
        Ok(Some(Box::new(BrowserSurface)))
    }
}

/// A browser tab. Never reports closed.
#[derive(Debug, Default)]
pub struct BrowserSurface;

#[async_trait]
impl Surface for BrowserSurface {
    fn is_closed(&mut self) -> bool {
        false
    }

    async fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn browser_surface_never_closes() {
        let mut surface = BrowserSurface;
        assert!(!surface.is_closed());
        surface.close().await;
        assert!(!surface.is_closed());
    }
}
