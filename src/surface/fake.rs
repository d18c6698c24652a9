//! Scriptable launcher for unit tests.

use async_trait::async_trait;
use reqwest::Url;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{Surface, SurfaceGeometry, SurfaceLauncher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Behaviour {
    Open,
    Blocked,
    Fails,
    ClosedOnArrival,
}

/// One window handed out by the fake launcher.
#[derive(Debug, Clone)]
pub(crate) struct FakeWindow {
    pub(crate) url: Url,
    closed: Arc<AtomicBool>,
    torn_down: Arc<AtomicBool>,
}

impl FakeWindow {
    /// Simulate the user closing the window.
    pub(crate) fn close_by_user(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }
}

struct FakeSurface {
    closed: Arc<AtomicBool>,
    torn_down: Arc<AtomicBool>,
}

// Mirrors kill-on-drop of process windows.
impl Drop for FakeSurface {
    fn drop(&mut self) {
        self.torn_down.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Surface for FakeSurface {
    fn is_closed(&mut self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn close(&mut self) {
        self.torn_down.store(true, Ordering::SeqCst);
    }
}

pub(crate) struct FakeLauncher {
    default: Behaviour,
    script: Mutex<VecDeque<Behaviour>>,
    opened: AtomicUsize,
    windows: Mutex<Vec<FakeWindow>>,
}

impl FakeLauncher {
    pub(crate) fn new(default: Behaviour) -> Arc<Self> {
        Self::scripted(default, [])
    }

    /// Use `script` for the first opens, then `default`.
    pub(crate) fn scripted(
        default: Behaviour,
        script: impl IntoIterator<Item = Behaviour>,
    ) -> Arc<Self> {
        Arc::new(Self {
            default,
            script: Mutex::new(script.into_iter().collect()),
            opened: AtomicUsize::new(0),
            windows: Mutex::new(Vec::new()),
        })
    }

    /// Calls to `open`, including blocked and failed ones.
    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn windows(&self) -> Vec<FakeWindow> {
        self.windows.lock().unwrap().clone()
    }

    pub(crate) fn last_window(&self) -> Option<FakeWindow> {
        self.windows.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SurfaceLauncher for FakeLauncher {
    async fn open(
        &self,
        url: &Url,
        _geometry: SurfaceGeometry,
    ) -> io::Result<Option<Box<dyn Surface>>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let behaviour = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default);

        match behaviour {
            Behaviour::Blocked => Ok(None),
            Behaviour::Fails => Err(io::Error::new(io::ErrorKind::NotFound, "no browser")),
            Behaviour::Open | Behaviour::ClosedOnArrival => {
                let window = FakeWindow {
                    url: url.clone(),
                    closed: Arc::new(AtomicBool::new(behaviour == Behaviour::ClosedOnArrival)),
                    torn_down: Arc::new(AtomicBool::new(false)),
                };
                let surface = FakeSurface {
                    closed: window.closed.clone(),
                    torn_down: window.torn_down.clone(),
                };
                self.windows.lock().unwrap().push(window);
                Ok(Some(Box::new(surface)))
            }
        }
    }
}
