//! The video source collaborator: three 8-bit planes and clip-change events.

use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender};
use glam::UVec2;

use crate::backend::TextureId;

/// Planar Y, U and V textures of the current clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YuvPlanes {
    pub y: TextureId,
    pub u: TextureId,
    pub v: TextureId,
}

/// Announces that the active clip, and with it the plane textures, changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipChanged {
    pub size: UVec2,
    pub planes: YuvPlanes,
}

/// A source of decoded video frames.
///
/// `planes` and the size accessors reflect the most recently announced clip.
pub trait VideoSource: Send {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn planes(&self) -> YuvPlanes;
    /// Receiver for clip-change notifications; each call returns a handle to
    /// the same channel.
    fn clip_changes(&self) -> Receiver<ClipChanged>;

    fn size(&self) -> UVec2 {
        UVec2::new(self.width(), self.height())
    }
}

#[derive(Debug, Clone, Copy)]
struct ClipState {
    size: UVec2,
    planes: YuvPlanes,
}

/// A source whose planes are uploaded up front, switched through a
/// [`ClipSwitcher`].
#[derive(Debug)]
pub struct StaticVideoSource {
    state: Arc<Mutex<ClipState>>,
    changes: Receiver<ClipChanged>,
}

/// Sending half of a [`StaticVideoSource`].
#[derive(Debug, Clone)]
pub struct ClipSwitcher {
    state: Arc<Mutex<ClipState>>,
    sender: Sender<ClipChanged>,
}

impl StaticVideoSource {
    pub fn new(size: UVec2, planes: YuvPlanes) -> (Self, ClipSwitcher) {
        let state = Arc::new(Mutex::new(ClipState { size, planes }));
        let (sender, changes) = crossbeam_channel::unbounded();
        (
            Self {
                state: Arc::clone(&state),
                changes,
            },
            ClipSwitcher { state, sender },
        )
    }

    fn state(&self) -> ClipState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VideoSource for StaticVideoSource {
    fn width(&self) -> u32 {
        self.state().size.x
    }

    fn height(&self) -> u32 {
        self.state().size.y
    }

    fn planes(&self) -> YuvPlanes {
        self.state().planes
    }

    fn clip_changes(&self) -> Receiver<ClipChanged> {
        self.changes.clone()
    }
}

impl ClipSwitcher {
    /// Makes `planes` the active clip and notifies listeners.
    pub fn switch(&self, size: UVec2, planes: YuvPlanes) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.size = size;
            state.planes = planes;
        }
        // Nobody listening is fine; the state above is still current.
        let _ = self.sender.send(ClipChanged { size, planes });
    }
}
