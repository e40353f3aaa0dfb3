//! Renderer collaborators.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::types::Position;

/// Receives the tree polyline whenever the tree or a point changes.
pub trait Renderer: Send {
    /// Replace the drawn polyline.
    fn set_polyline(&mut self, points: &[Position]);

    /// Show or hide the drawing.
    fn set_visible(&mut self, _visible: bool) {}
}

/// Renderer that draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpRenderer;

impl Renderer for NoOpRenderer {
    fn set_polyline(&mut self, _points: &[Position]) {}
}

/// Renderer that keeps the last polyline, for tests and offline tools.
///
/// Clones share the same buffer, so a clone kept by the caller sees what the
/// wizard pushed to the boxed one.
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    state: Arc<Mutex<RecordedFrame>>,
}

/// What a [`RecordingRenderer`] has received so far.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordedFrame {
    /// Last polyline pushed.
    pub polyline: Vec<Position>,
    /// Number of polyline updates.
    pub updates: usize,
    /// Last visibility flag.
    pub visible: bool,
}

impl RecordingRenderer {
    /// Create a new recorder (visible).
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RecordedFrame {
                visible: true,
                ..RecordedFrame::default()
            })),
        }
    }

    /// Copy of the recorded state.
    pub fn frame(&self) -> RecordedFrame {
        self.state.lock().clone()
    }
}

impl Renderer for RecordingRenderer {
    fn set_polyline(&mut self, points: &[Position]) {
        let mut state = self.state.lock();
        state.polyline = points.to_vec();
        state.updates += 1;
    }

    fn set_visible(&mut self, visible: bool) {
        self.state.lock().visible = visible;
    }
}
