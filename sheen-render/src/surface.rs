//! The on-screen element a trial draws into.
//!
//! A trial inserts one element under a fixed id, swaps its pixels, toggles
//! its visibility and marks it once answered. Every change is published on a
//! watch channel so a window (or a test) can follow what is on screen.

use crate::error::RenderError;
use std::sync::Arc;
use tiny_skia::Pixmap;
use tokio::sync::watch;
use tracing::trace;

pub const STIMULUS_ELEMENT_ID: &str = "sheen-canvas-keyboard-response-stimulus";

/// Class added to the stimulus element once a response was recorded.
pub const RESPONDED_CLASS: &str = "responded";

#[derive(Debug, Clone)]
pub struct DisplayedFrame {
    pub id: String,
    pub pixmap: Arc<Pixmap>,
    pub visible: bool,
    pub classes: Vec<String>,
}

impl DisplayedFrame {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// What the surface shows right now. `revision` bumps on every change.
#[derive(Debug, Clone, Default)]
pub struct SurfaceSnapshot {
    pub frame: Option<DisplayedFrame>,
    pub revision: u64,
}

impl SurfaceSnapshot {
    /// The pixels a viewer should present, if any.
    pub fn visible_pixmap(&self) -> Option<&Arc<Pixmap>> {
        self.frame.as_ref().filter(|f| f.visible).map(|f| &f.pixmap)
    }
}

pub struct DisplaySurface {
    frame: Option<DisplayedFrame>,
    revision: u64,
    tx: watch::Sender<SurfaceSnapshot>,
}

impl Default for DisplaySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySurface {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SurfaceSnapshot::default());
        Self {
            frame: None,
            revision: 0,
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SurfaceSnapshot> {
        self.tx.subscribe()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_none()
    }

    pub fn get(&self, id: &str) -> Option<&DisplayedFrame> {
        self.frame.as_ref().filter(|f| f.id == id)
    }

    /// Shows `pixmap` under `id`, replacing whatever element was there.
    pub fn insert(&mut self, id: &str, pixmap: Pixmap) {
        self.frame = Some(DisplayedFrame {
            id: id.to_owned(),
            pixmap: Arc::new(pixmap),
            visible: true,
            classes: Vec::new(),
        });
        self.publish();
    }

    pub fn replace_pixels(&mut self, id: &str, pixmap: Pixmap) -> Result<(), RenderError> {
        self.element_mut(id)?.pixmap = Arc::new(pixmap);
        self.publish();
        Ok(())
    }

    pub fn set_visible(&mut self, id: &str, visible: bool) -> Result<(), RenderError> {
        self.element_mut(id)?.visible = visible;
        self.publish();
        Ok(())
    }

    pub fn add_class(&mut self, id: &str, class: &str) -> Result<(), RenderError> {
        let frame = self.element_mut(id)?;
        if !frame.has_class(class) {
            frame.classes.push(class.to_owned());
        }
        self.publish();
        Ok(())
    }

    /// Removes the element if it is there. Returns whether it was.
    pub fn remove(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.frame = None;
        self.publish();
        true
    }

    pub fn clear(&mut self) {
        if self.frame.take().is_some() {
            self.publish();
        }
    }

    fn element_mut(&mut self, id: &str) -> Result<&mut DisplayedFrame, RenderError> {
        self.frame
            .as_mut()
            .filter(|f| f.id == id)
            .ok_or_else(|| RenderError::ElementNotFound(id.to_owned()))
    }

    fn publish(&mut self) {
        self.revision += 1;
        trace!(revision = self.revision, "display surface changed");
        // No receivers is fine: headless sessions never subscribe.
        self.tx.send_replace(SurfaceSnapshot {
            frame: self.frame.clone(),
            revision: self.revision,
        });
    }
}
