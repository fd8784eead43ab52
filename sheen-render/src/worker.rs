//! Background recomputation of a raw render into a displayable frame.
//!
//! A request carries the raw RGBA bytes, the display gamma and the row
//! width; the reply carries the marker location and the composited frame.
//! Each request gets its own one-shot reply channel.

use crate::compositor::{composite_and_correct, locate_marker, pixmap_from_rgba};
use crate::error::RenderError;
use sheen_core::Gamma;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tiny_skia::Pixmap;
use tokio::sync::oneshot;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub pixels: Vec<u8>,
    pub gamma: Gamma,
    pub width: u32,
}

impl WorkerRequest {
    pub fn from_pixmap(pixmap: &Pixmap, gamma: Gamma) -> Self {
        Self {
            pixels: pixmap.data().to_vec(),
            gamma,
            width: pixmap.width(),
        }
    }
}

#[derive(Debug)]
pub struct WorkerReply {
    /// `y * width + x` of the marker centroid, if a marker was rendered.
    pub marker_index: Option<usize>,
    pub pixels: Pixmap,
}

pub type ReplyReceiver = oneshot::Receiver<Result<WorkerReply, RenderError>>;

pub trait ImageWorker {
    fn submit(&self, request: WorkerRequest) -> ReplyReceiver;
}

/// Runs one request to completion on the calling thread.
pub fn process(request: WorkerRequest) -> Result<WorkerReply, RenderError> {
    let raw = pixmap_from_rgba(request.pixels, request.width)?;
    let marker_index = locate_marker(&raw);
    let pixels = composite_and_correct(&raw, request.gamma);
    Ok(WorkerReply {
        marker_index,
        pixels,
    })
}

/// Computes the reply before `submit` returns.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineWorker;

impl ImageWorker for InlineWorker {
    fn submit(&self, request: WorkerRequest) -> ReplyReceiver {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(process(request));
        rx
    }
}

type Job = (WorkerRequest, oneshot::Sender<Result<WorkerReply, RenderError>>);

/// Processes requests in order on a dedicated OS thread.
pub struct ThreadWorker {
    jobs: Option<mpsc::Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadWorker {
    pub fn spawn() -> std::io::Result<Self> {
        let (jobs, queue) = mpsc::channel::<Job>();
        let handle = thread::Builder::new()
            .name("sheen-image-worker".into())
            .spawn(move || {
                for (request, reply) in queue {
                    let width = request.width;
                    if reply.send(process(request)).is_err() {
                        // The trial detached before we finished.
                        debug!(width, "worker reply dropped");
                    }
                }
                debug!("image worker stopped");
            })?;
        Ok(Self {
            jobs: Some(jobs),
            handle: Some(handle),
        })
    }
}

impl ImageWorker for ThreadWorker {
    fn submit(&self, request: WorkerRequest) -> ReplyReceiver {
        let (tx, rx) = oneshot::channel();
        let Some(jobs) = &self.jobs else {
            let _ = tx.send(Err(RenderError::WorkerGone));
            return rx;
        };
        if let Err(mpsc::SendError((_, tx))) = jobs.send((request, tx)) {
            warn!("image worker thread is gone");
            let _ = tx.send(Err(RenderError::WorkerGone));
        }
        rx
    }
}

impl Drop for ThreadWorker {
    fn drop(&mut self) {
        // Closing the queue ends the worker loop.
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("image worker panicked");
            }
        }
    }
}
