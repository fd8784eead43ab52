#![allow(dead_code)]

use sheen_core::{Gamma, LightKind, MaterialKind, Stimulus, SurfaceData};
use sheen_render::{
    ImageWorker, InlineWorker, MARKER_KEY, RenderError, RendererContext, ReplyReceiver,
    SkiaSceneRenderer, WorkerRequest, process,
};
use std::cell::RefCell;
use std::time::Duration;
use tiny_skia::Pixmap;
use tokio::sync::oneshot;

pub const CANVAS: u32 = 400;

/// A 3x3 grid with a raised centre vertex.
pub fn stimulus(is_pretest: bool) -> Stimulus {
    let mut vertices = Vec::new();
    for row in 0..3 {
        for col in 0..3 {
            let z = if row == 1 && col == 1 { 0.1 } else { 0.0 };
            vertices.extend_from_slice(&[col as f32 * 0.5 - 0.5, row as f32 * 0.5 - 0.5, z]);
        }
    }
    Stimulus {
        surface_data: SurfaceData {
            vertices,
            indices: None,
            extrema_index: 12,
        },
        material: MaterialKind::Glossy,
        surface_slant: 20.0,
        light: LightKind::Directional,
        light_slant: 30.0,
        gamma: Gamma {
            red: 2.2,
            green: 2.0,
            blue: 1.8,
        },
        is_pretest,
    }
}

pub fn context<W: ImageWorker>(worker: W) -> RendererContext<SkiaSceneRenderer, W> {
    RendererContext::new(SkiaSceneRenderer::new(CANVAS, CANVAS), worker)
}

pub fn inline_context() -> RendererContext<SkiaSceneRenderer, InlineWorker> {
    context(InlineWorker)
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

pub fn assert_rt(rt: Option<f64>, expected_ms: f64) {
    let rt = rt.expect("a reaction time");
    assert!((rt - expected_ms).abs() < 1e-6, "rt {rt} != {expected_ms}");
}

pub fn marker_pixels(pixmap: &Pixmap) -> usize {
    pixmap
        .pixels()
        .iter()
        .filter(|p| {
            p.alpha() == 255
                && p.red() == MARKER_KEY[0]
                && p.green() == MARKER_KEY[1]
                && p.blue() == MARKER_KEY[2]
        })
        .count()
}

/// Accepts requests and never answers them.
#[derive(Default)]
pub struct StalledWorker {
    held: RefCell<Vec<oneshot::Sender<Result<sheen_render::WorkerReply, RenderError>>>>,
}

impl ImageWorker for StalledWorker {
    fn submit(&self, _request: WorkerRequest) -> ReplyReceiver {
        let (tx, rx) = oneshot::channel();
        self.held.borrow_mut().push(tx);
        rx
    }
}

/// Answers each request after a fixed delay.
pub struct DelayedWorker {
    pub delay: Duration,
}

impl ImageWorker for DelayedWorker {
    fn submit(&self, request: WorkerRequest) -> ReplyReceiver {
        let (tx, rx) = oneshot::channel();
        let reply = process(request);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(reply);
        });
        rx
    }
}

/// Drops every reply channel without answering.
pub struct DroppingWorker;

impl ImageWorker for DroppingWorker {
    fn submit(&self, _request: WorkerRequest) -> ReplyReceiver {
        let (_tx, rx) = oneshot::channel();
        rx
    }
}
