pub mod compositor;
pub mod context;
pub mod error;
pub mod render;
pub mod scene;
pub mod surface;
pub mod worker;

pub use compositor::{
    BACKGROUND_KEY, GammaLut, MARKER_KEY, composite_and_correct, draw_disk, linear_to_srgb_per_channel,
    locate_marker, pixmap_from_rgba, remove_background_key,
};
pub use context::RendererContext;
pub use error::RenderError;
pub use render::SkiaSceneRenderer;
pub use scene::SceneRenderer;
pub use surface::{
    DisplaySurface, DisplayedFrame, RESPONDED_CLASS, STIMULUS_ELEMENT_ID, SurfaceSnapshot,
};
pub use worker::{ImageWorker, InlineWorker, ReplyReceiver, ThreadWorker, WorkerReply, WorkerRequest, process};
