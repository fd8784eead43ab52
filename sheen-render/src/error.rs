use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid geometry: {0}")]
    Geometry(String),

    #[error("cannot allocate a {width}x{height} pixmap")]
    Pixmap { width: u32, height: u32 },

    #[error("pixel buffer of {len} bytes does not fit rows of width {width}")]
    BufferSize { len: usize, width: u32 },

    #[error("display surface is not attached")]
    SurfaceMissing,

    #[error("no element with id '{0}' on the display surface")]
    ElementNotFound(String),

    #[error("image worker is not running")]
    WorkerGone,
}
