use crate::keys::key_name;
use crate::runner::SessionHandle;
use anyhow::{Result, anyhow};
use pixels::{Pixels, SurfaceTexture};
use sheen_experiment::{SessionConfig, SessionReport};
use sheen_render::SurfaceSnapshot;
use sheen_timing::{FrameTimer, KeyEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tiny_skia::Pixmap;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{KeyEvent as WinitKeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{Key, NamedKey},
    window::{Fullscreen, Window, WindowId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEvent {
    SessionFinished,
}

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    proxy: EventLoopProxy<UserEvent>,

    pending: Option<(SessionConfig, PathBuf)>,
    session: Option<SessionHandle>,
    canvas: (u32, u32),
    shown_revision: Option<u64>,

    frames: FrameTimer,
    current_size: Option<PhysicalSize<u32>>,
    scale_factor: f64,
    refresh_rate: Option<f64>,
    startup_error: Option<anyhow::Error>,
}

impl App {
    pub fn run(config: SessionConfig, output: PathBuf) -> Result<SessionReport> {
        let event_loop = EventLoop::<UserEvent>::with_user_event().build()?;
        info!(
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "press ESC to abort the session"
        );

        let mut app = App {
            window: None,
            pixels: None,
            proxy: event_loop.create_proxy(),
            canvas: (config.canvas.width, config.canvas.height),
            pending: Some((config, output)),
            session: None,
            shown_revision: None,
            frames: FrameTimer::new(240),
            current_size: None,
            scale_factor: 1.0,
            refresh_rate: None,
            startup_error: None,
        };
        event_loop.run_app(&mut app)?;
        app.finish()
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("no monitor available"))?;

        self.refresh_rate = monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let attributes = Window::default_attributes()
            .with_title("Sheen")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(monitor.clone()))))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        self.current_size = Some(size);
        self.scale_factor = window.scale_factor();

        info!(
            width = size.width,
            height = size.height,
            scale = self.scale_factor,
            refresh_hz = ?self.refresh_rate,
            "display configured"
        );
        let (cw, ch) = self.canvas;
        if cw > size.width || ch > size.height {
            warn!(cw, ch, "canvas is larger than the display and will be cropped");
        }

        // The buffer is canvas-sized; pixels centres it and clears the rest to black.
        let texture = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(cw, ch, texture)?);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn start_session(&mut self) -> Result<()> {
        let Some((config, output)) = self.pending.take() else {
            return Ok(());
        };
        let proxy = self.proxy.clone();
        let handle = SessionHandle::spawn(config, output, move || {
            // Fails only if the event loop is already gone.
            let _ = proxy.send_event(UserEvent::SessionFinished);
        })?;
        self.session = Some(handle);
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(session)) = (self.pixels.as_mut(), self.session.as_ref()) else {
            return Ok(());
        };

        let snapshot = session.frames().borrow().clone();
        if self.shown_revision != Some(snapshot.revision) {
            present(pixels.frame_mut(), self.canvas.0, &snapshot);
            self.shown_revision = Some(snapshot.revision);
        }
        pixels.render()?;
        self.frames.tick();
        Ok(())
    }

    fn handle_key(&mut self, event: &WinitKeyEvent, event_loop: &ActiveEventLoop) {
        if event.logical_key == Key::Named(NamedKey::Escape) {
            info!("session aborted from the keyboard");
            self.abort(event_loop);
            return;
        }
        let (Some(session), Some(name)) = (self.session.as_ref(), key_name(&event.logical_key))
        else {
            return;
        };
        let sent = session.keys().send(KeyEvent {
            key: name.into(),
            at: Instant::now(),
            repeat: event.repeat,
        });
        if !sent {
            debug!("session no longer listening for keys");
        }
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        self.current_size = Some(size);
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(size.width, size.height) {
                error!(error = %e, "failed to resize surface");
            }
        }
        debug!(width = size.width, height = size.height, "display resized");
    }

    fn abort(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(session) = &self.session {
            session.cancel();
        }
        event_loop.exit();
    }

    fn finish(mut self) -> Result<SessionReport> {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        if let Some(stats) = self.frames.stats() {
            info!(
                frames = self.frames.frame_count(),
                mean_ms = stats.average_frame_time_ns / 1e6,
                jitter_ms = stats.jitter_ns / 1e6,
                min_ms = stats.min_frame_time_ns / 1e6,
                max_ms = stats.max_frame_time_ns / 1e6,
                fps = stats.effective_fps,
                "frame timing"
            );
        }
        if let Some(err) = self.startup_error.take() {
            if let Some(session) = self.session.take() {
                session.cancel();
                let _ = session.join();
            }
            return Err(err);
        }
        let session = self
            .session
            .take()
            .ok_or_else(|| anyhow!("window closed before the session started"))?;
        // Closing the window early must not leave the session running.
        session.cancel();
        session.join()
    }

    fn fail(&mut self, err: anyhow::Error, event_loop: &ActiveEventLoop) {
        error!(error = %err, "display failure");
        self.startup_error = Some(err);
        self.abort(event_loop);
    }
}

/// Copies the visible stimulus into a `canvas_width`-wide RGBA buffer over black.
///
/// Premultiplied pixels composited over black keep their colour bytes, so only
/// alpha needs forcing to opaque.
pub fn present(frame: &mut [u8], canvas_width: u32, snapshot: &SurfaceSnapshot) {
    for px in frame.chunks_exact_mut(4) {
        px.copy_from_slice(&[0, 0, 0, 255]);
    }
    let Some(pixmap) = snapshot.visible_pixmap() else {
        return;
    };
    blit_centered(frame, canvas_width, pixmap);
}

fn blit_centered(frame: &mut [u8], width: u32, pixmap: &Pixmap) {
    let width = width as usize;
    if width == 0 {
        return;
    }
    let height = frame.len() / 4 / width;
    let (pw, ph) = (pixmap.width() as usize, pixmap.height() as usize);
    let (cols, rows) = (pw.min(width), ph.min(height));
    let (dx, dy) = ((width - cols) / 2, (height - rows) / 2);
    let (sx, sy) = ((pw - cols) / 2, (ph - rows) / 2);

    let src = pixmap.data();
    for row in 0..rows {
        let s = ((sy + row) * pw + sx) * 4;
        let d = ((dy + row) * width + dx) * 4;
        let (src_row, dst_row) = (&src[s..s + cols * 4], &mut frame[d..d + cols * 4]);
        for (out, px) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
            out[..3].copy_from_slice(&px[..3]);
            out[3] = 255;
        }
    }
}

impl ApplicationHandler<UserEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.create_window_and_surface(event_loop) {
            self.fail(e, event_loop);
            return;
        }
        if let Err(e) = self.start_session() {
            self.fail(e, event_loop);
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::SessionFinished => {
                info!("session finished");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.abort(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    self.fail(e, event_loop);
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                self.handle_key(&event, event_loop);
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = scale_factor;
                if let Some(window) = &self.window {
                    self.handle_resize(window.inner_size());
                }
            }
            _ => {}
        }
    }
}
