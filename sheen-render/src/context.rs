use crate::error::RenderError;
use crate::scene::SceneRenderer;
use crate::surface::{DisplaySurface, SurfaceSnapshot};
use crate::worker::ImageWorker;
use glam::Vec3;
use sheen_core::{Marker, Stimulus};
use tiny_skia::Pixmap;
use tokio::sync::watch;
use tracing::debug;

/// Everything a trial draws with: the scene, the image worker and the
/// surface frames are shown on.
pub struct RendererContext<R, W> {
    renderer: R,
    worker: W,
    surface: Option<DisplaySurface>,
}

impl<R: SceneRenderer, W: ImageWorker> RendererContext<R, W> {
    pub fn new(renderer: R, worker: W) -> Self {
        Self {
            renderer,
            worker,
            surface: Some(DisplaySurface::new()),
        }
    }

    /// A context with no display surface attached. Trials run against it fail.
    pub fn detached(renderer: R, worker: W) -> Self {
        Self {
            renderer,
            worker,
            surface: None,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn worker(&self) -> &W {
        &self.worker
    }

    pub fn surface(&self) -> Result<&DisplaySurface, RenderError> {
        self.surface.as_ref().ok_or(RenderError::SurfaceMissing)
    }

    pub fn surface_mut(&mut self) -> Result<&mut DisplaySurface, RenderError> {
        self.surface.as_mut().ok_or(RenderError::SurfaceMissing)
    }

    pub fn subscribe(&self) -> Result<watch::Receiver<SurfaceSnapshot>, RenderError> {
        self.surface().map(DisplaySurface::subscribe)
    }

    /// Loads `stimulus` into the scene and shows `marker` above its extremum.
    pub fn prepare_scene(&mut self, stimulus: &Stimulus, marker: Marker) -> Result<(), RenderError> {
        let surface = &stimulus.surface_data;
        let extremum = surface.extremum().ok_or_else(|| {
            RenderError::Geometry(format!(
                "extrema index {} does not address a vertex",
                surface.extrema_index
            ))
        })?;

        self.renderer.rebuild_geometry(surface)?;
        self.renderer.set_material(stimulus.material);
        self.renderer.rotate(stimulus.surface_slant);

        let world = self.renderer.local_to_world(Vec3::from_array(extremum));
        let position = world + Vec3::Z * marker.distance();
        self.renderer.place_marker(marker, position);
        self.renderer
            .set_lighting(&stimulus.light_config(), true);
        self.renderer.set_marker_visible(marker, true);

        debug!(
            ?marker,
            material = ?stimulus.material,
            slant = stimulus.surface_slant,
            "scene prepared"
        );
        Ok(())
    }

    pub fn render_raw(&mut self) -> Result<Pixmap, RenderError> {
        self.renderer.render_frame()
    }

    /// Hides markers and the stimulus light, and undoes the slant rotation.
    pub fn reset_scene(&mut self, stimulus: &Stimulus) {
        for marker in Marker::ALL {
            self.renderer.set_marker_visible(marker, false);
        }
        self.renderer.reset_transforms();
        self.renderer.set_lighting(&stimulus.light_config(), false);
    }
}
