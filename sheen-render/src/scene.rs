use crate::error::RenderError;
use glam::Vec3;
use sheen_core::{LightConfig, Marker, MaterialKind, SurfaceData};
use tiny_skia::Pixmap;

/// The 3D scene a trial draws its stimulus with.
///
/// Implementations keep mesh, markers and lights between calls; a trial
/// configures them, renders, and the owner resets them afterwards.
pub trait SceneRenderer {
    /// Replaces the mesh with `surface`'s vertices and triangles.
    fn rebuild_geometry(&mut self, surface: &SurfaceData) -> Result<(), RenderError>;

    fn set_material(&mut self, kind: MaterialKind);

    /// Tilts the mesh away from the viewer by `slant_deg` (rotation of `-slant` about X).
    fn rotate(&mut self, slant_deg: f32);

    /// Maps a mesh-local point through the current mesh transform.
    fn local_to_world(&self, local: Vec3) -> Vec3;

    fn place_marker(&mut self, marker: Marker, position: Vec3);

    fn set_marker_visible(&mut self, marker: Marker, visible: bool);

    fn set_lighting(&mut self, light: &LightConfig, visible: bool);

    /// Raw frame: background in the key green, markers in the key red.
    fn render_frame(&mut self) -> Result<Pixmap, RenderError>;

    /// Puts mesh and marker transforms back to identity.
    fn reset_transforms(&mut self);

    /// On-screen radius of `marker` in pixels.
    fn marker_radius_px(&self, marker: Marker) -> f32;

    fn size(&self) -> (u32, u32);
}
