use crate::compositor::{BACKGROUND_KEY, MARKER_KEY};
use crate::error::RenderError;
use crate::scene::SceneRenderer;
use glam::{Mat3, Mat4, Vec3};
use sheen_core::{LightConfig, LightKind, Marker, MaterialKind, SurfaceData};
use std::collections::HashMap;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Transform};
use tracing::{debug, trace};

const ALBEDO: f32 = 0.7;
const BASE_AMBIENT: f32 = 0.08;
const SPECULAR: f32 = 0.6;
const SHININESS: f32 = 40.0;
const VIEW: Vec3 = Vec3::Z;

#[derive(Debug, Clone, Copy)]
struct DirectionalLight {
    direction: Vec3,
    color: Vec3,
}

impl DirectionalLight {
    fn new(from: Vec3, color: Vec3) -> Self {
        Self {
            direction: from.normalize_or_zero(),
            color,
        }
    }
}

/// Mathematica's default lighting: coloured ambient plus four coloured lights.
const MATHEMATICA_AMBIENT: Vec3 = Vec3::new(0.4, 0.2, 0.2);

fn mathematica_lights() -> [DirectionalLight; 4] {
    [
        DirectionalLight::new(Vec3::new(0.0, 2.0, 2.0), Vec3::new(0.0, 0.18, 0.5)),
        DirectionalLight::new(Vec3::new(2.0, 2.0, 2.0), Vec3::new(0.18, 0.5, 0.18)),
        DirectionalLight::new(Vec3::new(2.0, 0.0, 2.0), Vec3::new(0.5, 0.18, 0.0)),
        DirectionalLight::new(Vec3::new(0.0, 0.0, 2.0), Vec3::new(0.0, 0.18, 0.5)),
    ]
}

fn matlab_light() -> DirectionalLight {
    DirectionalLight::new(Vec3::new(1.0, 0.0, 1.0), Vec3::ONE)
}

/// Slant in tenths of a degree, used as a light map key.
fn slant_key(deg: f32) -> i32 {
    (deg * 10.0).round() as i32
}

fn directional_light(surface_slant: f32, light_slant: f32) -> DirectionalLight {
    let ls = light_slant.to_radians();
    let tilt = Mat3::from_rotation_x((-surface_slant).to_radians());
    DirectionalLight::new(tilt * Vec3::new(0.0, ls.sin(), ls.cos()), Vec3::ONE)
}

#[derive(Debug, Default)]
struct LightRig {
    matlab: bool,
    mathematica: bool,
    /// Directional lights keyed by (surface slant, light slant).
    directional: HashMap<(i32, i32), (DirectionalLight, bool)>,
}

impl LightRig {
    fn set(&mut self, light: &LightConfig, visible: bool) {
        match light.kind {
            LightKind::Matlab => self.matlab = visible,
            LightKind::Mathematica => self.mathematica = visible,
            LightKind::Directional => {
                let key = (slant_key(light.surface_slant), slant_key(light.light_slant));
                let entry = self.directional.entry(key).or_insert_with(|| {
                    (
                        directional_light(light.surface_slant, light.light_slant),
                        false,
                    )
                });
                entry.1 = visible;
            }
        }
    }

    fn ambient(&self) -> Vec3 {
        let mut ambient = Vec3::splat(BASE_AMBIENT);
        if self.mathematica {
            ambient += MATHEMATICA_AMBIENT;
        }
        ambient
    }

    fn active(&self) -> Vec<DirectionalLight> {
        let mut lights = Vec::new();
        if self.matlab {
            lights.push(matlab_light());
        }
        if self.mathematica {
            lights.extend(mathematica_lights());
        }
        lights.extend(
            self.directional
                .values()
                .filter(|(_, visible)| *visible)
                .map(|(light, _)| *light),
        );
        lights
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct MarkerState {
    position: Vec3,
    visible: bool,
}

/// Software rasterizer for the stimulus scene.
///
/// Orthographic camera looking down -Z, flat-shaded triangles filled back to
/// front, markers drawn last in the marker key colour over a background in
/// the background key colour.
pub struct SkiaSceneRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),
    scale: f32,

    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    material: MaterialKind,
    model: Mat4,

    markers: [MarkerState; 2],
    lights: LightRig,
}

impl SkiaSceneRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            center: (width as f32 / 2.0, height as f32 / 2.0),
            scale: width.min(height) as f32 * 0.4,
            vertices: Vec::new(),
            triangles: Vec::new(),
            material: MaterialKind::Matte,
            model: Mat4::IDENTITY,
            markers: [MarkerState::default(); 2],
            lights: LightRig::default(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.center = (width as f32 / 2.0, height as f32 / 2.0);
        self.scale = width.min(height) as f32 * 0.4;
    }

    pub fn marker_visible(&self, marker: Marker) -> bool {
        self.markers[marker.index()].visible
    }

    pub fn marker_position(&self, marker: Marker) -> Vec3 {
        self.markers[marker.index()].position
    }

    pub fn active_light_count(&self) -> usize {
        self.lights.active().len()
    }

    pub fn model(&self) -> Mat4 {
        self.model
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    fn project(&self, p: Vec3) -> (f32, f32) {
        (
            self.center.0 + p.x * self.scale,
            self.center.1 - p.y * self.scale,
        )
    }

    fn shade(&self, normal: Vec3, lights: &[DirectionalLight], ambient: Vec3) -> [u8; 3] {
        let mut diffuse = Vec3::ZERO;
        let mut specular = Vec3::ZERO;
        for light in lights {
            let lambert = normal.dot(light.direction).max(0.0);
            diffuse += light.color * lambert;
            if self.material == MaterialKind::Glossy && lambert > 0.0 {
                let half = (light.direction + VIEW).normalize_or_zero();
                specular += light.color * normal.dot(half).max(0.0).powf(SHININESS) * SPECULAR;
            }
        }
        let c = (ALBEDO * (ambient + diffuse) + specular).clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
        [c.x.round() as u8, c.y.round() as u8, c.z.round() as u8]
    }

    fn triangulate(surface: &SurfaceData) -> Result<Vec<[u32; 3]>, RenderError> {
        let count = surface.vertex_count();
        if let Some(indices) = &surface.indices {
            if indices.is_empty() || indices.len() % 3 != 0 {
                return Err(RenderError::Geometry(format!(
                    "index buffer length {} is not a positive multiple of 3",
                    indices.len()
                )));
            }
            if let Some(bad) = indices.iter().find(|&&i| i as usize >= count) {
                return Err(RenderError::Geometry(format!(
                    "index {bad} out of range for {count} vertices"
                )));
            }
            return Ok(indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect());
        }

        let side = surface.grid_side().ok_or_else(|| {
            RenderError::Geometry(format!(
                "{count} vertices without indices do not form a square grid"
            ))
        })?;
        let mut triangles = Vec::with_capacity((side - 1) * (side - 1) * 2);
        for row in 0..side - 1 {
            for col in 0..side - 1 {
                let i = (row * side + col) as u32;
                let s = side as u32;
                triangles.push([i, i + 1, i + s]);
                triangles.push([i + 1, i + s + 1, i + s]);
            }
        }
        Ok(triangles)
    }

    fn fill_triangle(&self, pixmap: &mut Pixmap, points: [Vec3; 3], rgb: [u8; 3]) {
        let mut paint = Paint::default();
        paint.anti_alias = false;
        paint.set_color_rgba8(rgb[0], rgb[1], rgb[2], 255);

        let mut pb = PathBuilder::new();
        let (x0, y0) = self.project(points[0]);
        let (x1, y1) = self.project(points[1]);
        let (x2, y2) = self.project(points[2]);
        pb.move_to(x0, y0);
        pb.line_to(x1, y1);
        pb.line_to(x2, y2);
        pb.close();
        // Degenerate (edge-on) triangles produce no path.
        if let Some(path) = pb.finish() {
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }

    fn draw_marker(&self, pixmap: &mut Pixmap, marker: Marker) {
        let state = self.markers[marker.index()];
        let (x, y) = self.project(state.position);

        let mut paint = Paint::default();
        paint.anti_alias = false;
        paint.set_color_rgba8(MARKER_KEY[0], MARKER_KEY[1], MARKER_KEY[2], 255);

        let mut pb = PathBuilder::new();
        pb.push_circle(x, y, self.marker_radius_px(marker).max(0.5));
        if let Some(path) = pb.finish() {
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }
}

impl SceneRenderer for SkiaSceneRenderer {
    fn rebuild_geometry(&mut self, surface: &SurfaceData) -> Result<(), RenderError> {
        if surface.vertices.is_empty() || surface.vertices.len() % 3 != 0 {
            return Err(RenderError::Geometry(format!(
                "vertex buffer length {} is not a positive multiple of 3",
                surface.vertices.len()
            )));
        }
        self.triangles = Self::triangulate(surface)?;
        self.vertices = surface
            .vertices
            .chunks_exact(3)
            .map(|v| Vec3::new(v[0], v[1], v[2]))
            .collect();
        debug!(
            vertices = self.vertices.len(),
            triangles = self.triangles.len(),
            "mesh geometry rebuilt"
        );
        Ok(())
    }

    fn set_material(&mut self, kind: MaterialKind) {
        self.material = kind;
    }

    fn rotate(&mut self, slant_deg: f32) {
        self.model *= Mat4::from_rotation_x((-slant_deg).to_radians());
    }

    fn local_to_world(&self, local: Vec3) -> Vec3 {
        self.model.transform_point3(local)
    }

    fn place_marker(&mut self, marker: Marker, position: Vec3) {
        self.markers[marker.index()].position = position;
    }

    fn set_marker_visible(&mut self, marker: Marker, visible: bool) {
        self.markers[marker.index()].visible = visible;
    }

    fn set_lighting(&mut self, light: &LightConfig, visible: bool) {
        self.lights.set(light, visible);
    }

    fn render_frame(&mut self) -> Result<Pixmap, RenderError> {
        let mut pixmap = Pixmap::new(self.width, self.height).ok_or(RenderError::Pixmap {
            width: self.width,
            height: self.height,
        })?;
        pixmap.fill(Color::from_rgba8(
            BACKGROUND_KEY[0],
            BACKGROUND_KEY[1],
            BACKGROUND_KEY[2],
            255,
        ));

        let world: Vec<Vec3> = self
            .vertices
            .iter()
            .map(|v| self.model.transform_point3(*v))
            .collect();

        // Painter's order: farthest (most negative z) first.
        let mut order: Vec<(f32, [Vec3; 3])> = self
            .triangles
            .iter()
            .map(|t| {
                let points = [
                    world[t[0] as usize],
                    world[t[1] as usize],
                    world[t[2] as usize],
                ];
                ((points[0].z + points[1].z + points[2].z) / 3.0, points)
            })
            .collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0));

        let lights = self.lights.active();
        let ambient = self.lights.ambient();
        for (_, points) in &order {
            let mut normal = (points[1] - points[0])
                .cross(points[2] - points[0])
                .normalize_or_zero();
            if normal.z < 0.0 {
                normal = -normal;
            }
            let rgb = self.shade(normal, &lights, ambient);
            self.fill_triangle(&mut pixmap, *points, rgb);
        }

        for marker in Marker::ALL {
            if self.marker_visible(marker) {
                self.draw_marker(&mut pixmap, marker);
            }
        }

        trace!(triangles = order.len(), lights = lights.len(), "scene rendered");
        Ok(pixmap)
    }

    fn reset_transforms(&mut self) {
        self.model = Mat4::IDENTITY;
        for marker in &mut self.markers {
            marker.position = Vec3::ZERO;
        }
    }

    fn marker_radius_px(&self, marker: Marker) -> f32 {
        marker.radius() * self.scale
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::locate_marker;

    fn flat_grid(side: usize, half: f32) -> SurfaceData {
        let mut vertices = Vec::new();
        for row in 0..side {
            for col in 0..side {
                let t = |i: usize| -half + 2.0 * half * i as f32 / (side - 1) as f32;
                vertices.extend_from_slice(&[t(col), t(row), 0.0]);
            }
        }
        SurfaceData {
            vertices,
            indices: None,
            extrema_index: (side * side / 2) * 3,
        }
    }

    fn matlab() -> LightConfig {
        LightConfig {
            kind: LightKind::Matlab,
            surface_slant: 0.0,
            light_slant: 0.0,
        }
    }

    #[test]
    fn grid_is_triangulated() {
        let mut r = SkiaSceneRenderer::new(64, 64);
        r.rebuild_geometry(&flat_grid(4, 1.0)).unwrap();
        assert_eq!(r.triangle_count(), 18);
    }

    #[test]
    fn rejects_out_of_range_indices() {
        let mut r = SkiaSceneRenderer::new(64, 64);
        let mut surface = flat_grid(2, 1.0);
        surface.indices = Some(vec![0, 1, 9]);
        assert!(matches!(
            r.rebuild_geometry(&surface),
            Err(RenderError::Geometry(_))
        ));
    }

    #[test]
    fn renders_surface_over_key_background() {
        let mut r = SkiaSceneRenderer::new(100, 100);
        r.rebuild_geometry(&flat_grid(3, 0.5)).unwrap();
        r.set_lighting(&matlab(), true);
        let frame = r.render_frame().unwrap();

        let corner = frame.pixel(0, 0).unwrap();
        assert_eq!(
            [corner.red(), corner.green(), corner.blue()],
            BACKGROUND_KEY
        );
        let middle = frame.pixel(50, 50).unwrap();
        assert_ne!(
            [middle.red(), middle.green(), middle.blue()],
            BACKGROUND_KEY
        );
        assert!(middle.red() > 0 && middle.green() > 0 && middle.blue() > 0);
    }

    #[test]
    fn visible_marker_is_drawn_where_placed() {
        let mut r = SkiaSceneRenderer::new(100, 100);
        r.rebuild_geometry(&flat_grid(3, 0.5)).unwrap();
        r.place_marker(Marker::Disk, Vec3::new(0.0, 0.0, 0.02));
        let hidden = r.render_frame().unwrap();
        assert_eq!(locate_marker(&hidden), None);

        r.set_marker_visible(Marker::Disk, true);
        let shown = r.render_frame().unwrap();
        let index = locate_marker(&shown).unwrap();
        let (x, y) = (index % 100, index / 100);
        assert!(x.abs_diff(50) <= 1 && y.abs_diff(50) <= 1, "{x},{y}");
    }

    #[test]
    fn rotation_moves_points_and_resets() {
        let mut r = SkiaSceneRenderer::new(64, 64);
        r.rotate(90.0);
        let p = r.local_to_world(Vec3::new(0.0, 1.0, 0.0));
        assert!((p.z + 1.0).abs() < 1e-5);
        r.reset_transforms();
        assert_eq!(r.model(), Mat4::IDENTITY);
    }

    #[test]
    fn directional_lights_are_keyed_by_slants() {
        let mut r = SkiaSceneRenderer::new(32, 32);
        let light = LightConfig {
            kind: LightKind::Directional,
            surface_slant: 30.0,
            light_slant: 15.0,
        };
        r.set_lighting(&light, true);
        r.set_lighting(
            &LightConfig {
                light_slant: 45.0,
                ..light
            },
            false,
        );
        assert_eq!(r.active_light_count(), 1);
        r.set_lighting(&light, false);
        assert_eq!(r.active_light_count(), 0);
    }
}
