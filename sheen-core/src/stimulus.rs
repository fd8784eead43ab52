use serde::{Deserialize, Serialize};

/// Surface finish used when shading the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    Matte,
    Glossy,
}

/// Which lighting rig illuminates the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    /// Single white light, MATLAB `light` default placement.
    Matlab,
    /// Mathematica's default three coloured lights plus coloured ambient.
    Mathematica,
    /// One white directional light chosen by surface and light slant.
    Directional,
}

/// Everything a renderer needs to switch a light rig on or off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightConfig {
    pub kind: LightKind,
    pub surface_slant: f32,
    pub light_slant: f32,
}

/// Per-channel display gamma.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gamma {
    #[serde(rename = "gammaRed")]
    pub red: f32,
    #[serde(rename = "gammaGreen")]
    pub green: f32,
    #[serde(rename = "gammaBlue")]
    pub blue: f32,
}

impl Gamma {
    pub const LINEAR: Gamma = Gamma {
        red: 1.0,
        green: 1.0,
        blue: 1.0,
    };

    pub fn channels(&self) -> [f32; 3] {
        [self.red, self.green, self.blue]
    }
}

impl Default for Gamma {
    fn default() -> Self {
        Self::LINEAR
    }
}

/// Overlay marker placed on the surface extremum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Large probe disk shown in pretest trials and in the first phase of two-phase trials.
    Disk,
    /// Small pip.
    Pip,
}

impl Marker {
    pub const ALL: [Marker; 2] = [Marker::Disk, Marker::Pip];

    pub const fn for_pretest(is_pretest: bool) -> Self {
        if is_pretest { Marker::Disk } else { Marker::Pip }
    }

    /// Radius in world units.
    pub const fn radius(self) -> f32 {
        match self {
            Marker::Disk => 0.06,
            Marker::Pip => 0.012,
        }
    }

    /// Offset towards the camera from the extremum vertex, in world units.
    pub const fn distance(self) -> f32 {
        match self {
            Marker::Disk => 0.02,
            Marker::Pip => 0.005,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Marker::Disk => 0,
            Marker::Pip => 1,
        }
    }
}

/// Mesh description of the rendered surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceData {
    /// Flat `[x, y, z, x, y, z, ...]` vertex buffer.
    pub vertices: Vec<f32>,
    /// Triangle list. When absent the vertices are read as a square grid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<u32>>,
    /// Offset of the extremum vertex's x component in `vertices`.
    pub extrema_index: usize,
}

impl SurfaceData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn extremum(&self) -> Option<[f32; 3]> {
        if self.extrema_index % 3 != 0 {
            return None;
        }
        let end = self.extrema_index.checked_add(3)?;
        self.vertices
            .get(self.extrema_index..end)
            .map(|v| [v[0], v[1], v[2]])
    }

    /// Side length when the vertices form an `n x n` grid (n >= 2).
    pub fn grid_side(&self) -> Option<usize> {
        let count = self.vertex_count();
        let side = (count as f64).sqrt().round() as usize;
        (side >= 2 && side * side == count).then_some(side)
    }
}

/// A surface to render for one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stimulus {
    pub surface_data: SurfaceData,
    pub material: MaterialKind,
    /// Degrees; the mesh is rotated by `-surface_slant` about X.
    pub surface_slant: f32,
    pub light: LightKind,
    /// Degrees; only used by directional lights.
    #[serde(default)]
    pub light_slant: f32,
    #[serde(flatten)]
    pub gamma: Gamma,
    #[serde(default = "default_is_pretest")]
    pub is_pretest: bool,
}

fn default_is_pretest() -> bool {
    true
}

impl Stimulus {
    pub fn light_config(&self) -> LightConfig {
        LightConfig {
            kind: self.light,
            surface_slant: self.surface_slant,
            light_slant: self.light_slant,
        }
    }

    pub fn marker(&self) -> Marker {
        Marker::for_pretest(self.is_pretest)
    }
}
