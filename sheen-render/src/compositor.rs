//! Pixel passes that turn a raw scene render into a displayable frame.
//!
//! Raw renders use two key colours: pure green for the background and pure
//! red for the overlay marker. The compositor keys out the background,
//! corrects each channel for the display's gamma and can paint a full-size
//! disk over the marker.

use crate::error::RenderError;
use sheen_core::Gamma;
use tiny_skia::{
    ColorU8, FillRule, IntSize, Paint, PathBuilder, Pixmap, PremultipliedColorU8, Transform,
};

pub const BACKGROUND_KEY: [u8; 3] = [0, 255, 0];
pub const MARKER_KEY: [u8; 3] = [255, 0, 0];

fn is_key(px: PremultipliedColorU8, key: [u8; 3]) -> bool {
    px.alpha() == 255 && px.red() == key[0] && px.green() == key[1] && px.blue() == key[2]
}

/// Makes every background-key pixel fully transparent. Returns how many were cleared.
pub fn remove_background_key(pixmap: &mut Pixmap) -> usize {
    let mut cleared = 0;
    for px in pixmap.pixels_mut() {
        if is_key(*px, BACKGROUND_KEY) {
            *px = PremultipliedColorU8::TRANSPARENT;
            cleared += 1;
        }
    }
    cleared
}

/// Per-channel lookup tables for `c' = 255 * (c / 255)^(1 / gamma)`.
#[derive(Debug, Clone)]
pub struct GammaLut {
    tables: [[u8; 256]; 3],
}

impl GammaLut {
    pub fn new(gamma: Gamma) -> Self {
        let mut tables = [[0u8; 256]; 3];
        for (table, g) in tables.iter_mut().zip(gamma.channels()) {
            let exponent = 1.0 / g as f64;
            for (i, out) in table.iter_mut().enumerate() {
                let v = (i as f64 / 255.0).powf(exponent);
                *out = (v * 255.0).round().clamp(0.0, 255.0) as u8;
            }
        }
        Self { tables }
    }

    pub fn apply(&self, c: ColorU8) -> ColorU8 {
        ColorU8::from_rgba(
            self.tables[0][c.red() as usize],
            self.tables[1][c.green() as usize],
            self.tables[2][c.blue() as usize],
            c.alpha(),
        )
    }
}

/// Converts linear channel values to display values using a separate gamma per channel.
pub fn linear_to_srgb_per_channel(pixmap: &mut Pixmap, gamma: Gamma) {
    let lut = GammaLut::new(gamma);
    for px in pixmap.pixels_mut() {
        match px.alpha() {
            0 => {}
            255 => {
                // Opaque pixels are stored unpremultiplied already.
                let c = lut.apply(ColorU8::from_rgba(px.red(), px.green(), px.blue(), 255));
                if let Some(out) = PremultipliedColorU8::from_rgba(c.red(), c.green(), c.blue(), 255)
                {
                    *px = out;
                }
            }
            _ => *px = lut.apply(px.demultiply()).premultiply(),
        }
    }
}

/// Copy of `raw` with the background keyed out and gamma applied.
pub fn composite_and_correct(raw: &Pixmap, gamma: Gamma) -> Pixmap {
    let mut frame = raw.clone();
    remove_background_key(&mut frame);
    linear_to_srgb_per_channel(&mut frame, gamma);
    frame
}

/// Pixel index (`y * width + x`) of the centroid of the marker-key pixels.
pub fn locate_marker(pixmap: &Pixmap) -> Option<usize> {
    let width = pixmap.width() as usize;
    let (mut sum_x, mut sum_y, mut count) = (0usize, 0usize, 0usize);
    for (i, px) in pixmap.pixels().iter().enumerate() {
        if is_key(*px, MARKER_KEY) {
            sum_x += i % width;
            sum_y += i / width;
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }
    Some((sum_y / count) * width + sum_x / count)
}

/// Paints a marker-key disk of `radius` pixels centred on `marker_index`.
pub fn draw_disk(pixmap: &mut Pixmap, marker_index: usize, radius: f32) {
    let width = pixmap.width() as usize;
    let x = (marker_index % width) as f32 + 0.5;
    let y = (marker_index / width) as f32 + 0.5;

    let mut paint = Paint::default();
    paint.anti_alias = false;
    paint.set_color_rgba8(MARKER_KEY[0], MARKER_KEY[1], MARKER_KEY[2], 255);

    let mut pb = PathBuilder::new();
    pb.push_circle(x, y, radius.max(0.5));
    if let Some(path) = pb.finish() {
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
}

/// Rebuilds a pixmap from premultiplied RGBA rows of `width` pixels.
pub fn pixmap_from_rgba(bytes: Vec<u8>, width: u32) -> Result<Pixmap, RenderError> {
    let len = bytes.len();
    let row = width as usize * 4;
    if row == 0 || len == 0 || len % row != 0 {
        return Err(RenderError::BufferSize { len, width });
    }
    let height = (len / row) as u32;
    IntSize::from_wh(width, height)
        .and_then(|size| Pixmap::from_vec(bytes, size))
        .ok_or(RenderError::Pixmap { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::Color;

    fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Pixmap {
        let mut pm = Pixmap::new(width, height).unwrap();
        pm.fill(Color::from_rgba8(rgb[0], rgb[1], rgb[2], 255));
        pm
    }

    #[test]
    fn background_key_becomes_transparent() {
        let mut pm = filled(4, 4, BACKGROUND_KEY);
        pm.pixels_mut()[5] = PremultipliedColorU8::from_rgba(10, 250, 10, 255).unwrap();
        assert_eq!(remove_background_key(&mut pm), 15);
        assert_eq!(pm.pixels()[0].alpha(), 0);
        assert_eq!(pm.pixels()[5].green(), 250);
    }

    #[test]
    fn linear_gamma_is_identity() {
        let lut = GammaLut::new(Gamma::LINEAR);
        let c = ColorU8::from_rgba(12, 128, 200, 255);
        assert_eq!(lut.apply(c), c);
    }

    #[test]
    fn gamma_brightens_midtones_per_channel() {
        let mut pm = filled(2, 2, [64, 64, 64]);
        linear_to_srgb_per_channel(
            &mut pm,
            Gamma {
                red: 2.2,
                green: 1.0,
                blue: 2.0,
            },
        );
        let px = pm.pixels()[0];
        assert_eq!(px.red(), 136);
        assert_eq!(px.green(), 64);
        assert_eq!(px.blue(), 128);
        assert_eq!(px.alpha(), 255);
    }

    #[test]
    fn gamma_keeps_key_colours() {
        let mut pm = filled(2, 1, MARKER_KEY);
        linear_to_srgb_per_channel(
            &mut pm,
            Gamma {
                red: 2.4,
                green: 1.8,
                blue: 2.2,
            },
        );
        assert!(is_key(pm.pixels()[0], MARKER_KEY));
    }

    #[test]
    fn composite_leaves_raw_untouched() {
        let raw = filled(3, 3, BACKGROUND_KEY);
        let frame = composite_and_correct(&raw, Gamma::LINEAR);
        assert_eq!(raw.pixels()[0].alpha(), 255);
        assert!(frame.pixels().iter().all(|p| p.alpha() == 0));
    }

    #[test]
    fn marker_centroid_and_disk() {
        let mut pm = filled(20, 20, [40, 40, 40]);
        assert_eq!(locate_marker(&pm), None);

        let index = 7 * 20 + 12;
        draw_disk(&mut pm, index, 3.3);
        assert_eq!(locate_marker(&pm), Some(index));
        assert!(is_key(pm.pixels()[index], MARKER_KEY));
        assert!(!is_key(pm.pixels()[0], MARKER_KEY));
    }

    #[test]
    fn rgba_round_trip_checks_row_width() {
        let pm = filled(5, 3, [1, 2, 3]);
        let rebuilt = pixmap_from_rgba(pm.data().to_vec(), 5).unwrap();
        assert_eq!((rebuilt.width(), rebuilt.height()), (5, 3));
        assert!(matches!(
            pixmap_from_rgba(vec![0; 10], 5),
            Err(RenderError::BufferSize { len: 10, width: 5 })
        ));
    }
}
