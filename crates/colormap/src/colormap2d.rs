//! Scalar-pair → RGBA mapping through named 2D palettes.
//!
//! Table palettes are precomputed into a 256 × 256 lookup (nearest sampling);
//! the `rgba_wheel` palette is evaluated analytically.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sl_common::color::{hsv_to_rgb, lerp_rgba};
use sl_common::{Range, Rgba, Threshold};

use crate::colormap::{check_range, check_threshold};
use crate::error::ColorMapError;

/// Side length of a precomputed palette table.
pub const PALETTE_SIZE: usize = 256;

/// Named 2D palettes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Palette2D {
    /// x: diverging value, y: confidence (low confidence fades to gray).
    Confidence,
    /// Bivariate corner blend (gray / red / blue / purple).
    Diverging,
    /// x: signed value (cold below center, hot above), y: intensity.
    HotCold,
    /// x: magnitude (brightness), y: phase (hue).
    MagnitudePhase,
    /// Polar HSV wheel around the center: angle → hue, radius → saturation.
    RgbaWheel,
}

impl Palette2D {
    pub fn name(self) -> &'static str {
        match self {
            Self::Confidence => "confidence",
            Self::Diverging => "diverging",
            Self::HotCold => "hot_cold",
            Self::MagnitudePhase => "magnitude_phase",
            Self::RgbaWheel => "rgba_wheel",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ColorMapError> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.name() == name)
            .ok_or_else(|| ColorMapError::UnknownPalette {
                name: name.to_string(),
            })
    }

    pub fn all() -> &'static [Palette2D] {
        &[
            Self::Confidence,
            Self::Diverging,
            Self::HotCold,
            Self::MagnitudePhase,
            Self::RgbaWheel,
        ]
    }

    /// Whether lookups go through a precomputed table.
    pub fn is_tabulated(self) -> bool {
        !matches!(self, Self::RgbaWheel)
    }

    /// Evaluate the palette function at `(tx, ty) ∈ [0, 1]²`.
    pub fn evaluate(self, tx: f32, ty: f32) -> Rgba {
        match self {
            Self::Confidence => {
                let cold = [0.23, 0.30, 0.75, 1.0];
                let mid = [0.87, 0.87, 0.87, 1.0];
                let warm = [0.71, 0.02, 0.15, 1.0];
                let value = if tx < 0.5 {
                    lerp_rgba(cold, mid, tx * 2.0)
                } else {
                    lerp_rgba(mid, warm, (tx - 0.5) * 2.0)
                };
                lerp_rgba([0.5, 0.5, 0.5, 1.0], value, ty)
            }
            Self::Diverging => {
                let c00 = [0.91, 0.91, 0.91, 1.0];
                let c10 = [0.78, 0.35, 0.35, 1.0];
                let c01 = [0.39, 0.67, 0.75, 1.0];
                let c11 = [0.34, 0.26, 0.29, 1.0];
                let bottom = lerp_rgba(c00, c10, tx);
                let top = lerp_rgba(c01, c11, tx);
                lerp_rgba(bottom, top, ty)
            }
            Self::HotCold => {
                let u = (tx - 0.5) * 2.0;
                let rgb = if u >= 0.0 {
                    [1.0, u, 0.0]
                } else {
                    [0.0, -u, 1.0]
                };
                let k = 0.25 + 0.75 * ty;
                [rgb[0] * k, rgb[1] * k, rgb[2] * k, 1.0]
            }
            Self::MagnitudePhase => {
                let [r, g, b] = hsv_to_rgb(ty * 360.0, 1.0, tx);
                [r, g, b, 1.0]
            }
            Self::RgbaWheel => {
                let cx = tx * 2.0 - 1.0;
                let cy = ty * 2.0 - 1.0;
                let radius = (cx * cx + cy * cy).sqrt().min(1.0);
                let hue = cy.atan2(cx).to_degrees();
                let [r, g, b] = hsv_to_rgb(hue, radius, 1.0);
                [r, g, b, 1.0]
            }
        }
    }
}

/// Precomputed `PALETTE_SIZE²` lookup, row-major by `y`.
#[derive(Debug, PartialEq)]
pub struct PaletteTable {
    lut: Vec<Rgba>,
}

impl PaletteTable {
    pub fn build(palette: Palette2D) -> Self {
        let scale = (PALETTE_SIZE - 1) as f32;
        let mut lut = Vec::with_capacity(PALETTE_SIZE * PALETTE_SIZE);
        for iy in 0..PALETTE_SIZE {
            for ix in 0..PALETTE_SIZE {
                lut.push(palette.evaluate(ix as f32 / scale, iy as f32 / scale));
            }
        }
        Self { lut }
    }

    #[inline]
    pub fn lookup(&self, tx: f32, ty: f32) -> Rgba {
        let scale = (PALETTE_SIZE - 1) as f32;
        let ix = (tx * scale).round() as usize;
        let iy = (ty * scale).round() as usize;
        self.lut[iy.min(PALETTE_SIZE - 1) * PALETTE_SIZE + ix.min(PALETTE_SIZE - 1)]
    }
}

/// Two-axis colormap with independent ranges and hide-band thresholds.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "ColorMap2DDef", into = "ColorMap2DDef")]
pub struct ColorMap2D {
    palette: Palette2D,
    range_x: Range,
    range_y: Range,
    threshold_x: Threshold,
    threshold_y: Threshold,
    table: Option<Arc<PaletteTable>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColorMap2DDef {
    palette: Palette2D,
    #[serde(default)]
    range_x: Range,
    #[serde(default)]
    range_y: Range,
    #[serde(default)]
    threshold_x: Threshold,
    #[serde(default)]
    threshold_y: Threshold,
}

impl TryFrom<ColorMap2DDef> for ColorMap2D {
    type Error = ColorMapError;

    fn try_from(def: ColorMap2DDef) -> Result<Self, Self::Error> {
        let mut map = ColorMap2D::new(def.palette);
        map.set_range(def.range_x, def.range_y)?;
        map.set_threshold(def.threshold_x, def.threshold_y)?;
        Ok(map)
    }
}

impl From<ColorMap2D> for ColorMap2DDef {
    fn from(map: ColorMap2D) -> Self {
        Self {
            palette: map.palette,
            range_x: map.range_x,
            range_y: map.range_y,
            threshold_x: map.threshold_x,
            threshold_y: map.threshold_y,
        }
    }
}

impl PartialEq for ColorMap2D {
    fn eq(&self, other: &Self) -> bool {
        self.palette == other.palette
            && self.range_x == other.range_x
            && self.range_y == other.range_y
            && self.threshold_x == other.threshold_x
            && self.threshold_y == other.threshold_y
    }
}

impl ColorMap2D {
    pub fn new(palette: Palette2D) -> Self {
        let table = palette
            .is_tabulated()
            .then(|| Arc::new(PaletteTable::build(palette)));
        Self {
            palette,
            range_x: Range::UNIT,
            range_y: Range::UNIT,
            threshold_x: Threshold::NONE,
            threshold_y: Threshold::NONE,
            table,
        }
    }

    pub fn palette(&self) -> Palette2D {
        self.palette
    }

    pub fn range_x(&self) -> Range {
        self.range_x
    }

    pub fn range_y(&self) -> Range {
        self.range_y
    }

    pub fn threshold_x(&self) -> Threshold {
        self.threshold_x
    }

    pub fn threshold_y(&self) -> Threshold {
        self.threshold_y
    }

    /// Switch palettes, rebuilding the table if needed.
    pub fn set_palette(&mut self, palette: Palette2D) {
        if palette != self.palette {
            *self = Self {
                palette,
                table: palette
                    .is_tabulated()
                    .then(|| Arc::new(PaletteTable::build(palette))),
                ..self.clone()
            };
        }
    }

    pub fn set_range(&mut self, x: Range, y: Range) -> Result<(), ColorMapError> {
        check_range("rangeX", x)?;
        check_range("rangeY", y)?;
        self.range_x = x;
        self.range_y = y;
        Ok(())
    }

    pub fn set_threshold(&mut self, x: Threshold, y: Threshold) -> Result<(), ColorMapError> {
        check_threshold("thresholdX", x)?;
        check_threshold("thresholdY", y)?;
        self.threshold_x = x;
        self.threshold_y = y;
        Ok(())
    }

    /// Map `(x, y)` to a color. Either axis inside its hide band, or a
    /// non-finite input, gives alpha 0.
    pub fn get_color(&self, x: f32, y: f32) -> Rgba {
        let finite = x.is_finite() && y.is_finite();
        let tx = if x.is_finite() { self.range_x.normalize(x) } else { 0.0 };
        let ty = if y.is_finite() { self.range_y.normalize(y) } else { 0.0 };
        let mut c = match &self.table {
            Some(table) => table.lookup(tx, ty),
            None => self.palette.evaluate(tx, ty),
        };
        if !finite || self.threshold_x.hides(x) || self.threshold_y.hides(y) {
            c[3] = 0.0;
        }
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_names_roundtrip() {
        for &p in Palette2D::all() {
            assert_eq!(Palette2D::from_name(p.name()).unwrap(), p);
        }
        assert!(Palette2D::from_name("plaid").is_err());
    }

    #[test]
    fn wheel_is_analytic_and_hue_follows_angle() {
        let map = ColorMap2D::new(Palette2D::RgbaWheel);
        assert!(map.table.is_none());
        // +x axis, full radius → red.
        let c = map.get_color(1.0, 0.5);
        assert!((c[0] - 1.0).abs() < 1e-5 && c[1] < 1e-5 && c[2] < 1e-5);
        // Center → white (zero saturation).
        let c = map.get_color(0.5, 0.5);
        assert!(c[0] > 0.99 && c[1] > 0.99 && c[2] > 0.99);
    }

    #[test]
    fn table_matches_function_at_grid_points() {
        let map = ColorMap2D::new(Palette2D::Diverging);
        let expected = Palette2D::Diverging.evaluate(0.0, 1.0);
        assert_eq!(map.get_color(0.0, 1.0), expected);
        assert_eq!(map.get_color(1.0, 0.0), Palette2D::Diverging.evaluate(1.0, 0.0));
    }

    #[test]
    fn per_axis_threshold_hides() {
        let mut map = ColorMap2D::new(Palette2D::HotCold);
        map.set_range(Range::new(-1.0, 1.0), Range::new(0.0, 1.0)).unwrap();
        map.set_threshold(Threshold::new(-0.2, 0.2), Threshold::NONE).unwrap();
        assert_eq!(map.get_color(0.1, 0.9)[3], 0.0);
        assert_eq!(map.get_color(0.5, 0.9)[3], 1.0);

        map.set_threshold(Threshold::NONE, Threshold::new(0.0, 0.5)).unwrap();
        assert_eq!(map.get_color(0.5, 0.25)[3], 0.0);
        assert_eq!(map.get_color(0.5, 0.75)[3], 1.0);
    }

    #[test]
    fn non_finite_axis_bounds_rejected() {
        let mut map = ColorMap2D::new(Palette2D::HotCold);
        let err = map
            .set_range(Range::UNIT, Range::new(0.0, f32::NAN))
            .unwrap_err();
        assert!(matches!(
            err,
            ColorMapError::NonFiniteBound { field: "rangeY", .. }
        ));
        assert_eq!(map.range_y(), Range::UNIT);
        assert!(map
            .set_threshold(Threshold::new(f32::NEG_INFINITY, 0.0), Threshold::NONE)
            .is_err());

        let json = r#"{"palette":"hot_cold","thresholdX":[null,0.5]}"#;
        assert!(serde_json::from_str::<ColorMap2D>(json).is_err());
    }

    #[test]
    fn hot_cold_sides() {
        let map = ColorMap2D::new(Palette2D::HotCold);
        let hot = map.get_color(1.0, 1.0);
        let cold = map.get_color(0.0, 1.0);
        assert!(hot[0] > 0.9 && hot[2] < 0.1);
        assert!(cold[2] > 0.9 && cold[0] < 0.1);
    }

    #[test]
    fn nan_input_is_transparent() {
        let map = ColorMap2D::new(Palette2D::Confidence);
        assert_eq!(map.get_color(f32::NAN, 0.5)[3], 0.0);
    }

    #[test]
    fn set_palette_rebuilds_table() {
        let mut map = ColorMap2D::new(Palette2D::RgbaWheel);
        map.set_range(Range::new(0.0, 2.0), Range::UNIT).unwrap();
        map.set_palette(Palette2D::MagnitudePhase);
        assert!(map.table.is_some());
        assert_eq!(map.range_x(), Range::new(0.0, 2.0));
    }

    #[test]
    fn serde_roundtrip() {
        let mut map = ColorMap2D::new(Palette2D::MagnitudePhase);
        map.set_range(Range::new(0.0, 5.0), Range::new(-3.0, 3.0)).unwrap();
        let json = serde_json::to_string(&map).unwrap();
        assert!(json.contains("\"palette\":\"magnitude_phase\""));
        let back: ColorMap2D = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
        assert!(back.table.is_some());
    }
}
