//! Color helpers shared by colormaps and layer variants.

use crate::types::Rgba;

pub const TRANSPARENT: Rgba = [0.0, 0.0, 0.0, 0.0];
pub const WHITE: Rgba = [1.0, 1.0, 1.0, 1.0];

/// Component-wise linear interpolation between two colors.
#[inline]
pub fn lerp_rgba(a: Rgba, b: Rgba, t: f32) -> Rgba {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

/// Clamp every component into `[0, 1]`, mapping NaN to 0.
#[inline]
pub fn clamp_rgba(c: Rgba) -> Rgba {
    let f = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
    [f(c[0]), f(c[1]), f(c[2]), f(c[3])]
}

/// Convert HSV (`h` in degrees, `s` and `v` in `[0, 1]`) to RGB.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [f32; 3] {
    let h = h.rem_euclid(360.0);
    let c = v * s;
    let h_prime = h / 60.0;
    let x = c * (1.0 - (h_prime % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match h_prime as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    [
        (r1 + m).clamp(0.0, 1.0),
        (g1 + m).clamp(0.0, 1.0),
        (b1 + m).clamp(0.0, 1.0),
    ]
}

/// Parse `#rrggbb` or `#rrggbbaa` into a color.
pub fn parse_hex(hex: &str) -> Option<Rgba> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    let a = if digits.len() == 8 { byte(6)? } else { 255 };
    Some([
        byte(0)? as f32 / 255.0,
        byte(2)? as f32 / 255.0,
        byte(4)? as f32 / 255.0,
        a as f32 / 255.0,
    ])
}
