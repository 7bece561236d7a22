//! Blend mode definitions for layer compositing.
//!
//! Every blend formula is written once, inside the `blend_modes!` invocation
//! below. The macro expands each formula into the host routine
//! ([`BlendMode::blend_channel`] / [`BlendMode::blend_alpha`]) and into the
//! WGSL text used by the shader generator ([`BlendMode::wgsl_color_expr`] /
//! [`BlendMode::wgsl_alpha_expr`]). The host loop and the fragment routine
//! therefore evaluate the same arithmetic in the same order.
//!
//! Formula variables:
//! - `s`: source channel (one of r, g, b)
//! - `d`: destination channel
//! - `a`: source alpha already multiplied by the layer opacity
//! - `da`: destination alpha
//!
//! Formulas may only use arithmetic and `min`, which is spelled identically
//! in both languages.

use serde::{Deserialize, Serialize};

/// Scalar `min` with WGSL spelling, usable inside formulas.
#[inline(always)]
fn min(x: f32, y: f32) -> f32 {
    if x < y {
        x
    } else {
        y
    }
}

macro_rules! blend_modes {
    ($(
        $(#[$meta:meta])*
        $variant:ident = $code:literal, $name:literal {
            color($s:ident, $d:ident, $a:ident) => $color:expr,
            alpha($aa:ident, $da:ident) => $alpha:expr $(,)?
        }
    )*) => {
        /// Blend modes for compositing a layer onto the accumulator beneath it.
        #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum BlendMode {
            $( $(#[$meta])* $variant, )*
        }

        impl BlendMode {
            /// Integer constant passed to the GPU as `blend_code`.
            pub fn code(self) -> u32 {
                match self {
                    $( Self::$variant => $code, )*
                }
            }

            /// Inverse of [`code`](Self::code).
            pub fn from_code(code: u32) -> Option<Self> {
                match code {
                    $( $code => Some(Self::$variant), )*
                    _ => None,
                }
            }

            pub fn display_name(self) -> &'static str {
                match self {
                    $( Self::$variant => $name, )*
                }
            }

            /// All blend modes in code order.
            pub fn all() -> &'static [BlendMode] {
                &[ $( Self::$variant, )* ]
            }

            /// Blend one color channel. `a` is source alpha times layer opacity.
            #[inline]
            #[allow(unused_variables)]
            pub fn blend_channel(self, s: f32, d: f32, a: f32) -> f32 {
                match self {
                    $( Self::$variant => {
                        let ($s, $d, $a) = (s, d, a);
                        $color
                    } )*
                }
            }

            /// Resulting alpha for source alpha `a` (opacity applied) over `da`.
            #[inline]
            #[allow(unused_variables)]
            pub fn blend_alpha(self, a: f32, da: f32) -> f32 {
                match self {
                    $( Self::$variant => {
                        let ($aa, $da) = (a, da);
                        $alpha
                    } )*
                }
            }

            /// Color formula as WGSL source, applied per scalar channel.
            pub fn wgsl_color_expr(self) -> &'static str {
                match self {
                    $( Self::$variant => stringify!($color), )*
                }
            }

            /// Alpha formula as WGSL source.
            pub fn wgsl_alpha_expr(self) -> &'static str {
                match self {
                    $( Self::$variant => stringify!($alpha), )*
                }
            }
        }
    };
}

blend_modes! {
    /// Source-over: `out = s*a + d*(1-a)`.
    #[default]
    Normal = 0, "Normal" {
        color(s, d, a) => s * a + d * (1.0 - a),
        alpha(a, da) => a + da * (1.0 - a),
    }
    /// Adds the weighted source onto the destination.
    Additive = 1, "Additive" {
        color(s, d, a) => d + s * a,
        alpha(a, da) => min(1.0, da + a),
    }
    /// Darkens the destination; white or zero alpha leaves it unchanged.
    Multiply = 2, "Multiply" {
        color(s, d, a) => d * (1.0 - a * (1.0 - s)),
        alpha(a, da) => da,
    }
}

impl BlendMode {
    /// Blend a single RGBA source pixel onto `dst` in place.
    #[inline]
    pub fn blend_pixel(self, dst: &mut [f32], src: &[f32], opacity: f32) {
        let a = src[3] * opacity;
        dst[0] = self.blend_channel(src[0], dst[0], a);
        dst[1] = self.blend_channel(src[1], dst[1], a);
        dst[2] = self.blend_channel(src[2], dst[2], a);
        dst[3] = self.blend_alpha(a, dst[3]);
    }

    /// Blend a whole interleaved RGBA buffer onto the accumulator.
    ///
    /// Both slices must have the same length (a multiple of 4).
    pub fn blend_buffer(self, acc: &mut [f32], src: &[f32], opacity: f32) {
        debug_assert_eq!(acc.len(), src.len());
        for (d, s) in acc.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
            self.blend_pixel(d, s, opacity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip() {
        for &mode in BlendMode::all() {
            assert_eq!(BlendMode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(BlendMode::from_code(99), None);
    }

    #[test]
    fn default_is_normal() {
        assert_eq!(BlendMode::default(), BlendMode::Normal);
    }

    #[test]
    fn normal_opaque_replaces() {
        let mut dst = [0.2, 0.4, 0.6, 0.5];
        BlendMode::Normal.blend_pixel(&mut dst, &[0.9, 0.1, 0.3, 1.0], 1.0);
        assert_eq!(dst, [0.9, 0.1, 0.3, 1.0]);
    }

    #[test]
    fn additive_zero_opacity_is_identity() {
        let before = [0.123_456, 0.654_321, 0.5, 0.75];
        let mut dst = before;
        BlendMode::Additive.blend_pixel(&mut dst, &[0.7, -0.3, 1.0, 1.0], 0.0);
        for i in 0..4 {
            assert_eq!(dst[i].to_bits(), before[i].to_bits());
        }
    }

    #[test]
    fn additive_alpha_saturates() {
        let mut dst = [0.1, 0.1, 0.1, 0.8];
        BlendMode::Additive.blend_pixel(&mut dst, &[0.5, 0.5, 0.5, 1.0], 0.5);
        assert!((dst[0] - 0.35).abs() < 1e-6);
        assert_eq!(dst[3], 1.0);
    }

    #[test]
    fn multiply_white_is_identity() {
        let before = [0.3, 0.6, 0.9, 0.4];
        let mut dst = before;
        BlendMode::Multiply.blend_pixel(&mut dst, &[1.0, 1.0, 1.0, 1.0], 1.0);
        assert_eq!(dst, before);
    }

    #[test]
    fn multiply_black_zeroes_color_keeps_alpha() {
        let mut dst = [0.3, 0.6, 0.9, 0.4];
        BlendMode::Multiply.blend_pixel(&mut dst, &[0.0, 0.0, 0.0, 1.0], 1.0);
        assert_eq!(dst, [0.0, 0.0, 0.0, 0.4]);
    }

    #[test]
    fn wgsl_exprs_use_formula_variables() {
        assert_eq!(
            BlendMode::Normal.wgsl_color_expr().replace(' ', ""),
            "s*a+d*(1.0-a)"
        );
        assert_eq!(
            BlendMode::Additive.wgsl_alpha_expr().replace(' ', ""),
            "min(1.0,da+a)"
        );
        assert_eq!(BlendMode::Multiply.wgsl_alpha_expr(), "da");
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&BlendMode::Additive).unwrap();
        assert_eq!(json, "\"additive\"");
        let back: BlendMode = serde_json::from_str("\"multiply\"").unwrap();
        assert_eq!(back, BlendMode::Multiply);
    }
}
