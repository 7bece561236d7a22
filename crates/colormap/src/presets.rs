//! Colormap preset registry — by-name lookup of stop tables.
//!
//! The registry is an ordinary value: build it once (usually with
//! [`ColorMapRegistry::with_builtins`]) and pass it to whoever constructs
//! colormaps. Tests can build their own registry with custom palettes.

use std::collections::HashMap;

use sl_common::color::parse_hex;
use tracing::info;

use crate::colormap::ColorStop;
use crate::error::ColorMapError;

/// Built-in presets as evenly spaced hex colors.
const EVEN_PRESETS: &[(&str, &[&str])] = &[
    (
        "jet",
        &[
            "#000080", "#0000ff", "#0080ff", "#00ffff", "#80ff80", "#ffff00", "#ff8000", "#ff0000",
            "#800000",
        ],
    ),
    ("cool", &["#00ffff", "#ff00ff"]),
    ("gray", &["#000000", "#ffffff"]),
    (
        "viridis",
        &[
            "#440154", "#472c7a", "#3b518b", "#2c718e", "#21908d", "#27ad81", "#5cc863", "#aadc32",
            "#fde725",
        ],
    ),
    (
        "plasma",
        &[
            "#0d0887", "#5302a3", "#8b0aa5", "#b83289", "#db5c68", "#f48849", "#febd2a", "#f0f921",
        ],
    ),
    (
        "inferno",
        &[
            "#000004", "#1b0c41", "#4a0c6b", "#781c6d", "#a52c60", "#cf4446", "#ed6925", "#fb9b06",
            "#f7d13d", "#fcffa4",
        ],
    ),
    (
        "coolwarm",
        &[
            "#3b4cc0", "#7396f5", "#b0cbfc", "#dddddd", "#f6bfa6", "#e7745b", "#b40426",
        ],
    ),
    (
        "rdbu",
        &[
            "#67001f", "#b2182b", "#d6604d", "#f4a582", "#fddbc7", "#f7f7f7", "#d1e5f0", "#92c5de",
            "#4393c3", "#2166ac", "#053061",
        ],
    ),
    ("bwr", &["#0000ff", "#ffffff", "#ff0000"]),
    ("red_yellow", &["#ff0000", "#ffff00"]),
    ("blue_lightblue", &["#0000ff", "#00ffff"]),
    ("spring", &["#ff00ff", "#ffff00"]),
    ("summer", &["#008066", "#ffff66"]),
    ("autumn", &["#ff0000", "#ffff00"]),
    ("winter", &["#0000ff", "#00ff80"]),
];

/// `hot` has uneven knots: black → red → yellow → white.
const HOT: &[(f32, &str)] = &[
    (0.0, "#000000"),
    (0.375, "#ff0000"),
    (0.75, "#ffff00"),
    (1.0, "#ffffff"),
];

/// Spread hex colors evenly over `[0, 1]`.
pub fn even_stops(hex: &[&str]) -> Vec<ColorStop> {
    let n = hex.len();
    hex.iter()
        .enumerate()
        .filter_map(|(i, h)| {
            let position = if n > 1 {
                i as f32 / (n - 1) as f32
            } else {
                0.0
            };
            parse_hex(h).map(|color| ColorStop::new(position, color))
        })
        .collect()
}

/// Registry holding named colormap stop tables.
#[derive(Clone, Debug)]
pub struct ColorMapRegistry {
    presets: HashMap<String, Vec<ColorStop>>,
}

impl ColorMapRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            presets: HashMap::new(),
        }
    }

    /// Create a registry with all built-in presets registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        for (name, hex) in EVEN_PRESETS {
            registry.register(name, even_stops(hex));
        }
        let hot = HOT
            .iter()
            .filter_map(|(pos, h)| parse_hex(h).map(|c| ColorStop::new(*pos, c)))
            .collect();
        registry.register("hot", hot);

        info!(
            count = registry.presets.len(),
            "Registered built-in colormap presets"
        );

        registry
    }

    /// Register a preset. Overwrites any previous preset with the same name.
    pub fn register(&mut self, name: &str, stops: Vec<ColorStop>) {
        self.presets.insert(name.to_string(), stops);
    }

    /// Try to register a preset, returning an error if the name is taken.
    pub fn try_register(&mut self, name: &str, stops: Vec<ColorStop>) -> Result<(), ColorMapError> {
        if self.presets.contains_key(name) {
            return Err(ColorMapError::AlreadyRegistered {
                name: name.to_string(),
            });
        }
        self.presets.insert(name.to_string(), stops);
        Ok(())
    }

    /// Look up a preset's stops by name.
    pub fn get(&self, name: &str) -> Option<&[ColorStop]> {
        self.presets.get(name).map(|s| s.as_slice())
    }

    /// All preset names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.presets.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

impl Default for ColorMapRegistry {
    fn default() -> Self {
        Self::new()
    }
}
