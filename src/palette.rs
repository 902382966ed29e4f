//! Provider color table
//!
//! Both charts look up series colors here so a provider keeps the same color
//! on the distribution and the trend chart. Providers missing from the table
//! are drawn in [`NEUTRAL_GRAY`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::LatenciaError;

/// 24-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Rgb {
    /// Build from channels
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = LatenciaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(LatenciaError::InvalidConfiguration(format!(
                "color {s:?} is not of the form #RRGGBB"
            )));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|e| {
                LatenciaError::InvalidConfiguration(format!("color {s:?}: {e}"))
            })
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Fallback for providers without an assigned color
pub const NEUTRAL_GRAY: Rgb = Rgb::new(0x9E, 0x9E, 0x9E);

const BUILTIN: &[(&str, Rgb)] = &[
    ("OpenAI", Rgb::new(0x10, 0xA3, 0x7F)),
    ("Anthropic", Rgb::new(0xD9, 0x77, 0x57)),
    ("Google", Rgb::new(0x42, 0x85, 0xF4)),
    ("Groq", Rgb::new(0xF5, 0x50, 0x36)),
    ("TogetherAI", Rgb::new(0x0F, 0x6F, 0xFF)),
    ("Cloudflare", Rgb::new(0xF3, 0x80, 0x20)),
    ("PerplexityAI", Rgb::new(0x20, 0x80, 0x8D)),
    ("Hyperbolic", Rgb::new(0x8B, 0x5C, 0xF6)),
    ("AWSBedrock", Rgb::new(0xFF, 0x99, 0x00)),
    ("Azure", Rgb::new(0x00, 0x78, 0xD4)),
    ("vLLM", Rgb::new(0xE0, 0x3E, 0x8C)),
];

/// Provider name → color lookup
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: BTreeMap<String, Rgb>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: BUILTIN
                .iter()
                .map(|(name, color)| ((*name).to_string(), *color))
                .collect(),
        }
    }
}

impl Palette {
    /// Built-in table extended (or overridden) by `overrides`
    #[must_use]
    pub fn with_overrides(overrides: &BTreeMap<String, Rgb>) -> Self {
        let mut palette = Self::default();
        palette
            .colors
            .extend(overrides.iter().map(|(k, v)| (k.clone(), *v)));
        palette
    }

    /// Color for `provider`, gray if unknown
    #[must_use]
    pub fn color_for(&self, provider: &str) -> Rgb {
        self.colors.get(provider).copied().unwrap_or(NEUTRAL_GRAY)
    }

    /// True if `provider` has an explicit color
    #[must_use]
    pub fn knows(&self, provider: &str) -> bool {
        self.colors.contains_key(provider)
    }
}
