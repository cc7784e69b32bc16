//! Design tokens and styles extracted alongside component schemas.
//!
//! Colors are resolved by name: design tokens first, then scanned color styles.
//! Raw colors in the IR bypass both tables.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
        }
    }

    /// Parse `#rgb` or `#rrggbb`; the leading `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Rgb> {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.is_ascii() {
            return None;
        }
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return None,
        };
        let channel = |i: usize| {
            u8::from_str_radix(&expanded[i..i + 2], 16)
                .ok()
                .map(|v| v as f64 / 255.0)
        };
        Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Normalize an authored color into 0..1 channels.
    ///
    /// Accepts `{r,g,b}` with 0..1 or 0..255 numbers or `"NN%"` strings, and hex strings.
    pub fn from_value(value: &Value) -> Option<Rgb> {
        match value {
            Value::String(s) if s.trim().starts_with('#') => Rgb::from_hex(s),
            Value::Object(map) => {
                let r = map.get("r").and_then(channel_value)?;
                let g = map.get("g").and_then(channel_value)?;
                let b = map.get("b").and_then(channel_value)?;
                let byte_scale = [r, g, b].iter().any(|c| c.1 && c.0 > 1.0);
                let scale = |c: (f64, bool)| if byte_scale && c.1 { c.0 / 255.0 } else { c.0 };
                Some(Rgb::new(scale(r), scale(g), scale(b)))
            }
            _ => None,
        }
    }
}

/// Returns the channel and whether it came from a bare number.
fn channel_value(v: &Value) -> Option<(f64, bool)> {
    match v {
        Value::Number(n) => n.as_f64().map(|f| (f, true)),
        Value::String(s) => {
            let s = s.trim();
            if let Some(pct) = s.strip_suffix('%') {
                pct.trim().parse::<f64>().ok().map(|p| (p / 100.0, false))
            } else {
                s.parse::<f64>().ok().map(|f| (f, true))
            }
        }
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOKENS & STYLES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignToken {
    pub name: String,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub value: Value,
}

fn default_token_type() -> String {
    "COLOR".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorStyle {
    pub name: String,
    /// Hex color, e.g. `#1d1b20`.
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyleEntry {
    pub name: String,
    #[serde(default)]
    pub font_size: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorSource {
    DesignToken,
    ColorStyle,
    Raw,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignSystemStyles {
    pub tokens: Vec<DesignToken>,
    pub color_styles: Vec<ColorStyle>,
    pub text_styles: Vec<TextStyleEntry>,
}

impl DesignSystemStyles {
    /// Token lookup by exact name, case-insensitive name, then `collection/name`.
    pub fn find_token(&self, name: &str) -> Option<&DesignToken> {
        let colors = || self.tokens.iter().filter(|t| t.token_type.eq_ignore_ascii_case("COLOR"));
        colors()
            .find(|t| t.name == name)
            .or_else(|| colors().find(|t| t.name.eq_ignore_ascii_case(name)))
            .or_else(|| {
                colors().find(|t| {
                    t.collection
                        .as_deref()
                        .map_or(false, |c| format!("{}/{}", c, t.name) == name)
                })
            })
    }

    pub fn find_color_style(&self, name: &str) -> Option<&ColorStyle> {
        self.color_styles
            .iter()
            .find(|s| s.name == name)
            .or_else(|| self.color_styles.iter().find(|s| s.name.eq_ignore_ascii_case(name)))
    }

    pub fn find_text_style(&self, name: &str) -> Option<&TextStyleEntry> {
        self.text_styles
            .iter()
            .find(|s| s.name == name)
            .or_else(|| self.text_styles.iter().find(|s| s.name.eq_ignore_ascii_case(name)))
    }

    /// Resolve a named color: design token, then color style, then an inline hex.
    pub fn resolve_color(&self, name: &str) -> Option<(Rgb, ColorSource)> {
        if let Some(rgb) = self.find_token(name).and_then(|t| Rgb::from_value(&t.value)) {
            return Some((rgb, ColorSource::DesignToken));
        }
        if let Some(rgb) = self.find_color_style(name).and_then(|s| Rgb::from_hex(&s.color)) {
            return Some((rgb, ColorSource::ColorStyle));
        }
        if name.trim().starts_with('#') {
            return Rgb::from_hex(name).map(|rgb| (rgb, ColorSource::Raw));
        }
        None
    }
}
