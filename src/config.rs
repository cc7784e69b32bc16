//! Compiler configuration.
//!
//! Every field has a default so partial JSON documents can be layered over the
//! built-in values.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::CompileResult;
use crate::host::FontName;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerConfig {
    pub render: RenderConfig,
    pub validation: ValidationConfig,
    pub retry: RetryPolicy,
}

impl CompilerConfig {
    pub fn from_json(json: &str) -> CompileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> CompileResult<Self> {
        let data = fs::read_to_string(path.as_ref())?;
        Self::from_json(&data)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDERING
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    /// The root frame never shrinks below this height.
    pub root_min_height: f64,
    /// Ancestors at or below this width count as constraining text width.
    pub text_wrap_threshold: f64,
    pub default_font: FontName,
    pub bold_font: FontName,
    pub default_font_size: f64,
    /// Horizontal gap between consecutive root frames on the canvas.
    pub canvas_gap: f64,
    pub default_root_width: f64,
    pub fallback_frame_width: f64,
    pub fallback_frame_height: f64,
    pub placeholder_width: f64,
    pub placeholder_height: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            root_min_height: 600.0,
            text_wrap_threshold: 375.0,
            default_font: FontName::new("Inter", "Regular"),
            bold_font: FontName::new("Inter", "Bold"),
            default_font_size: 16.0,
            canvas_gap: 100.0,
            default_root_width: 800.0,
            fallback_frame_width: 375.0,
            fallback_frame_height: 100.0,
            placeholder_width: 200.0,
            placeholder_height: 48.0,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationConfig {
    pub enable_structural_validation: bool,
    pub enable_component_validation: bool,
    pub enable_design_system_validation: bool,
    pub enable_ai_validation: bool,
    pub quality_threshold: f64,
    /// Number of repair attempts. Validation runs at most `max_retries + 1` times.
    pub max_retries: u32,
    pub auto_fix_enabled: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enable_structural_validation: true,
            enable_component_validation: true,
            enable_design_system_validation: true,
            enable_ai_validation: false,
            quality_threshold: 0.7,
            max_retries: 2,
            auto_fix_enabled: true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSPORT RETRIES
// ═══════════════════════════════════════════════════════════════════════════════

/// Retry policy for a single generator call. Independent of the repair loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Base delay, multiplied by the attempt number.
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_delay_ms.saturating_mul(attempt as u64))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
            timeout_ms: 30_000,
        }
    }
}
