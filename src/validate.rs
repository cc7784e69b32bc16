//! Layout validation.
//!
//! `ValidationEngine::validate` is a pure function of the layout JSON text and a schema
//! lookup. Issues are collected, never thrown, and folded into a quality score.

#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::config::ValidationConfig;
use crate::error::Severity;
use crate::ir::is_component_type;
use crate::migrate::is_well_formed_id;
use crate::properties::{canonical_dimension, coerce_variant_value};
use crate::schema::{Scanner, SchemaRegistry};

// ═══════════════════════════════════════════════════════════════════════════════
// ISSUE CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const JSON_PARSE_ERROR: &str = "JSON_PARSE_ERROR";
pub const MISSING_ROOT_STRUCTURE: &str = "MISSING_ROOT_STRUCTURE";
pub const INVALID_LAYOUT_MODE: &str = "INVALID_LAYOUT_MODE";
pub const INVALID_WIDTH: &str = "INVALID_WIDTH";
pub const MISSING_TYPE: &str = "MISSING_TYPE";
pub const MISSING_COMPONENT_ID: &str = "MISSING_COMPONENT_ID";
pub const INVALID_COMPONENT_ID_FORMAT: &str = "INVALID_COMPONENT_ID_FORMAT";
pub const INVALID_VARIANTS_TYPE: &str = "INVALID_VARIANTS_TYPE";
pub const VARIANTS_NOT_GROUPED: &str = "VARIANTS_NOT_GROUPED";
pub const COMPONENT_NOT_FOUND: &str = "COMPONENT_NOT_FOUND";
pub const NO_SCAN_RESULTS: &str = "NO_SCAN_RESULTS";
pub const INVALID_VARIANT_VALUE: &str = "INVALID_VARIANT_VALUE";

/// Keys that are variant dimensions on most scanned components.
const GROUPED_VARIANT_KEYS: &[&str] = &[
    "Condition", "Leading", "Trailing", "State", "Style", "Size", "Type",
];

const VALID_LAYOUT_MODES: &[&str] = &["VERTICAL", "HORIZONTAL", "NONE"];

// ═══════════════════════════════════════════════════════════════════════════════
// RESULT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub code: String,
    pub message: String,
    pub path: String,
    pub severity: Severity,
    pub fixable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn error(code: &str, message: impl Into<String>, path: impl Into<String>, severity: Severity, fixable: bool) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            path: path.into(),
            severity,
            fixable,
            suggestion: None,
        }
    }

    /// Warnings never block validity and are never auto-fixed.
    pub fn warning(code: &str, message: impl Into<String>, path: impl Into<String>, suggestion: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            path: path.into(),
            severity: Severity::Low,
            fixable: false,
            suggestion: Some(suggestion.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub score: f64,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub suggestions: Vec<String>,
    pub auto_fix_available: bool,
}

impl ValidationResult {
    pub fn fixable_errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().filter(|e| e.fixable)
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.errors.iter().chain(&self.warnings).any(|i| i.code == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub structural_integrity: f64,
    pub component_consistency: f64,
    pub design_system_compliance: f64,
    pub usability_score: f64,
    pub overall_score: f64,
}

impl QualityMetrics {
    pub fn compute(errors: &[ValidationIssue], warnings: &[ValidationIssue]) -> Self {
        let count = |severity: Severity| errors.iter().filter(|e| e.severity == severity).count() as f64;
        let mentions = |needle: &str| errors.iter().filter(|e| e.code.contains(needle)).count() as f64;

        let structural_integrity =
            (1.0 - (count(Severity::Critical) * 0.5 + count(Severity::High) * 0.3 + count(Severity::Medium) * 0.1)).max(0.0);
        let component_consistency = (1.0 - mentions("COMPONENT") * 0.2).max(0.0);
        let design_system_compliance = (1.0 - mentions("VARIANT") * 0.15).max(0.0);
        let usability_score = (1.0 - warnings.len() as f64 * 0.1).max(0.0);

        let overall = structural_integrity * 0.4
            + component_consistency * 0.3
            + design_system_compliance * 0.2
            + usability_score * 0.1;

        Self {
            structural_integrity,
            component_consistency,
            design_system_compliance,
            usability_score,
            overall_score: overall.clamp(0.0, 1.0),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    config: ValidationConfig,
}

#[derive(Default)]
struct Collected {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl ValidationEngine {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate layout JSON. Without a scanner the component and design-system
    /// passes report `NO_SCAN_RESULTS` instead of checking references.
    pub fn validate(&self, json: &str, scanner: Option<&dyn Scanner>) -> ValidationResult {
        let layout: Value = match serde_json::from_str(json) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("layout JSON does not parse: {}", e);
                return parse_failure();
            }
        };

        let mut found = Collected::default();
        if self.config.enable_structural_validation {
            validate_structure(&layout, &mut found);
        }
        if self.config.enable_component_validation {
            validate_components(&layout, scanner, &mut found);
        }
        if self.config.enable_design_system_validation {
            if let Some(scanner) = scanner {
                validate_variants(&layout, scanner, &mut found);
            }
        }

        let metrics = QualityMetrics::compute(&found.errors, &found.warnings);
        let score = metrics.overall_score;
        let blocking = found.errors.iter().any(|e| e.severity.is_blocking());
        let is_valid = !blocking && score >= self.config.quality_threshold;
        let auto_fix_available = found.errors.iter().any(|e| e.fixable);

        tracing::info!(
            is_valid,
            score = %format!("{:.1}%", score * 100.0),
            errors = found.errors.len(),
            warnings = found.warnings.len(),
            "validation complete"
        );

        ValidationResult {
            is_valid,
            score,
            errors: found.errors,
            warnings: found.warnings,
            suggestions: Vec::new(),
            auto_fix_available,
        }
    }

    pub fn validate_with_registry(&self, json: &str, registry: &SchemaRegistry) -> ValidationResult {
        self.validate(json, Some(registry))
    }

    /// One-paragraph summary for display.
    pub fn summary(result: &ValidationResult) -> String {
        let percent = (result.score * 100.0).round() as i64;
        let mut lines = vec![if result.is_valid {
            format!("✅ Validation passed ({}%)", percent)
        } else {
            format!("❌ Validation failed ({}%)", percent)
        }];
        if !result.errors.is_empty() {
            lines.push(format!("Errors: {}", result.errors.len()));
        }
        if !result.warnings.is_empty() {
            lines.push(format!("Warnings: {}", result.warnings.len()));
        }
        if result.auto_fix_available {
            lines.push("Auto-fix available".to_string());
        }
        lines.join("\n")
    }
}

fn parse_failure() -> ValidationResult {
    ValidationResult {
        is_valid: false,
        score: 0.0,
        errors: vec![ValidationIssue::error(
            JSON_PARSE_ERROR,
            "Invalid JSON syntax",
            "root",
            Severity::Critical,
            false,
        )],
        warnings: Vec::new(),
        suggestions: vec!["Check JSON syntax for missing brackets, commas, or quotes".to_string()],
        auto_fix_available: false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STRUCTURAL PASS
// ═══════════════════════════════════════════════════════════════════════════════

fn validate_structure(layout: &Value, found: &mut Collected) {
    let container = layout.get("layoutContainer").filter(|c| !c.is_null());
    let items = layout.get("items").filter(|i| !i.is_null());

    if container.is_none() && items.is_none() {
        found.errors.push(ValidationIssue::error(
            MISSING_ROOT_STRUCTURE,
            "JSON must have either layoutContainer or items array",
            "root",
            Severity::Critical,
            true,
        ));
    }

    if let Some(container) = container {
        let mode_ok = container
            .get("layoutMode")
            .and_then(Value::as_str)
            .map_or(false, |m| VALID_LAYOUT_MODES.contains(&m));
        if !mode_ok {
            found.errors.push(ValidationIssue::error(
                INVALID_LAYOUT_MODE,
                "layoutMode must be VERTICAL, HORIZONTAL, or NONE",
                "layoutContainer.layoutMode",
                Severity::High,
                true,
            ));
        }

        if let Some(width) = container.get("width").filter(|w| !w.is_null()) {
            if !width.as_f64().map_or(false, |w| w > 0.0) {
                found.warnings.push(ValidationIssue::warning(
                    INVALID_WIDTH,
                    "Width should be a positive number",
                    "layoutContainer.width",
                    "Use a positive number like 360 for mobile or 1200 for desktop",
                ));
            }
        }
    }

    if let Some(Value::Array(list)) = items {
        for (i, item) in list.iter().enumerate() {
            validate_item(item, &format!("items[{}]", i), found);
        }
    }
}

fn validate_item(item: &Value, path: &str, found: &mut Collected) {
    let Some(item_type) = item.get("type").and_then(Value::as_str).filter(|t| !t.is_empty()) else {
        found.errors.push(ValidationIssue::error(
            MISSING_TYPE,
            "Each item must have a type field",
            format!("{}.type", path),
            Severity::Critical,
            false,
        ));
        return;
    };

    let id = item.get("componentNodeId").and_then(Value::as_str).filter(|s| !s.is_empty());
    if is_component_type(item_type) && id.is_none() {
        found.errors.push(ValidationIssue::error(
            MISSING_COMPONENT_ID,
            "Non-native items must have a componentNodeId",
            format!("{}.componentNodeId", path),
            Severity::High,
            true,
        ));
    }

    if let Some(id) = id {
        if !is_well_formed_id(id) {
            found.warnings.push(ValidationIssue::warning(
                INVALID_COMPONENT_ID_FORMAT,
                "componentNodeId should follow format \"number:number\"",
                format!("{}.componentNodeId", path),
                "Use IDs from your design system scan",
            ));
        }
    }

    if let Some(Value::Object(props)) = item.get("properties") {
        validate_properties(props, &format!("{}.properties", path), found);
    }

    if let Some(Value::Array(children)) = item.get("items") {
        for (i, child) in children.iter().enumerate() {
            validate_item(child, &format!("{}.items[{}]", path, i), found);
        }
    }
}

fn validate_properties(props: &Map<String, Value>, path: &str, found: &mut Collected) {
    let variants = props.get("variants").filter(|v| !v.is_null());
    if let Some(v) = variants {
        if !v.is_object() {
            found.warnings.push(ValidationIssue::warning(
                INVALID_VARIANTS_TYPE,
                "variants should be an object",
                format!("{}.variants", path),
                "Use {\"Condition\": \"1-line\", \"Leading\": \"Icon\"} format",
            ));
        }
    }

    let has_loose_variants = GROUPED_VARIANT_KEYS.iter().any(|k| props.contains_key(*k));
    if has_loose_variants && variants.is_none() {
        found.warnings.push(ValidationIssue::warning(
            VARIANTS_NOT_GROUPED,
            "Variant properties should be inside a variants object",
            path,
            "Move variant properties like \"Condition\", \"Leading\" into a variants object",
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT PASS
// ═══════════════════════════════════════════════════════════════════════════════

/// Every `componentNodeId` in the tree with its path.
pub fn collect_component_refs(layout: &Value) -> Vec<(String, String)> {
    fn traverse(value: &Value, path: &str, out: &mut Vec<(String, String)>) {
        let Some(obj) = value.as_object() else {
            return;
        };
        if let Some(id) = obj.get("componentNodeId").and_then(Value::as_str) {
            out.push((id.to_string(), path.to_string()));
        }
        if let Some(Value::Array(items)) = obj.get("items") {
            for (i, item) in items.iter().enumerate() {
                traverse(item, &format!("{}.items[{}]", path, i), out);
            }
        }
        if let Some(container) = obj.get("layoutContainer") {
            traverse(container, &format!("{}.layoutContainer", path), out);
        }
    }

    let mut out = Vec::new();
    traverse(layout, "root", &mut out);
    out
}

fn validate_components(layout: &Value, scanner: Option<&dyn Scanner>, found: &mut Collected) {
    let known: HashSet<&str> = scanner
        .map(|s| s.component_ids().into_iter().collect())
        .unwrap_or_default();
    if known.is_empty() {
        found.warnings.push(ValidationIssue::warning(
            NO_SCAN_RESULTS,
            "No design system scan results found",
            "validation",
            "Run a design system scan to validate component references",
        ));
        return;
    }

    for (id, path) in collect_component_refs(layout) {
        if !id.is_empty() && !known.contains(id.as_str()) {
            found.errors.push(ValidationIssue::error(
                COMPONENT_NOT_FOUND,
                format!("Component with ID \"{}\" not found in design system", id),
                path,
                Severity::High,
                true,
            ));
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DESIGN-SYSTEM PASS
// ═══════════════════════════════════════════════════════════════════════════════

fn validate_variants(layout: &Value, scanner: &dyn Scanner, found: &mut Collected) {
    fn visit(value: &Value, path: &str, scanner: &dyn Scanner, found: &mut Collected) {
        let Some(obj) = value.as_object() else {
            return;
        };
        if let Some(schema) = obj
            .get("componentNodeId")
            .and_then(Value::as_str)
            .and_then(|id| scanner.get_schema(id))
        {
            let groups = [
                obj.get("variants"),
                obj.get("properties").and_then(|p| p.get("variants")),
            ];
            for variants in groups.into_iter().flatten().filter_map(Value::as_object) {
                for (key, raw) in variants {
                    let Some(dimension) = canonical_dimension(schema, key) else {
                        continue;
                    };
                    let Some(value) = coerce_variant_value(raw) else {
                        continue;
                    };
                    let legal = schema.variant_values(dimension).unwrap_or_default();
                    if !legal.is_empty() && !legal.contains(&value) {
                        found.errors.push(ValidationIssue {
                            suggestion: Some(format!("Use one of: {}", legal.join(", "))),
                            ..ValidationIssue::error(
                                INVALID_VARIANT_VALUE,
                                format!("\"{}\" is not a valid value for variant {}", value, dimension),
                                format!("{}.variants.{}", path, key),
                                Severity::Medium,
                                true,
                            )
                        });
                    }
                }
            }
        }
        if let Some(Value::Array(items)) = obj.get("items") {
            for (i, item) in items.iter().enumerate() {
                visit(item, &format!("{}.items[{}]", path, i), scanner, found);
            }
        }
    }

    if let Some(Value::Array(items)) = layout.get("items") {
        for (i, item) in items.iter().enumerate() {
            visit(item, &format!("items[{}]", i), scanner, found);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate layout JSON against a JSON array of component schemas. Returns the
/// serialized `ValidationResult`.
#[cfg(feature = "napi")]
#[napi]
pub fn validate_layout_native(json: String, schemas_json: String) -> String {
    let registry = crate::registry_from_json(&schemas_json);
    let result = ValidationEngine::default().validate_with_registry(&json, &registry);
    serde_json::to_string(&result).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}
