#[cfg(test)]
mod tests {
    use crate::config::ValidationConfig;
    use crate::error::Severity;
    use crate::schema::{ComponentSchema, SchemaRegistry};
    use crate::validate::*;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        let mut list_item = ComponentSchema::new("10:1", "List Item");
        list_item
            .variant_dimensions
            .insert("Condition".to_string(), vec!["1-line".to_string(), "2-line".to_string()]);
        list_item
            .variant_dimensions
            .insert("Leading".to_string(), vec!["True".to_string(), "False".to_string()]);
        SchemaRegistry::from_schemas(vec![list_item, ComponentSchema::new("20:1", "Button")])
    }

    fn codes(issues: &[ValidationIssue]) -> Vec<&str> {
        issues.iter().map(|i| i.code.as_str()).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_component_item_without_id() {
        let engine = ValidationEngine::default();
        let result = engine.validate(r#"{"items":[{"type":"button"}]}"#, None);

        assert_eq!(codes(&result.errors), vec![MISSING_COMPONENT_ID]);
        let error = &result.errors[0];
        assert_eq!(error.severity, Severity::High);
        assert!(error.fixable);
        assert_eq!(error.path, "items[0].componentNodeId");

        assert!(!result.is_valid);
        assert!(result.auto_fix_available);
        assert_eq!(codes(&result.warnings), vec![NO_SCAN_RESULTS]);
        // structural 0.7, component 0.8, design system 1.0, usability 0.9
        assert!(approx(result.score, 0.81));
    }

    #[test]
    fn test_unparseable_json_scores_zero() {
        let engine = ValidationEngine::default();
        let result = engine.validate("{\"items\": [", None);

        assert!(!result.is_valid);
        assert_eq!(result.score, 0.0);
        assert_eq!(codes(&result.errors), vec![JSON_PARSE_ERROR]);
        assert_eq!(result.errors[0].severity, Severity::Critical);
        assert_eq!(result.errors[0].path, "root");
        assert!(!result.auto_fix_available);
        assert_eq!(result.suggestions.len(), 1);
    }

    #[test]
    fn test_clean_layout_against_registry() {
        let engine = ValidationEngine::default();
        let layout = json!({
            "layoutContainer": { "layoutMode": "VERTICAL", "width": 360 },
            "items": [{
                "type": "list-item",
                "componentNodeId": "10:1",
                "properties": { "Headline": "Inbox", "variants": { "Condition": "1-line", "Leading": true } }
            }]
        });

        let result = engine.validate_with_registry(&layout.to_string(), &registry());

        assert!(result.is_valid, "{:?}", result);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
        assert!(approx(result.score, 1.0));
    }

    #[test]
    fn test_unknown_component_reference() {
        let engine = ValidationEngine::default();
        let layout = json!({
            "layoutContainer": { "layoutMode": "VERTICAL" },
            "items": [
                { "type": "button", "componentNodeId": "20:1" },
                { "type": "layoutContainer", "items": [ { "type": "button", "componentNodeId": "99:9" } ] }
            ]
        });

        let result = engine.validate_with_registry(&layout.to_string(), &registry());

        assert_eq!(codes(&result.errors), vec![COMPONENT_NOT_FOUND]);
        assert_eq!(result.errors[0].path, "root.items[1].items[0]");
        assert!(result.errors[0].message.contains("99:9"));
        assert!(!result.is_valid);
    }

    #[test]
    fn test_invalid_variant_value() {
        let engine = ValidationEngine::default();
        let layout = json!({
            "items": [{
                "type": "list-item",
                "componentNodeId": "10:1",
                "variants": { "condition": "4-line" }
            }]
        });

        let result = engine.validate_with_registry(&layout.to_string(), &registry());

        assert_eq!(codes(&result.errors), vec![INVALID_VARIANT_VALUE]);
        let error = &result.errors[0];
        assert_eq!(error.severity, Severity::Medium);
        assert!(error.fixable);
        assert_eq!(error.path, "items[0].variants.condition");
        assert_eq!(error.suggestion.as_deref(), Some("Use one of: 1-line, 2-line"));

        // medium issues lower the score without blocking
        assert!(result.is_valid);
        assert!(result.score < 1.0);
        assert!(result.auto_fix_available);
    }

    #[test]
    fn test_missing_root_structure_is_critical() {
        let engine = ValidationEngine::default();
        let result = engine.validate_with_registry(r#"{"name":"Screen"}"#, &registry());

        assert!(result.has_code(MISSING_ROOT_STRUCTURE));
        assert_eq!(result.errors[0].severity, Severity::Critical);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_structural_warnings() {
        let engine = ValidationEngine::default();
        let layout = json!({
            "layoutContainer": { "layoutMode": "GRID", "width": -5 },
            "items": [
                { "type": "button", "componentNodeId": "btn", "properties": { "Leading": "True" } },
                { "type": "chip", "componentNodeId": "1:2", "properties": { "variants": "selected" } }
            ]
        });

        let result = engine.validate(&layout.to_string(), None);

        assert_eq!(codes(&result.errors), vec![INVALID_LAYOUT_MODE]);
        let warnings = codes(&result.warnings);
        for code in [
            INVALID_WIDTH,
            INVALID_COMPONENT_ID_FORMAT,
            VARIANTS_NOT_GROUPED,
            INVALID_VARIANTS_TYPE,
            NO_SCAN_RESULTS,
        ] {
            assert!(warnings.contains(&code), "missing {}", code);
        }
        assert!(result.warnings.iter().all(|w| !w.fixable && w.severity == Severity::Low));
    }

    #[test]
    fn test_nested_item_without_type() {
        let engine = ValidationEngine::default();
        let layout = json!({
            "items": [{ "type": "layoutContainer", "items": [ { "type": "native-text" }, { "text": "x" } ] }]
        });

        let result = engine.validate(&layout.to_string(), None);

        assert_eq!(codes(&result.errors), vec![MISSING_TYPE]);
        assert_eq!(result.errors[0].path, "items[0].items[1].type");
        assert!(!result.errors[0].fixable);
    }

    #[test]
    fn test_score_stays_in_unit_interval() {
        let engine = ValidationEngine::default();
        let items: Vec<_> = (0..12).map(|_| json!({ "type": "" })).collect();
        let result = engine.validate(&json!({ "items": items }).to_string(), None);

        assert_eq!(result.errors.len(), 12);
        assert!(result.score >= 0.0 && result.score <= 1.0);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_disabled_passes_are_skipped() {
        let engine = ValidationEngine::new(ValidationConfig {
            enable_component_validation: false,
            enable_structural_validation: false,
            ..ValidationConfig::default()
        });

        let result = engine.validate(r#"{"items":[{"type":"button"}]}"#, None);

        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
        assert!(result.is_valid);
    }

    #[test]
    fn test_quality_threshold_applies_without_blocking_errors() {
        let engine = ValidationEngine::new(ValidationConfig {
            quality_threshold: 0.95,
            ..ValidationConfig::default()
        });

        let result = engine.validate(r#"{"items":[]}"#, None);

        assert!(result.errors.is_empty());
        assert!(approx(result.score, 0.99));
        assert!(result.is_valid);

        let strict = ValidationEngine::new(ValidationConfig {
            quality_threshold: 1.0,
            ..ValidationConfig::default()
        });
        assert!(!strict.validate(r#"{"items":[]}"#, None).is_valid);
    }

    #[test]
    fn test_quality_metrics() {
        let errors = vec![
            ValidationIssue::error(COMPONENT_NOT_FOUND, "x", "root", Severity::High, true),
            ValidationIssue::error(INVALID_VARIANT_VALUE, "y", "items[0]", Severity::Medium, true),
        ];
        let warnings = vec![ValidationIssue::warning(NO_SCAN_RESULTS, "z", "validation", "scan")];

        let m = QualityMetrics::compute(&errors, &warnings);

        assert!(approx(m.structural_integrity, 0.6));
        assert!(approx(m.component_consistency, 0.8));
        assert!(approx(m.design_system_compliance, 0.85));
        assert!(approx(m.usability_score, 0.9));
        assert!(approx(m.overall_score, 0.24 + 0.24 + 0.17 + 0.09));
    }

    #[test]
    fn test_collect_component_refs() {
        let layout = json!({
            "layoutContainer": { "items": [ { "type": "button", "componentNodeId": "1:1" } ] },
            "items": [ { "type": "card", "componentNodeId": "2:2", "items": [ { "componentNodeId": "3:3" } ] } ]
        });

        let refs = collect_component_refs(&layout);

        assert_eq!(
            refs,
            vec![
                ("2:2".to_string(), "root.items[0]".to_string()),
                ("3:3".to_string(), "root.items[0].items[0]".to_string()),
                ("1:1".to_string(), "root.layoutContainer.items[0]".to_string()),
            ]
        );
    }

    #[test]
    fn test_summary() {
        let engine = ValidationEngine::default();
        let failed = engine.validate(r#"{"items":[{"type":"button"}]}"#, None);
        assert_eq!(
            ValidationEngine::summary(&failed),
            "❌ Validation failed (81%)\nErrors: 1\nWarnings: 1\nAuto-fix available"
        );

        let passed = engine.validate_with_registry(r#"{"items":[]}"#, &registry());
        assert_eq!(ValidationEngine::summary(&passed), "✅ Validation passed (100%)");
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let engine = ValidationEngine::default();
        let result = engine.validate(r#"{"items":[{"type":"button"}]}"#, None);
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["isValid"], json!(false));
        assert_eq!(value["autoFixAvailable"], json!(true));
        assert_eq!(value["errors"][0]["severity"], json!("high"));
    }
}
