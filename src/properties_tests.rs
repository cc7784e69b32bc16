#[cfg(test)]
mod tests {
    use crate::error::Severity;
    use crate::ir::HorizontalSizing;
    use crate::matcher::MatchStrategy;
    use crate::properties::{
        array_slot_hint, preprocess_for_type, sanitize_properties, MediaValue, PropertyEngine,
        RawPropertyBag, TextValue, WarningKind,
    };
    use crate::schema::{ComponentSchema, SchemaRegistry};
    use serde_json::{json, Value};

    fn list_item() -> ComponentSchema {
        serde_json::from_value(json!({
            "componentId": "10:1",
            "name": "List Item",
            "componentType": "list-item",
            "variantDimensions": {
                "Leading": ["True", "False"],
                "Condition": ["1-line", "2-line", "3-line"]
            },
            "textSlots": [
                { "name": "Headline", "nodeId": "10:2", "classification": "primary" },
                { "name": "Subhead", "nodeId": "10:3", "classification": "secondary" },
                { "name": "Trailing value", "nodeId": "10:5", "classification": "tertiary" }
            ],
            "mediaSlots": [
                { "name": "Leading icon", "nodeId": "10:6", "kind": "component-instance" },
                { "name": "Trailing icon", "nodeId": "10:7", "kind": "component-instance" }
            ]
        }))
        .unwrap()
    }

    fn tabs() -> ComponentSchema {
        serde_json::from_value(json!({
            "componentId": "40:1",
            "name": "Tabs",
            "textSlots": [
                { "name": "Label 1", "nodeId": "40:2", "classification": "primary" },
                { "name": "Label 2", "nodeId": "40:3", "classification": "primary" },
                { "name": "Label 3", "nodeId": "40:4", "classification": "primary" }
            ]
        }))
        .unwrap()
    }

    fn registry() -> SchemaRegistry {
        SchemaRegistry::from_schemas(vec![list_item(), tabs()])
    }

    fn bag(value: Value) -> RawPropertyBag {
        RawPropertyBag::from_value(&value).unwrap()
    }

    #[test]
    fn test_boolean_variants_become_capitalized_strings() {
        let registry = registry();
        let engine = PropertyEngine::new(&registry);

        let resolved = engine.resolve("10:1", &bag(json!({ "Leading": true })));
        assert_eq!(resolved.variants.get("Leading").map(String::as_str), Some("True"));

        let resolved = engine.resolve("10:1", &bag(json!({ "variants": { "leading": false } })));
        assert_eq!(resolved.variants.get("Leading").map(String::as_str), Some("False"));
        assert!(resolved.warnings.is_empty());
    }

    #[test]
    fn test_invalid_variant_value_is_dropped_with_warning() {
        let registry = registry();
        let engine = PropertyEngine::new(&registry);

        let resolved = engine.resolve("10:1", &bag(json!({ "variants": { "Condition": "4-line" } })));

        assert!(resolved.variants.is_empty());
        assert_eq!(resolved.warnings.len(), 1);
        let warning = &resolved.warnings[0];
        assert_eq!(warning.kind, WarningKind::VariantInvalid);
        assert_eq!(warning.severity, Severity::High);
        assert_eq!(warning.suggestions, vec!["1-line", "2-line", "3-line"]);
        assert!(warning.message.contains("Valid values: 1-line, 2-line, 3-line"));
    }

    #[test]
    fn test_variant_value_case_mismatch_hints_at_legal_value() {
        let registry = registry();
        let engine = PropertyEngine::new(&registry);

        let resolved = engine.resolve("10:1", &bag(json!({ "Condition": "2-LINE" })));

        assert!(resolved.variants.is_empty());
        assert!(resolved.warnings[0].message.contains("did you mean '2-line'?"));
    }

    #[test]
    fn test_unknown_variant_dimension() {
        let registry = registry();
        let engine = PropertyEngine::new(&registry);

        let resolved = engine.resolve("10:1", &bag(json!({ "variants": { "Density": "compact" } })));

        assert!(resolved.variants.is_empty());
        assert_eq!(resolved.warnings[0].kind, WarningKind::VariantUnknown);
        assert_eq!(resolved.warnings[0].severity, Severity::Medium);
    }

    #[test]
    fn test_non_object_variants_is_an_error() {
        let registry = registry();
        let engine = PropertyEngine::new(&registry);

        let resolved = engine.resolve("10:1", &bag(json!({ "variants": "Leading=True" })));

        assert_eq!(resolved.errors.len(), 1);
        assert_eq!(resolved.errors[0].property, "variants");
    }

    #[test]
    fn test_supporting_text_binds_secondary_slot_semantically() {
        let registry = registry();
        let engine = PropertyEngine::new(&registry);

        let resolved = engine.resolve("10:1", &bag(json!({ "supporting-text": "Hello" })));

        assert_eq!(resolved.text_properties.len(), 1);
        let assignment = &resolved.text_properties[0];
        assert_eq!(assignment.strategy, MatchStrategy::Semantic);
        assert_eq!(assignment.bindings[0].slot.slot_name, "Subhead");
        assert_eq!(assignment.bindings[0].slot.node_id, "10:3");
        assert_eq!(assignment.bindings[0].value, TextValue::Single("Hello".to_string()));
    }

    #[test]
    fn test_exact_slot_name_wins() {
        let registry = registry();
        let engine = PropertyEngine::new(&registry);

        let resolved = engine.resolve("10:1", &bag(json!({ "trailing value": "$5" })));

        let assignment = &resolved.text_properties[0];
        assert_eq!(assignment.strategy, MatchStrategy::Exact);
        assert_eq!(assignment.bindings[0].slot.slot_name, "Trailing value");
    }

    #[test]
    fn test_unmatched_text_property_warns_with_slot_names() {
        let registry = registry();
        let engine = PropertyEngine::new(&registry);

        let resolved = engine.resolve("10:1", &bag(json!({ "footnote": "fine print" })));

        assert!(resolved.text_properties.is_empty());
        let warning = &resolved.warnings[0];
        assert_eq!(warning.kind, WarningKind::TextSlotUnmatched);
        assert_eq!(warning.suggestions, vec!["Headline", "Subhead", "Trailing value"]);
    }

    #[test]
    fn test_media_boolean_toggles_visibility() {
        let registry = registry();
        let engine = PropertyEngine::new(&registry);

        let resolved = engine.resolve(
            "10:1",
            &bag(json!({ "leadingIcon": true, "Trailing icon": "search" })),
        );

        assert_eq!(resolved.media_properties.len(), 2);
        let leading = resolved
            .media_properties
            .iter()
            .find(|m| m.property == "leadingIcon")
            .unwrap();
        assert_eq!(leading.strategy, MatchStrategy::MediaClassifier);
        assert_eq!(leading.slot.slot_name, "Leading icon");
        assert_eq!(leading.value, MediaValue::Visible(true));

        let trailing = resolved
            .media_properties
            .iter()
            .find(|m| m.property == "Trailing-icon")
            .unwrap();
        assert_eq!(trailing.strategy, MatchStrategy::Exact);
        assert_eq!(trailing.value, MediaValue::Reference("search".to_string()));
    }

    #[test]
    fn test_array_values_spread_over_numbered_slots() {
        let registry = registry();
        let engine = PropertyEngine::new(&registry);

        let resolved = engine.resolve("40:1", &bag(json!({ "label": ["Home", "Search"] })));

        let assignment = &resolved.text_properties[0];
        let names: Vec<&str> = assignment
            .bindings
            .iter()
            .map(|b| b.slot.slot_name.as_str())
            .collect();
        assert_eq!(names, vec!["Label 1", "Label 2"]);
        assert_eq!(assignment.bindings[1].value, TextValue::Single("Search".to_string()));
        assert_eq!(assignment.hidden_slots.len(), 1);
        assert_eq!(assignment.hidden_slots[0].slot_name, "Label 3");
    }

    #[test]
    fn test_array_slot_keeps_values_up_to_max_items() {
        let schema: ComponentSchema = serde_json::from_value(json!({
            "componentId": "50:1",
            "name": "Menu",
            "textSlots": [
                { "name": "Items", "nodeId": "50:2", "classification": "primary", "dataType": "array", "maxItems": 2 }
            ]
        }))
        .unwrap();
        let registry = SchemaRegistry::from_schemas(vec![schema]);
        let engine = PropertyEngine::new(&registry);

        let resolved = engine.resolve("50:1", &bag(json!({ "items": ["Cut", "Copy", "Paste"] })));

        let binding = &resolved.text_properties[0].bindings[0];
        assert_eq!(
            binding.value,
            TextValue::Multiple(vec!["Cut".to_string(), "Copy".to_string()])
        );
        assert_eq!(binding.max_items, Some(2));
    }

    #[test]
    fn test_array_on_scalar_slot_is_joined() {
        let registry = registry();
        let engine = PropertyEngine::new(&registry);

        let resolved = engine.resolve("10:1", &bag(json!({ "Headline": ["Alpha", "Beta"] })));

        assert_eq!(
            resolved.text_properties[0].bindings[0].value,
            TextValue::Single("Alpha, Beta".to_string())
        );
    }

    #[test]
    fn test_layout_keys_are_extracted() {
        let registry = registry();
        let engine = PropertyEngine::new(&registry);

        let resolved = engine.resolve(
            "10:1",
            &bag(json!({ "horizontalSizing": "FILL", "minWidth": "120px", "layoutGrow": "lots" })),
        );

        let layout = resolved.layout_properties;
        assert_eq!(layout.horizontal_sizing, Some(HorizontalSizing::Fill));
        assert_eq!(layout.constraints.min_width, Some(120.0));
        assert_eq!(layout.layout_grow, None);
        assert_eq!(resolved.errors.len(), 1);
        assert_eq!(resolved.errors[0].property, "layoutGrow");
    }

    #[test]
    fn test_basic_mode_without_schema() {
        let registry = registry();
        let engine = PropertyEngine::new(&registry);

        let resolved = engine.resolve(
            "99:9",
            &bag(json!({ "Leading": true, "State": "Pressed", "Headline": "Hi" })),
        );

        assert_eq!(resolved.warnings[0].kind, WarningKind::SchemaMissing);
        assert_eq!(resolved.warnings[0].severity, Severity::Low);
        assert_eq!(resolved.variants.get("Leading").map(String::as_str), Some("True"));
        assert_eq!(resolved.variants.get("State").map(String::as_str), Some("Pressed"));
        assert_eq!(resolved.passthrough.get("Headline"), Some(&json!("Hi")));
    }

    #[test]
    fn test_structured_values_pass_through() {
        let registry = registry();
        let engine = PropertyEngine::new(&registry);

        let resolved = engine.resolve("10:1", &bag(json!({ "analytics": { "event": "tap" } })));

        assert_eq!(resolved.passthrough.get("analytics"), Some(&json!({ "event": "tap" })));
        assert!(resolved.warnings.is_empty());
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let raw = bag(json!({
            "Supporting  text": 42,
            "Leading": true,
            "headline": "Hi"
        }));

        let once = sanitize_properties(&raw);
        assert_eq!(once.get("Supporting-text"), Some(&json!("42")));
        assert_eq!(once.get("Leading"), Some(&json!(true)));
        assert_eq!(sanitize_properties(&once), once);
    }

    #[test]
    fn test_resolution_is_idempotent_over_sanitized_input() {
        let registry = registry();
        let engine = PropertyEngine::new(&registry);
        let raw = bag(json!({
            "Supporting text": "Second line",
            "Condition": "2-line",
            "leadingIcon": false
        }));

        let direct = engine.resolve("10:1", &raw);
        let resanitized = engine.resolve("10:1", &sanitize_properties(&raw));
        assert_eq!(direct, resanitized);
        assert_eq!(direct, engine.resolve("10:1", &raw));
    }

    #[test]
    fn test_tab_labels_are_wrapped_into_arrays() {
        let mut raw = bag(json!({ "label": "Home", "badge": "3" }));
        preprocess_for_type("tab", &mut raw);
        assert_eq!(raw.get("label"), Some(&json!(["Home"])));
        assert_eq!(raw.get("badge"), Some(&json!("3")));

        let mut untouched = bag(json!({ "label": "Save" }));
        preprocess_for_type("button", &mut untouched);
        assert_eq!(untouched.get("label"), Some(&json!("Save")));
    }

    #[test]
    fn test_array_slot_hints() {
        let hint = array_slot_hint("Tabs");
        assert_eq!(hint.slot_names, &["label"]);
        assert_eq!(hint.max_items, 8);
        assert_eq!(array_slot_hint("list-item").max_items, 50);
        assert!(array_slot_hint("button").slot_names.is_empty());
    }

    #[test]
    fn test_merge_variants_later_values_win() {
        let mut raw = bag(json!({ "variants": { "Leading": "False", "Condition": "1-line" } }));
        let item_variants = json!({ "Leading": "True" });
        raw.merge_variants(item_variants.as_object().unwrap());

        assert_eq!(
            raw.get("variants"),
            Some(&json!({ "Leading": "True", "Condition": "1-line" }))
        );
    }
}
