#[cfg(test)]
mod tests {
    use crate::properties::canonical_dimension;
    use crate::schema::{ComponentSchema, Scanner, SchemaRegistry, SlotDataType, SCHEMA_STALE_AFTER};
    use crate::tokens::{ColorSource, DesignSystemStyles, Rgb};
    use serde_json::json;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn list_item_schema() -> ComponentSchema {
        serde_json::from_value(json!({
            "componentId": "10:1",
            "name": "List Item",
            "componentType": "list-item",
            "variantDimensions": { "Leading": ["True", "False"], "Condition": ["1-line", "2-line"] },
            "textSlots": [
                { "name": "Headline", "nodeId": "10:2", "classification": "primary" },
                { "name": "Supporting text", "nodeId": "10:3", "classification": "secondary", "dataType": "single" }
            ],
            "mediaSlots": [
                { "name": "Leading icon", "nodeId": "10:4", "kind": "component-instance" }
            ]
        }))
        .unwrap()
    }

    fn button_schema() -> ComponentSchema {
        let mut schema = ComponentSchema::new("20:1", "Button");
        schema.component_type = Some("button".to_string());
        schema
    }

    #[test]
    fn test_schema_decodes_scanner_snapshot() {
        let schema = list_item_schema();
        assert_eq!(schema.text_slots.len(), 2);
        assert_eq!(schema.text_slots[1].data_type, SlotDataType::Scalar);
        assert_eq!(schema.variant_values("Leading").unwrap(), ["True", "False"]);
        assert_eq!(canonical_dimension(&schema, "condition"), Some("Condition"));
    }

    #[test]
    fn test_register_replaces_previous_record() {
        let mut registry = SchemaRegistry::new();
        assert!(registry.register(list_item_schema()).is_none());

        let mut rescanned = list_item_schema();
        rescanned.name = "List Item v2".to_string();
        let previous = registry.register(rescanned).unwrap();

        assert_eq!(previous.name, "List Item");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_schema("10:1").unwrap().name, "List Item v2");
    }

    #[test]
    fn test_get_all_schemas_sorted_by_id() {
        let registry = SchemaRegistry::from_schemas(vec![button_schema(), list_item_schema()]);
        let ids: Vec<&str> = registry.get_all_schemas().iter().map(|s| s.component_id.as_str()).collect();
        assert_eq!(ids, vec!["10:1", "20:1"]);
        assert_eq!(registry.component_ids(), vec!["10:1", "20:1"]);
    }

    #[test]
    fn test_scanner_lookup_by_id_then_name() {
        let registry = SchemaRegistry::from_schemas(vec![list_item_schema()]);
        let scanner: &dyn Scanner = &registry;
        assert!(scanner.get_schema("10:1").is_some());
        assert_eq!(scanner.get_schema("list item").unwrap().component_id, "10:1");
        assert!(scanner.get_schema("Card").is_none());
    }

    #[test]
    fn test_resolve_id_by_type() {
        let registry = SchemaRegistry::from_schemas(vec![button_schema(), list_item_schema()]);
        assert_eq!(registry.resolve_id_by_type("list-item").as_deref(), Some("10:1"));
        assert_eq!(registry.resolve_id_by_type("Button").as_deref(), Some("20:1"));
        // containment: "primary-button" contains "button"
        assert_eq!(registry.resolve_id_by_type("primary-button").as_deref(), Some("20:1"));
        assert_eq!(registry.resolve_id_by_type("slider"), None);
        assert_eq!(registry.resolve_id_by_type(""), None);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = list_item_schema();
        let mut b = list_item_schema();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        b.text_slots.pop();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_staleness_window() {
        let now = UNIX_EPOCH + Duration::from_secs(30 * 24 * 60 * 60);
        let now_secs = now.duration_since(UNIX_EPOCH).unwrap().as_secs();

        let mut fresh = list_item_schema();
        fresh.scanned_at = Some(now_secs - 60);
        assert!(!fresh.is_stale(now));

        let mut old = button_schema();
        old.scanned_at = Some(now_secs - SCHEMA_STALE_AFTER.as_secs() - 1);
        assert!(old.is_stale(now));

        let never_scanned = ComponentSchema::new("30:1", "Chip");
        assert!(never_scanned.is_stale(SystemTime::now()));

        let registry = SchemaRegistry::from_schemas(vec![fresh, old]);
        let stale: Vec<&str> = registry.stale_schemas(now).iter().map(|s| s.component_id.as_str()).collect();
        assert_eq!(stale, vec!["20:1"]);
    }

    #[test]
    fn test_load_dir_reads_snapshots_and_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a_single.json"),
            serde_json::to_string(&list_item_schema()).unwrap(),
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(
            dir.path().join("nested").join("b_many.json"),
            serde_json::to_string(&vec![button_schema()]).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.path().join("c_broken.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut registry = SchemaRegistry::new();
        let loaded = registry.load_dir(dir.path()).unwrap();

        assert_eq!(loaded, 2);
        assert!(registry.contains("10:1"));
        assert!(registry.contains("20:1"));
    }

    #[test]
    fn test_load_dir_missing_directory() {
        let mut registry = SchemaRegistry::new();
        assert_eq!(registry.load_dir("/definitely/not/here").unwrap(), 0);
        assert!(registry.is_empty());
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TOKENS
    // ═══════════════════════════════════════════════════════════════════════════

    fn styles() -> DesignSystemStyles {
        serde_json::from_value(json!({
            "tokens": [
                { "name": "primary", "collection": "brand", "value": { "r": 0.2, "g": 0.4, "b": 0.6 } },
                { "name": "spacing-md", "tokenType": "FLOAT", "value": 16 }
            ],
            "colorStyles": [
                { "name": "Surface/Background", "color": "#ffffff" },
                { "name": "primary", "color": "#000000" }
            ],
            "textStyles": [ { "name": "Body/Large", "fontSize": 18 } ]
        }))
        .unwrap()
    }

    #[test]
    fn test_hex_parsing() {
        assert_eq!(Rgb::from_hex("#fff"), Some(Rgb::new(1.0, 1.0, 1.0)));
        assert_eq!(Rgb::from_hex("#000000"), Some(Rgb::BLACK));
        assert_eq!(Rgb::from_hex("#12345"), None);
        assert_eq!(Rgb::from_hex("#ééé"), None);
    }

    #[test]
    fn test_rgb_from_value_scales_byte_channels() {
        let rgb = Rgb::from_value(&json!({ "r": 255, "g": 0, "b": 0 })).unwrap();
        assert_eq!(rgb, Rgb::new(1.0, 0.0, 0.0));
        let unit = Rgb::from_value(&json!({ "r": 0.5, "g": 0.5, "b": 0.5 })).unwrap();
        assert_eq!(unit, Rgb::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn test_color_resolution_order() {
        let styles = styles();

        let (rgb, source) = styles.resolve_color("primary").unwrap();
        assert_eq!(source, ColorSource::DesignToken);
        assert_eq!(rgb, Rgb::new(0.2, 0.4, 0.6));

        assert_eq!(styles.resolve_color("brand/primary").unwrap().1, ColorSource::DesignToken);
        assert_eq!(
            styles.resolve_color("surface/background").unwrap(),
            (Rgb::new(1.0, 1.0, 1.0), ColorSource::ColorStyle)
        );
        assert_eq!(styles.resolve_color("#ff0000").unwrap().1, ColorSource::Raw);
        // non-color tokens never resolve as colors
        assert!(styles.resolve_color("spacing-md").is_none());
        assert!(styles.resolve_color("unknown").is_none());
    }

    #[test]
    fn test_text_style_lookup() {
        let styles = styles();
        assert_eq!(styles.find_text_style("body/large").unwrap().font_size, Some(18.0));
        assert!(styles.find_text_style("Heading").is_none());
    }
}
