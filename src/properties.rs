//! Property Resolution Engine
//!
//! Splits a component's raw property bag into variants, text assignments, media
//! assignments and layout directives, validating each against the component schema.
//! Nothing here is fatal: bad entries are dropped and reported as warnings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::Severity;
use crate::ir::{as_f64, HorizontalSizing, LayoutAlign, LayoutDirective};
use crate::matcher::{
    media_chain, normalize_key, text_chain, ExactNameMatcher, MatchStrategy, Matcher,
    MatcherChain, SlotMatch,
};
use crate::schema::{ComponentSchema, MediaKind, MediaSlot, SchemaRegistry, SlotDataType, TextSlot};

/// Keys treated as variant dimensions when no schema is available.
pub const VARIANT_KEYWORDS: &[&str] = &[
    "Condition", "Leading", "Trailing", "State", "Style", "Size", "Type",
];

const MEDIA_KEY_WORDS: &[&str] = &[
    "icon", "image", "avatar", "photo", "picture", "logo", "badge", "media", "thumbnail",
];

// ═══════════════════════════════════════════════════════════════════════════════
// RAW PROPERTY BAG
// ═══════════════════════════════════════════════════════════════════════════════

/// Properties as authored, keyed by property name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPropertyBag(BTreeMap<String, Value>);

impl RawPropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().map(|m| Self::from_map(m.clone()))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn insert_if_absent(&mut self, key: &str, value: Value) {
        self.0.entry(key.to_string()).or_insert(value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge item-level variants into the `variants` sub-object; later values win.
    pub fn merge_variants(&mut self, variants: &Map<String, Value>) {
        let entry = self
            .0
            .entry("variants".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(existing) = entry {
            for (k, v) in variants {
                existing.insert(k.clone(), v.clone());
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KNOWN KEYS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKey {
    HorizontalSizing,
    LayoutAlign,
    LayoutGrow,
    MinWidth,
    MaxWidth,
    MinHeight,
    MaxHeight,
}

impl LayoutKey {
    pub const ALL: [LayoutKey; 7] = [
        LayoutKey::HorizontalSizing,
        LayoutKey::LayoutAlign,
        LayoutKey::LayoutGrow,
        LayoutKey::MinWidth,
        LayoutKey::MaxWidth,
        LayoutKey::MinHeight,
        LayoutKey::MaxHeight,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LayoutKey::HorizontalSizing => "horizontalSizing",
            LayoutKey::LayoutAlign => "layoutAlign",
            LayoutKey::LayoutGrow => "layoutGrow",
            LayoutKey::MinWidth => "minWidth",
            LayoutKey::MaxWidth => "maxWidth",
            LayoutKey::MinHeight => "minHeight",
            LayoutKey::MaxHeight => "maxHeight",
        }
    }

    pub fn from_key(key: &str) -> Option<LayoutKey> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(key))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLVED OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    VariantInvalid,
    VariantUnknown,
    TextSlotUnmatched,
    MediaSlotUnmatched,
    SchemaMissing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyWarning {
    pub kind: WarningKind,
    pub property: String,
    pub message: String,
    pub severity: Severity,
    pub suggestions: Vec<String>,
}

/// A property whose value has an unusable type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyError {
    pub property: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextValue {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRef {
    pub slot_name: String,
    pub node_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotBinding {
    pub slot: SlotRef,
    /// `Multiple` only for array slots, spread over repeated nodes at render time.
    pub value: TextValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAssignment {
    pub property: String,
    pub strategy: MatchStrategy,
    pub bindings: Vec<SlotBinding>,
    /// Slots in the bound group that received no value.
    pub hidden_slots: Vec<SlotRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum MediaValue {
    Reference(String),
    Visible(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAssignment {
    pub property: String,
    pub strategy: MatchStrategy,
    pub slot: SlotRef,
    pub kind: MediaKind,
    pub value: MediaValue,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedProperties {
    pub variants: BTreeMap<String, String>,
    pub text_properties: Vec<TextAssignment>,
    pub media_properties: Vec<MediaAssignment>,
    pub layout_properties: LayoutDirective,
    /// Unrecognized structured values, left untouched.
    pub passthrough: BTreeMap<String, Value>,
    pub errors: Vec<PropertyError>,
    pub warnings: Vec<PropertyWarning>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SANITIZING
// ═══════════════════════════════════════════════════════════════════════════════

/// Hyphenate whitespace runs in keys and stringify scalar values of text-like keys.
/// Applying it twice gives the same bag as applying it once.
pub fn sanitize_properties(raw: &RawPropertyBag) -> RawPropertyBag {
    let mut out = RawPropertyBag::new();
    for (key, value) in raw.iter() {
        let clean_key = key.split_whitespace().collect::<Vec<_>>().join("-");
        let clean_value = if clean_key.to_lowercase().contains("text") {
            match value {
                Value::Number(n) => Value::String(n.to_string()),
                Value::Bool(b) => Value::String(b.to_string()),
                other => other.clone(),
            }
        } else {
            value.clone()
        };
        out.insert(clean_key, clean_value);
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// ARRAY SLOT HINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Slot names that hold repeated values for a component type, with the usual cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArraySlotHint {
    pub slot_names: &'static [&'static str],
    pub max_items: usize,
}

pub fn array_slot_hint(component_type: &str) -> ArraySlotHint {
    let t = component_type.to_lowercase();
    let (slot_names, max_items): (&'static [&'static str], usize) = if t.contains("tab") {
        (&["label"], 8)
    } else if t.contains("chip") {
        (&["label", "text"], 10)
    } else if t.contains("list") {
        (&["item", "option", "choice"], 50)
    } else if t.contains("navigation") {
        (&["label", "item"], 6)
    } else if t.contains("menu") {
        (&["item", "option"], 20)
    } else if t.contains("breadcrumb") {
        (&["item", "label"], 5)
    } else if t.contains("carousel") {
        (&["item", "image"], 10)
    } else {
        (&[], 10)
    };
    ArraySlotHint {
        slot_names,
        max_items,
    }
}

/// Tabs and chips take their labels as arrays; wrap a scalar label.
pub fn preprocess_for_type(component_type: &str, bag: &mut RawPropertyBag) {
    let t = component_type.to_lowercase();
    if !(t.contains("tab") || t.contains("chip")) {
        return;
    }
    for key in ["Label", "label"] {
        if let Some(Value::String(s)) = bag.get(key).cloned() {
            bag.insert(key, Value::Array(vec![Value::String(s)]));
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

pub struct PropertyEngine<'a> {
    registry: &'a SchemaRegistry,
    text_matchers: MatcherChain<TextSlot>,
    media_matchers: MatcherChain<MediaSlot>,
}

impl<'a> PropertyEngine<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self {
            registry,
            text_matchers: text_chain(),
            media_matchers: media_chain(),
        }
    }

    pub fn resolve(&self, component_id: &str, raw: &RawPropertyBag) -> ResolvedProperties {
        let schema = self.registry.get_schema(component_id);
        let mut resolved = self.resolve_with_schema(schema, raw);
        if schema.is_none() {
            resolved.warnings.insert(
                0,
                PropertyWarning {
                    kind: WarningKind::SchemaMissing,
                    property: component_id.to_string(),
                    message: format!(
                        "No schema for component {}; resolving in basic mode",
                        component_id
                    ),
                    severity: Severity::Low,
                    suggestions: Vec::new(),
                },
            );
        }
        resolved
    }

    /// Resolve against an explicit schema, or in basic mode when there is none.
    pub fn resolve_with_schema(
        &self,
        schema: Option<&ComponentSchema>,
        raw: &RawPropertyBag,
    ) -> ResolvedProperties {
        let bag = sanitize_properties(raw);
        let mut out = ResolvedProperties::default();
        let mut variant_candidates: Vec<(String, Value)> = Vec::new();

        match bag.get("variants") {
            Some(Value::Object(map)) => {
                variant_candidates.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Some(Value::Null) | None => {}
            Some(_) => out.errors.push(PropertyError {
                property: "variants".to_string(),
                message: "variants must be an object".to_string(),
            }),
        }

        for (key, value) in bag.iter() {
            if key == "variants" || value.is_null() {
                continue;
            }
            if let Some(layout_key) = LayoutKey::from_key(key) {
                apply_layout_key(&mut out, layout_key, key, value);
                continue;
            }
            if let Some(dimension) = loose_variant_dimension(schema, key) {
                variant_candidates.push((dimension, value.clone()));
                continue;
            }
            match (schema, value) {
                (_, Value::Object(_)) | (None, _) => {
                    out.passthrough.insert(key.clone(), value.clone());
                }
                (Some(schema), _) => self.resolve_content(schema, key, value, &mut out),
            }
        }

        for (dimension, value) in variant_candidates {
            resolve_variant(schema, &dimension, &value, &mut out);
        }
        out
    }

    fn resolve_content(
        &self,
        schema: &ComponentSchema,
        key: &str,
        value: &Value,
        out: &mut ResolvedProperties,
    ) {
        if let Some(index) = ExactNameMatcher.find(key, schema.text_slots.as_slice()) {
            let m = SlotMatch {
                index,
                strategy: MatchStrategy::Exact,
            };
            self.bind_text(schema, key, value, m, out);
            return;
        }
        if let Some(index) = ExactNameMatcher.find(key, schema.media_slots.as_slice()) {
            let m = SlotMatch {
                index,
                strategy: MatchStrategy::Exact,
            };
            bind_media(schema, key, value, m, out);
            return;
        }

        let lower = key.to_lowercase();
        if value.is_boolean() || MEDIA_KEY_WORDS.iter().any(|w| lower.contains(w)) {
            match self.media_matchers.first_match(key, &schema.media_slots) {
                Some(m) => bind_media(schema, key, value, m, out),
                None => {
                    let suggestions: Vec<String> =
                        schema.media_slots.iter().map(|s| s.name.clone()).collect();
                    push_warning(
                        out,
                        WarningKind::MediaSlotUnmatched,
                        key,
                        format!("No media slot matches property '{}'", key),
                        Severity::Medium,
                        suggestions,
                    );
                }
            }
            return;
        }

        match self.text_matchers.first_match(key, &schema.text_slots) {
            Some(m) => self.bind_text(schema, key, value, m, out),
            None => {
                let suggestions = schema.text_slots.iter().map(|s| s.name.clone()).collect();
                push_warning(
                    out,
                    WarningKind::TextSlotUnmatched,
                    key,
                    format!("No text slot matches property '{}'", key),
                    Severity::Medium,
                    suggestions,
                );
            }
        }
    }

    fn bind_text(
        &self,
        schema: &ComponentSchema,
        key: &str,
        value: &Value,
        m: SlotMatch,
        out: &mut ResolvedProperties,
    ) {
        let Some(text) = text_value(value) else {
            out.errors.push(PropertyError {
                property: key.to_string(),
                message: "Text properties must be strings, numbers or arrays of strings"
                    .to_string(),
            });
            return;
        };
        let slots = &schema.text_slots;
        let matched = &slots[m.index];
        let mut assignment = TextAssignment {
            property: key.to_string(),
            strategy: m.strategy,
            bindings: Vec::new(),
            hidden_slots: Vec::new(),
        };

        match text {
            TextValue::Single(s) => assignment.bindings.push(SlotBinding {
                slot: slot_ref(matched),
                value: TextValue::Single(s),
                max_items: None,
            }),
            TextValue::Multiple(values) => {
                let group = slot_group(slots, m.index);
                if group.len() > 1 {
                    let limit = matched.max_items.unwrap_or(group.len()).min(values.len());
                    for (i, slot_index) in group.into_iter().enumerate() {
                        let slot = &slots[slot_index];
                        if i < limit {
                            assignment.bindings.push(SlotBinding {
                                slot: slot_ref(slot),
                                value: TextValue::Single(values[i].clone()),
                                max_items: None,
                            });
                        } else {
                            assignment.hidden_slots.push(slot_ref(slot));
                        }
                    }
                } else if matched.data_type == SlotDataType::Array {
                    let limit = matched.max_items.unwrap_or(values.len());
                    assignment.bindings.push(SlotBinding {
                        slot: slot_ref(matched),
                        value: TextValue::Multiple(values.into_iter().take(limit).collect()),
                        max_items: matched.max_items,
                    });
                } else {
                    assignment.bindings.push(SlotBinding {
                        slot: slot_ref(matched),
                        value: TextValue::Single(values.join(", ")),
                        max_items: None,
                    });
                }
            }
        }
        out.text_properties.push(assignment);
    }
}

fn push_warning(
    out: &mut ResolvedProperties,
    kind: WarningKind,
    property: &str,
    message: String,
    severity: Severity,
    suggestions: Vec<String>,
) {
    tracing::warn!(property, "{}", message);
    out.warnings.push(PropertyWarning {
        kind,
        property: property.to_string(),
        message,
        severity,
        suggestions,
    });
}

fn slot_ref(slot: &TextSlot) -> SlotRef {
    SlotRef {
        slot_name: slot.name.clone(),
        node_id: slot.node_id.clone(),
    }
}

/// Slots whose names differ from the matched one only by a trailing index.
fn slot_group(slots: &[TextSlot], index: usize) -> Vec<usize> {
    let base = base_slot_name(&slots[index].name);
    slots
        .iter()
        .enumerate()
        .filter(|(_, s)| base_slot_name(&s.name) == base)
        .map(|(i, _)| i)
        .collect()
}

fn base_slot_name(name: &str) -> String {
    normalize_key(name)
        .trim_end_matches(|c: char| c.is_ascii_digit() || c == '-')
        .to_string()
}

fn text_value(value: &Value) -> Option<TextValue> {
    match value {
        Value::String(s) => Some(TextValue::Single(s.clone())),
        Value::Number(n) => Some(TextValue::Single(n.to_string())),
        Value::Bool(b) => Some(TextValue::Single(b.to_string())),
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(TextValue::Multiple),
        _ => None,
    }
}

fn bind_media(
    schema: &ComponentSchema,
    key: &str,
    value: &Value,
    m: SlotMatch,
    out: &mut ResolvedProperties,
) {
    let slot = &schema.media_slots[m.index];
    let media_value = match value {
        Value::String(s) => MediaValue::Reference(s.clone()),
        Value::Bool(b) => MediaValue::Visible(*b),
        _ => {
            out.errors.push(PropertyError {
                property: key.to_string(),
                message: "Media properties must be a reference string or a boolean".to_string(),
            });
            return;
        }
    };
    out.media_properties.push(MediaAssignment {
        property: key.to_string(),
        strategy: m.strategy,
        slot: SlotRef {
            slot_name: slot.name.clone(),
            node_id: slot.node_id.clone(),
        },
        kind: slot.kind,
        value: media_value,
    });
}

fn apply_layout_key(out: &mut ResolvedProperties, layout_key: LayoutKey, key: &str, value: &Value) {
    let directive = &mut out.layout_properties;
    let ok = match layout_key {
        LayoutKey::HorizontalSizing => value
            .as_str()
            .and_then(HorizontalSizing::parse)
            .map(|v| directive.horizontal_sizing = Some(v))
            .is_some(),
        LayoutKey::LayoutAlign => value
            .as_str()
            .and_then(LayoutAlign::parse)
            .map(|v| directive.layout_align = Some(v))
            .is_some(),
        LayoutKey::LayoutGrow => as_f64(value)
            .map(|v| directive.layout_grow = Some(v))
            .is_some(),
        LayoutKey::MinWidth => as_f64(value)
            .map(|v| directive.constraints.min_width = Some(v))
            .is_some(),
        LayoutKey::MaxWidth => as_f64(value)
            .map(|v| directive.constraints.max_width = Some(v))
            .is_some(),
        LayoutKey::MinHeight => as_f64(value)
            .map(|v| directive.constraints.min_height = Some(v))
            .is_some(),
        LayoutKey::MaxHeight => as_f64(value)
            .map(|v| directive.constraints.max_height = Some(v))
            .is_some(),
    };
    if !ok {
        out.errors.push(PropertyError {
            property: key.to_string(),
            message: format!("Invalid value for {}: {}", layout_key.as_str(), value),
        });
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VARIANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Canonical dimension name: exact, then ignoring case and spacing.
pub fn canonical_dimension<'s>(schema: &'s ComponentSchema, key: &str) -> Option<&'s str> {
    if let Some((name, _)) = schema.variant_dimensions.get_key_value(key) {
        return Some(name.as_str());
    }
    let wanted = normalize_key(key);
    schema
        .variant_dimensions
        .keys()
        .find(|k| normalize_key(k) == wanted)
        .map(|k| k.as_str())
}

/// A loose top-level key that names a variant dimension. With a schema only its real
/// dimensions qualify; without one the fixed keyword list is used.
fn loose_variant_dimension(schema: Option<&ComponentSchema>, key: &str) -> Option<String> {
    match schema {
        Some(schema) => canonical_dimension(schema, key).map(str::to_string),
        None => VARIANT_KEYWORDS
            .iter()
            .find(|k| k.eq_ignore_ascii_case(key))
            .map(|k| k.to_string()),
    }
}

/// Booleans become `"True"`/`"False"`; numbers use their decimal form.
pub fn coerce_variant_value(value: &Value) -> Option<String> {
    match value {
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn resolve_variant(
    schema: Option<&ComponentSchema>,
    dimension: &str,
    value: &Value,
    out: &mut ResolvedProperties,
) {
    let Some(coerced) = coerce_variant_value(value) else {
        out.errors.push(PropertyError {
            property: dimension.to_string(),
            message: format!("Unsupported variant value: {}", value),
        });
        return;
    };

    let Some(schema) = schema else {
        out.variants.insert(dimension.to_string(), coerced);
        return;
    };

    let Some(canonical) = canonical_dimension(schema, dimension) else {
        let suggestions = schema.variant_dimensions.keys().cloned().collect();
        push_warning(
            out,
            WarningKind::VariantUnknown,
            dimension,
            format!(
                "Component {} has no variant dimension '{}'",
                schema.component_id, dimension
            ),
            Severity::Medium,
            suggestions,
        );
        return;
    };

    let legal = schema.variant_values(canonical).unwrap_or(&[]);
    if legal.iter().any(|v| *v == coerced) {
        out.variants.insert(canonical.to_string(), coerced);
        return;
    }

    let mut message = format!(
        "Invalid value '{}' for variant '{}'. Valid values: {}",
        coerced,
        canonical,
        legal.join(", ")
    );
    if let Some(close) = legal.iter().find(|v| v.eq_ignore_ascii_case(&coerced)) {
        message.push_str(&format!(" (did you mean '{}'?)", close));
    }
    push_warning(
        out,
        WarningKind::VariantInvalid,
        canonical,
        message,
        Severity::High,
        legal.to_vec(),
    );
}
