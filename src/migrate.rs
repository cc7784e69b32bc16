//! JSON pre-passes run before IR ingestion.
//!
//! - consecutive `tab` items are merged into a single tab-bar item
//! - placeholder-shaped component ids are resolved by semantic type through the scanner

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::ir::is_component_type;
use crate::schema::Scanner;

lazy_static! {
    static ref COMPONENT_ID_RE: Regex = Regex::new(r"^[0-9]+:[0-9]+$").unwrap();
}

/// `true` when `id` matches the `digits:digits` node id shape.
pub fn is_well_formed_id(id: &str) -> bool {
    COMPONENT_ID_RE.is_match(id)
}

pub fn is_placeholder_id(id: &str) -> bool {
    id.contains("_id") || id.contains("placeholder") || !is_well_formed_id(id)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TAB MERGING
// ═══════════════════════════════════════════════════════════════════════════════

/// Merge runs of consecutive `tab` items into one item whose `Label` property is
/// the list of labels. Returns the number of items removed.
pub fn merge_tabs(value: &mut Value) -> usize {
    let mut removed = 0;
    if let Some(obj) = value.as_object_mut() {
        if let Some(Value::Array(items)) = obj.get_mut("items") {
            removed += merge_tab_run(items);
        }
        if let Some(Value::Object(container)) = obj.get_mut("layoutContainer") {
            if let Some(Value::Array(items)) = container.get_mut("items") {
                removed += merge_tab_run(items);
            }
        }
    }
    removed
}

fn is_tab(item: &Value) -> bool {
    item.get("type")
        .and_then(Value::as_str)
        .map_or(false, |t| t.eq_ignore_ascii_case("tab"))
}

fn tab_labels(item: &Value) -> Vec<Value> {
    let props = item.get("properties").and_then(Value::as_object);
    let label = props
        .and_then(|p| p.get("Label").or_else(|| p.get("label")).or_else(|| p.get("text")))
        .or_else(|| item.get("label"));
    match label {
        Some(Value::Array(list)) => list.clone(),
        Some(v @ Value::String(_)) => vec![v.clone()],
        _ => Vec::new(),
    }
}

fn merge_tab_run(items: &mut Vec<Value>) -> usize {
    let before = items.len();
    let mut merged: Vec<Value> = Vec::with_capacity(items.len());
    let mut run: Vec<Value> = Vec::new();

    let flush = |run: &mut Vec<Value>, merged: &mut Vec<Value>| {
        match run.len() {
            0 => {}
            1 => merged.append(run),
            _ => {
                let labels: Vec<Value> = run.iter().flat_map(tab_labels).collect();
                let mut first = run[0].clone();
                if let Some(obj) = first.as_object_mut() {
                    let props = obj
                        .entry("properties")
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(props) = props {
                        props.remove("label");
                        props.remove("text");
                        props.insert("Label".to_string(), Value::Array(labels));
                    }
                }
                merged.push(first);
                run.clear();
            }
        }
    };

    for mut item in items.drain(..) {
        if let Some(obj) = item.as_object_mut() {
            for key in ["items", "children"] {
                if let Some(Value::Array(children)) = obj.get_mut(key) {
                    merge_tab_run(children);
                }
            }
        }
        if is_tab(&item) {
            run.push(item);
        } else {
            flush(&mut run, &mut merged);
            merged.push(item);
        }
    }
    flush(&mut run, &mut merged);

    *items = merged;
    before - items.len()
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLACEHOLDER IDS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdResolution {
    pub path: String,
    pub item_type: String,
    pub original: Option<String>,
    pub resolved: Option<String>,
}

/// Replace missing or placeholder-shaped component ids with the id the scanner
/// associates with the item's type. Unresolvable ids are left as authored.
pub fn resolve_component_ids(value: &mut Value, scanner: &dyn Scanner) -> Vec<IdResolution> {
    let mut out = Vec::new();
    if let Some(obj) = value.as_object_mut() {
        if let Some(Value::Array(items)) = obj.get_mut("items") {
            resolve_in_items(items, "items", scanner, &mut out);
        }
        if let Some(Value::Object(container)) = obj.get_mut("layoutContainer") {
            if let Some(Value::Array(items)) = container.get_mut("items") {
                resolve_in_items(items, "layoutContainer.items", scanner, &mut out);
            }
        }
    }
    out
}

fn resolve_in_items(
    items: &mut [Value],
    path: &str,
    scanner: &dyn Scanner,
    out: &mut Vec<IdResolution>,
) {
    for (i, item) in items.iter_mut().enumerate() {
        let item_path = format!("{}[{}]", path, i);
        let Some(obj) = item.as_object_mut() else {
            continue;
        };
        if let Some(Value::Array(children)) = obj.get_mut("items") {
            resolve_in_items(children, &format!("{}.items", item_path), scanner, out);
        }

        let Some(item_type) = obj.get("type").and_then(Value::as_str).map(str::to_string) else {
            continue;
        };
        if !is_component_type(&item_type) {
            continue;
        }

        let original = obj
            .get("componentNodeId")
            .and_then(Value::as_str)
            .map(str::to_string);
        let needs_lookup = original.as_deref().map_or(true, is_placeholder_id);
        if !needs_lookup {
            continue;
        }

        let resolved = scanner.resolve_id_by_type(&item_type);
        match &resolved {
            Some(id) => {
                tracing::debug!(path = %item_path, item_type = %item_type, id = %id, "resolved placeholder component id");
                obj.insert("componentNodeId".to_string(), Value::String(id.clone()));
            }
            None => {
                tracing::warn!(path = %item_path, item_type = %item_type, "no component found for type");
            }
        }
        out.push(IdResolution {
            path: item_path,
            item_type,
            original,
            resolved,
        });
    }
}
