//! Layout IR
//!
//! The JSON layout tree is decoded once into a closed `LayoutNode` union. Item type
//! strings are only inspected here; the renderer dispatches on the enum.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CompileError, CompileResult};
use crate::properties::{LayoutKey, RawPropertyBag};
use crate::tokens::Rgb;

/// Item types that never reference a design-system component.
pub const NON_COMPONENT_TYPES: &[&str] = &[
    "native-text",
    "text",
    "native-rectangle",
    "native-circle",
    "layoutContainer",
    "frame",
];

pub fn is_component_type(item_type: &str) -> bool {
    !NON_COMPONENT_TYPES.contains(&item_type)
}

// ═══════════════════════════════════════════════════════════════════════════════
// LAYOUT ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LayoutMode {
    #[default]
    None,
    Horizontal,
    Vertical,
}

impl LayoutMode {
    pub fn parse(s: &str) -> Option<LayoutMode> {
        match s {
            "NONE" => Some(LayoutMode::None),
            "HORIZONTAL" => Some(LayoutMode::Horizontal),
            "VERTICAL" => Some(LayoutMode::Vertical),
            _ => None,
        }
    }

    pub fn is_auto_layout(self) -> bool {
        self != LayoutMode::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SizingMode {
    Fixed,
    Auto,
}

impl SizingMode {
    pub fn parse(s: &str) -> Option<SizingMode> {
        match s.to_uppercase().as_str() {
            "FIXED" => Some(SizingMode::Fixed),
            "AUTO" | "HUG" => Some(SizingMode::Auto),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemSpacing {
    Fixed(f64),
    /// Space children evenly along the primary axis.
    Auto,
}

impl Default for ItemSpacing {
    fn default() -> Self {
        ItemSpacing::Fixed(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HorizontalSizing {
    Fill,
    Hug,
    Auto,
    Fixed,
}

impl HorizontalSizing {
    pub fn parse(s: &str) -> Option<HorizontalSizing> {
        match s.to_uppercase().as_str() {
            "FILL" => Some(HorizontalSizing::Fill),
            "HUG" => Some(HorizontalSizing::Hug),
            "AUTO" => Some(HorizontalSizing::Auto),
            "FIXED" => Some(HorizontalSizing::Fixed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LayoutAlign {
    #[default]
    Inherit,
    Stretch,
    Min,
    Center,
    Max,
}

impl LayoutAlign {
    pub fn parse(s: &str) -> Option<LayoutAlign> {
        match s.to_uppercase().as_str() {
            "INHERIT" => Some(LayoutAlign::Inherit),
            "STRETCH" => Some(LayoutAlign::Stretch),
            "MIN" => Some(LayoutAlign::Min),
            "CENTER" => Some(LayoutAlign::Center),
            "MAX" => Some(LayoutAlign::Max),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Padding {
    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeConstraints {
    pub min_width: Option<f64>,
    pub max_width: Option<f64>,
    pub min_height: Option<f64>,
    pub max_height: Option<f64>,
}

impl SizeConstraints {
    pub fn clamp_width(&self, w: f64) -> f64 {
        clamp_opt(w, self.min_width, self.max_width)
    }

    pub fn clamp_height(&self, h: f64) -> f64 {
        clamp_opt(h, self.min_height, self.max_height)
    }
}

fn clamp_opt(v: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    let v = max.map_or(v, |m| v.min(m));
    min.map_or(v, |m| v.max(m))
}

// ═══════════════════════════════════════════════════════════════════════════════
// LAYOUT DIRECTIVES
// ═══════════════════════════════════════════════════════════════════════════════

/// Authored sizing request of a child, before the parent's axis is known.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDirective {
    pub horizontal_sizing: Option<HorizontalSizing>,
    pub layout_align: Option<LayoutAlign>,
    pub layout_grow: Option<f64>,
    pub constraints: SizeConstraints,
}

/// Directive after resolution against the parent's layout mode.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildLayout {
    pub layout_align: LayoutAlign,
    pub layout_grow: f64,
    /// Both axes hug content.
    pub hug_contents: bool,
    /// Width is governed by the parent layout (FILL).
    pub fills_width: bool,
}

impl LayoutDirective {
    pub fn is_empty(&self) -> bool {
        *self == LayoutDirective::default()
    }

    /// FILL grows along a horizontal parent and stretches across a vertical one.
    /// HUG and AUTO make both axes hug content. Explicit align/grow values win.
    pub fn for_parent(&self, parent: LayoutMode) -> ChildLayout {
        let mut out = ChildLayout::default();
        match self.horizontal_sizing {
            Some(HorizontalSizing::Fill) => match parent {
                LayoutMode::Horizontal => {
                    out.layout_grow = 1.0;
                    out.layout_align = LayoutAlign::Stretch;
                    out.fills_width = true;
                }
                LayoutMode::Vertical => {
                    out.layout_align = LayoutAlign::Stretch;
                    out.fills_width = true;
                }
                LayoutMode::None => {}
            },
            Some(HorizontalSizing::Hug) | Some(HorizontalSizing::Auto) => {
                out.hug_contents = true;
            }
            Some(HorizontalSizing::Fixed) | None => {}
        }
        if let Some(align) = self.layout_align {
            out.layout_align = align;
        }
        if let Some(grow) = self.layout_grow {
            out.layout_grow = grow;
        }
        out
    }

    pub fn from_map(map: &Map<String, Value>) -> LayoutDirective {
        LayoutDirective {
            horizontal_sizing: str_field(map, &["horizontalSizing", "layoutSizingHorizontal"])
                .and_then(HorizontalSizing::parse),
            layout_align: str_field(map, &["layoutAlign"]).and_then(LayoutAlign::parse),
            layout_grow: num_field(map, &["layoutGrow"]),
            constraints: constraints_from_map(map),
        }
    }
}

fn constraints_from_map(map: &Map<String, Value>) -> SizeConstraints {
    SizeConstraints {
        min_width: num_field(map, &["minWidth"]),
        max_width: num_field(map, &["maxWidth"]),
        min_height: num_field(map, &["minHeight"]),
        max_height: num_field(map, &["maxHeight"]),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum ColorRef {
    Rgb(Rgb),
    /// Token or style name, resolved at render time.
    Named(String),
}

impl ColorRef {
    pub fn from_value(value: &Value) -> Option<ColorRef> {
        if let Some(rgb) = Rgb::from_value(value) {
            return Some(ColorRef::Rgb(rgb));
        }
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(ColorRef::Named(s.trim().to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Rectangle,
    Ellipse,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContainerNode {
    pub name: Option<String>,
    pub layout_mode: LayoutMode,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub padding: Padding,
    pub item_spacing: ItemSpacing,
    pub layout_wrap: bool,
    pub primary_axis_align_items: Option<String>,
    pub counter_axis_align_items: Option<String>,
    pub primary_axis_sizing_mode: Option<SizingMode>,
    pub counter_axis_sizing_mode: Option<SizingMode>,
    pub fill: Option<ColorRef>,
    pub corner_radius: Option<f64>,
    pub directive: LayoutDirective,
    pub children: Vec<LayoutNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeTextNode {
    pub content: String,
    pub font_size: Option<f64>,
    pub bold: bool,
    pub alignment: TextAlign,
    pub color: Option<ColorRef>,
    pub color_style_ref: Option<String>,
    pub text_style_ref: Option<String>,
    pub directive: LayoutDirective,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativePrimitiveNode {
    pub shape: Shape,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub fill: Option<ColorRef>,
    pub image_fill: Option<String>,
    pub corner_radius: Option<f64>,
    pub directive: LayoutDirective,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentRefNode {
    /// Authored item type, e.g. "list-item" or "component".
    pub type_name: String,
    pub component_id: Option<String>,
    pub name: Option<String>,
    pub properties: RawPropertyBag,
    pub icon_swaps: Vec<(String, String)>,
    pub visibility_overrides: Vec<(String, bool)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MalformedNode {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutNode {
    Container(ContainerNode),
    Text(NativeTextNode),
    Primitive(NativePrimitiveNode),
    Component(ComponentRefNode),
    Malformed(MalformedNode),
}

impl LayoutNode {
    pub fn kind_name(&self) -> &'static str {
        match self {
            LayoutNode::Container(_) => "container",
            LayoutNode::Text(_) => "native-text",
            LayoutNode::Primitive(_) => "native-primitive",
            LayoutNode::Component(_) => "component",
            LayoutNode::Malformed(_) => "malformed",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DOCUMENT INGESTION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutDocument {
    pub root: ContainerNode,
}

impl LayoutDocument {
    pub fn from_json(json: &str) -> CompileResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> CompileResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| CompileError::structural("$", "Root must be a JSON object"))?;

        let container = obj.get("layoutContainer").and_then(Value::as_object);
        let items = obj.get("items");
        if container.is_none() && items.is_none() {
            return Err(CompileError::structural(
                "$",
                "Root must contain a layoutContainer or an items array",
            ));
        }

        let mut root = match container {
            Some(c) => parse_container_fields(c),
            None => ContainerNode {
                name: Some("Generated Layout".to_string()),
                layout_mode: LayoutMode::Vertical,
                ..ContainerNode::default()
            },
        };

        let items = items.or_else(|| container.and_then(|c| c.get("items")));
        root.children = match items {
            Some(Value::Array(list)) => parse_items(list, "items"),
            Some(_) => return Err(CompileError::structural("items", "items must be an array")),
            None => Vec::new(),
        };
        Ok(LayoutDocument { root })
    }
}

fn parse_items(list: &[Value], path: &str) -> Vec<LayoutNode> {
    list.iter()
        .enumerate()
        .map(|(i, item)| parse_item(item, &format!("{}[{}]", path, i)))
        .collect()
}

pub(crate) fn parse_item(value: &Value, path: &str) -> LayoutNode {
    let Some(item) = value.as_object() else {
        return malformed(path, "Item must be an object");
    };
    let Some(item_type) = item.get("type").and_then(Value::as_str) else {
        return malformed(path, "Item is missing a type");
    };

    match item_type {
        "layoutContainer" | "frame" => LayoutNode::Container(parse_container_item(item, path)),
        "native-text" | "text" => LayoutNode::Text(parse_text(&merged_props(item))),
        "native-rectangle" | "native-circle" => {
            let props = merged_props(item);
            let shape = if item_type == "native-circle" {
                Shape::Ellipse
            } else {
                Shape::Rectangle
            };
            let primitive = parse_primitive(&props, shape);
            match child_list(item) {
                Some(children) if !children.is_empty() => {
                    tracing::warn!(path, "primitive with children rendered as a container");
                    LayoutNode::Container(primitive_as_container(
                        primitive,
                        &props,
                        parse_items(children, &format!("{}.items", path)),
                    ))
                }
                _ => LayoutNode::Primitive(primitive),
            }
        }
        other => LayoutNode::Component(parse_component(item, other)),
    }
}

fn malformed(path: &str, reason: &str) -> LayoutNode {
    LayoutNode::Malformed(MalformedNode {
        path: path.to_string(),
        reason: reason.to_string(),
    })
}

fn child_list(item: &Map<String, Value>) -> Option<&Vec<Value>> {
    item.get("items")
        .or_else(|| item.get("children"))
        .and_then(Value::as_array)
}

/// Item fields overlaid by its `properties` object.
fn merged_props(item: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = item.clone();
    if let Some(Value::Object(props)) = item.get("properties") {
        for (k, v) in props {
            merged.insert(k.clone(), v.clone());
        }
    }
    merged
}

fn parse_container_item(item: &Map<String, Value>, path: &str) -> ContainerNode {
    let source = item.get("layoutContainer").and_then(Value::as_object);
    let mut container = match source {
        Some(nested) => {
            let mut c = parse_container_fields(nested);
            c.directive = merge_directives(c.directive, LayoutDirective::from_map(item));
            c
        }
        None => parse_container_fields(item),
    };
    if container.name.is_none() {
        container.name = item.get("name").and_then(Value::as_str).map(str::to_string);
    }

    let children = child_list(item).or_else(|| source.and_then(child_list));
    container.children = children
        .map(|list| parse_items(list, &format!("{}.items", path)))
        .unwrap_or_default();
    container
}

fn merge_directives(primary: LayoutDirective, fallback: LayoutDirective) -> LayoutDirective {
    LayoutDirective {
        horizontal_sizing: primary.horizontal_sizing.or(fallback.horizontal_sizing),
        layout_align: primary.layout_align.or(fallback.layout_align),
        layout_grow: primary.layout_grow.or(fallback.layout_grow),
        constraints: SizeConstraints {
            min_width: primary.constraints.min_width.or(fallback.constraints.min_width),
            max_width: primary.constraints.max_width.or(fallback.constraints.max_width),
            min_height: primary.constraints.min_height.or(fallback.constraints.min_height),
            max_height: primary.constraints.max_height.or(fallback.constraints.max_height),
        },
    }
}

pub(crate) fn parse_container_fields(map: &Map<String, Value>) -> ContainerNode {
    let item_spacing = match map.get("itemSpacing") {
        Some(Value::String(s)) if s.eq_ignore_ascii_case("AUTO") => ItemSpacing::Auto,
        Some(v) => ItemSpacing::Fixed(as_f64(v).unwrap_or(0.0)),
        None => ItemSpacing::default(),
    };
    let layout_wrap = match map.get("layoutWrap") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("WRAP"),
        _ => false,
    };

    ContainerNode {
        name: str_field(map, &["name"]).map(str::to_string),
        layout_mode: str_field(map, &["layoutMode"])
            .and_then(LayoutMode::parse)
            .unwrap_or_default(),
        width: num_field(map, &["width"]),
        height: num_field(map, &["height"]),
        padding: Padding {
            top: num_field(map, &["paddingTop"]).unwrap_or(0.0),
            right: num_field(map, &["paddingRight"]).unwrap_or(0.0),
            bottom: num_field(map, &["paddingBottom"]).unwrap_or(0.0),
            left: num_field(map, &["paddingLeft"]).unwrap_or(0.0),
        },
        item_spacing,
        layout_wrap,
        primary_axis_align_items: str_field(map, &["primaryAxisAlignItems"]).map(str::to_string),
        counter_axis_align_items: str_field(map, &["counterAxisAlignItems"]).map(str::to_string),
        primary_axis_sizing_mode: str_field(map, &["primaryAxisSizingMode"])
            .and_then(SizingMode::parse),
        counter_axis_sizing_mode: str_field(map, &["counterAxisSizingMode"])
            .and_then(SizingMode::parse),
        fill: map
            .get("fill")
            .or_else(|| map.get("backgroundColor"))
            .and_then(ColorRef::from_value),
        corner_radius: num_field(map, &["cornerRadius"]),
        directive: LayoutDirective::from_map(map),
        children: Vec::new(),
    }
}

fn parse_text(props: &Map<String, Value>) -> NativeTextNode {
    let content = match props
        .get("content")
        .or_else(|| props.get("text"))
        .or_else(|| props.get("characters"))
    {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "Text".to_string(),
    };

    let bold = match props.get("fontWeight").or_else(|| props.get("weight")) {
        Some(Value::String(s)) => {
            let s = s.to_lowercase();
            s.contains("bold") || s.parse::<u32>().map_or(false, |w| w >= 600)
        }
        Some(Value::Number(n)) => n.as_f64().map_or(false, |w| w >= 600.0),
        _ => false,
    };

    let alignment = match str_field(props, &["alignment", "textAlign", "textAlignHorizontal"])
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("center") => TextAlign::Center,
        Some("right") => TextAlign::Right,
        _ => TextAlign::Left,
    };

    NativeTextNode {
        content,
        font_size: num_field(props, &["fontSize", "size"]),
        bold,
        alignment,
        color: props.get("color").and_then(ColorRef::from_value),
        color_style_ref: str_field(props, &["colorStyleRef", "colorStyleName"]).map(str::to_string),
        text_style_ref: str_field(props, &["textStyleRef", "textStyle", "textStyleName"])
            .map(str::to_string),
        directive: LayoutDirective::from_map(props),
    }
}

fn parse_primitive(props: &Map<String, Value>, shape: Shape) -> NativePrimitiveNode {
    NativePrimitiveNode {
        shape,
        width: num_field(props, &["width"]),
        height: num_field(props, &["height"]),
        fill: props
            .get("fill")
            .or_else(|| props.get("color"))
            .and_then(ColorRef::from_value),
        image_fill: str_field(props, &["imageFill", "imageHash", "imageUrl"]).map(str::to_string),
        corner_radius: num_field(props, &["cornerRadius"]),
        directive: LayoutDirective::from_map(props),
    }
}

fn primitive_as_container(
    primitive: NativePrimitiveNode,
    props: &Map<String, Value>,
    children: Vec<LayoutNode>,
) -> ContainerNode {
    let mut container = parse_container_fields(props);
    if container.layout_mode == LayoutMode::None {
        container.layout_mode = LayoutMode::Vertical;
    }
    let default_name = match primitive.shape {
        Shape::Rectangle => "Rectangle Container",
        Shape::Ellipse => "Ellipse Container",
    };
    container.name = container.name.or_else(|| Some(default_name.to_string()));
    container.width = primitive.width;
    container.height = primitive.height;
    container.fill = primitive.fill;
    container.corner_radius = match primitive.shape {
        Shape::Ellipse => primitive
            .corner_radius
            .or_else(|| primitive.width.map(|w| w / 2.0)),
        Shape::Rectangle => primitive.corner_radius,
    };
    container.children = children;
    container
}

fn parse_component(item: &Map<String, Value>, type_name: &str) -> ComponentRefNode {
    let mut properties = match item.get("properties") {
        Some(Value::Object(map)) => RawPropertyBag::from_map(map.clone()),
        _ => RawPropertyBag::default(),
    };
    if let Some(Value::Object(variants)) = item.get("variants") {
        properties.merge_variants(variants);
    }
    for key in LayoutKey::ALL {
        if let Some(v) = item.get(key.as_str()) {
            properties.insert_if_absent(key.as_str(), v.clone());
        }
    }

    let icon_swaps = item
        .get("iconSwaps")
        .and_then(Value::as_object)
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    let visibility_overrides = item
        .get("visibilityOverrides")
        .and_then(Value::as_object)
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| match v {
                    Value::Bool(b) => Some((k.clone(), *b)),
                    _ => {
                        tracing::warn!(node_id = %k, "ignoring non-boolean visibility override");
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    ComponentRefNode {
        type_name: type_name.to_string(),
        component_id: item
            .get("componentNodeId")
            .or_else(|| item.get("componentId"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string),
        name: item.get("name").and_then(Value::as_str).map(str::to_string),
        properties,
        icon_swaps,
        visibility_overrides,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FIELD HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

pub(crate) fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches("px").parse().ok(),
        _ => None,
    }
}

fn num_field(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| map.get(*k).and_then(as_f64))
}

fn str_field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| map.get(*k).and_then(Value::as_str))
}
