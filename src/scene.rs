//! Scene graph produced by the renderer.
//!
//! Nodes live in an arena and refer to each other by `NodeId`. The graph mirrors
//! what the host document receives: frames, text, shapes, component instances and
//! placeholders, with resolved geometry.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::host::FontName;
use crate::ir::{ChildLayout, ItemSpacing, LayoutMode, Padding, SizeConstraints, SizingMode, TextAlign};
use crate::tokens::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Paint {
    Solid { color: Rgb, opacity: f64 },
    #[serde(rename_all = "camelCase")]
    Image { image_ref: String },
}

impl Paint {
    pub fn solid(color: Rgb) -> Self {
        Paint::Solid {
            color,
            opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextAutoResize {
    WidthAndHeight,
    Height,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameProps {
    pub layout_mode: LayoutMode,
    pub padding: Padding,
    pub item_spacing: ItemSpacing,
    pub layout_wrap: bool,
    pub primary_axis_align_items: Option<String>,
    pub counter_axis_align_items: Option<String>,
    pub primary_sizing: SizingMode,
    pub counter_sizing: SizingMode,
    pub corner_radius: Option<f64>,
    pub fills: Vec<Paint>,
}

impl Default for FrameProps {
    fn default() -> Self {
        Self {
            layout_mode: LayoutMode::None,
            padding: Padding::default(),
            item_spacing: ItemSpacing::default(),
            layout_wrap: false,
            primary_axis_align_items: None,
            counter_axis_align_items: None,
            primary_sizing: SizingMode::Fixed,
            counter_sizing: SizingMode::Fixed,
            corner_radius: None,
            fills: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProps {
    pub characters: String,
    pub fonts: Vec<FontName>,
    pub font_size: f64,
    pub text_align: TextAlign,
    pub auto_resize: TextAutoResize,
    pub fills: Vec<Paint>,
    pub fill_style_id: Option<String>,
    pub text_style_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeProps {
    pub fills: Vec<Paint>,
    pub corner_radius: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceProps {
    pub main_component_id: String,
    pub variant_values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderProps {
    pub reason: String,
    /// Component id or item type the placeholder stands in for.
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "props", rename_all = "kebab-case")]
pub enum NodeKind {
    Frame(FrameProps),
    Text(TextProps),
    Rectangle(ShapeProps),
    Ellipse(ShapeProps),
    Instance(InstanceProps),
    Vector,
    Image(ShapeProps),
    Placeholder(PlaceholderProps),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneNode {
    pub id: NodeId,
    /// Identifier as the host sees it. Instance children use `I<instance>;<node>`.
    pub host_id: String,
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub visible: bool,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Width set explicitly rather than hugging or filling.
    pub fixed_width: bool,
    pub layout: ChildLayout,
    pub constraints: SizeConstraints,
    /// Media reference applied to a slot node.
    pub media_ref: Option<String>,
    pub kind: NodeKind,
}

impl SceneNode {
    pub fn frame(&self) -> Option<&FrameProps> {
        match &self.kind {
            NodeKind::Frame(f) => Some(f),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&TextProps> {
        match &self.kind {
            NodeKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn instance(&self) -> Option<&InstanceProps> {
        match &self.kind {
            NodeKind::Instance(i) => Some(i),
            _ => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, NodeKind::Placeholder(_))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GRAPH
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node and append it to `parent`'s children.
    pub fn add(
        &mut self,
        parent: Option<NodeId>,
        host_id: Option<String>,
        name: impl Into<String>,
        kind: NodeKind,
        width: f64,
        height: f64,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            id,
            host_id: host_id.unwrap_or_else(|| format!("gen:{}", id.0)),
            name: name.into(),
            parent,
            children: Vec::new(),
            visible: true,
            x: 0.0,
            y: 0.0,
            width,
            height,
            fixed_width: false,
            layout: ChildLayout::default(),
            constraints: SizeConstraints::default(),
            media_ref: None,
            kind,
        });
        if let Some(p) = parent {
            self.nodes[p.0].children.push(id);
        }
        id
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.parent.is_none())
            .map(|n| n.id)
            .collect()
    }

    /// Pre-order descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn find_by_host_id(&self, host_id: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.host_id == host_id).map(|n| n.id)
    }

    pub fn find_by_name(&self, name: &str) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.name == name)
            .map(|n| n.id)
            .collect()
    }
}
