//! Design host interface.
//!
//! The renderer never talks to a concrete design tool. Everything it needs from the
//! live document (component blueprints, fonts, named styles) comes through
//! `DesignHost`, which tests replace with an in-memory mock.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::CompileResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontName {
    pub family: String,
    pub style: String,
}

impl FontName {
    pub fn new(family: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            style: style.into(),
        }
    }
}

/// A named style that exists in the host document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRef {
    pub id: String,
    pub name: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT BLUEPRINTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BlueprintKind {
    Frame,
    #[serde(rename_all = "camelCase")]
    Text {
        characters: String,
        /// More than one entry means a mixed-font run.
        fonts: Vec<FontName>,
        font_size: f64,
        #[serde(default)]
        missing_font: bool,
    },
    #[serde(rename_all = "camelCase")]
    Instance { main_component_id: String },
    Vector,
    Image,
}

fn visible_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintNode {
    pub id: String,
    pub name: String,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    pub kind: BlueprintKind,
    #[serde(default)]
    pub children: Vec<BlueprintNode>,
}

/// Structure of a component's default variant as the host sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentBlueprint {
    pub component_id: String,
    pub name: String,
    pub width: f64,
    pub height: f64,
    /// Variant dimensions of the owning component set.
    #[serde(default)]
    pub variant_options: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub default_variant: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<BlueprintNode>,
}

impl ComponentBlueprint {
    /// Depth-first walk over every node in the blueprint.
    pub fn walk(&self) -> Vec<&BlueprintNode> {
        fn visit<'a>(nodes: &'a [BlueprintNode], out: &mut Vec<&'a BlueprintNode>) {
            for node in nodes {
                out.push(node);
                visit(&node.children, out);
            }
        }
        let mut out = Vec::new();
        visit(&self.children, &mut out);
        out
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOST TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait DesignHost: Send + Sync {
    /// Resolve a component id to the blueprint of its default variant.
    async fn component_blueprint(&self, component_id: &str) -> CompileResult<Option<ComponentBlueprint>>;

    /// Must succeed before any text using `font` is mutated.
    async fn load_font(&self, font: &FontName) -> CompileResult<()>;

    async fn paint_style(&self, _name: &str) -> Option<StyleRef> {
        None
    }

    async fn text_style(&self, _name: &str) -> Option<StyleRef> {
        None
    }

    /// Component id for an icon name, for icon swaps not covered by the registry.
    async fn find_icon_component(&self, _icon_name: &str) -> Option<String> {
        None
    }

    /// Approximate text box size. Hosts with real metrics should override this.
    fn measure_text(&self, text: &str, font_size: f64, wrap_width: Option<f64>) -> (f64, f64) {
        let char_width = font_size * 0.5;
        let line_height = font_size * 1.2;
        let mut width: f64 = 0.0;
        let mut lines = 0usize;
        for paragraph in text.split('\n') {
            let natural = paragraph.chars().count() as f64 * char_width;
            match wrap_width {
                Some(w) if w > 0.0 => {
                    lines += ((natural / w).ceil() as usize).max(1);
                    width = w;
                }
                _ => {
                    lines += 1;
                    width = width.max(natural);
                }
            }
        }
        (width, lines.max(1) as f64 * line_height)
    }
}
