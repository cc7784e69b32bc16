//! Layout Renderer
//!
//! Recursive descent over the IR that materializes a `SceneGraph`:
//!
//! - containers become auto-layout frames
//! - native text and primitives become text and shape nodes
//! - component references become instances with variants, layout, text, media,
//!   visibility overrides and icon swaps applied in that order
//!
//! Each item is an error boundary. A failing item is replaced by a placeholder and
//! its siblings keep rendering. Only a document that cannot be ingested at all falls
//! back to a single error frame.

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::context::CompilationContext;
use crate::error::{CompileError, CompileResult};
use crate::host::{BlueprintKind, BlueprintNode, ComponentBlueprint, DesignHost, FontName};
use crate::ir::{
    ChildLayout, ColorRef, ComponentRefNode, ContainerNode, LayoutDocument, LayoutMode,
    LayoutNode, NativePrimitiveNode, NativeTextNode, Shape, SizingMode,
};
use crate::layout::{arrange, content_extent, effective_width, inner_width};
use crate::matcher::{contains_any, normalize_key, LEADING_WORDS, TRAILING_WORDS};
use crate::migrate::{merge_tabs, resolve_component_ids};
use crate::properties::{
    array_slot_hint, preprocess_for_type, MediaAssignment, MediaValue, PropertyEngine,
    PropertyWarning, SlotRef, TextAssignment, TextValue,
};
use crate::scene::{
    FrameProps, InstanceProps, NodeId, NodeKind, Paint, PlaceholderProps, SceneGraph, ShapeProps,
    TextAutoResize, TextProps,
};
use crate::schema::{ComponentSchema, MediaKind, MediaSlot, SlotDataType, TextClassification, TextSlot};
use crate::tokens::Rgb;

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Where the next root frame goes on the canvas. Persisted by the caller between
/// compile calls and only ever advanced.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasCursor {
    pub next_x: f64,
    pub y: f64,
}

impl CanvasCursor {
    pub fn place(&mut self, width: f64, gap: f64) -> (f64, f64) {
        let position = (self.next_x, self.y);
        self.next_x += width.max(0.0) + gap;
        position
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderWarning {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderReport {
    pub warnings: Vec<RenderWarning>,
    pub property_warnings: Vec<PropertyWarning>,
    /// Sources (component id or item type) replaced by placeholders.
    pub placeholders: Vec<String>,
    /// Components rendered without a scanned schema.
    pub basic_mode_components: Vec<String>,
    /// User-facing message when the whole layout fell back to an error frame.
    pub notification: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOutput {
    pub graph: SceneGraph,
    pub root: NodeId,
    pub report: RenderReport,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Compile layout JSON into a scene graph. Never fails: unrecoverable input yields
/// the error frame with a notification.
pub async fn compile_layout<H: DesignHost + ?Sized>(
    ctx: &CompilationContext,
    host: &H,
    json: &str,
    cursor: &mut CanvasCursor,
) -> RenderOutput {
    match serde_json::from_str::<Value>(json) {
        Ok(value) => compile_layout_value(ctx, host, value, cursor).await,
        Err(e) => fallback_output(ctx, &CompileError::from(e), cursor),
    }
}

pub async fn compile_layout_value<H: DesignHost + ?Sized>(
    ctx: &CompilationContext,
    host: &H,
    mut value: Value,
    cursor: &mut CanvasCursor,
) -> RenderOutput {
    let merged = merge_tabs(&mut value);
    if merged > 0 {
        tracing::debug!(merged, "merged consecutive tab items");
    }
    resolve_component_ids(&mut value, ctx.registry.as_ref());

    let document = match LayoutDocument::from_value(&value) {
        Ok(doc) => doc,
        Err(e) => return fallback_output(ctx, &e, cursor),
    };

    let mut renderer = LayoutRenderer::new(ctx, host);
    match renderer.render_document(&document).await {
        Ok(root) => {
            let width = renderer.graph.node(root).width;
            let (x, y) = cursor.place(width, ctx.config.render.canvas_gap);
            let node = renderer.graph.node_mut(root);
            node.x = x;
            node.y = y;
            tracing::info!(
                nodes = renderer.graph.len(),
                placeholders = renderer.report.placeholders.len(),
                "layout rendered"
            );
            RenderOutput {
                graph: renderer.graph,
                root,
                report: renderer.report,
            }
        }
        Err(e) => fallback_output(ctx, &e, cursor),
    }
}

fn fallback_output(ctx: &CompilationContext, error: &CompileError, cursor: &mut CanvasCursor) -> RenderOutput {
    tracing::error!("layout rendering failed: {}", error);
    let config = &ctx.config.render;
    let mut graph = SceneGraph::new();
    let root = graph.add(
        None,
        None,
        "Error Frame",
        NodeKind::Frame(FrameProps {
            fills: vec![Paint::solid(Rgb::new(1.0, 0.9, 0.9))],
            ..FrameProps::default()
        }),
        config.fallback_frame_width,
        config.fallback_frame_height,
    );
    let (x, y) = cursor.place(config.fallback_frame_width, config.canvas_gap);
    let node = graph.node_mut(root);
    node.x = x;
    node.y = y;
    node.fixed_width = true;

    RenderOutput {
        graph,
        root,
        report: RenderReport {
            notification: Some(format!("Layout generation failed: {}", error)),
            ..RenderReport::default()
        },
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDERER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct LayoutRenderer<'a, H: DesignHost + ?Sized> {
    ctx: &'a CompilationContext,
    host: &'a H,
    engine: PropertyEngine<'a>,
    graph: SceneGraph,
    report: RenderReport,
    /// Text nodes whose fonts are missing in the host document.
    missing_fonts: HashSet<NodeId>,
}

impl<'a, H: DesignHost + ?Sized> LayoutRenderer<'a, H> {
    pub fn new(ctx: &'a CompilationContext, host: &'a H) -> Self {
        Self {
            ctx,
            host,
            engine: PropertyEngine::new(ctx.registry.as_ref()),
            graph: SceneGraph::new(),
            report: RenderReport::default(),
            missing_fonts: HashSet::new(),
        }
    }

    pub async fn render_document(&mut self, document: &LayoutDocument) -> CompileResult<NodeId> {
        let root_spec = &document.root;
        let root = self.create_frame(root_spec, None);
        if root_spec.width.is_none() && root_spec.layout_mode == LayoutMode::None {
            let node = self.graph.node_mut(root);
            node.width = self.ctx.config.render.default_root_width;
            node.fixed_width = true;
        }

        for (i, child) in root_spec.children.iter().enumerate() {
            self.render_child(child, root, format!("items[{}]", i)).await;
        }
        self.arrange_frame(root);
        self.fit_root(root, root_spec);
        Ok(root)
    }

    /// Grow the root to its content, never below the minimum height.
    fn fit_root(&mut self, root: NodeId, spec: &ContainerNode) {
        let min_height = spec
            .directive
            .constraints
            .min_height
            .unwrap_or(self.ctx.config.render.root_min_height);
        let children = self.graph.children(root).to_vec();
        let (right, bottom) = content_extent(&self.graph, &children);
        let padding = self.graph.node(root).frame().map(|f| f.padding).unwrap_or_default();

        let node = self.graph.node_mut(root);
        let content_height = if children.is_empty() { 0.0 } else { bottom + padding.bottom };
        node.height = node.height.max(content_height).max(min_height);
        if !node.fixed_width && !children.is_empty() {
            node.width = node.width.max(right + padding.right);
        }
    }

    /// Render one item, replacing it with a placeholder if it fails.
    fn render_child<'b>(
        &'b mut self,
        node: &'b LayoutNode,
        parent: NodeId,
        path: String,
    ) -> BoxFuture<'b, ()> {
        async move {
            let result = match node {
                LayoutNode::Container(c) => self.render_container(c, parent, &path).await,
                LayoutNode::Text(t) => self.render_text(t, parent).await.map(|_| ()),
                LayoutNode::Primitive(p) => {
                    self.render_primitive(p, parent);
                    Ok(())
                }
                LayoutNode::Component(c) => self.render_component(c, parent, &path).await,
                LayoutNode::Malformed(m) => Err(CompileError::structural(&m.path, &m.reason)),
            };

            if let Err(e) = result {
                let source = match node {
                    LayoutNode::Component(c) => {
                        c.component_id.clone().unwrap_or_else(|| c.type_name.clone())
                    }
                    other => other.kind_name().to_string(),
                };
                tracing::warn!(path = %path, "item replaced by placeholder: {}", e);
                self.warn(&path, e.to_string());
                self.add_placeholder(parent, &source, &e.to_string());
            }
        }
        .boxed()
    }

    fn warn(&mut self, path: &str, message: impl Into<String>) {
        self.report.warnings.push(RenderWarning {
            path: path.to_string(),
            message: message.into(),
        });
    }

    fn parent_mode(&self, parent: Option<NodeId>) -> LayoutMode {
        parent
            .and_then(|p| self.graph.node(p).frame())
            .map_or(LayoutMode::None, |f| f.layout_mode)
    }

    fn add_placeholder(&mut self, parent: NodeId, source: &str, reason: &str) -> NodeId {
        let config = &self.ctx.config.render;
        let (w, h) = (config.placeholder_width, config.placeholder_height);
        let id = self.graph.add(
            Some(parent),
            None,
            format!("Missing: {}", source),
            NodeKind::Placeholder(PlaceholderProps {
                reason: reason.to_string(),
                source: source.to_string(),
            }),
            w,
            h,
        );
        self.report.placeholders.push(source.to_string());
        id
    }

    fn paint_for(&mut self, color: &ColorRef, path: &str) -> Option<Paint> {
        match color {
            ColorRef::Rgb(rgb) => Some(Paint::solid(*rgb)),
            ColorRef::Named(name) => match self.ctx.styles.resolve_color(name) {
                Some((rgb, _)) => Some(Paint::solid(rgb)),
                None => {
                    self.warn(path, format!("Unknown color '{}'", name));
                    None
                }
            },
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONTAINERS
    // ═══════════════════════════════════════════════════════════════════════════

    fn create_frame(&mut self, spec: &ContainerNode, parent: Option<NodeId>) -> NodeId {
        let parent_mode = self.parent_mode(parent);
        let layout = spec.directive.for_parent(parent_mode);
        let mode = spec.layout_mode;

        let mut props = FrameProps {
            layout_mode: mode,
            corner_radius: spec.corner_radius,
            ..FrameProps::default()
        };
        if mode.is_auto_layout() {
            let horizontal = mode == LayoutMode::Horizontal;
            props.padding = spec.padding;
            props.item_spacing = spec.item_spacing;
            props.layout_wrap = spec.layout_wrap;
            props.primary_axis_align_items = spec.primary_axis_align_items.clone();
            props.counter_axis_align_items = spec.counter_axis_align_items.clone();

            let width_fixed = spec.width.is_some();
            let height_fixed = spec.height.is_some();
            let (primary_default, counter_default) = if horizontal {
                (width_fixed, height_fixed)
            } else {
                (height_fixed, width_fixed)
            };
            let sizing = |fixed: bool| if fixed { SizingMode::Fixed } else { SizingMode::Auto };
            props.primary_sizing = spec.primary_axis_sizing_mode.unwrap_or(sizing(primary_default));
            props.counter_sizing = spec.counter_axis_sizing_mode.unwrap_or(sizing(counter_default));
            if layout.hug_contents {
                props.primary_sizing = SizingMode::Auto;
                props.counter_sizing = SizingMode::Auto;
            }
        }

        let name = spec.name.clone().unwrap_or_else(|| {
            if parent.is_none() {
                "Generated Layout".to_string()
            } else {
                "Container".to_string()
            }
        });
        let fill = spec.fill.as_ref().and_then(|c| self.paint_for(c, &name));
        props.fills = fill.into_iter().collect();

        let fill_width = if layout.fills_width && parent_mode == LayoutMode::Vertical {
            parent.and_then(|p| inner_width(&self.graph, p))
        } else {
            None
        };

        let width = spec.width.or(fill_width).unwrap_or(0.0);
        let height = spec.height.unwrap_or(0.0);
        let id = self.graph.add(parent, None, name, NodeKind::Frame(props), width, height);

        let node = self.graph.node_mut(id);
        node.fixed_width = spec.width.is_some();
        node.layout = layout;
        node.constraints = spec.directive.constraints;
        if fill_width.is_some() && spec.width.is_none() {
            // Width comes from the parent; keep it through arrangement.
            if let NodeKind::Frame(f) = &mut node.kind {
                match f.layout_mode {
                    LayoutMode::Vertical => f.counter_sizing = SizingMode::Fixed,
                    LayoutMode::Horizontal => f.primary_sizing = SizingMode::Fixed,
                    LayoutMode::None => {}
                }
            }
        }
        id
    }

    async fn render_container(&mut self, spec: &ContainerNode, parent: NodeId, path: &str) -> CompileResult<()> {
        let frame = self.create_frame(spec, Some(parent));
        for (i, child) in spec.children.iter().enumerate() {
            self.render_child(child, frame, format!("{}.items[{}]", path, i)).await;
        }
        self.arrange_frame(frame);
        Ok(())
    }

    fn arrange_frame(&mut self, frame: NodeId) {
        arrange(&mut self.graph, frame);
        if self.remeasure_wrapped_text(frame) {
            arrange(&mut self.graph, frame);
        }
    }

    /// Grow and stretch can change the width of wrapping text after it was measured.
    /// Returns `true` when any height changed.
    fn remeasure_wrapped_text(&mut self, frame: NodeId) -> bool {
        let mut changed = false;
        for child in self.graph.children(frame).to_vec() {
            let node = self.graph.node(child);
            let Some(text) = node.text() else {
                continue;
            };
            if text.auto_resize != TextAutoResize::Height {
                continue;
            }
            let (_, height) = self
                .host
                .measure_text(&text.characters, text.font_size, Some(node.width));
            if (height - node.height).abs() > f64::EPSILON {
                self.graph.node_mut(child).height = height;
                changed = true;
            }
        }
        changed
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // NATIVE TEXT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Load every distinct font of a run concurrently; on failure fall back to the
    /// default font.
    async fn load_fonts(&self, fonts: &[FontName]) -> CompileResult<Vec<FontName>> {
        let mut distinct: Vec<&FontName> = Vec::new();
        for font in fonts {
            if !distinct.contains(&font) {
                distinct.push(font);
            }
        }
        let host = self.host;
        let results = join_all(distinct.iter().map(|f| host.load_font(f))).await;
        if let Some(err) = results.into_iter().find_map(Result::err) {
            let fallback = self.ctx.config.render.default_font.clone();
            tracing::warn!(
                "font load failed ({}); falling back to {} {}",
                err,
                fallback.family,
                fallback.style
            );
            host.load_font(&fallback).await?;
            return Ok(vec![fallback]);
        }
        Ok(fonts.to_vec())
    }

    async fn render_text(&mut self, spec: &NativeTextNode, parent: NodeId) -> CompileResult<NodeId> {
        let config = &self.ctx.config.render;
        let requested = if spec.bold {
            config.bold_font.clone()
        } else {
            config.default_font.clone()
        };
        let fonts = self.load_fonts(std::slice::from_ref(&requested)).await?;
        let mut font_size = spec.font_size.unwrap_or(config.default_font_size);
        let threshold = config.text_wrap_threshold;
        let path = spec.content.chars().take(30).collect::<String>();

        let mut text_style_id = None;
        if let Some(style_name) = &spec.text_style_ref {
            if let Some(style) = self.host.text_style(style_name).await {
                text_style_id = Some(style.id);
            } else if let Some(entry) = self.ctx.styles.find_text_style(style_name) {
                font_size = entry.font_size.unwrap_or(font_size);
            } else {
                self.warn(&path, format!("Unknown text style '{}'", style_name));
            }
        }

        let (fills, fill_style_id) = self.resolve_text_color(spec, &path).await;

        let parent_mode = self.parent_mode(Some(parent));
        let layout = spec.directive.for_parent(parent_mode);
        let (auto_resize, wrap_width) = if layout.fills_width && parent_mode.is_auto_layout() {
            let width = effective_width(&self.graph, parent).map(|(_, available)| available);
            (TextAutoResize::Height, width)
        } else {
            match effective_width(&self.graph, parent) {
                Some((ancestor, available)) if ancestor <= threshold => {
                    (TextAutoResize::Height, Some(available))
                }
                _ => (TextAutoResize::WidthAndHeight, None),
            }
        };
        let (width, height) = self.host.measure_text(&spec.content, font_size, wrap_width);

        let name = if spec.content.is_empty() {
            "Text".to_string()
        } else {
            path.clone()
        };
        let id = self.graph.add(
            Some(parent),
            None,
            name,
            NodeKind::Text(TextProps {
                characters: spec.content.clone(),
                fonts,
                font_size,
                text_align: spec.alignment,
                auto_resize,
                fills,
                fill_style_id,
                text_style_id,
            }),
            width,
            height,
        );
        let node = self.graph.node_mut(id);
        node.layout = layout;
        node.constraints = spec.directive.constraints;
        Ok(id)
    }

    /// Token, then color style, then the raw color; black when nothing resolves.
    async fn resolve_text_color(&mut self, spec: &NativeTextNode, path: &str) -> (Vec<Paint>, Option<String>) {
        if let Some(style_name) = &spec.color_style_ref {
            if let Some(style) = self.host.paint_style(style_name).await {
                return (Vec::new(), Some(style.id));
            }
            if let Some((rgb, _)) = self.ctx.styles.resolve_color(style_name) {
                return (vec![Paint::solid(rgb)], None);
            }
            self.warn(path, format!("Unknown color style '{}'", style_name));
        }

        match &spec.color {
            Some(ColorRef::Rgb(rgb)) => (vec![Paint::solid(*rgb)], None),
            Some(ColorRef::Named(name)) => {
                if let Some((rgb, _)) = self.ctx.styles.resolve_color(name) {
                    return (vec![Paint::solid(rgb)], None);
                }
                if let Some(style) = self.host.paint_style(name).await {
                    return (Vec::new(), Some(style.id));
                }
                self.warn(path, format!("Unknown color '{}', using black", name));
                (vec![Paint::solid(Rgb::BLACK)], None)
            }
            None => (vec![Paint::solid(Rgb::BLACK)], None),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // NATIVE PRIMITIVES
    // ═══════════════════════════════════════════════════════════════════════════

    fn render_primitive(&mut self, spec: &NativePrimitiveNode, parent: NodeId) -> NodeId {
        let (default_w, default_h, name) = match spec.shape {
            Shape::Rectangle => (100.0, 100.0, "Rectangle"),
            Shape::Ellipse => (50.0, 50.0, "Ellipse"),
        };
        let fills: Vec<Paint> = match (&spec.image_fill, &spec.fill) {
            (Some(image), _) => vec![Paint::Image {
                image_ref: image.clone(),
            }],
            (None, Some(color)) => self.paint_for(color, name).into_iter().collect(),
            (None, None) => vec![Paint::solid(Rgb::new(0.85, 0.85, 0.85))],
        };
        let props = ShapeProps {
            fills,
            corner_radius: spec.corner_radius,
        };
        let kind = match spec.shape {
            Shape::Rectangle => NodeKind::Rectangle(props),
            Shape::Ellipse => NodeKind::Ellipse(props),
        };

        let parent_mode = self.parent_mode(Some(parent));
        let layout = spec.directive.for_parent(parent_mode);
        let id = self.graph.add(
            Some(parent),
            None,
            name,
            kind,
            spec.width.unwrap_or(default_w),
            spec.height.unwrap_or(default_h),
        );
        let node = self.graph.node_mut(id);
        node.fixed_width = spec.width.is_some() && !layout.fills_width;
        node.layout = layout;
        node.constraints = spec.directive.constraints;
        id
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // COMPONENTS
    // ═══════════════════════════════════════════════════════════════════════════

    async fn render_component(&mut self, spec: &ComponentRefNode, parent: NodeId, path: &str) -> CompileResult<()> {
        let component_id = spec.component_id.as_deref().ok_or_else(|| {
            CompileError::structural(path, format!("'{}' item has no componentNodeId", spec.type_name))
        })?;
        let blueprint = self
            .host
            .component_blueprint(component_id)
            .await?
            .ok_or_else(|| CompileError::component_not_found(component_id))?;

        let schema = match self.ctx.registry.get_schema(component_id) {
            Some(schema) => schema.clone(),
            None => {
                tracing::debug!(component_id, "no scanned schema; using basic mode");
                self.report.basic_mode_components.push(component_id.to_string());
                basic_schema(&blueprint, &spec.type_name)
            }
        };

        let mut bag = spec.properties.clone();
        preprocess_for_type(&spec.type_name, &mut bag);
        let resolved = self.engine.resolve_with_schema(Some(&schema), &bag);
        for error in &resolved.errors {
            self.warn(path, format!("{}: {}", error.property, error.message));
        }
        self.report.property_warnings.extend(resolved.warnings.iter().cloned());

        let instance = self.instantiate(&blueprint, parent, spec.name.as_deref());
        self.apply_variants(instance, &resolved.variants, &blueprint, path);
        self.apply_layout(instance, &resolved.layout_properties, parent);
        self.apply_text(instance, &resolved.text_properties, path).await;
        self.apply_media(instance, &resolved.media_properties, path).await;
        self.apply_visibility(instance, &spec.visibility_overrides, path);
        self.apply_icon_swaps(instance, &spec.icon_swaps, path).await;
        Ok(())
    }

    fn instantiate(&mut self, blueprint: &ComponentBlueprint, parent: NodeId, name: Option<&str>) -> NodeId {
        let instance = self.graph.add(
            Some(parent),
            None,
            name.unwrap_or(&blueprint.name),
            NodeKind::Instance(InstanceProps {
                main_component_id: blueprint.component_id.clone(),
                variant_values: blueprint.default_variant.clone(),
            }),
            blueprint.width,
            blueprint.height,
        );
        let prefix = self.graph.node(instance).host_id.clone();
        for child in &blueprint.children {
            self.instantiate_node(child, instance, &prefix);
        }
        instance
    }

    fn instantiate_node(&mut self, node: &BlueprintNode, parent: NodeId, prefix: &str) {
        let kind = match &node.kind {
            BlueprintKind::Frame => NodeKind::Frame(FrameProps::default()),
            BlueprintKind::Text {
                characters,
                fonts,
                font_size,
                ..
            } => NodeKind::Text(TextProps {
                characters: characters.clone(),
                fonts: fonts.clone(),
                font_size: *font_size,
                text_align: Default::default(),
                auto_resize: TextAutoResize::WidthAndHeight,
                fills: Vec::new(),
                fill_style_id: None,
                text_style_id: None,
            }),
            BlueprintKind::Instance { main_component_id } => NodeKind::Instance(InstanceProps {
                main_component_id: main_component_id.clone(),
                variant_values: Default::default(),
            }),
            BlueprintKind::Vector => NodeKind::Vector,
            BlueprintKind::Image => NodeKind::Image(ShapeProps::default()),
        };
        let id = self.graph.add(
            Some(parent),
            Some(format!("I{};{}", prefix, node.id)),
            node.name.clone(),
            kind,
            node.width,
            node.height,
        );
        self.graph.node_mut(id).visible = node.visible;
        if let BlueprintKind::Text { missing_font: true, .. } = node.kind {
            self.missing_fonts.insert(id);
        }
        for child in &node.children {
            self.instantiate_node(child, id, prefix);
        }
    }

    fn apply_variants(
        &mut self,
        instance: NodeId,
        variants: &std::collections::BTreeMap<String, String>,
        blueprint: &ComponentBlueprint,
        path: &str,
    ) {
        for (dimension, value) in variants {
            if !blueprint.variant_options.is_empty() {
                let allowed = blueprint
                    .variant_options
                    .get(dimension)
                    .map_or(false, |values| values.contains(value));
                if !allowed {
                    self.warn(
                        path,
                        format!("Variant {}={} is not available on the live component", dimension, value),
                    );
                    continue;
                }
            }
            if let NodeKind::Instance(props) = &mut self.graph.node_mut(instance).kind {
                props.variant_values.insert(dimension.clone(), value.clone());
            }
        }
    }

    fn apply_layout(&mut self, instance: NodeId, directive: &crate::ir::LayoutDirective, parent: NodeId) {
        let parent_mode = self.parent_mode(Some(parent));
        let layout: ChildLayout = directive.for_parent(parent_mode);
        let fill_width = (layout.fills_width && parent_mode == LayoutMode::Vertical)
            .then(|| inner_width(&self.graph, parent))
            .flatten();

        let node = self.graph.node_mut(instance);
        node.layout = layout;
        node.constraints = directive.constraints;
        if let Some(w) = fill_width {
            node.width = directive.constraints.clamp_width(w);
        }
    }

    /// Find a node inside an instance: exact host id, then id suffix (scan-time ids lose
    /// the instance prefix), then id substring, then name.
    fn locate_child(&self, instance: NodeId, node_id: &str, name: &str) -> Option<NodeId> {
        let descendants = self.graph.descendants(instance);
        let suffix = format!(";{}", node_id);
        let host_id = |d: NodeId| self.graph.node(d).host_id.as_str();
        descendants
            .iter()
            .copied()
            .find(|d| host_id(*d) == node_id)
            .or_else(|| {
                let by_suffix = |d: &NodeId| !node_id.is_empty() && host_id(*d).ends_with(&suffix);
                descendants.iter().copied().find(by_suffix)
            })
            .or_else(|| {
                let by_substring = |d: &NodeId| !node_id.is_empty() && host_id(*d).contains(node_id);
                descendants.iter().copied().find(by_substring)
            })
            .or_else(|| {
                let wanted = normalize_key(name);
                descendants
                    .iter()
                    .copied()
                    .find(|d| normalize_key(&self.graph.node(*d).name) == wanted)
            })
    }

    /// Text nodes that belong to an array slot: the slot's node plus same-named siblings.
    fn slot_text_nodes(&self, instance: NodeId, slot: &SlotRef) -> Vec<NodeId> {
        let wanted = normalize_key(&slot.slot_name);
        let first = self.locate_child(instance, &slot.node_id, &slot.slot_name);
        self.graph
            .descendants(instance)
            .into_iter()
            .filter(|d| {
                let node = self.graph.node(*d);
                node.text().is_some() && (Some(*d) == first || normalize_key(&node.name) == wanted)
            })
            .collect()
    }

    async fn set_text(&mut self, node_id: NodeId, characters: &str, path: &str) {
        if self.missing_fonts.contains(&node_id) {
            let name = self.graph.node(node_id).name.clone();
            self.warn(path, format!("Skipping text node '{}' with missing font", name));
            return;
        }
        let Some(current) = self.graph.node(node_id).text().map(|t| t.fonts.clone()) else {
            return;
        };
        let fonts = match self.load_fonts(&current).await {
            Ok(fonts) => fonts,
            Err(e) => {
                self.warn(path, e.to_string());
                return;
            }
        };
        let node = self.graph.node_mut(node_id);
        node.visible = true;
        if let NodeKind::Text(text) = &mut node.kind {
            text.characters = characters.to_string();
            text.fonts = fonts;
        }
    }

    async fn apply_text(&mut self, instance: NodeId, assignments: &[TextAssignment], path: &str) {
        for assignment in assignments {
            for binding in &assignment.bindings {
                match &binding.value {
                    TextValue::Single(text) => {
                        match self.locate_child(instance, &binding.slot.node_id, &binding.slot.slot_name) {
                            Some(node) => self.set_text(node, text, path).await,
                            None => self.warn(
                                path,
                                format!("Text slot '{}' not found in instance", binding.slot.slot_name),
                            ),
                        }
                    }
                    TextValue::Multiple(values) => {
                        let nodes = self.slot_text_nodes(instance, &binding.slot);
                        let limit = binding.max_items.unwrap_or(nodes.len()).min(values.len());
                        for (i, node) in nodes.into_iter().enumerate() {
                            if i < limit {
                                self.set_text(node, &values[i], path).await;
                            } else {
                                self.graph.node_mut(node).visible = false;
                            }
                        }
                    }
                }
            }
            for hidden in &assignment.hidden_slots {
                if let Some(node) = self.locate_child(instance, &hidden.node_id, &hidden.slot_name) {
                    self.graph.node_mut(node).visible = false;
                }
            }
        }
    }

    async fn resolve_component_reference(&self, reference: &str) -> Option<String> {
        let registry = &self.ctx.registry;
        if registry.contains(reference) {
            return Some(reference.to_string());
        }
        if let Some(schema) = registry.find_by_name(reference) {
            return Some(schema.component_id.clone());
        }
        self.host.find_icon_component(reference).await
    }

    async fn apply_media(&mut self, instance: NodeId, assignments: &[MediaAssignment], path: &str) {
        for media in assignments {
            let Some(node_id) = self.locate_child(instance, &media.slot.node_id, &media.slot.slot_name) else {
                self.warn(path, format!("Media slot '{}' not found in instance", media.slot.slot_name));
                continue;
            };
            match &media.value {
                MediaValue::Visible(visible) => self.graph.node_mut(node_id).visible = *visible,
                MediaValue::Reference(reference) => {
                    let swap = match media.kind {
                        MediaKind::ComponentInstance => self.resolve_component_reference(reference).await,
                        _ => None,
                    };
                    let node = self.graph.node_mut(node_id);
                    node.visible = true;
                    node.media_ref = Some(reference.clone());
                    match &mut node.kind {
                        NodeKind::Instance(props) => {
                            if let Some(component_id) = swap {
                                props.main_component_id = component_id;
                            }
                        }
                        NodeKind::Image(shape) | NodeKind::Rectangle(shape) => {
                            shape.fills = vec![Paint::Image {
                                image_ref: reference.clone(),
                            }];
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn apply_visibility(&mut self, instance: NodeId, overrides: &[(String, bool)], path: &str) {
        for (node_id, visible) in overrides {
            match self.locate_child(instance, node_id, node_id) {
                Some(node) => self.graph.node_mut(node).visible = *visible,
                None => self.warn(path, format!("Visibility override target '{}' not found", node_id)),
            }
        }
    }

    /// Nested instance to swap: direct id, then position words, then name, then any icon.
    fn icon_swap_target(&self, instance: NodeId, slot_key: &str) -> Option<NodeId> {
        let nested: Vec<NodeId> = self
            .graph
            .descendants(instance)
            .into_iter()
            .filter(|d| self.graph.node(*d).instance().is_some())
            .collect();
        if nested.is_empty() {
            return None;
        }

        let suffix = format!(";{}", slot_key);
        if let Some(direct) = nested.iter().copied().find(|d| {
            let host_id = &self.graph.node(*d).host_id;
            host_id == slot_key || host_id.ends_with(&suffix)
        }) {
            return Some(direct);
        }

        let key = slot_key.to_lowercase();
        let name_of = |d: &NodeId| self.graph.node(*d).name.to_lowercase();
        if contains_any(&key, &["leading", "start", "left"]) {
            return nested
                .iter()
                .copied()
                .find(|d| contains_any(&name_of(d), LEADING_WORDS))
                .or_else(|| nested.first().copied());
        }
        if contains_any(&key, &["trailing", "end", "right"]) {
            return nested
                .iter()
                .copied()
                .find(|d| contains_any(&name_of(d), TRAILING_WORDS))
                .or_else(|| nested.last().copied());
        }

        let key = normalize_key(slot_key);
        nested
            .iter()
            .copied()
            .find(|d| {
                let name = normalize_key(&self.graph.node(*d).name);
                !name.is_empty() && (name.contains(&key) || key.contains(&name))
            })
            .or_else(|| nested.iter().copied().find(|d| name_of(d).contains("icon")))
    }

    async fn apply_icon_swaps(&mut self, instance: NodeId, swaps: &[(String, String)], path: &str) {
        for (slot_key, icon_name) in swaps {
            let Some(target) = self.icon_swap_target(instance, slot_key) else {
                self.warn(path, format!("No icon slot matches '{}'", slot_key));
                continue;
            };
            let Some(component_id) = self.resolve_component_reference(icon_name).await else {
                self.warn(path, format!("Icon '{}' not found", icon_name));
                continue;
            };
            if let NodeKind::Instance(props) = &mut self.graph.node_mut(target).kind {
                tracing::debug!(slot = %slot_key, icon = %icon_name, "icon swapped");
                props.main_component_id = component_id;
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BASIC MODE
// ═══════════════════════════════════════════════════════════════════════════════

/// Schema inferred from a live blueprint when the scanner has no record of it.
pub fn basic_schema(blueprint: &ComponentBlueprint, component_type: &str) -> ComponentSchema {
    let hint = array_slot_hint(component_type);
    let mut schema = ComponentSchema::new(blueprint.component_id.clone(), blueprint.name.clone());
    schema.component_type = Some(component_type.to_string());
    schema.variant_dimensions = blueprint.variant_options.clone();

    let mut seen_array_slots: HashSet<String> = HashSet::new();
    let mut text_index = 0;
    for node in blueprint.walk() {
        match &node.kind {
            BlueprintKind::Text { .. } => {
                let normalized = normalize_key(&node.name);
                let is_array = hint.slot_names.iter().any(|n| normalized.contains(n));
                if is_array && !seen_array_slots.insert(normalized) {
                    continue;
                }
                let classification = match text_index {
                    0 => TextClassification::Primary,
                    1 => TextClassification::Secondary,
                    _ => TextClassification::Tertiary,
                };
                text_index += 1;
                schema.text_slots.push(TextSlot {
                    name: node.name.clone(),
                    node_id: node.id.clone(),
                    classification,
                    max_items: is_array.then_some(hint.max_items),
                    data_type: if is_array {
                        SlotDataType::Array
                    } else {
                        SlotDataType::Scalar
                    },
                });
            }
            BlueprintKind::Instance { .. } | BlueprintKind::Vector | BlueprintKind::Image => {
                let kind = match node.kind {
                    BlueprintKind::Vector => MediaKind::Vector,
                    BlueprintKind::Image => MediaKind::Image,
                    _ => MediaKind::ComponentInstance,
                };
                schema.media_slots.push(MediaSlot {
                    name: node.name.clone(),
                    node_id: node.id.clone(),
                    kind,
                });
            }
            BlueprintKind::Frame => {}
        }
    }
    schema
}
