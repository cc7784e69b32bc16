//! # Layout Compiler
//!
//! Compiles a declarative JSON layout (containers, native primitives and references to
//! design-system components) into a styled scene graph, using schemas extracted from a
//! scanned design system to resolve loosely specified component properties. A
//! validation and repair loop scores layout JSON and, when a generator is available,
//! asks it to correct defects.
//!
//! ## Invariants
//!
//! 1. **Explicit context**: every entry point takes a `CompilationContext`. The schema
//!    registry, token tables and config are read-only during a compile call.
//!
//! 2. **Closed IR**: item type strings are inspected once, at ingestion. The renderer
//!    dispatches on `LayoutNode` only; unknown shapes become `LayoutNode::Malformed`.
//!
//! 3. **Item error boundary**: a failing item renders as a `Missing: <id>` placeholder.
//!    Only a document that cannot be ingested falls back to the error frame.
//!
//! 4. **Variants never raise**: an illegal variant value is dropped with a warning and
//!    the component's default is kept. Booleans are always `"True"`/`"False"`.
//!
//! 5. **Application order**: variants, layout, text, media, visibility overrides, icon
//!    swaps.
//!
//! 6. **Bounded repair**: validation runs at most `max_retries + 1` times and the
//!    generator is never asked to fix a valid result. Transport retries are a separate
//!    policy.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod config;
mod context;
mod error;
mod host;
mod ir;
mod layout;
mod matcher;
mod migrate;
mod properties;
mod render;
mod repair;
mod scene;
mod schema;
mod tokens;
mod validate;

#[cfg(test)]
mod properties_tests;
#[cfg(test)]
mod repair_tests;
#[cfg(test)]
mod schema_tests;
#[cfg(test)]
mod validate_tests;

pub use config::{CompilerConfig, RenderConfig, RetryPolicy, ValidationConfig};
pub use context::CompilationContext;
pub use error::{CompileError, CompileResult, Severity};
pub use host::{BlueprintKind, BlueprintNode, ComponentBlueprint, DesignHost, FontName, StyleRef};
pub use ir::{
    ChildLayout, ColorRef, ComponentRefNode, ContainerNode, HorizontalSizing, ItemSpacing,
    LayoutAlign, LayoutDirective, LayoutDocument, LayoutMode, LayoutNode, MalformedNode,
    NativePrimitiveNode, NativeTextNode, Padding, Shape, SizeConstraints, SizingMode, TextAlign,
};
pub use matcher::{
    classify_media_slots, media_chain, normalize_key, text_chain, MatchStrategy, Matcher,
    MatcherChain, MediaBuckets, SlotMatch,
};
pub use migrate::{is_placeholder_id, is_well_formed_id, merge_tabs, resolve_component_ids, IdResolution};
pub use properties::{
    array_slot_hint, preprocess_for_type, sanitize_properties, ArraySlotHint, LayoutKey,
    MediaAssignment, MediaValue, PropertyEngine, PropertyError, PropertyWarning, RawPropertyBag,
    ResolvedProperties, SlotBinding, SlotRef, TextAssignment, TextValue, WarningKind,
};
pub use render::{
    basic_schema, compile_layout, compile_layout_value, CanvasCursor, LayoutRenderer,
    RenderOutput, RenderReport, RenderWarning,
};
pub use repair::{
    build_fix_prompt, extract_json, validate_with_retry, with_retry, GenerationRequest,
    GenerationResponse, Generator, GeneratorError, RepairOutcome, RepairSession,
    RetryingGenerator,
};
pub use scene::{NodeId, NodeKind, Paint, SceneGraph, SceneNode, TextAutoResize};
pub use schema::{
    ComponentSchema, MediaKind, MediaSlot, Scanner, SchemaRegistry, SlotDataType,
    TextClassification, TextSlot,
};
pub use tokens::{ColorStyle, DesignSystemStyles, DesignToken, Rgb, TextStyleEntry};
pub use validate::*;

fn registry_from_json(schemas_json: &str) -> SchemaRegistry {
    match serde_json::from_str::<Vec<ComponentSchema>>(schemas_json) {
        Ok(schemas) => SchemaRegistry::from_schemas(schemas),
        Err(e) => {
            tracing::warn!("ignoring unreadable schemas: {}", e);
            SchemaRegistry::new()
        }
    }
}

/// Resolve a property bag against one component of a JSON schema array.
/// Returns the serialized `ResolvedProperties`.
pub fn resolve_properties_json(schemas_json: &str, component_id: &str, properties_json: &str) -> CompileResult<String> {
    let registry = registry_from_json(schemas_json);
    let value: serde_json::Value = serde_json::from_str(properties_json)?;
    let bag = RawPropertyBag::from_value(&value)
        .ok_or_else(|| CompileError::structural("properties", "properties must be an object"))?;
    let resolved = PropertyEngine::new(&registry).resolve(component_id, &bag);
    Ok(serde_json::to_string(&resolved)?)
}

/// Run the JSON pre-passes (tab merging) and return the migrated document.
pub fn migrate_layout_json(json: &str) -> CompileResult<String> {
    let mut value: serde_json::Value = serde_json::from_str(json)?;
    merge_tabs(&mut value);
    Ok(serde_json::to_string(&value)?)
}

#[cfg(feature = "napi")]
fn error_json(e: CompileError) -> String {
    serde_json::json!({ "error": e.to_string() }).to_string()
}

#[cfg(feature = "napi")]
#[napi]
pub fn resolve_properties_native(schemas_json: String, component_id: String, properties_json: String) -> String {
    resolve_properties_json(&schemas_json, &component_id, &properties_json).unwrap_or_else(error_json)
}

#[cfg(feature = "napi")]
#[napi]
pub fn migrate_layout_native(json: String) -> String {
    migrate_layout_json(&json).unwrap_or_else(error_json)
}

#[cfg(feature = "napi")]
#[napi]
pub fn compile_bridge() -> String {
    "Layout Compiler Native Bridge Connected".to_string()
}
