//! Compilation context shared by every entry point.

use std::sync::Arc;

use crate::config::CompilerConfig;
use crate::schema::SchemaRegistry;
use crate::tokens::DesignSystemStyles;

/// Read-only inputs for rendering and validation.
///
/// Built once after a scan and cloned cheaply into each compile call; nothing in the
/// compiler mutates it.
#[derive(Debug, Clone, Default)]
pub struct CompilationContext {
    pub registry: Arc<SchemaRegistry>,
    pub styles: Arc<DesignSystemStyles>,
    pub config: Arc<CompilerConfig>,
}

impl CompilationContext {
    pub fn new(registry: SchemaRegistry, styles: DesignSystemStyles, config: CompilerConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            styles: Arc::new(styles),
            config: Arc::new(config),
        }
    }

    pub fn with_registry(registry: SchemaRegistry) -> Self {
        Self::new(registry, DesignSystemStyles::default(), CompilerConfig::default())
    }
}
