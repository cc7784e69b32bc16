//! Component Schema Registry
//!
//! In-memory table of scanned component schemas keyed by component id. Schemas are
//! produced by an external design-system scanner and are immutable once registered;
//! a later scan of the same component replaces the earlier record wholesale.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

use crate::error::CompileResult;

/// Scans older than this are reported as stale.
pub const SCHEMA_STALE_AFTER: Duration = Duration::from_secs(7 * 24 * 60 * 60);

// ═══════════════════════════════════════════════════════════════════════════════
// SCHEMA TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextClassification {
    Primary,
    Secondary,
    Tertiary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotDataType {
    #[default]
    #[serde(alias = "single")]
    Scalar,
    Array,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSlot {
    pub name: String,
    pub node_id: String,
    pub classification: TextClassification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default)]
    pub data_type: SlotDataType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaKind {
    ComponentInstance,
    Vector,
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSlot {
    pub name: String,
    pub node_id: String,
    pub kind: MediaKind,
}

/// Everything the compiler knows about one scannable component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSchema {
    pub component_id: String,
    #[serde(default)]
    pub name: String,
    /// Semantic type assigned by the scanner (e.g. "list-item", "tab").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,
    #[serde(default)]
    pub variant_dimensions: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub text_slots: Vec<TextSlot>,
    #[serde(default)]
    pub media_slots: Vec<MediaSlot>,
    /// Unix seconds of the scan that produced this record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanned_at: Option<u64>,
}

impl ComponentSchema {
    pub fn new(component_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            name: name.into(),
            component_type: None,
            variant_dimensions: BTreeMap::new(),
            text_slots: Vec::new(),
            media_slots: Vec::new(),
            scanned_at: None,
        }
    }

    pub fn variant_values(&self, dimension: &str) -> Option<&[String]> {
        self.variant_dimensions.get(dimension).map(|v| v.as_slice())
    }

    /// SHA-256 over the canonical JSON encoding.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn is_stale(&self, now: SystemTime) -> bool {
        let Some(scanned_at) = self.scanned_at else {
            return true;
        };
        let now_secs = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        now_secs.saturating_sub(scanned_at) > SCHEMA_STALE_AFTER.as_secs()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCANNER CONTRACT
// ═══════════════════════════════════════════════════════════════════════════════

/// Read-only view of the scanner's output.
pub trait Scanner: Send + Sync {
    /// Look up by component id, then by component name.
    fn get_schema(&self, type_or_id: &str) -> Option<&ComponentSchema>;

    /// Map a semantic type name ("button", "list-item") onto a component id.
    fn resolve_id_by_type(&self, type_name: &str) -> Option<String>;

    fn component_ids(&self) -> Vec<&str>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, ComponentSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_schemas(schemas: impl IntoIterator<Item = ComponentSchema>) -> Self {
        let mut registry = Self::new();
        for schema in schemas {
            registry.register(schema);
        }
        registry
    }

    /// Insert a schema, replacing and returning any earlier record for the same id.
    pub fn register(&mut self, schema: ComponentSchema) -> Option<ComponentSchema> {
        let previous = self.schemas.insert(schema.component_id.clone(), schema);
        if let Some(prev) = &previous {
            if let Some(current) = self.schemas.get(&prev.component_id) {
                if prev.fingerprint() != current.fingerprint() {
                    tracing::debug!(
                        component_id = %current.component_id,
                        "schema replaced by a newer scan"
                    );
                }
            }
        }
        previous
    }

    pub fn get_schema(&self, component_id: &str) -> Option<&ComponentSchema> {
        self.schemas.get(component_id)
    }

    /// All schemas, ordered by component id.
    pub fn get_all_schemas(&self) -> Vec<&ComponentSchema> {
        let mut all: Vec<&ComponentSchema> = self.schemas.values().collect();
        all.sort_by(|a, b| a.component_id.cmp(&b.component_id));
        all
    }

    pub fn contains(&self, component_id: &str) -> bool {
        self.schemas.contains_key(component_id)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&ComponentSchema> {
        let wanted = name.trim().to_lowercase();
        self.get_all_schemas()
            .into_iter()
            .find(|s| s.name.to_lowercase() == wanted)
    }

    pub fn stale_schemas(&self, now: SystemTime) -> Vec<&ComponentSchema> {
        self.get_all_schemas()
            .into_iter()
            .filter(|s| s.is_stale(now))
            .collect()
    }

    /// Load every `*.json` scan snapshot under `dir`. Each file holds a single
    /// schema or an array of schemas. Unreadable files are skipped.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> CompileResult<usize> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(0);
        }

        let mut loaded = 0;
        for entry in WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }

            match read_snapshot(path) {
                Ok(schemas) => {
                    for schema in schemas {
                        self.register(schema);
                        loaded += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), "skipping scan snapshot: {}", e);
                }
            }
        }
        Ok(loaded)
    }
}

fn read_snapshot(path: &Path) -> CompileResult<Vec<ComponentSchema>> {
    let data = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&data)?;
    let schemas = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)?,
        other => vec![serde_json::from_value(other)?],
    };
    Ok(schemas)
}

fn normalize_type_name(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

impl Scanner for SchemaRegistry {
    fn get_schema(&self, type_or_id: &str) -> Option<&ComponentSchema> {
        SchemaRegistry::get_schema(self, type_or_id).or_else(|| self.find_by_name(type_or_id))
    }

    fn resolve_id_by_type(&self, type_name: &str) -> Option<String> {
        let wanted = normalize_type_name(type_name);
        if wanted.is_empty() {
            return None;
        }
        let all = self.get_all_schemas();

        let exact = all.iter().find(|s| {
            s.component_type
                .as_deref()
                .map_or(false, |t| normalize_type_name(t) == wanted)
                || normalize_type_name(&s.name) == wanted
        });
        if let Some(schema) = exact {
            return Some(schema.component_id.clone());
        }

        all.iter()
            .find(|s| {
                let name = normalize_type_name(&s.name);
                !name.is_empty() && (name.contains(&wanted) || wanted.contains(&name))
            })
            .map(|s| s.component_id.clone())
    }

    fn component_ids(&self) -> Vec<&str> {
        self.get_all_schemas()
            .into_iter()
            .map(|s| s.component_id.as_str())
            .collect()
    }
}
