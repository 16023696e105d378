//! Configuration model: what the caller tells the engine about the
//! repository, and what the engine reports back.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File name of the structural index at the repository root.
pub const STRUCTURAL_INDEX_FILE: &str = "Configuration.xml";
/// File name of the dump-metadata index at the repository root.
pub const DUMP_INDEX_FILE: &str = "ConfigDumpInfo.xml";

/// A configuration entity, referenced by `Type.Name` inside artifacts and
/// indexes. Both parts must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub type_name: String,
    pub name: String,
}

impl EntityRef {
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        EntityRef {
            type_name: type_name.into(),
            name: name.into(),
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.type_name, self.name)
    }
}

/// On-disk layout of the repository. Definition artifacts for one entity
/// type live under a single directory (`Catalogs/Items.xml`); the two index
/// files sit at the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoLayout {
    pub root: PathBuf,
    /// Directory under `root` holding this type's definition files.
    pub type_group: String,
}

impl RepoLayout {
    pub fn definition_path(&self, entity_name: &str) -> PathBuf {
        self.root
            .join(&self.type_group)
            .join(format!("{entity_name}.xml"))
    }

    pub fn structural_index_path(&self) -> PathBuf {
        self.root.join(STRUCTURAL_INDEX_FILE)
    }

    pub fn dump_index_path(&self) -> PathBuf {
        self.root.join(DUMP_INDEX_FILE)
    }
}

/// Namespace prefixes and the identity-attribute name used by the consuming
/// system. These are an external contract of the repository format, so they
/// are injected rather than hard-coded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceMap {
    /// Prefix of the structural vocabulary (`cfg:Catalog`, `cfg:ChildObjects`).
    pub config_prefix: String,
    /// Prefix of the extension vocabulary carrying identifier roles
    /// (`xr:TypeId`, `xr:ValueId`, `xr:Metadata`).
    pub ext_prefix: String,
    /// Attribute holding the root object's unique identifier.
    pub identity_attr: String,
}

impl Default for NamespaceMap {
    fn default() -> Self {
        NamespaceMap {
            config_prefix: "cfg".to_string(),
            ext_prefix: "xr".to_string(),
            identity_attr: "uuid".to_string(),
        }
    }
}

impl NamespaceMap {
    pub fn config_name(&self, local: &str) -> String {
        format!("{}:{}", self.config_prefix, local)
    }

    pub fn ext_name(&self, local: &str) -> String {
        format!("{}:{}", self.ext_prefix, local)
    }
}

/// One clone-and-integrate run: donor entity, clone name, repository shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneJob {
    pub repo: RepoLayout,
    #[serde(default)]
    pub namespaces: NamespaceMap,
    pub donor: EntityRef,
    pub clone_name: String,
}

impl CloneJob {
    pub fn clone_ref(&self) -> EntityRef {
        EntityRef::new(&self.donor.type_name, &self.clone_name)
    }
}

/// What a completed run did, for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneOutcome {
    /// Path of the clone's definition artifact.
    pub clone_path: PathBuf,
    /// Whether cleanup removed a stale clone definition file.
    pub removed_stale_definition: bool,
    /// Stale registration records removed during cleanup.
    pub removed_stale_records: usize,
    /// Fresh identifiers assigned in the clone's definition artifact.
    pub regenerated_ids: usize,
    /// Index files a registration record was inserted into.
    pub indexes_updated: usize,
}
