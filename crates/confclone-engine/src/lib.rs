//! Clone-and-integrate engine for XML configuration repositories.
//!
//! Given a donor entity identified by `(type, name)`, the engine produces a
//! second entity that is internally consistent and registered in every index
//! file that references entities by name:
//!
//! - removes any stale prior clone first, so re-runs converge,
//! - duplicates the donor's definition file while rewriting name-derived
//!   identifiers (`.Name` path suffixes and `>Name<` element text),
//! - regenerates every embedded unique identifier so the clone is a distinct
//!   entity at the identity level,
//! - inserts registration records into the structural index and the
//!   dump-metadata index, keeping records of one type contiguous.
//!
//! The repository's file layout and namespace prefixes are inputs
//! ([`model::RepoLayout`], [`model::NamespaceMap`]), not built-in knowledge:
//! the engine must not corrupt content whose schema it does not understand.

pub mod ids;
pub mod index;
pub mod model;
pub mod pipeline;
pub mod store;


use std::path::PathBuf;
use thiserror::Error;

pub use model::{CloneJob, CloneOutcome, EntityRef, NamespaceMap, RepoLayout};

/// Every error aborts the remaining phases; recovery is a re-run, relying on
/// the idempotent cleanup phase.
#[derive(Debug, Error)]
pub enum CloneError {
    #[error("artifact not found: {}", path.display())]
    ArtifactNotFound { path: PathBuf },

    #[error("malformed artifact {}: {source}", path.display())]
    MalformedArtifact {
        path: PathBuf,
        source: confclone_xmltree::XmlError,
    },

    #[error("missing identifier nodes ({role}) in {}", path.display())]
    MissingIdentifierNodes { path: PathBuf, role: String },

    #[error("failed to write {}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
