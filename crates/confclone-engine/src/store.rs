//! Artifact store: file-system access for definition and index artifacts.
//!
//! All artifacts are UTF-8 XML. `load`/`save` go through the parsed
//! [`Document`] representation; `read_text` exists for the one phase that
//! must operate on raw text.

use crate::CloneError;
use confclone_xmltree::Document;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub fn read_text(path: &Path) -> Result<String, CloneError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(source) if source.kind() == ErrorKind::NotFound => Err(CloneError::ArtifactNotFound {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(CloneError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub fn load(path: &Path) -> Result<Document, CloneError> {
    let text = read_text(path)?;
    Document::parse(&text).map_err(|source| CloneError::MalformedArtifact {
        path: path.to_path_buf(),
        source,
    })
}

/// Serializes with the canonical declaration and overwrites `path`.
pub fn save(doc: &Document, path: &Path) -> Result<(), CloneError> {
    write_text(&doc.to_xml(), path)
}

/// Like [`save`], but creates the containing directory first (used for the
/// clone's definition artifact, whose type-group directory may not exist).
pub fn save_creating_dir(doc: &Document, path: &Path) -> Result<(), CloneError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| CloneError::WriteError {
            path: path.to_path_buf(),
            source,
        })?;
    }
    save(doc, path)
}

pub fn write_text(text: &str, path: &Path) -> Result<(), CloneError> {
    fs::write(path, text).map_err(|source| CloneError::WriteError {
        path: path.to_path_buf(),
        source,
    })
}

/// Removes a file if present. `Ok(false)` when it was already absent;
/// absence is never an error.
pub fn delete_if_exists(path: &Path) -> Result<bool, CloneError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(source) if source.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(CloneError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
