//! The abstract workspace every compiled artifact owns (C1's data model).
//!
//! Every phonology, morphology, language model, and morphophonology parser
//! is identified by an [`ObjectId`], tagged with an [`ObjectType`], and
//! rooted at a `parent_directory`. Its workspace is the deterministic path
//! `parent_directory/<object_type>_<object_id>/`, and every file it needs
//! lives at a deterministic path within that workspace (see
//! [`ObjectType::file_name`] and [`FileKind::filename`]).

use crate::core::error::Result;
use crate::core::{FileKind, ObjectId, ObjectType};
use std::fs;
use std::path::{Path, PathBuf};

/// A handle to one object's workspace directory.
///
/// The workspace directory is created on construction (via
/// [`ObjectHandle::new`]) and is never implicitly deleted — only
/// [`ObjectHandle::remove_workspace`] removes it.
#[derive(Debug, Clone)]
pub struct ObjectHandle {
    parent_directory: PathBuf,
    object_type: ObjectType,
    object_id: ObjectId,
}

impl ObjectHandle {
    /// Create a handle and ensure its workspace directory exists.
    pub fn new(
        parent_directory: impl Into<PathBuf>,
        object_type: ObjectType,
        object_id: ObjectId,
    ) -> Result<Self> {
        let handle = Self {
            parent_directory: parent_directory.into(),
            object_type,
            object_id,
        };
        handle.ensure_workspace()?;
        Ok(handle)
    }

    /// The object's type tag.
    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    /// The object's id.
    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    /// The directory this object's files live under:
    /// `parent_directory/<object_type>_<object_id>/`.
    pub fn workspace(&self) -> PathBuf {
        self.parent_directory.join(format!(
            "{}_{}",
            self.object_type.directory_name(),
            self.object_id
        ))
    }

    /// Idempotently create the workspace directory, returning its path.
    pub fn ensure_workspace(&self) -> Result<PathBuf> {
        let ws = self.workspace();
        fs::create_dir_all(&ws)?;
        Ok(ws)
    }

    /// The deterministic path of a given file kind within this object's
    /// workspace.
    pub fn file_path(&self, kind: FileKind) -> PathBuf {
        self.workspace().join(kind.filename(self.object_type))
    }

    /// Remove the entire workspace directory. This is the only operation
    /// that deletes workspace state; it must be called explicitly.
    pub fn remove_workspace(&self) -> Result<()> {
        let ws = self.workspace();
        if ws.exists() {
            fs::remove_dir_all(&ws)?;
        }
        Ok(())
    }
}

/// Join a workspace-relative path with a sibling object's workspace, for
/// replicating files between two objects that share a parent directory.
pub fn sibling_workspace(parent_directory: &Path, object_type: ObjectType, object_id: ObjectId) -> PathBuf {
    parent_directory.join(format!("{}_{}", object_type.directory_name(), object_id))
}
