//! The persisted ledger of engine-created artifacts.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ImprintError, ImprintResult};
use crate::hash;
use crate::logger::Logger;
use crate::patch::PatchOp;

/// What the registry remembers about one tracked path.
#[derive(Debug, Clone, PartialEq)]
pub enum FileRecord {
    /// Regular file written by the engine, with the fingerprint it had
    /// right after the last engine write.
    PlainFile(String),
    /// Symbolic link created by the engine, with the absolute target it
    /// pointed at.
    SymLink(String),
    /// Data file managed at key level, with the operations that undo the
    /// engine's edits.
    DataFile(Vec<PatchOp>),
}

impl FileRecord {
    pub fn is_data_file(&self) -> bool {
        matches!(self, FileRecord::DataFile(_))
    }

    /// The stored string for the two string-valued kinds.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FileRecord::PlainFile(text) | FileRecord::SymLink(text) => Some(text),
            FileRecord::DataFile(_) => None,
        }
    }
}

impl Serialize for FileRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FileRecord::PlainFile(text) | FileRecord::SymLink(text) => {
                serializer.serialize_str(text)
            }
            FileRecord::DataFile(ops) => ops.serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordRepr {
    Text(String),
    Ops(Vec<PatchOp>),
}

impl<'de> Deserialize<'de> for FileRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // A stored string is either a content hash or a symlink target.
        // The split here is advisory: comparison sites pick hash or target
        // from the kind of node actually on disk.
        Ok(match RecordRepr::deserialize(deserializer)? {
            RecordRepr::Text(text) if hash::is_hash_like(&text) => FileRecord::PlainFile(text),
            RecordRepr::Text(text) => FileRecord::SymLink(text),
            RecordRepr::Ops(ops) => FileRecord::DataFile(ops),
        })
    }
}

/// Persisted record of everything the engine has created in a project.
///
/// Stored as pretty JSON next to the files it describes. An absent file is
/// an empty registry, and the engine deletes the file again once every
/// collection is empty, so a fully reset project carries no residue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Registry {
    /// Data files that did not exist before the engine created them.
    pub created_data_files: Vec<String>,
    /// Directories created by the engine, in creation order.
    pub directories: Vec<String>,
    /// Tracked paths and what the engine knows about each.
    pub files: BTreeMap<String, FileRecord>,
}

impl Registry {
    /// Loads the registry stored at `path`, or the default when no file
    /// exists yet.
    pub fn load(path: &Path) -> ImprintResult<Registry> {
        if !path.exists() {
            return Ok(Registry::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|err| ImprintError::io("read", path.display().to_string(), err))?;
        serde_json::from_str(&content)
            .map_err(|err| ImprintError::parse(path.display().to_string(), err.to_string()))
    }

    /// True when every collection is empty.
    pub fn is_empty(&self) -> bool {
        self.created_data_files.is_empty() && self.directories.is_empty() && self.files.is_empty()
    }

    /// Writes the registry to `path`, or deletes the file when there is
    /// nothing left to record.
    ///
    /// `after_reset` changes how a non-empty registry is reported: leftover
    /// entries after a reset are surfaced at error level so they get looked
    /// at, a normal save logs at info.
    pub fn save(&self, path: &Path, logger: &dyn Logger, after_reset: bool) -> ImprintResult<()> {
        if self.is_empty() {
            if path.exists() {
                fs::remove_file(path)
                    .map_err(|err| ImprintError::io("delete", path.display().to_string(), err))?;
                logger.info(&format!(
                    "Deleted registry file (it is empty): {}",
                    path.display()
                ));
            }
            return Ok(());
        }

        if after_reset {
            logger.error(&format!(
                "Data remains after reset. Review registry: {}",
                path.display()
            ));
        } else {
            logger.info(&format!("Registry saved: {}", path.display()));
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|err| ImprintError::serialize(path.display().to_string(), err.to_string()))?;
        fs::write(path, content).map_err(|err| ImprintError::io("write", path.display().to_string(), err))
    }
}
