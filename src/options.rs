//! Option structs for engine operations.
//!
//! Every operation takes a small options struct with chainable `with_*`
//! setters, so call sites only spell out what differs from the defaults.
//! `track` fields are `Option<bool>`: `None` inherits the engine default
//! set at construction.

use serde_json::Value;

use crate::format::Format;
use crate::keypath::KeyPath;

/// Content handled by write and read operations: raw text written verbatim,
/// or structured data to be serialized.
#[derive(Debug, Clone, PartialEq)]
pub enum FileContent {
    Text(String),
    Data(Value),
}

impl FileContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FileContent::Text(text) => Some(text),
            FileContent::Data(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&Value> {
        match self {
            FileContent::Data(data) => Some(data),
            FileContent::Text(_) => None,
        }
    }
}

impl From<&str> for FileContent {
    fn from(text: &str) -> Self {
        FileContent::Text(text.to_owned())
    }
}

impl From<String> for FileContent {
    fn from(text: String) -> Self {
        FileContent::Text(text)
    }
}

impl From<Value> for FileContent {
    fn from(data: Value) -> Self {
        FileContent::Data(data)
    }
}

/// Options for [`Imprint::write_file`](crate::Imprint::write_file).
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Write even when the path is not safe to touch.
    pub force: bool,
    pub track: Option<bool>,
    /// Accept structured content and serialize it before writing.
    pub serialize: bool,
    /// Serialization format; resolved from the path when absent.
    pub format: Option<Format>,
    /// Paths whose object keys are sorted before serialization.
    pub sort_keys: Vec<KeyPath>,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_track(mut self, track: bool) -> Self {
        self.track = Some(track);
        self
    }

    pub fn with_serialize(mut self, serialize: bool) -> Self {
        self.serialize = serialize;
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_sort_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<KeyPath>,
    {
        self.sort_keys = keys.into_iter().map(Into::into).collect();
        self
    }
}

/// Options for [`Imprint::read_file`](crate::Imprint::read_file) and
/// [`Imprint::read_file_detailed`](crate::Imprint::read_file_detailed).
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Create the file when it does not exist.
    pub create: bool,
    pub track: Option<bool>,
    /// Create even when the missing path is not safe (registered but gone).
    pub force: bool,
    /// Content written and returned when the file is missing.
    pub default_content: Option<FileContent>,
    /// Report a missing file as an error instead of returning the default.
    /// On by default.
    pub error_if_missing: bool,
    /// Parse the content into structured data.
    pub parse: bool,
    pub format: Option<Format>,
    /// Format for newly created files when none can be resolved from the
    /// path.
    pub create_format: Option<Format>,
    /// Serialize the default content when creating; follows `parse` when
    /// unset.
    pub serialize: Option<bool>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            create: false,
            track: None,
            force: false,
            default_content: None,
            error_if_missing: true,
            parse: false,
            format: None,
            create_format: None,
            serialize: None,
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    pub fn with_track(mut self, track: bool) -> Self {
        self.track = Some(track);
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_default_content<C: Into<FileContent>>(mut self, content: C) -> Self {
        self.default_content = Some(content.into());
        self
    }

    pub fn with_error_if_missing(mut self, error_if_missing: bool) -> Self {
        self.error_if_missing = error_if_missing;
        self
    }

    pub fn with_parse(mut self, parse: bool) -> Self {
        self.parse = parse;
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_create_format(mut self, format: Format) -> Self {
        self.create_format = Some(format);
        self
    }

    pub fn with_serialize(mut self, serialize: bool) -> Self {
        self.serialize = Some(serialize);
        self
    }
}

/// Options for [`Imprint::data_object`](crate::Imprint::data_object).
#[derive(Debug, Clone)]
pub struct DataOptions {
    /// Create the file when it does not exist.
    pub create: bool,
    /// Document written when the file is created; empty object by default.
    pub default_content: Option<Value>,
    /// Report a missing file as an error instead of starting empty. On by
    /// default.
    pub error_if_missing: bool,
    pub format: Option<Format>,
    pub create_format: Option<Format>,
    pub track: Option<bool>,
    pub force: bool,
    /// Paths whose object keys are sorted whenever the document is written
    /// back.
    pub sort_keys: Vec<KeyPath>,
}

impl Default for DataOptions {
    fn default() -> Self {
        Self {
            create: false,
            default_content: None,
            error_if_missing: true,
            format: None,
            create_format: None,
            track: None,
            force: false,
            sort_keys: Vec::new(),
        }
    }
}

impl DataOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    pub fn with_default_content(mut self, content: Value) -> Self {
        self.default_content = Some(content);
        self
    }

    pub fn with_error_if_missing(mut self, error_if_missing: bool) -> Self {
        self.error_if_missing = error_if_missing;
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_create_format(mut self, format: Format) -> Self {
        self.create_format = Some(format);
        self
    }

    pub fn with_track(mut self, track: bool) -> Self {
        self.track = Some(track);
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_sort_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<KeyPath>,
    {
        self.sort_keys = keys.into_iter().map(Into::into).collect();
        self
    }
}

/// Options for [`Imprint::delete_file`](crate::Imprint::delete_file).
#[derive(Debug, Clone)]
pub struct DeleteOptions {
    pub force: bool,
    pub track: Option<bool>,
    /// Log the outcome; reset internals switch this off for bulk work.
    pub log: bool,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            force: false,
            track: None,
            log: true,
        }
    }
}

impl DeleteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_track(mut self, track: bool) -> Self {
        self.track = Some(track);
        self
    }

    pub fn with_log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }
}

/// Options for [`Imprint::copy_file`](crate::Imprint::copy_file).
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    pub force: bool,
    pub track: Option<bool>,
}

impl CopyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_track(mut self, track: bool) -> Self {
        self.track = Some(track);
        self
    }
}

/// Options for [`Imprint::create_symlink`](crate::Imprint::create_symlink).
#[derive(Debug, Clone, Default)]
pub struct SymlinkOptions {
    pub force: bool,
    pub track: Option<bool>,
}

impl SymlinkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_track(mut self, track: bool) -> Self {
        self.track = Some(track);
        self
    }
}

/// Options for [`Imprint::create_dir`](crate::Imprint::create_dir).
#[derive(Debug, Clone)]
pub struct CreateDirOptions {
    pub track: Option<bool>,
    /// Log every created segment, not only the first.
    pub log_dirs: bool,
}

impl Default for CreateDirOptions {
    fn default() -> Self {
        Self {
            track: None,
            log_dirs: true,
        }
    }
}

impl CreateDirOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track(mut self, track: bool) -> Self {
        self.track = Some(track);
        self
    }

    pub fn with_log_dirs(mut self, log_dirs: bool) -> Self {
        self.log_dirs = log_dirs;
        self
    }
}

/// Options for [`Imprint::delete_dir`](crate::Imprint::delete_dir).
#[derive(Debug, Clone)]
pub struct DeleteDirOptions {
    /// Delete contents and the directory even when not empty.
    pub force: bool,
    pub track: Option<bool>,
    /// Log per-file delete outcomes inside the tree.
    pub log_files: bool,
    /// Log per-directory outcomes below the requested one.
    pub log_dirs: bool,
}

impl Default for DeleteDirOptions {
    fn default() -> Self {
        Self {
            force: false,
            track: None,
            log_files: true,
            log_dirs: true,
        }
    }
}

impl DeleteDirOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_track(mut self, track: bool) -> Self {
        self.track = Some(track);
        self
    }

    pub fn with_log_files(mut self, log_files: bool) -> Self {
        self.log_files = log_files;
        self
    }

    pub fn with_log_dirs(mut self, log_dirs: bool) -> Self {
        self.log_dirs = log_dirs;
        self
    }
}

/// Options for [`Imprint::reset_file`](crate::Imprint::reset_file).
#[derive(Debug, Clone)]
pub struct ResetFileOptions {
    /// Report a path unknown to the registry as an error instead of a
    /// warning. On by default.
    pub error_if_unknown: bool,
}

impl Default for ResetFileOptions {
    fn default() -> Self {
        Self {
            error_if_unknown: true,
        }
    }
}

impl ResetFileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_if_unknown(mut self, error_if_unknown: bool) -> Self {
        self.error_if_unknown = error_if_unknown;
        self
    }
}
