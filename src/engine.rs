//! The tracked-mutation engine.
//!
//! [`Imprint`] creates files, directories, symlinks and structured data
//! files inside a project root and records everything it creates in a
//! registry file. Later sessions consult the registry to tell tool-owned
//! content from user content: a path whose recorded fingerprint no longer
//! matches the disk is considered taken over by the user and is skipped,
//! and [`reset`](Imprint::reset) removes whatever still belongs to the
//! tool.

use std::collections::BTreeMap;
use std::fs::{self, Metadata};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::data_object::{DataObject, DataObjectParams};
use crate::error::{ImprintError, ImprintResult};
use crate::format::{self, Format};
use crate::hash;
use crate::logger::{Logger, TracingLogger};
use crate::options::{
    CopyOptions, CreateDirOptions, DataOptions, DeleteDirOptions, DeleteOptions, FileContent,
    ReadOptions, ResetFileOptions, SymlinkOptions, WriteOptions,
};
use crate::registry::{FileRecord, Registry};

/// Everything the safety classifier knows about one project path.
#[derive(Debug)]
pub struct FileDetail {
    /// Whether the path may be created, overwritten or deleted without
    /// discarding a user change.
    pub is_safe: bool,
    /// Metadata of the node itself (its `lstat`), when it exists.
    pub stats: Option<Metadata>,
    /// Resolved target when the node is a symbolic link.
    pub link_target: Option<PathBuf>,
    /// Content fingerprint; absent for directories.
    pub hash: Option<String>,
}

/// Content and format returned by [`Imprint::read_file_detailed`].
#[derive(Debug)]
pub struct ReadDetail {
    /// File content; `None` when the file is missing and no default was
    /// given.
    pub data: Option<FileContent>,
    /// Format the content was parsed from or created in; `None` for raw
    /// text reads.
    pub format: Option<Format>,
}

/// File engine tracking its own artifacts in a registry.
///
/// The project root is the directory holding the registry file. All file
/// arguments are paths relative to that root; source files for copy and
/// symlink operations are relative to the separately configured source
/// root.
pub struct Imprint {
    registry_file: PathBuf,
    root: PathBuf,
    source_root: Option<PathBuf>,
    track: bool,
    registry: Registry,
    data_files: BTreeMap<String, DataObject>,
    logger: Arc<dyn Logger>,
}

impl Imprint {
    /// Opens the engine for the project containing `registry_file`. A
    /// missing registry file means an empty registry; an unreadable or
    /// unparseable one is an error.
    pub fn new<P: Into<PathBuf>>(registry_file: P) -> ImprintResult<Self> {
        let registry_file = registry_file.into();
        let registry = Registry::load(&registry_file)?;
        let root = registry_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            registry_file,
            root,
            source_root: None,
            track: true,
            registry,
            data_files: BTreeMap::new(),
            logger: Arc::new(TracingLogger),
        })
    }

    /// Root that source files are resolved against for copy and symlink
    /// operations, usually the installation directory of the tool itself.
    pub fn with_source_root<P: Into<PathBuf>>(mut self, source_root: P) -> Self {
        self.source_root = Some(source_root.into());
        self
    }

    /// Default tracking mode for operations that do not override it. On by
    /// default.
    pub fn with_track(mut self, track: bool) -> Self {
        self.track = track;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Project root, the directory holding the registry file.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_root(&self) -> Option<&Path> {
        self.source_root.as_deref()
    }

    /// Default tracking mode.
    pub fn track(&self) -> bool {
        self.track
    }

    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    /// Read-only view of the registry as accumulated in this session.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Absolute path of a project-relative path.
    pub fn root_join<P: AsRef<Path>>(&self, rel: P) -> PathBuf {
        self.root.join(rel)
    }

    /// Absolute path of a source-relative path. The source root must have
    /// been configured.
    pub fn source_join<P: AsRef<Path>>(&self, rel: P) -> ImprintResult<PathBuf> {
        match &self.source_root {
            Some(source_root) => Ok(source_root.join(rel)),
            None => Err(ImprintError::invalid_argument(
                "source root is not set, configure it with with_source_root",
            )),
        }
    }

    /// Whether the given project-relative path exists on disk.
    pub fn has_file(&self, rel: &str) -> bool {
        self.root_join(rel).exists()
    }

    /// Whether any of the given project-relative paths exists on disk.
    pub fn has_any_file<I, S>(&self, rels: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        rels.into_iter().any(|rel| self.has_file(rel.as_ref()))
    }

    /// Whether the path is tracked as a data file, either in the registry
    /// or in this session's cache.
    pub fn is_data_file(&self, rel: &str) -> bool {
        self.registry
            .files
            .get(rel)
            .is_some_and(FileRecord::is_data_file)
            || self.data_files.contains_key(rel)
    }

    /// Classifies whether a path is safe to operate on and collects the
    /// evidence callers compare against.
    ///
    /// `force` always wins. Untracked operations only touch paths that do
    /// not exist. Data files are never safe here, because their protection
    /// is per key inside the data object. Every other path is safe when it
    /// is new to both disk and registry, or when its recorded fingerprint
    /// (link target for symlinks, content hash otherwise) still matches the
    /// disk.
    pub fn file_detail(&self, rel: &str, force: bool, track: bool) -> ImprintResult<FileDetail> {
        let abs = self.root_join(rel);
        let record = self.registry.files.get(rel);
        let in_registry = record.is_some();
        let exists = abs.exists();

        let mut detail = FileDetail {
            is_safe: false,
            stats: None,
            link_target: None,
            hash: None,
        };

        if exists {
            let real = fs::canonicalize(&abs)
                .map_err(|err| ImprintError::io("resolve", abs.display().to_string(), err))?;
            let stats = fs::symlink_metadata(&abs)
                .map_err(|err| ImprintError::io("stat", abs.display().to_string(), err))?;
            let is_link = stats.file_type().is_symlink();
            let target_is_dir =
                is_link && fs::metadata(&real).map(|meta| meta.is_dir()).unwrap_or(false);
            if is_link {
                detail.link_target = Some(real);
            }
            if !stats.is_dir() && !target_is_dir {
                detail.hash = Some(self.file_hash(rel)?);
            }
            detail.stats = Some(stats);
        }

        if force {
            detail.is_safe = true;
        } else if !track {
            // Untracked mode never overwrites anything that exists.
            detail.is_safe = !exists;
        } else if self.is_data_file(rel) {
            detail.is_safe = false;
        } else {
            detail.is_safe = detail.stats.is_none() && !in_registry;
            if let (Some(_), Some(record)) = (detail.stats.as_ref(), record) {
                detail.is_safe = match (&detail.link_target, record.as_str()) {
                    (Some(real), Some(recorded)) => Path::new(recorded) == real.as_path(),
                    (None, Some(recorded)) => detail.hash.as_deref() == Some(recorded),
                    _ => false,
                };
            }
        }

        self.logger.debug(&format!(
            "[File Detail] {}: force {}, track {}, in registry {}, exists {}, safe {}",
            rel, force, track, in_registry, exists, detail.is_safe
        ));

        Ok(detail)
    }

    /// Format-aware content hash of a project file. Structured documents
    /// hash by value with the format folded in, source-like files hash
    /// normalized text, so formatting-only differences keep the hash
    /// stable while a format change does not.
    pub fn file_hash(&self, rel: &str) -> ImprintResult<String> {
        hash::file_fingerprint(&self.root_join(rel), rel)
    }

    /// Returns the data object for a structured file, loading or creating
    /// it on first access. The object is cached for the session; repeated
    /// calls return the same instance and [`save`](Self::save) writes its
    /// changes back.
    ///
    /// A path tracked as a regular file so far is promoted to a data file
    /// when the user has not modified it; a modified file is an error, the
    /// ownership would be ambiguous.
    pub fn data_object(&mut self, rel: &str, options: &DataOptions) -> ImprintResult<&mut DataObject> {
        if !self.data_files.contains_key(rel) {
            let object = self.build_data_object(rel, options)?;
            self.data_files.insert(rel.to_owned(), object);
        }
        self.data_files
            .get_mut(rel)
            .ok_or_else(|| ImprintError::not_found(rel))
    }

    fn build_data_object(&mut self, rel: &str, options: &DataOptions) -> ImprintResult<DataObject> {
        let abs = self.root_join(rel);
        let track = options.track.unwrap_or(self.track);

        let operations = match self.registry.files.get(rel) {
            Some(FileRecord::DataFile(ops)) => Some(ops.clone()),
            Some(_) => {
                // Tracked as a whole file so far. Promote only when the
                // user has not modified it; an edited file cannot be
                // converted into a partially resettable structure.
                let detail = self.file_detail(rel, options.force, true)?;
                if !detail.is_safe {
                    return Err(ImprintError::modified(
                        abs.display().to_string(),
                        "already tracked as a regular file and it was changed",
                    ));
                }
                self.logger.info(&format!(
                    "Tracked file changed to tracked data file in registry: {}",
                    abs.display()
                ));
                Some(Vec::new())
            }
            None => None,
        };

        let exists = self.has_file(rel);
        let default_content = options
            .default_content
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()));
        let read_options = ReadOptions {
            create: options.create,
            // Data files are tracked per key, never as whole files.
            track: Some(false),
            force: options.force,
            default_content: Some(FileContent::Data(default_content)),
            error_if_missing: options.error_if_missing,
            parse: true,
            format: options.format,
            create_format: options.create_format,
            serialize: Some(true),
        };
        let detail = self.read_file_detailed(rel, &read_options)?;

        if !exists && !self.registry.created_data_files.iter().any(|path| path == rel) {
            self.registry.created_data_files.push(rel.to_owned());
        }

        let data = match detail.data {
            Some(FileContent::Data(value)) => value,
            Some(FileContent::Text(_)) | None => Value::Object(Map::new()),
        };
        let format = detail
            .format
            .or(options.format)
            .or_else(|| Format::from_extension(&abs))
            .or(options.create_format)
            .unwrap_or(Format::Json);

        Ok(DataObject::new(
            data,
            DataObjectParams {
                track,
                new_created: !exists,
                name: abs.display().to_string(),
                format,
                operations,
                sort_keys: options.sort_keys.clone(),
                logger: Arc::clone(&self.logger),
            },
        ))
    }

    /// Reads a project file and returns its content, or the default when
    /// the file is missing and the options allow that.
    pub fn read_file(&mut self, rel: &str, options: &ReadOptions) -> ImprintResult<Option<FileContent>> {
        Ok(self.read_file_detailed(rel, options)?.data)
    }

    /// Reads a project file, optionally parsing structured content, and
    /// optionally creating the file from the default content when it is
    /// missing.
    pub fn read_file_detailed(&mut self, rel: &str, options: &ReadOptions) -> ImprintResult<ReadDetail> {
        let abs = self.root_join(rel);
        let format = options.format.or_else(|| Format::from_extension(&abs));
        let create_format = options.create_format.or(format).unwrap_or(Format::Json);
        let serialize = options.serialize.unwrap_or(options.parse);

        if self.has_file(rel) {
            let content = fs::read_to_string(&abs)
                .map_err(|err| ImprintError::io("read", abs.display().to_string(), err))?;
            if options.parse {
                let (data, parsed) = format::parse_data(&content, format, rel)?;
                return Ok(ReadDetail {
                    data: Some(FileContent::Data(data)),
                    format: Some(parsed),
                });
            }
            return Ok(ReadDetail {
                data: Some(FileContent::Text(content)),
                format: None,
            });
        }

        if options.create {
            self.logger.verbose(&format!(
                "File does not exist and will be created (create option in effect): {}",
                abs.display()
            ));
            let content = options
                .default_content
                .clone()
                .unwrap_or_else(|| FileContent::Text(String::new()));
            let write_options = WriteOptions {
                force: options.force,
                track: options.track,
                serialize,
                format: Some(format.unwrap_or(create_format)),
                sort_keys: Vec::new(),
            };
            self.write_file(rel, content, &write_options)?;
            return Ok(ReadDetail {
                data: options.default_content.clone(),
                format: serialize.then_some(create_format),
            });
        }

        if options.error_if_missing {
            return Err(ImprintError::not_found(abs.display().to_string()));
        }

        Ok(ReadDetail {
            format: options.default_content.as_ref().map(|_| create_format),
            data: options.default_content.clone(),
        })
    }

    /// Writes content to a project file when the path is safe, creating
    /// parent directories as needed. Tracked writes record the new content
    /// hash in the registry; an unsafe path is skipped with a warning.
    pub fn write_file<C: Into<FileContent>>(
        &mut self,
        rel: &str,
        content: C,
        options: &WriteOptions,
    ) -> ImprintResult<()> {
        let content = content.into();
        if matches!(content, FileContent::Data(Value::Null)) {
            return Err(ImprintError::invalid_argument(
                "file content must not be null, use an empty string instead",
            ));
        }
        if !options.serialize && matches!(content, FileContent::Data(_)) {
            return Err(ImprintError::invalid_argument(
                "content is structured data but the serialize option is off",
            ));
        }

        let track = options.track.unwrap_or(self.track);
        let abs = self.root_join(rel);
        let detail = self.file_detail(rel, options.force, track)?;

        if detail.is_safe {
            let text = match &content {
                FileContent::Text(text) => text.clone(),
                FileContent::Data(value) => {
                    let format = match options.format {
                        Some(format) => format,
                        None => format::detect_format(&abs, rel)?,
                    };
                    format::serialize_data(value, format, &options.sort_keys, rel)?
                }
            };
            if let Some(parent) = abs.parent() {
                fs::create_dir_all(parent).map_err(|err| {
                    ImprintError::io("create directory", parent.display().to_string(), err)
                })?;
            }
            fs::write(&abs, text)
                .map_err(|err| ImprintError::io("write", abs.display().to_string(), err))?;
            if track {
                let hash = self.file_hash(rel)?;
                self.registry
                    .files
                    .insert(rel.to_owned(), FileRecord::PlainFile(hash));
            }
            self.logger.info(&format!(
                "Written file ({}tracked): {}",
                if track { "" } else { "not " },
                abs.display()
            ));
        } else {
            self.logger.warn(&format!(
                "Skipped write file ({}tracked): {}",
                if track { "" } else { "not " },
                abs.display()
            ));
        }

        self.logger.debug(&format!(
            "[Write File] {}: existed {}, force {}, track {}, serialize {}",
            rel,
            detail.stats.is_some(),
            options.force,
            track,
            options.serialize
        ));
        Ok(())
    }

    /// Deletes a project file when safe. The registry entry for the path is
    /// dropped once the operation is found safe, whether or not anything
    /// was on disk. Directories are rejected; those go through
    /// [`delete_dir`](Self::delete_dir).
    pub fn delete_file(&mut self, rel: &str, options: &DeleteOptions) -> ImprintResult<()> {
        let track = options.track.unwrap_or(self.track);
        let abs = self.root_join(rel);
        let detail = if self.has_file(rel) {
            Some(self.file_detail(rel, options.force, track)?)
        } else {
            None
        };

        let is_dir = detail
            .as_ref()
            .and_then(|detail| detail.stats.as_ref())
            .map(Metadata::is_dir)
            .unwrap_or(false);
        if is_dir {
            return Err(ImprintError::invalid_argument(format!(
                "cannot delete a directory with delete_file, use delete_dir: {}",
                abs.display()
            )));
        }

        let is_safe = detail.as_ref().map(|detail| detail.is_safe).unwrap_or(true);
        if is_safe {
            remove_node(&abs)
                .map_err(|err| ImprintError::io("delete", abs.display().to_string(), err))?;
            if options.log {
                self.logger.info(&format!(
                    "Deleted file ({}tracked): {}",
                    if track { "" } else { "not " },
                    abs.display()
                ));
            }
            self.registry.files.remove(rel);
        } else if options.log {
            self.logger.warn(&format!(
                "Skipped delete file ({}tracked): {}",
                if track { "" } else { "not " },
                abs.display()
            ));
        }
        Ok(())
    }

    /// Copies a file from the source tree into the project when the
    /// destination is safe. The recorded hash is computed from the freshly
    /// copied content, not from whatever occupied the path before.
    pub fn copy_file(&mut self, source_rel: &str, rel: &str, options: &CopyOptions) -> ImprintResult<()> {
        let track = options.track.unwrap_or(self.track);
        let source = self.source_join(source_rel)?;
        let destination = self.root_join(rel);
        let detail = self.file_detail(rel, options.force, track)?;

        if detail.is_safe {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).map_err(|err| {
                    ImprintError::io("create directory", parent.display().to_string(), err)
                })?;
            }
            fs::copy(&source, &destination)
                .map_err(|err| ImprintError::io("copy", source.display().to_string(), err))?;
            self.logger.info(&format!(
                "Copied file ({}tracked): {} to {}",
                if track { "" } else { "not " },
                source.display(),
                destination.display()
            ));
            if track {
                let hash = self.file_hash(rel)?;
                self.registry
                    .files
                    .insert(rel.to_owned(), FileRecord::PlainFile(hash));
            }
        } else {
            self.logger.warn(&format!(
                "Skipped copy file ({}tracked): {} to {}",
                if track { "" } else { "not " },
                source.display(),
                destination.display()
            ));
        }
        Ok(())
    }

    /// Creates every missing segment of a directory path. Newly created
    /// tracked segments are recorded one by one, so reset can remove them
    /// individually. The first segment is always logged; deeper segments
    /// follow the `log_dirs` option.
    pub fn create_dir(&mut self, rel: &str, options: &CreateDirOptions) -> ImprintResult<()> {
        let track = options.track.unwrap_or(self.track);
        let mut current = PathBuf::new();
        let mut top_dir = true;

        for component in Path::new(rel).components() {
            if !matches!(component, Component::Normal(_)) {
                continue;
            }
            current.push(component);
            let abs = self.root_join(&current);
            let should_log = top_dir || options.log_dirs;

            if !abs.exists() {
                fs::create_dir(&abs).map_err(|err| {
                    ImprintError::io("create directory", abs.display().to_string(), err)
                })?;
                if should_log {
                    self.logger.info(&format!(
                        "Created directory ({}tracked): {}",
                        if track { "" } else { "not " },
                        abs.display()
                    ));
                }
                if track {
                    self.registry
                        .directories
                        .push(current.to_string_lossy().into_owned());
                }
            } else if should_log {
                self.logger.warn(&format!(
                    "Skipped create directory ({}tracked) (directory exists): {}",
                    if track { "" } else { "not " },
                    abs.display()
                ));
            }
            top_dir = false;
        }
        Ok(())
    }

    /// Deletes a directory tree bottom-up. Files inside go through
    /// [`delete_file`](Self::delete_file), so user content survives unless
    /// forced; each directory is removed only when it ends up empty or
    /// `force` is set, and is then dropped from the registry.
    pub fn delete_dir(&mut self, rel: &str, options: &DeleteDirOptions) -> ImprintResult<()> {
        self.delete_dir_inner(rel, options, true)
    }

    fn delete_dir_inner(&mut self, rel: &str, options: &DeleteDirOptions, top_dir: bool) -> ImprintResult<()> {
        let abs = self.root_join(rel);
        let entries = fs::read_dir(&abs)
            .map_err(|err| ImprintError::io("read directory", abs.display().to_string(), err))?;

        for entry in entries {
            let entry = entry
                .map_err(|err| ImprintError::io("read directory", abs.display().to_string(), err))?;
            let child_rel = Path::new(rel)
                .join(entry.file_name())
                .to_string_lossy()
                .into_owned();
            let file_type = entry.file_type().map_err(|err| {
                ImprintError::io("stat", entry.path().display().to_string(), err)
            })?;
            if file_type.is_dir() {
                self.delete_dir_inner(&child_rel, options, false)?;
            } else {
                let delete_options = DeleteOptions {
                    force: options.force,
                    track: options.track,
                    log: options.log_files,
                };
                self.delete_file(&child_rel, &delete_options)?;
            }
        }

        let should_log = options.log_dirs || top_dir;
        let now_empty = fs::read_dir(&abs)
            .map_err(|err| ImprintError::io("read directory", abs.display().to_string(), err))?
            .next()
            .is_none();

        if options.force || now_empty {
            fs::remove_dir_all(&abs)
                .map_err(|err| ImprintError::io("delete directory", abs.display().to_string(), err))?;
            if should_log {
                self.logger.info(&format!("Deleted directory: {}", abs.display()));
            }
            self.registry.directories.retain(|dir| dir != rel);
        } else if should_log {
            self.logger.warn(&format!("Skipped delete directory: {}", abs.display()));
        }
        Ok(())
    }

    /// Creates a symbolic link in the project pointing at a file in the
    /// source tree. A link that already resolves to the intended target is
    /// left alone; an unsafe path is skipped with a warning. The link on
    /// disk is relative to its own directory, while the registry records
    /// the absolute target.
    pub fn create_symlink(&mut self, source_rel: &str, rel: &str, options: &SymlinkOptions) -> ImprintResult<()> {
        let track = options.track.unwrap_or(self.track);
        let abs = self.root_join(rel);
        let target = self.source_join(source_rel)?;
        let detail = self.file_detail(rel, options.force, track)?;

        if detail.link_target.as_deref() == Some(target.as_path()) {
            self.logger.verbose(&format!(
                "Skipped symbolic link creation (file exists and has same target): {} -> {}",
                target.display(),
                abs.display()
            ));
            return Ok(());
        }
        if !detail.is_safe {
            self.logger.warn(&format!(
                "Skipped symbolic link creation (changed by user): {} -> {}",
                target.display(),
                abs.display()
            ));
            return Ok(());
        }

        let target_meta = fs::symlink_metadata(&target)
            .map_err(|err| ImprintError::io("stat", target.display().to_string(), err))?;
        if detail.stats.is_some() {
            remove_node(&abs)
                .map_err(|err| ImprintError::io("delete", abs.display().to_string(), err))?;
        }
        let link_dir = abs.parent().unwrap_or_else(|| Path::new(""));
        let link_path = relative_path(link_dir, &target);
        symlink(&link_path, &abs, target_meta.is_dir())
            .map_err(|err| ImprintError::io("link", abs.display().to_string(), err))?;
        self.logger.info(&format!(
            "{} symbolic link: {} -> {}",
            if detail.stats.is_some() { "Overwritten" } else { "Created" },
            target.display(),
            abs.display()
        ));
        if track {
            self.registry.files.insert(
                rel.to_owned(),
                FileRecord::SymLink(target.display().to_string()),
            );
        }
        Ok(())
    }

    /// Resets a single path: data files are restored toward their original
    /// content, plain files and symlinks are deleted. A path unknown to
    /// both the registry and the session cache is an error unless the
    /// options downgrade it to a warning.
    pub fn reset_file(&mut self, rel: &str, options: &ResetFileOptions) -> ImprintResult<()> {
        let known = self.registry.files.contains_key(rel) || self.data_files.contains_key(rel);
        if !known {
            let message = format!("{} (not in registry)", self.root_join(rel).display());
            if options.error_if_unknown {
                return Err(ImprintError::not_found(message));
            }
            self.logger.warn(&format!("Cannot reset file: {}", message));
            return Ok(());
        }

        if self.is_data_file(rel) {
            self.reset_data_file(rel)
        } else {
            self.delete_file(rel, &DeleteOptions::default())
        }
    }

    fn reset_data_file(&mut self, rel: &str) -> ImprintResult<()> {
        let abs = self.root_join(rel);

        if !self.data_files.contains_key(rel) && !self.has_file(rel) {
            // Nothing on disk to restore. Drop the stale records instead of
            // failing the whole reset.
            self.logger.warn(&format!(
                "Cannot reset data file (file is missing): {}",
                abs.display()
            ));
            self.registry.files.remove(rel);
            self.registry.created_data_files.retain(|path| path != rel);
            return Ok(());
        }

        self.data_object(rel, &DataOptions::default())?;
        let Some(object) = self.data_files.get_mut(rel) else {
            return Err(ImprintError::not_found(abs.display().to_string()));
        };

        let unapplied = object.reset();
        let clean = unapplied.is_empty();
        let empty_data = object.data() == &Value::Object(Map::new());
        let data = object.data().clone();
        let format = object.format();
        let sort_keys = object.sort_keys().to_vec();
        let was_created = self.registry.created_data_files.iter().any(|path| path == rel);

        if clean && empty_data && was_created {
            remove_node(&abs)
                .map_err(|err| ImprintError::io("delete", abs.display().to_string(), err))?;
            self.registry.created_data_files.retain(|path| path != rel);
            self.logger.info(&format!(
                "Deleted data file after reset (empty object created by imprint): {}",
                abs.display()
            ));
        } else {
            let write_options = WriteOptions {
                force: true,
                track: Some(false),
                serialize: true,
                format: Some(format),
                sort_keys,
            };
            self.write_file(rel, FileContent::Data(data), &write_options)?;
        }

        if clean {
            self.registry.files.remove(rel);
        } else {
            self.logger.warn(&format!(
                "Cannot reset data file (some steps cannot be reset): {}",
                abs.display()
            ));
        }
        Ok(())
    }

    /// Writes every changed data file back to disk, records its reverse
    /// operations in the registry and persists the registry itself. Call
    /// this once work on the project is done.
    pub fn save(&mut self) -> ImprintResult<()> {
        let changed: Vec<_> = self
            .data_files
            .iter()
            .filter(|(_, object)| object.is_changed())
            .map(|(rel, object)| {
                (
                    rel.clone(),
                    object.data().clone(),
                    object.format(),
                    object.sort_keys().to_vec(),
                    object.diff_from_original(true),
                )
            })
            .collect();

        let written_any = !changed.is_empty();
        for (rel, data, format, sort_keys, operations) in changed {
            self.registry
                .files
                .insert(rel.clone(), FileRecord::DataFile(operations));
            let write_options = WriteOptions {
                force: true,
                // Data files are tracked per key, not as whole files.
                track: Some(false),
                serialize: true,
                format: Some(format),
                sort_keys,
            };
            self.write_file(&rel, FileContent::Data(data), &write_options)?;
        }

        self.save_registry(false)?;
        if written_any {
            self.logger.info("Resettable files saved.");
        }
        Ok(())
    }

    /// Undoes the tool's artifacts: resets or deletes every registered
    /// path, removes tracked directories that ended up empty in reverse
    /// creation order, and persists the registry, which deletes itself
    /// when nothing remains.
    ///
    /// Deleted files are not recreated.
    pub fn reset(&mut self) -> ImprintResult<()> {
        self.logger.info("Reset begins.");

        let mut paths: Vec<String> = self.registry.files.keys().cloned().collect();
        for rel in self.data_files.keys() {
            if !self.registry.files.contains_key(rel) {
                paths.push(rel.clone());
            }
        }
        for rel in paths {
            self.reset_file(&rel, &ResetFileOptions::default())?;
        }

        let mut directories = self.registry.directories.clone();
        directories.reverse();
        for dir in directories {
            if !self.root_join(&dir).exists() {
                self.logger.verbose(&format!(
                    "Tracked directory is already gone: {}",
                    self.root_join(&dir).display()
                ));
                self.registry.directories.retain(|tracked| tracked != &dir);
                continue;
            }
            self.delete_dir(&dir, &DeleteDirOptions::default())?;
        }

        self.save_registry(true)?;
        self.logger.info("Reset ends.");
        Ok(())
    }

    fn save_registry(&mut self, after_reset: bool) -> ImprintResult<()> {
        self.registry
            .save(&self.registry_file, self.logger.as_ref(), after_reset)
    }
}

/// Removes whatever node sits at the path: file, symlink or directory
/// tree. Missing paths are fine.
fn remove_node(abs: &Path) -> std::io::Result<()> {
    match fs::symlink_metadata(abs) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(abs),
        Ok(_) => fs::remove_file(abs),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Relative path from the directory `from` to `to`. Both sides must be
/// either absolute or relative to the same base.
fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(left, right)| left == right)
        .count();

    let mut result = PathBuf::new();
    for _ in common..from.len() {
        result.push("..");
    }
    for component in &to[common..] {
        result.push(component);
    }
    result
}

#[cfg(unix)]
fn symlink(link_path: &Path, link: &Path, _target_is_dir: bool) -> std::io::Result<()> {
    std::os::unix::fs::symlink(link_path, link)
}

#[cfg(windows)]
fn symlink(link_path: &Path, link: &Path, target_is_dir: bool) -> std::io::Result<()> {
    if target_is_dir {
        std::os::windows::fs::symlink_dir(link_path, link)
    } else {
        std::os::windows::fs::symlink_file(link_path, link)
    }
}
