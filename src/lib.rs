//! Imprint Tracked-Mutation Engine
//!
//! This crate lets project scaffolding tools create files, directories,
//! symlinks and structured data files while recording everything in a
//! registry, so that later runs can tell tool-owned content from user
//! content, refuse to clobber user changes, and undo their own artifacts
//! on demand.
//!
//! ```no_run
//! use imprint::{Imprint, WriteOptions};
//!
//! fn main() -> imprint::ImprintResult<()> {
//!     let mut project = Imprint::new("my-project/.imprint-registry.json")?;
//!     project.write_file("LICENSE", "MIT", &WriteOptions::new())?;
//!     project.save()
//! }
//! ```

pub mod data_object;
pub mod engine;
pub mod error;
pub mod format;
pub mod hash;
pub mod keypath;
pub mod logger;
pub mod options;
pub mod patch;
pub mod registry;

// Re-export commonly used types
pub use data_object::DataObject;
pub use engine::{FileDetail, Imprint, ReadDetail};
pub use error::{ImprintError, ImprintResult};
pub use format::Format;
pub use keypath::KeyPath;
pub use logger::{Logger, NullLogger, TracingLogger};
pub use options::{
    CopyOptions, CreateDirOptions, DataOptions, DeleteDirOptions, DeleteOptions, FileContent,
    ReadOptions, ResetFileOptions, SymlinkOptions, WriteOptions,
};
pub use patch::PatchOp;
pub use registry::{FileRecord, Registry};
