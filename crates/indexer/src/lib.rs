//! Background indexing of package-declared connection extensions.
//!
//! Installed packages declare connection types in a DCF resource file; this
//! crate scans the package libraries for those files, assembles a
//! [`berth_registry::ConnectionRegistry`] per scan, and publishes it
//! atomically for concurrent readers. Rebuilds run one at a time and
//! coalesce concurrent requests; console input that mutates the library
//! (package installs, `load_all`) triggers a debounced, idle-gated rebuild.
//!
//! [`ConnectionIndexer`] is the host-facing service; hosts typically call
//! [`ConnectionIndexer::refresh`] once at startup and then feed console
//! lines to [`ConnectionIndexer::observe_console_input`].

mod config;
mod console;
mod dev;
mod scan;
mod service;

pub use config::IndexConfig;
pub use dev::{DevPackage, DevWorkspace, InactiveWorkspace, StaticWorkspace, dev_extension_file};
pub use scan::{EXTENSION_RESOURCE, LibraryScanner, PackageScanner};
pub use service::{ConnectionIndexer, IndexerBuilder};
