use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error};

/// Extension file path relative to an installed package's directory.
pub const EXTENSION_RESOURCE: &str = "berth/connections.dcf";

/// Enumerates extension-description files across the package library.
#[async_trait]
pub trait PackageScanner: Send + Sync + 'static {
	/// Runs one full enumeration, invoking `emit(package, file)` for every
	/// discovered extension file.
	async fn scan(&self, emit: &mut (dyn FnMut(String, PathBuf) + Send));
}

/// Scans installed-package libraries on the filesystem.
///
/// Every immediate subdirectory of a library path is one installed
/// package; a package participates when it contains the extension
/// resource file. Directory walks run on the blocking pool, one library
/// path at a time.
#[derive(Debug, Clone)]
pub struct LibraryScanner {
	library_paths: Vec<PathBuf>,
}

impl LibraryScanner {
	pub fn new(library_paths: Vec<PathBuf>) -> Self {
		Self { library_paths }
	}
}

#[async_trait]
impl PackageScanner for LibraryScanner {
	async fn scan(&self, emit: &mut (dyn FnMut(String, PathBuf) + Send)) {
		for library in &self.library_paths {
			let library = library.clone();
			match berth_worker::spawn_blocking(move || scan_library(&library)).await {
				Ok(found) => {
					for (package, file) in found {
						emit(package, file);
					}
				}
				Err(error) => {
					error!(%error, "index.scan.walk_lost");
				}
			}
		}
	}
}

/// Walks one library directory for packages declaring connection
/// extensions. Sorted by package name so scan order does not depend on
/// directory iteration order.
fn scan_library(library: &Path) -> Vec<(String, PathBuf)> {
	let entries = match std::fs::read_dir(library) {
		Ok(entries) => entries,
		Err(error) => {
			debug!(library = %library.display(), %error, "index.scan.library_unreadable");
			return Vec::new();
		}
	};

	let mut found = Vec::new();
	for entry in entries.flatten() {
		let path = entry.path();
		if !path.is_dir() {
			continue;
		}
		let Some(package) = path.file_name().and_then(|name| name.to_str()) else {
			continue;
		};
		let file = path.join(EXTENSION_RESOURCE);
		if file.is_file() {
			found.push((package.to_string(), file));
		}
	}
	found.sort();
	found
}
