use std::path::{Path, PathBuf};

/// Source-layout prefix for package resources that installation would
/// place at the package root.
const SOURCE_RESOURCE_PREFIX: &str = "inst";

/// A workspace currently loaded as a package under development.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevPackage {
	/// Declared package name.
	pub name: String,
	/// Workspace root directory.
	pub root: PathBuf,
}

/// Probe for the host's live package-development state.
///
/// When a workspace is loaded as a package under development, its own
/// extension file is merged at the end of every rebuild so the in-progress
/// package shows up without being installed.
pub trait DevWorkspace: Send + Sync + 'static {
	/// The package under development, if development mode is active.
	fn current(&self) -> Option<DevPackage>;
}

/// Probe for hosts that never enter development mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct InactiveWorkspace;

impl DevWorkspace for InactiveWorkspace {
	fn current(&self) -> Option<DevPackage> {
		None
	}
}

/// Probe reporting a fixed development package.
#[derive(Debug, Clone)]
pub struct StaticWorkspace {
	package: DevPackage,
}

impl StaticWorkspace {
	pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
		Self {
			package: DevPackage {
				name: name.into(),
				root: root.into(),
			},
		}
	}
}

impl DevWorkspace for StaticWorkspace {
	fn current(&self) -> Option<DevPackage> {
		Some(self.package.clone())
	}
}

/// Where a source-layout workspace keeps its extension file.
pub fn dev_extension_file(root: &Path) -> PathBuf {
	root.join(SOURCE_RESOURCE_PREFIX).join(crate::scan::EXTENSION_RESOURCE)
}
