use serde::Serialize;
use serde_json::{Value, json};

/// One connection type contributed by an installed package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionEntry {
	/// Declared connection name (the `Name` field of its record block).
	pub name: String,
	/// Package that contributed the record.
	pub package: String,
}

impl ConnectionEntry {
	pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			package: package.into(),
		}
	}

	/// Synthetic registry key, `package::name`.
	pub fn key(&self) -> String {
		registry_key(&self.package, &self.name)
	}

	/// Structured form used in the published snapshot payload.
	pub fn to_json(&self) -> Value {
		json!({
			"name": self.name,
			"package": self.package,
		})
	}
}

/// Key format shared by inserts and lookups.
pub(crate) fn registry_key(package: &str, name: &str) -> String {
	format!("{package}::{name}")
}
