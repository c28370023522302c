use std::collections::BTreeMap;
use std::path::Path;

use berth_dcf::FieldMap;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::entry::{ConnectionEntry, registry_key};

/// Record field that names a connection within its block.
const NAME_FIELD: &str = "Name";

/// Collection of connection entries discovered by one library scan.
///
/// A registry is mutated only while the scan that owns it is assembling it.
/// Once published it is read-only; every consumer sees either this finished
/// registry or the one that replaces it, never an intermediate state.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
	entries: BTreeMap<String, ConnectionEntry>,
}

impl ConnectionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts an entry, overwriting any previous entry under the same key.
	pub fn insert(&mut self, entry: ConnectionEntry) {
		self.entries.insert(entry.key(), entry);
	}

	/// Builds and inserts an entry from a parsed record block.
	///
	/// Records without a `Name` field, or with an empty one, are dropped.
	/// Returns whether an entry was inserted.
	pub fn insert_fields(&mut self, package: &str, fields: &FieldMap) -> bool {
		match fields.get(NAME_FIELD).filter(|name| !name.is_empty()) {
			Some(name) => {
				self.insert(ConnectionEntry::new(name, package));
				true
			}
			None => {
				trace!(package, "registry.record.unnamed");
				false
			}
		}
	}

	/// Merges every record block of one extension file into the registry.
	///
	/// Unreadable files and malformed blocks are logged and skipped; the
	/// remaining blocks still merge. Returns the number of records merged.
	pub fn merge_extension_file(&mut self, package: &str, path: &Path) -> usize {
		let contents = match std::fs::read_to_string(path) {
			Ok(contents) => contents,
			Err(error) => {
				warn!(package, path = %path.display(), %error, "registry.file.unreadable");
				return 0;
			}
		};

		let mut merged = 0;
		for block in berth_dcf::split_blocks(&contents) {
			match berth_dcf::parse_block(block) {
				Ok(fields) => {
					if self.insert_fields(package, &fields) {
						merged += 1;
					}
				}
				Err(error) => {
					warn!(package, path = %path.display(), %error, "registry.block.malformed");
				}
			}
		}
		debug!(package, path = %path.display(), merged, "registry.file.merged");
		merged
	}

	pub fn contains(&self, package: &str, name: &str) -> bool {
		self.entries.contains_key(&registry_key(package, name))
	}

	pub fn get(&self, package: &str, name: &str) -> Option<&ConnectionEntry> {
		self.entries.get(&registry_key(package, name))
	}

	/// Entries in key order.
	pub fn entries(&self) -> impl Iterator<Item = &ConnectionEntry> {
		self.entries.values()
	}

	/// Structured snapshot form: an object keyed `package::name` whose
	/// values are each entry's structured form.
	pub fn to_json(&self) -> Value {
		let connections: serde_json::Map<String, Value> = self
			.entries
			.iter()
			.map(|(key, entry)| (key.clone(), entry.to_json()))
			.collect();
		Value::Object(connections)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
