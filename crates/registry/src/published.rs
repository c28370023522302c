use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::registry::ConnectionRegistry;

/// Shared cell holding the most recently published [`ConnectionRegistry`].
///
/// Readers load the current snapshot without blocking; the index job
/// replaces it with a single pointer swap. A superseded snapshot stays
/// valid for any reader that already loaded it.
pub struct PublishedRegistry {
	snap: ArcSwap<ConnectionRegistry>,
}

impl PublishedRegistry {
	/// Creates a cell holding an empty registry.
	pub fn new() -> Self {
		Self {
			snap: ArcSwap::from_pointee(ConnectionRegistry::new()),
		}
	}

	/// Loads the current snapshot.
	pub fn load(&self) -> Arc<ConnectionRegistry> {
		self.snap.load_full()
	}

	/// Publishes a finished registry, replacing the current snapshot.
	///
	/// Only the index job publishes; readers never store. Returns the
	/// snapshot just published.
	pub fn publish(&self, registry: ConnectionRegistry) -> Arc<ConnectionRegistry> {
		let next = Arc::new(registry);
		self.snap.store(Arc::clone(&next));
		next
	}
}

impl Default for PublishedRegistry {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::entry::ConnectionEntry;

	#[test]
	fn starts_empty() {
		let published = PublishedRegistry::new();
		assert!(published.load().is_empty());
	}

	#[test]
	fn publish_replaces_the_snapshot() {
		let published = PublishedRegistry::new();
		let mut registry = ConnectionRegistry::new();
		registry.insert(ConnectionEntry::new("odbc", "pkg"));
		published.publish(registry);

		assert_eq!(published.load().len(), 1);
		assert!(published.load().contains("pkg", "odbc"));
	}

	#[test]
	fn prior_snapshot_stays_valid_after_publish() {
		let published = PublishedRegistry::new();
		let mut registry = ConnectionRegistry::new();
		registry.insert(ConnectionEntry::new("odbc", "pkg"));
		published.publish(registry);

		let held = published.load();
		published.publish(ConnectionRegistry::new());

		// The reader that loaded before the swap keeps its complete view.
		assert_eq!(held.len(), 1);
		assert!(published.load().is_empty());
	}
}
