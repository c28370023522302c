use std::time::Duration;

use serde::Deserialize;

/// Runtime configuration for the connections index.
///
/// All fields have defaults, so hosts can layer this into their own config
/// files and omit what they do not care about.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
	/// Whether package-driven features, including console triggers, are
	/// enabled. When disabled, observed console input is ignored.
	pub packages_enabled: bool,
	/// Quiet period, in milliseconds, between a console trigger and the
	/// rebuild it schedules. The triggering command has not taken effect
	/// yet when its text is observed, so the rebuild must wait it out.
	pub rebuild_delay_ms: u64,
}

impl IndexConfig {
	pub fn rebuild_delay(&self) -> Duration {
		Duration::from_millis(self.rebuild_delay_ms)
	}
}

impl Default for IndexConfig {
	fn default() -> Self {
		Self {
			packages_enabled: true,
			rebuild_delay_ms: 1_000,
		}
	}
}
