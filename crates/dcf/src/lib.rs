//! DCF-style record parsing for connection extension files.
//!
//! Packages declare connection types in a plain-text description file made of
//! record blocks. A block is a run of `Field: value` lines; a line starting
//! with whitespace continues the previous field; one or more blank lines end
//! the block. [`split_blocks`] isolates the blocks of a file and
//! [`parse_block`] turns one block into a [`FieldMap`].

mod error;

pub use error::{DcfError, Result};

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// Parsed fields of one record block, keyed by field name (case preserved).
pub type FieldMap = BTreeMap<String, String>;

/// Runs of one-or-more blank lines delimit record blocks. CRLF input is
/// handled without a separate normalization pass.
static BLOCK_DELIMITER: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?:\r?\n){2,}").expect("static block delimiter pattern"));

/// Splits file contents into contiguous non-empty record blocks.
///
/// Whitespace-only blocks are dropped, so leading or trailing blank runs
/// never produce empty blocks.
pub fn split_blocks(contents: &str) -> Vec<&str> {
	BLOCK_DELIMITER
		.split(contents)
		.filter(|block| !block.trim().is_empty())
		.collect()
}

/// Parses one record block into its field map.
///
/// Later occurrences of a field within the same block overwrite earlier
/// ones. Field names are matched case-sensitively by consumers, so the case
/// of each name is preserved as written.
pub fn parse_block(block: &str) -> Result<FieldMap> {
	let mut fields = FieldMap::new();
	let mut current: Option<String> = None;

	for (idx, raw) in block.lines().enumerate() {
		let line = idx + 1;
		if raw.trim().is_empty() {
			continue;
		}
		if raw.starts_with([' ', '\t']) {
			let Some(name) = current.as_deref() else {
				return Err(DcfError::OrphanContinuation { line });
			};
			let folded = raw.trim();
			if let Some(value) = fields.get_mut(name) {
				if !value.is_empty() {
					value.push('\n');
				}
				value.push_str(folded);
			}
		} else {
			let Some((name, value)) = raw.split_once(':') else {
				return Err(DcfError::MissingSeparator { line });
			};
			let name = name.trim();
			if name.is_empty() {
				return Err(DcfError::EmptyFieldName { line });
			}
			fields.insert(name.to_string(), value.trim().to_string());
			current = Some(name.to_string());
		}
	}

	Ok(fields)
}
