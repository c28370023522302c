//! Error types for record-block parsing.

use thiserror::Error;

/// Errors that can occur when parsing one record block.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DcfError {
	/// A field line has no `:` separator.
	#[error("line {line}: field line without ':' separator")]
	MissingSeparator {
		/// 1-based line number within the block.
		line: usize,
	},

	/// A continuation line appeared before any field line.
	#[error("line {line}: continuation line with no preceding field")]
	OrphanContinuation {
		/// 1-based line number within the block.
		line: usize,
	},

	/// A field line has an empty name before the separator.
	#[error("line {line}: empty field name")]
	EmptyFieldName {
		/// 1-based line number within the block.
		line: usize,
	},
}

/// Convenience alias for parse results.
pub type Result<T> = std::result::Result<T, DcfError>;
