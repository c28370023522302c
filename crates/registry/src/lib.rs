//! Connection registry model and its atomically published snapshot.
//!
//! [`ConnectionRegistry`] is the immutable product of one full library scan.
//! It is assembled privately by the scan and handed to a
//! [`PublishedRegistry`], the shared cell readers load complete snapshots
//! from without ever blocking on a scan in progress.

mod entry;
mod published;
mod registry;

pub use entry::ConnectionEntry;
pub use published::PublishedRegistry;
pub use registry::ConnectionRegistry;
