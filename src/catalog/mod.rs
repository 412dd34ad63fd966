//! The archive catalog and on-demand entry access.
//!
//! - [`indexer`] scans the archive root once at startup
//! - [`codec`] maps archive paths to URL-safe identifiers and back
//! - [`store`] holds the resulting read-only [`Catalog`]
//! - [`locator`] opens a single entry of an archive per request

pub mod codec;
pub mod indexer;
pub mod locator;
pub mod store;

pub use codec::CodecError;
pub use indexer::{IndexError, IndexPolicy, IndexReport, SkippedArchive, index};
pub use locator::{LocatorError, open_entry};
pub use store::{Catalog, CatalogEntry, LookupError, Page};
