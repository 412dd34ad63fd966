//! # zipshelf
//!
//! Serve a directory of zip image archives (comic and manga volumes, photo
//! sets) for page-by-page viewing in a browser.
//!
//! At startup every `.zip`/`.cbz` under the data directory is indexed into
//! an in-memory [`Catalog`]. Archives are addressed by an opaque,
//! reversible identifier derived from their path; individual pages are
//! streamed straight out of the archive on each request, without
//! extracting anything else.
//!
//! ## Routes
//!
//! - `GET /`: listing of all archives with their page counts
//! - `GET /{id}`: viewer for one archive
//! - `GET /{id}/{index}`: raw bytes of entry `index`
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use zipshelf::catalog::{self, IndexPolicy};
//! use zipshelf::server::{App, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let report = catalog::index(Path::new("data"), IndexPolicy::BestEffort).await?;
//!     let app = Arc::new(App::new(Arc::new(report.catalog))?);
//!
//!     let server = Server::bind(ServerConfig::default()).await?;
//!     server
//!         .serve(app, async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```

pub mod catalog;
pub mod cli;
pub mod io;
pub mod server;
pub mod zip;

#[cfg(test)]
mod test_helpers;

pub use catalog::{Catalog, CatalogEntry};
pub use cli::Cli;
pub use io::{LocalFileReader, ReadAt};
pub use zip::{EntryStream, ZipError, ZipParser};
