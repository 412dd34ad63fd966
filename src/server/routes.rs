//! Request routing and the mapping from catalog errors to responses.

use std::path::Path;
use std::sync::Arc;
use tracing::{error, warn};

use crate::catalog::{Catalog, LocatorError, codec, locator};

use super::http::{Body, Method, Request, Response, Status};
use super::pages;

/// Cache directive for page images (about 23.5 hours).
pub const PAGE_CACHE_CONTROL: &str = "max-age=84600, public";

#[derive(Debug, Clone, Copy)]
enum Route {
    Listing,
    Viewer,
    Page,
}

/// The request handler shared by every connection.
pub struct App {
    catalog: Arc<Catalog>,
    router: matchit::Router<Route>,
}

impl App {
    pub fn new(catalog: Arc<Catalog>) -> Result<Self, matchit::InsertError> {
        let mut router = matchit::Router::new();
        router.insert("/", Route::Listing)?;
        router.insert("/{id}", Route::Viewer)?;
        router.insert("/{id}/{index}", Route::Page)?;
        Ok(Self { catalog, router })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn handle(&self, request: &Request) -> Response {
        if let Method::Other(method) = &request.method {
            return Response::error(Status::MethodNotAllowed, method).header("Allow", "GET, HEAD");
        }

        let Ok(matched) = self.router.at(&request.path) else {
            return Response::error(Status::NotFound, "no such route");
        };
        let id = matched.params.get("id").unwrap_or_default();

        match matched.value {
            Route::Listing => Response::html(pages::listing(&self.catalog).into_string()),
            Route::Viewer => self.viewer(id),
            Route::Page => {
                let index = matched.params.get("index").unwrap_or_default();
                self.page(id, index).await
            }
        }
    }

    fn viewer(&self, id: &str) -> Response {
        match self.catalog.lookup(id) {
            Ok(entry) => Response::html(pages::viewer(id, entry).into_string()),
            Err(err) => Response::error(Status::NotFound, err),
        }
    }

    async fn page(&self, id: &str, index: &str) -> Response {
        let index = match parse_index(index) {
            Ok(Some(index)) => index,
            Ok(None) => return Response::error(Status::NotFound, "page index out of range"),
            Err(()) => return Response::error(Status::BadRequest, "page index must be an integer"),
        };
        let path = match codec::decode(id) {
            Ok(path) => path,
            Err(err) => return Response::error(Status::BadRequest, err),
        };
        // Only archives found at startup are served.
        if let Err(err) = self.catalog.lookup(id) {
            return Response::error(Status::NotFound, err);
        }

        match locator::open_entry(&path, index).await {
            Ok(stream) => {
                let content_type = content_type(&stream.entry().file_name);
                Response::new(Status::Ok)
                    .header("Content-Type", content_type)
                    .header("Cache-Control", PAGE_CACHE_CONTROL)
                    .body(Body::Entry(stream))
            }
            Err(LocatorError::OutOfRange { .. }) => {
                Response::error(Status::NotFound, "page index out of range")
            }
            Err(err @ LocatorError::Missing(_)) => {
                warn!(index, error = %err, "archive vanished since indexing");
                Response::error(Status::NotFound, "archive not found")
            }
            Err(err) => {
                error!(path = %path.display(), index, error = %err, "cannot open page");
                Response::error(Status::InternalServerError, "cannot read archive")
            }
        }
    }
}

/// Parse a page index segment.
///
/// `Ok(None)` for integers that cannot be an index (negative or too
/// large), `Err(())` for anything that is not an integer at all.
fn parse_index(raw: &str) -> Result<Option<usize>, ()> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(());
    }
    if raw.starts_with('-') {
        return Ok(None);
    }
    Ok(raw.parse().ok())
}

/// Response content type for an entry, by extension.
pub fn content_type(entry_name: &str) -> &'static str {
    let ext = Path::new(entry_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}
