//! HTML for the listing and viewer pages.

use maud::{DOCTYPE, Markup, html};

use crate::catalog::{Catalog, CatalogEntry};

const CSS: &str = "\
body{margin:0;background:#111;color:#ddd;font-family:sans-serif}\
header{padding:.75rem 1rem;background:#1b1b1b}\
a{color:#8cf;text-decoration:none}\
table{border-collapse:collapse;margin:1rem}\
td{padding:.25rem .75rem}\
td.count{text-align:right;color:#999}\
.pages{display:flex;flex-direction:column;align-items:center}\
.pages img{display:block;max-width:100%;margin:0 auto .5rem}";

/// Renders the base HTML document structure
fn base_document(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (CSS) }
            }
            body {
                (content)
            }
        }
    }
}

/// Every archive in the catalog with its page count.
pub fn listing(catalog: &Catalog) -> Markup {
    let content = html! {
        header { "Archives (" (catalog.len()) ")" }
        @if catalog.is_empty() {
            p { "No archives found." }
        } @else {
            table {
                @for (id, entry) in catalog.all() {
                    tr {
                        td { a href={ "/" (id) } { (entry.name) } }
                        td.count { (entry.entry_count()) " pages" }
                    }
                }
            }
        }
    };
    base_document("Archives", content)
}

/// All pages of one archive, top to bottom.
pub fn viewer(id: &str, entry: &CatalogEntry) -> Markup {
    let content = html! {
        header {
            a href="/" { "Archives" }
            " / " (entry.name) " (" (entry.entry_count()) " pages)"
        }
        div.pages {
            @for page in &entry.pages {
                img src={ "/" (id) "/" (page.index) } alt=(page.name) title=(page.name) loading="lazy";
            }
        }
    };
    base_document(&entry.name, content)
}
