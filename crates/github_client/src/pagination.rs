//! Cursor pagination accumulation.
//!
//! GitHub's GraphQL connections return at most [`PAGE_SIZE`] nodes per request together with a
//! continuation cursor. Diffing against a partial collection would treat the missing tail as
//! removed, so every paginated read in this crate drains the connection completely before
//! returning.

use std::future::Future;

use tracing::debug;

use crate::Error;

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;

/// Number of nodes requested per page.
pub const PAGE_SIZE: u32 = 100;

/// One page of a cursor-paginated connection.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub nodes: Vec<T>,
    /// Whether the server reports another page after this one
    pub has_next_page: bool,
    /// Cursor to request the following page with
    pub end_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Creates the final page of a connection.
    pub fn last(nodes: Vec<T>) -> Self {
        Self {
            nodes,
            has_next_page: false,
            end_cursor: None,
        }
    }

    /// Creates a page that is followed by the page at `cursor`.
    pub fn with_next(nodes: Vec<T>, cursor: impl Into<String>) -> Self {
        Self {
            nodes,
            has_next_page: true,
            end_cursor: Some(cursor.into()),
        }
    }
}

/// Requests pages until the server reports no further page and returns every node in order.
///
/// `fetch_page` receives `None` for the first page and the previous page's end cursor after
/// that. Any error aborts the drain; no partial collection is ever returned.
///
/// # Errors
///
/// Returns the first error produced by `fetch_page`, or [`Error::InvalidResponse`] if a page
/// claims a successor but carries no cursor.
///
/// # Examples
///
/// ```rust
/// use github_client::{collect_all_pages, Page};
///
/// # async fn example() -> Result<(), github_client::Error> {
/// let nodes = collect_all_pages(|cursor| async move {
///     Ok(match cursor.as_deref() {
///         None => Page::with_next(vec![1, 2], "c1"),
///         Some(_) => Page::last(vec![3]),
///     })
/// })
/// .await?;
///
/// assert_eq!(nodes, vec![1, 2, 3]);
/// # Ok(())
/// # }
/// ```
pub async fn collect_all_pages<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, Error>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, Error>>,
{
    let mut nodes = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = fetch_page(cursor.take()).await?;
        pages += 1;
        nodes.extend(page.nodes);

        if !page.has_next_page {
            break;
        }

        match page.end_cursor {
            Some(next) => cursor = Some(next),
            None => {
                return Err(Error::InvalidResponse(format!(
                    "page {} reported a next page without an end cursor",
                    pages
                )))
            }
        }
    }

    debug!(pages = pages, nodes = nodes.len(), "Collected all pages");
    Ok(nodes)
}
