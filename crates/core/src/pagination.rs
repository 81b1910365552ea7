//! Page slicing
//!
//! Two flavours are used by the API:
//!
//! - lenient paging (`lenient_page`) never fails: garbage page numbers land on
//!   page 1 and out-of-range numbers on the last page;
//! - strict paging (`strict_window`) rejects anything that does not name an
//!   existing page with `CoreError::InvalidPage`. It only needs the row
//!   count, so the page itself is fetched with LIMIT/OFFSET.

use crate::error::{CoreError, Result};
use serde::Serialize;

/// Page size limits for one listing.
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default_size: usize,
    pub max_size: usize,
}

impl PageLimits {
    pub const fn new(default_size: usize, max_size: usize) -> Self {
        Self {
            default_size,
            max_size,
        }
    }

    /// Resolve a `page_size` query value. Invalid or non-positive values fall
    /// back to the default, large values are clamped.
    pub fn resolve(&self, requested: Option<&str>) -> usize {
        match requested.and_then(|s| s.trim().parse::<usize>().ok()) {
            Some(n) if n > 0 => n.min(self.max_size),
            _ => self.default_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number
    pub number: usize,
    pub num_pages: usize,
    /// Total number of items across all pages
    pub count: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_number(&self) -> Option<usize> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn previous_number(&self) -> Option<usize> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
        }
    }
}

/// Number of pages for `count` items. An empty listing still has one page.
pub fn num_pages(count: usize, per_page: usize) -> usize {
    let per_page = per_page.max(1);
    count.div_ceil(per_page).max(1)
}

fn slice<T>(items: Vec<T>, number: usize, per_page: usize) -> Page<T> {
    let count = items.len();
    let num_pages = num_pages(count, per_page);
    let start = (number - 1) * per_page;
    let items = items.into_iter().skip(start).take(per_page).collect();
    Page {
        items,
        number,
        num_pages,
        count,
    }
}

/// Lenient paging: non-numeric page → first page, out-of-range page → last
/// page.
pub fn lenient_page<T>(items: Vec<T>, page: Option<&str>, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total = num_pages(items.len(), per_page);
    let number = match page.map(|p| p.trim().parse::<i64>()) {
        None | Some(Err(_)) => 1,
        Some(Ok(n)) if n < 1 || n as usize > total => total,
        Some(Ok(n)) => n as usize,
    };
    slice(items, number, per_page)
}

/// Position of one existing page within `count` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: usize,
    pub num_pages: usize,
    pub per_page: usize,
    pub count: usize,
}

impl PageWindow {
    pub fn offset(&self) -> usize {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> usize {
        self.per_page
    }

    /// Wrap the items fetched for this window.
    pub fn page<T>(&self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
        }
    }
}

/// Strict page lookup over `count` items. `"last"` names the final page.
pub fn strict_window(count: usize, page: Option<&str>, per_page: usize) -> Result<PageWindow> {
    let per_page = per_page.max(1);
    let total = num_pages(count, per_page);
    let number = match page.map(str::trim) {
        None | Some("") => 1,
        Some("last") => total,
        Some(p) => p.parse::<usize>().map_err(|_| CoreError::InvalidPage)?,
    };
    if number < 1 || number > total {
        return Err(CoreError::InvalidPage);
    }
    Ok(PageWindow {
        number,
        num_pages: total,
        per_page,
        count,
    })
}

/// `{count, next, previous, results}` envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T: Serialize> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<usize> {
        (1..=n).collect()
    }

    #[test]
    fn test_num_pages() {
        assert_eq!(num_pages(0, 10), 1);
        assert_eq!(num_pages(10, 10), 1);
        assert_eq!(num_pages(11, 10), 2);
    }

    #[test]
    fn test_lenient_page_defaults() {
        let page = lenient_page(items(25), None, 10);
        assert_eq!(page.number, 1);
        assert_eq!(page.items, (1..=10).collect::<Vec<_>>());
        assert_eq!(page.num_pages, 3);
        assert_eq!(page.count, 25);
    }

    #[test]
    fn test_lenient_page_garbage_and_overflow() {
        assert_eq!(lenient_page(items(25), Some("abc"), 10).number, 1);
        let last = lenient_page(items(25), Some("99"), 10);
        assert_eq!(last.number, 3);
        assert_eq!(last.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(lenient_page(items(25), Some("0"), 10).number, 3);
    }

    #[test]
    fn test_lenient_page_empty() {
        let page = lenient_page(Vec::<usize>::new(), Some("4"), 10);
        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_strict_window() {
        let page = strict_window(45, Some("2"), 20).unwrap().page(Vec::<usize>::new());
        assert_eq!(page.next_number(), Some(3));
        assert_eq!(page.previous_number(), Some(1));

        let last = strict_window(45, Some("last"), 20).unwrap();
        assert_eq!(last.number, 3);
        assert!(!last.page(Vec::<usize>::new()).has_next());
    }

    #[test]
    fn test_strict_window_rejects_invalid() {
        assert_eq!(strict_window(45, Some("4"), 20), Err(CoreError::InvalidPage));
        assert_eq!(strict_window(45, Some("0"), 20), Err(CoreError::InvalidPage));
        assert_eq!(strict_window(45, Some("two"), 20), Err(CoreError::InvalidPage));
        // first page of an empty listing exists
        assert!(strict_window(0, Some("1"), 20).is_ok());
    }

    #[test]
    fn test_strict_window_offsets() {
        let window = strict_window(45, Some("3"), 20).unwrap();
        assert_eq!(window.offset(), 40);
        assert_eq!(window.limit(), 20);
        assert_eq!(window.num_pages, 3);

        let page = window.page(vec![41, 42, 43, 44, 45]);
        assert_eq!(page.count, 45);
        assert_eq!(page.next_number(), None);
        assert_eq!(page.previous_number(), Some(2));

        assert_eq!(strict_window(0, None, 20).unwrap().offset(), 0);
        assert_eq!(strict_window(45, Some("last"), 20).unwrap().number, 3);
    }

    #[test]
    fn test_strict_window_rejects_missing_pages() {
        assert_eq!(strict_window(45, Some("9"), 20), Err(CoreError::InvalidPage));
        assert_eq!(strict_window(0, Some("2"), 20), Err(CoreError::InvalidPage));
        assert_eq!(strict_window(45, Some("-1"), 20), Err(CoreError::InvalidPage));
    }

    #[test]
    fn test_page_limits() {
        let limits = PageLimits::new(20, 100);
        assert_eq!(limits.resolve(None), 20);
        assert_eq!(limits.resolve(Some("5")), 5);
        assert_eq!(limits.resolve(Some("500")), 100);
        assert_eq!(limits.resolve(Some("0")), 20);
        assert_eq!(limits.resolve(Some("x")), 20);
    }
}
