//! Fixed-size pagination with clamping.
//!
//! Page numbers are 1-indexed. A request past the last page yields the last
//! page; a request below 1 or a token that is not a number yields page 1. An
//! empty collection still has exactly one (empty) page.

use std::num::IntErrorKind;

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Number of posts on every feed page.
pub const POSTS_PER_PAGE: usize = 10;

/// A requested page number, already normalised to be at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageNumber(usize);

impl PageNumber {
    pub const FIRST: PageNumber = PageNumber(1);

    pub fn new(number: usize) -> Self {
        Self(number.max(1))
    }

    /// Interpret a raw `?page=` token.
    pub fn parse(token: Option<&str>) -> Self {
        let Some(token) = token.map(str::trim) else {
            return Self::FIRST;
        };
        match token.parse::<i64>() {
            Ok(n) if n >= 1 => Self(usize::try_from(n).unwrap_or(usize::MAX)),
            Ok(_) => Self::FIRST,
            // Too large to represent is still "past the end", which clamps.
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => Self(usize::MAX),
            Err(_) => Self::FIRST,
        }
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

/// The resolved position of one page inside a collection of `total` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: usize,
    pub num_pages: usize,
    pub offset: usize,
    pub limit: usize,
}

impl PageWindow {
    pub fn resolve(total: usize, requested: PageNumber, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let num_pages = total.div_ceil(page_size).max(1);
        let number = requested.get().min(num_pages);
        let offset = (number - 1) * page_size;
        let limit = page_size.min(total - offset);

        Self {
            number,
            num_pages,
            offset,
            limit,
        }
    }
}

/// One page of an ordered collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow, total: usize) -> Self {
        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            total,
        }
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_page_number(&self) -> Option<usize> {
        self.has_next().then_some(self.number + 1)
    }

    pub fn previous_page_number(&self) -> Option<usize> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
        }
    }
}

impl<T: Serialize> Serialize for Page<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Page", 6)?;
        state.serialize_field("items", &self.items)?;
        state.serialize_field("number", &self.number)?;
        state.serialize_field("num_pages", &self.num_pages)?;
        state.serialize_field("total", &self.total)?;
        state.serialize_field("has_next", &self.has_next())?;
        state.serialize_field("has_previous", &self.has_previous())?;
        state.end()
    }
}

/// Slice an in-memory collection, preserving its order.
pub fn paginate<T>(collection: Vec<T>, requested: PageNumber, page_size: usize) -> Page<T> {
    let total = collection.len();
    let window = PageWindow::resolve(total, requested, page_size);
    let items = collection
        .into_iter()
        .skip(window.offset)
        .take(window.limit)
        .collect();
    Page::new(items, window, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_tokens() {
        assert_eq!(PageNumber::parse(None), PageNumber::FIRST);
        assert_eq!(PageNumber::parse(Some("3")).get(), 3);
        assert_eq!(PageNumber::parse(Some("0")), PageNumber::FIRST);
        assert_eq!(PageNumber::parse(Some("-4")), PageNumber::FIRST);
        assert_eq!(PageNumber::parse(Some("last")), PageNumber::FIRST);
        assert_eq!(PageNumber::parse(Some("")), PageNumber::FIRST);
        assert_eq!(
            PageNumber::parse(Some("99999999999999999999999")).get(),
            usize::MAX
        );
    }

    #[test]
    fn test_thirteen_items_make_two_pages() {
        let items: Vec<u32> = (1..=13).collect();

        let first = paginate(items.clone(), PageNumber::new(1), 10);
        assert_eq!(first.items.len(), 10);
        assert!(first.has_next());
        assert!(!first.has_previous());

        let second = paginate(items.clone(), PageNumber::new(2), 10);
        assert_eq!(second.items, vec![11, 12, 13]);
        assert!(!second.has_next());
        assert_eq!(second.previous_page_number(), Some(1));

        let third = paginate(items, PageNumber::new(3), 10);
        assert_eq!(third, second);
    }

    #[test]
    fn test_empty_collection_has_one_empty_page() {
        let page = paginate(Vec::<u8>::new(), PageNumber::new(5), 10);
        assert!(page.items.is_empty());
        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert!(!page.has_next());
        assert!(!page.has_previous());
    }

    #[test]
    fn test_pages_concatenate_to_collection() {
        for size in 1..=7 {
            for len in 0..=30usize {
                let items: Vec<usize> = (0..len).collect();
                let expected_pages = if len == 0 { 1 } else { len.div_ceil(size) };

                let first = paginate(items.clone(), PageNumber::FIRST, size);
                assert_eq!(first.num_pages, expected_pages);

                let joined: Vec<usize> = (1..=first.num_pages)
                    .flat_map(|n| paginate(items.clone(), PageNumber::new(n), size).items)
                    .collect();
                assert_eq!(joined, items, "size={size} len={len}");
            }
        }
    }

    #[test]
    fn test_window_offsets() {
        let window = PageWindow::resolve(25, PageNumber::new(3), 10);
        assert_eq!(
            window,
            PageWindow {
                number: 3,
                num_pages: 3,
                offset: 20,
                limit: 5
            }
        );
    }

    #[test]
    fn test_page_serializes_navigation_flags() {
        let page = paginate(vec!["a", "b", "c"], PageNumber::new(1), 2);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["items"], serde_json::json!(["a", "b"]));
        assert_eq!(json["has_next"], true);
        assert_eq!(json["has_previous"], false);
        assert_eq!(json["num_pages"], 2);
    }
}
