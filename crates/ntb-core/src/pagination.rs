//! Page math over a session's result list.
//!
//! Pure functions: the session store owns the mutable state, the renderer
//! owns the presentation. Invariant: a produced view always satisfies
//! `page * PAGE_SIZE < total`.

use crate::domain::SearchResult;

/// Results shown per page.
pub const PAGE_SIZE: usize = 5;

/// A validated window into a result list, ready for rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageView {
    pub query: String,
    /// 0-based page index.
    pub page: usize,
    pub page_count: usize,
    pub total: usize,
    /// 0-based global index of the first item on this page.
    pub start: usize,
    /// Exclusive end index.
    pub end: usize,
    pub items: Vec<SearchResult>,
    pub has_prev: bool,
    pub has_next: bool,
    /// Session generation the view was rendered from.
    pub generation: u64,
}

pub fn page_count(total: usize) -> usize {
    total.div_ceil(PAGE_SIZE)
}

/// Whether `page` addresses at least one item of a `total`-item list.
pub fn is_valid_page(page: usize, total: usize) -> bool {
    total > 0 && page * PAGE_SIZE < total
}

/// Build the view for `page`, or `None` when the page is out of range.
///
/// Out-of-range requests come from stale buttons, not from our own
/// navigation; they are ignored rather than clamped so a stale keyboard
/// cannot silently jump the user elsewhere.
pub fn paginate(
    query: &str,
    results: &[SearchResult],
    page: usize,
    generation: u64,
) -> Option<PageView> {
    if !is_valid_page(page, results.len()) {
        return None;
    }

    let total = results.len();
    let start = page * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(total);

    Some(PageView {
        query: query.to_string(),
        page,
        page_count: page_count(total),
        total,
        start,
        end,
        items: results[start..end].to_vec(),
        has_prev: page > 0,
        has_next: end < total,
        generation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(n: usize) -> Vec<SearchResult> {
        (0..n)
            .map(|i| SearchResult {
                title: format!("result {i}"),
                detail_url: format!("https://nyaa.si/view/{i}"),
                size: "1 GiB".to_string(),
                seeders: "1".to_string(),
                leechers: "0".to_string(),
            })
            .collect()
    }

    #[test]
    fn twelve_results_paginate_as_5_5_2() {
        let rs = results(12);

        let p0 = paginate("naruto", &rs, 0, 1).unwrap();
        assert_eq!((p0.start, p0.end), (0, 5));
        assert!(!p0.has_prev);
        assert!(p0.has_next);

        let p1 = paginate("naruto", &rs, 1, 1).unwrap();
        assert_eq!((p1.start, p1.end), (5, 10));
        assert!(p1.has_prev);
        assert!(p1.has_next);

        let p2 = paginate("naruto", &rs, 2, 1).unwrap();
        assert_eq!((p2.start, p2.end), (10, 12));
        assert_eq!(p2.items.len(), 2);
        assert!(p2.has_prev);
        assert!(!p2.has_next);

        assert_eq!(p2.page_count, 3);
        assert!(paginate("naruto", &rs, 3, 1).is_none());
    }

    #[test]
    fn page_items_are_the_global_slice() {
        let rs = results(12);
        let p1 = paginate("q", &rs, 1, 1).unwrap();
        assert_eq!(p1.items[0], rs[5]);
        assert_eq!(p1.items[4], rs[9]);
    }

    #[test]
    fn empty_results_have_no_pages() {
        assert!(paginate("q", &[], 0, 1).is_none());
        assert_eq!(page_count(0), 0);
        assert!(!is_valid_page(0, 0));
    }

    #[test]
    fn exact_multiple_has_no_trailing_page() {
        let rs = results(10);
        assert_eq!(page_count(10), 2);
        assert!(paginate("q", &rs, 1, 1).unwrap().has_prev);
        assert!(!paginate("q", &rs, 1, 1).unwrap().has_next);
        assert!(paginate("q", &rs, 2, 1).is_none());
    }

    #[test]
    fn views_always_respect_the_page_invariant() {
        for total in [1usize, 4, 5, 6, 11, 12, 25] {
            let rs = results(total);
            for page in 0..10 {
                if let Some(v) = paginate("q", &rs, page, 0) {
                    assert!(v.page * PAGE_SIZE < v.total);
                    assert!(v.end <= v.total);
                    assert!(!v.items.is_empty());
                }
            }
        }
    }
}
