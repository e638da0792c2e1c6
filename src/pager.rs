use serde::{Serialize, Serializer};

pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Pages listed in full up to this count; beyond it the list is windowed.
const FULL_LIST_MAX: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

impl Serialize for PageItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Page(n) => serializer.serialize_u32(*n),
            Self::Ellipsis => serializer.serialize_str("ellipsis"),
        }
    }
}

pub fn total_pages(count: usize, page_size: usize) -> u32 {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size) as u32
}

/// Clamps into `[1, max(1, ceil(count / page_size))]`.
pub fn clamp_page(page: u32, count: usize, page_size: usize) -> u32 {
    let last = total_pages(count, page_size).max(1);
    page.clamp(1, last)
}

#[derive(Debug)]
pub struct Page<'a, T> {
    pub slice: &'a [T],
    pub total_pages: u32,
}

pub fn paginate<T>(sorted: &[T], page: u32, page_size: usize) -> Page<'_, T> {
    let total = total_pages(sorted.len(), page_size);
    let page = page.max(1) as usize;
    let start = (page - 1).saturating_mul(page_size).min(sorted.len());
    let end = start.saturating_add(page_size).min(sorted.len());
    Page {
        slice: &sorted[start..end],
        total_pages: total,
    }
}

pub fn build_page_list(total_pages: u32, current_page: u32) -> Vec<PageItem> {
    if total_pages == 0 {
        return Vec::new();
    }
    if total_pages <= FULL_LIST_MAX {
        return (1..=total_pages).map(PageItem::Page).collect();
    }

    let mut pages = vec![PageItem::Page(1)];
    let start = current_page.saturating_sub(1).max(2);
    let end = (current_page + 1).min(total_pages - 1);

    if start > 2 {
        pages.push(PageItem::Ellipsis);
    }
    for p in start..=end {
        pages.push(PageItem::Page(p));
    }
    if end < total_pages - 1 {
        pages.push(PageItem::Ellipsis);
    }
    pages.push(PageItem::Page(total_pages));
    pages
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagerState {
    pub current_page: u32,
    pub total_pages: u32,
    pub pages: Vec<PageItem>,
    pub prev_enabled: bool,
    pub next_enabled: bool,
    /// Zero-based index of the first row on the current page.
    pub first_row_index: usize,
}

pub fn pager_state(filtered_count: usize, current_page: u32, page_size: usize) -> PagerState {
    let has_rows = filtered_count > 0;
    let total = if has_rows {
        total_pages(filtered_count, page_size).max(1)
    } else {
        0
    };
    let current = if has_rows { current_page } else { 0 };
    PagerState {
        current_page: current_page.max(1),
        total_pages: total,
        pages: build_page_list(total, current),
        prev_enabled: has_rows && current_page > 1,
        next_enabled: has_rows && current_page < total,
        first_row_index: (current_page.max(1) as usize - 1) * page_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::PageItem::{Ellipsis, Page as P};

    #[test]
    fn small_totals_list_every_page() {
        assert!(build_page_list(0, 1).is_empty());
        for total in 1..=7 {
            let list = build_page_list(total, 1);
            let expected: Vec<_> = (1..=total).map(P).collect();
            assert_eq!(list, expected);
            assert!(!list.contains(&Ellipsis));
        }
    }

    #[test]
    fn interior_page_gets_both_ellipses() {
        assert_eq!(
            build_page_list(20, 10),
            vec![P(1), Ellipsis, P(9), P(10), P(11), Ellipsis, P(20)]
        );
    }

    #[test]
    fn window_touching_a_boundary_drops_that_ellipsis() {
        assert_eq!(build_page_list(8, 1), vec![P(1), P(2), Ellipsis, P(8)]);
        assert_eq!(build_page_list(8, 2), vec![P(1), P(2), P(3), Ellipsis, P(8)]);
        assert_eq!(build_page_list(8, 3), vec![P(1), P(2), P(3), P(4), Ellipsis, P(8)]);
        assert_eq!(build_page_list(8, 7), vec![P(1), Ellipsis, P(6), P(7), P(8)]);
        assert_eq!(build_page_list(8, 8), vec![P(1), Ellipsis, P(7), P(8)]);
    }

    #[test]
    fn paginate_slices_the_last_partial_page() {
        let items: Vec<u32> = (0..30).collect();
        let first = paginate(&items, 1, 25);
        assert_eq!(first.slice.len(), 25);
        assert_eq!(first.total_pages, 2);
        let second = paginate(&items, 2, 25);
        assert_eq!(second.slice, &items[25..]);
        let past = paginate(&items, 9, 25);
        assert!(past.slice.is_empty());
    }

    #[test]
    fn clamp_keeps_page_in_range() {
        assert_eq!(clamp_page(0, 30, 25), 1);
        assert_eq!(clamp_page(5, 30, 25), 2);
        assert_eq!(clamp_page(3, 0, 25), 1);
        assert_eq!(clamp_page(2, 50, 25), 2);
    }

    #[test]
    fn pager_disables_buttons_at_edges_and_when_empty() {
        let empty = pager_state(0, 1, 25);
        assert!(empty.pages.is_empty());
        assert!(!empty.prev_enabled && !empty.next_enabled);

        let last = pager_state(30, 2, 25);
        assert!(last.prev_enabled);
        assert!(!last.next_enabled);
        assert_eq!(last.first_row_index, 25);

        let first = pager_state(30, 1, 25);
        assert!(!first.prev_enabled);
        assert!(first.next_enabled);
    }

    #[test]
    fn page_items_serialize_like_the_dashboard_expects() {
        let v = serde_json::to_value(build_page_list(9, 5)).unwrap();
        assert_eq!(v, serde_json::json!([1, "ellipsis", 4, 5, 6, "ellipsis", 9]));
    }
}
