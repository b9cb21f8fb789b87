// Client-side paging over a fully loaded result

pub const ROWS_PER_PAGE: usize = 10;

/// Up to this many pages are all linked; beyond it the list is elided
const MAX_LINKED_PAGES: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLink {
    Page(usize),
    Ellipsis,
}

pub fn total_pages(total_rows: usize) -> usize {
    total_rows.div_ceil(ROWS_PER_PAGE)
}

/// Half-open row range shown on the 1-based `page`
pub fn page_bounds(page: usize, total_rows: usize) -> (usize, usize) {
    let start = page.saturating_sub(1) * ROWS_PER_PAGE;
    let start = start.min(total_rows);
    (start, (start + ROWS_PER_PAGE).min(total_rows))
}

/// Links for a pager positioned on `current` (1-based)
pub fn page_links(current: usize, total_pages: usize) -> Vec<PageLink> {
    use PageLink::{Ellipsis, Page};

    if total_pages <= MAX_LINKED_PAGES {
        return (1..=total_pages).map(Page).collect();
    }

    let last = total_pages;
    if current <= 3 {
        vec![Page(1), Page(2), Page(3), Page(4), Ellipsis, Page(last)]
    } else if current >= last - 2 {
        vec![
            Page(1),
            Ellipsis,
            Page(last - 3),
            Page(last - 2),
            Page(last - 1),
            Page(last),
        ]
    } else {
        vec![
            Page(1),
            Ellipsis,
            Page(current - 1),
            Page(current),
            Page(current + 1),
            Ellipsis,
            Page(last),
        ]
    }
}

/// "Showing 11 to 20 of 42 results"
pub fn summary(page: usize, total_rows: usize) -> String {
    let (start, end) = page_bounds(page, total_rows);
    format!("Showing {} to {} of {} results", start + 1, end, total_rows)
}
