//! Splitting listings into pages

use std::ops::Range;

/// One page of a listing
#[derive(Debug, Clone, PartialEq)]
pub struct Pager {
    /// 1-based
    pub number: usize,
    pub total_pages: usize,
    /// Items shown on this page
    pub range: Range<usize>,
    /// Site-relative path of this page
    pub path: String,
}

impl Pager {
    pub fn has_prev(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }
}

/// Split `total_items` into pages of `per_page` under `base` ("/", "/posts/").
/// An empty listing still gets one (empty) page.
pub fn paginate(base: &str, total_items: usize, per_page: usize) -> Vec<Pager> {
    let per_page = per_page.max(1);
    let total_pages = total_items.div_ceil(per_page).max(1);

    (1..=total_pages)
        .map(|number| {
            let start = (number - 1) * per_page;
            let end = (start + per_page).min(total_items);
            Pager {
                number,
                total_pages,
                range: start..end,
                path: page_path(base, number),
            }
        })
        .collect()
}

/// `base` for the first page, `base/page/N/` after that
pub fn page_path(base: &str, number: usize) -> String {
    if number <= 1 {
        base.to_string()
    } else {
        format!("{}/page/{}/", base.trim_end_matches('/'), number)
    }
}
