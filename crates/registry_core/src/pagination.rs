/// Pagination metadata a server may send alongside a page of records.
///
/// Every field is optional; zero or negative header values are dropped before
/// they reach this struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaginationHints {
    pub total_pages: Option<u32>,
    pub total_count: Option<u64>,
    pub current_page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PaginationHints {
    /// Builds hints from `(name, value)` pairs, matching names case-insensitively.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut hints = Self::default();
        for (name, value) in pairs {
            let name = name.to_ascii_lowercase();
            let Some(number) = parse_positive(value) else {
                continue;
            };
            match name.as_str() {
                "x-total-pages" => {
                    hints.total_pages.get_or_insert(clamp_u32(number));
                }
                "x-total-count" | "x-total" => {
                    hints.total_count.get_or_insert(number);
                }
                "x-current-page" => {
                    hints.current_page.get_or_insert(clamp_u32(number));
                }
                "x-page-size" => {
                    hints.page_size.get_or_insert(clamp_u32(number));
                }
                _ => {}
            }
        }
        hints
    }
}

/// Header names read by [`PaginationHints::from_pairs`], in canonical casing.
pub const PAGINATION_HEADERS: [&str; 5] = [
    "X-Total-Pages",
    "X-Total-Count",
    "X-Total",
    "X-Current-Page",
    "X-Page-Size",
];

/// Consistent pagination tuple for one rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_count: u64,
}

impl PaginationState {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            total_pages: 1,
            total_count: 0,
        }
    }

    /// `(first, last, total)` item numbers for the "Showing … of …" footer.
    pub fn showing_range(&self, rows_on_page: usize) -> (u64, u64, u64) {
        if rows_on_page == 0 {
            return (0, 0, self.total_count);
        }
        let first = u64::from(self.page.max(1) - 1) * u64::from(self.page_size) + 1;
        let last = (u64::from(self.page.max(1)) * u64::from(self.page_size))
            .min(first + rows_on_page as u64 - 1);
        // Without a server count the total is only known to reach `last`.
        (first, last, self.total_count.max(last))
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Merges server hints with the observed row count into a [`PaginationState`].
///
/// A positive total count is authoritative. Without it a total-pages hint is
/// used directly, and without either the page count is estimated as a lower
/// bound: the pages before this one plus the pages its rows fill, and one
/// more when this page came back full. An empty page gives no lower bound.
/// A page beyond the reconciled total resets to 1.
pub fn reconcile(
    hints: &PaginationHints,
    observed_len: usize,
    requested_page: u32,
    requested_page_size: u32,
) -> PaginationState {
    let page_size = hints.page_size.unwrap_or(requested_page_size).max(1);
    let requested_page = requested_page.max(1);
    let observed = observed_len as u64;

    let (total_pages, total_count) = match (hints.total_count, hints.total_pages) {
        (Some(count), _) => (pages_for(count, page_size), count),
        (None, Some(pages)) => (pages.max(1), observed),
        (None, None) if observed == 0 => (1, 0),
        (None, None) => {
            // Rows on page N mean at least N pages exist.
            let mut pages = (requested_page - 1).saturating_add(pages_for(observed, page_size));
            if observed >= u64::from(page_size) {
                pages = pages.max(requested_page.saturating_add(1));
            }
            (pages, observed)
        }
    };

    let mut page = hints.current_page.unwrap_or(requested_page).max(1);
    if page > total_pages {
        page = 1;
    }

    PaginationState {
        page,
        page_size,
        total_pages,
        total_count,
    }
}

fn pages_for(count: u64, page_size: u32) -> u32 {
    let pages = count.div_ceil(u64::from(page_size.max(1))).max(1);
    clamp_u32(pages)
}

fn parse_positive(value: &str) -> Option<u64> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u64>().ok().filter(|n| *n > 0)
}

fn clamp_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
