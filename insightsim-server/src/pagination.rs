//! Pagination utilities for registry listings

/// Page size used when the caller asks for less than one row per page
pub const DEFAULT_PAGE_SIZE: i64 = 9;

/// Upper bound on page size accepted over HTTP
pub const MAX_PAGE_SIZE: i64 = 100;

/// Sanitized pagination request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Rows per page
    pub limit: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

impl Pagination {
    /// Normalize a requested page and page size
    ///
    /// `page < 1` becomes 1 and `limit < 1` becomes [`DEFAULT_PAGE_SIZE`].
    /// Pages past the end are kept as requested and yield an empty slice.
    ///
    /// # Examples
    /// ```
    /// use insightsim_server::pagination::Pagination;
    ///
    /// let p = Pagination::new(3, 10);
    /// assert_eq!(p.offset, 20);
    ///
    /// let p = Pagination::new(0, 0);
    /// assert_eq!((p.page, p.limit, p.offset), (1, 9, 0));
    /// ```
    pub fn new(requested_page: i64, requested_limit: i64) -> Self {
        let page = requested_page.max(1);
        let limit = if requested_limit < 1 {
            DEFAULT_PAGE_SIZE
        } else {
            requested_limit
        };

        Pagination {
            page,
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }

    /// Same as [`Pagination::new`] with the page size capped at `max_limit`
    pub fn capped(requested_page: i64, requested_limit: i64, max_limit: i64) -> Self {
        Self::new(requested_page, requested_limit.min(max_limit))
    }

    /// Number of pages needed for `total` rows
    pub fn total_pages(&self, total: i64) -> i64 {
        (total + self.limit - 1) / self.limit
    }
}
