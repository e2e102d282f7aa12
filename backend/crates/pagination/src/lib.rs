//! Page/limit pagination primitives shared by backend list endpoints.
//!
//! List endpoints accept a one-based `page` and a `limit` and respond with a
//! `{page, limit, total, pages}` envelope alongside the items. This crate owns
//! the clamping and arithmetic so every endpoint paginates identically.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Default page size applied when a request omits `limit`.
pub const DEFAULT_LIMIT: u32 = 10;
/// Upper bound on `limit`; larger requests are rejected rather than clamped
/// so callers learn about the cap.
pub const MAX_LIMIT: u32 = 100;

/// Validation errors returned by [`PageRequest::new`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageRequestError {
    /// `page` was zero; pages are one-based.
    #[error("page must be at least 1")]
    ZeroPage,
    /// `limit` was zero.
    #[error("limit must be at least 1")]
    ZeroLimit,
    /// `limit` exceeded [`MAX_LIMIT`].
    #[error("limit must be at most {MAX_LIMIT}")]
    LimitTooLarge,
}

/// A validated one-based page request.
///
/// # Examples
/// ```
/// use pagination::PageRequest;
///
/// let request = PageRequest::new(2, 25)?;
/// assert_eq!(request.offset(), 25);
/// # Ok::<(), pagination::PageRequestError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Validate and construct a page request.
    ///
    /// # Errors
    ///
    /// Returns a [`PageRequestError`] when `page` or `limit` is zero, or
    /// `limit` exceeds [`MAX_LIMIT`].
    pub const fn new(page: u32, limit: u32) -> Result<Self, PageRequestError> {
        if page == 0 {
            return Err(PageRequestError::ZeroPage);
        }
        if limit == 0 {
            return Err(PageRequestError::ZeroLimit);
        }
        if limit > MAX_LIMIT {
            return Err(PageRequestError::LimitTooLarge);
        }
        Ok(Self { page, limit })
    }

    /// Build a request from optional query parameters, falling back to the
    /// first page and [`DEFAULT_LIMIT`].
    ///
    /// # Errors
    ///
    /// Propagates the same validation as [`PageRequest::new`].
    pub const fn from_query(
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Self, PageRequestError> {
        let page = match page {
            Some(value) => value,
            None => 1,
        };
        let limit = match limit {
            Some(value) => value,
            None => DEFAULT_LIMIT,
        };
        Self::new(page, limit)
    }

    /// One-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Maximum number of items per page.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of items to skip for this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Pagination envelope returned next to a page of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// One-based page number that was served.
    pub page: u32,
    /// Page size that was applied.
    pub limit: u32,
    /// Total number of matching items across all pages.
    pub total: u64,
    /// Total number of pages (ceiling of `total / limit`).
    pub pages: u64,
}

impl PageInfo {
    /// Compute the envelope for a request and a total item count.
    ///
    /// # Examples
    /// ```
    /// use pagination::{PageInfo, PageRequest};
    ///
    /// let request = PageRequest::new(1, 10)?;
    /// let info = PageInfo::for_request(&request, 25);
    /// assert_eq!(info.pages, 3);
    /// # Ok::<(), pagination::PageRequestError>(())
    /// ```
    #[must_use]
    pub const fn for_request(request: &PageRequest, total: u64) -> Self {
        Self {
            page: request.page(),
            limit: request.limit(),
            total,
            pages: total.div_ceil(request.limit() as u64),
        }
    }
}

/// A page of items together with its envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Items on this page, already sorted by the producing query.
    pub items: Vec<T>,
    /// Pagination envelope describing the full result set.
    pub pagination: PageInfo,
}

impl<T> Page<T> {
    /// Bundle a page of items with its envelope.
    #[must_use]
    pub const fn new(items: Vec<T>, pagination: PageInfo) -> Self {
        Self { items, pagination }
    }

    /// Map the items while keeping the envelope intact.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}
