use axum::http::Uri;
use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Resolved page window for a list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Pagination {
    /// `page` defaults to 1, `page_size` to `default_size` and is capped at `max_size`.
    pub fn from_params(params: &PageParams, default_size: u32, max_size: u32) -> Result<Self> {
        let page = params.page.unwrap_or(1);
        if page == 0 {
            return Err(AppError::NotFound("Invalid page.".to_string()));
        }
        let page_size = match params.page_size {
            Some(0) | None => default_size,
            Some(size) => size.min(max_size),
        };
        Ok(Self { page, page_size })
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u32 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn last_page(&self, count: u64) -> u32 {
        if count == 0 {
            1
        } else {
            count.div_ceil(self.page_size as u64) as u32
        }
    }

    /// A page past the end is an error, except page 1 of an empty list.
    pub fn check_in_range(&self, count: u64) -> Result<()> {
        if self.page > self.last_page(count) {
            return Err(AppError::NotFound("Invalid page.".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: T,
}

impl<T> Page<T> {
    pub fn new(results: T, count: u64, pagination: Pagination, uri: &Uri) -> Self {
        let last = pagination.last_page(count);
        let next = (pagination.page < last).then(|| page_link(uri, pagination.page + 1));
        let previous = (pagination.page > 1).then(|| page_link(uri, pagination.page - 1));
        Self { count, next, previous, results }
    }
}

/// Rewrites the `page` parameter of `uri`, keeping every other query parameter.
pub fn page_link(uri: &Uri, page: u32) -> String {
    let mut params: Vec<String> = uri
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty() && !pair.starts_with("page="))
        .map(str::to_string)
        .collect();
    params.push(format!("page={}", page));
    format!("{}?{}", uri.path(), params.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_and_caps() {
        let params = PageParams { page: Some(3), page_size: Some(500) };
        let pagination = Pagination::from_params(&params, 10, 100).unwrap();
        assert_eq!(pagination.page_size, 100);
        assert_eq!(pagination.offset(), 200);

        let defaults = Pagination::from_params(&PageParams::default(), 10, 100).unwrap();
        assert_eq!(defaults, Pagination { page: 1, page_size: 10 });
    }

    #[test]
    fn test_page_zero_rejected() {
        let params = PageParams { page: Some(0), page_size: None };
        assert!(Pagination::from_params(&params, 10, 100).is_err());
    }

    #[test]
    fn test_range_check() {
        let pagination = Pagination { page: 2, page_size: 10 };
        assert!(pagination.check_in_range(11).is_ok());
        assert!(pagination.check_in_range(10).is_err());
        assert!(Pagination { page: 1, page_size: 10 }.check_in_range(0).is_ok());
    }

    #[test]
    fn test_links_keep_filters() {
        let uri: Uri = "/api/v1/posts?search=rust&page=2&page_size=5".parse().unwrap();
        let page: Page<Vec<u8>> = Page::new(vec![], 12, Pagination { page: 2, page_size: 5 }, &uri);
        assert_eq!(page.next.as_deref(), Some("/api/v1/posts?search=rust&page_size=5&page=3"));
        assert_eq!(page.previous.as_deref(), Some("/api/v1/posts?search=rust&page_size=5&page=1"));
    }
}
