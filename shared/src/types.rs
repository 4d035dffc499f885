//! Common types used across the platform

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Largest page size a client may request
pub const MAX_PER_PAGE: u32 = 100;

/// Pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl Pagination {
    /// Clamp page to at least 1 and per_page to 1..=MAX_PER_PAGE
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.normalized().per_page)
    }

    pub fn offset(&self) -> i64 {
        let p = self.normalized();
        i64::from(p.page - 1) * i64::from(p.per_page)
    }

    /// Build response metadata for a total row count
    pub fn meta(&self, total_items: i64) -> PaginationMeta {
        let p = self.normalized();
        let total_items = total_items.max(0) as u64;
        let total_pages = total_items.div_ceil(u64::from(p.per_page)) as u32;
        PaginationMeta {
            page: p.page,
            per_page: p.per_page,
            total_items,
            total_pages,
        }
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, pagination: &Pagination, total_items: i64) -> Self {
        Self {
            items,
            pagination: pagination.meta(total_items),
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

/// Success envelope returned by every JSON endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// Date range for queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Both bounds are inclusive; `start` must not be after `end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, &'static str> {
        if start > end {
            return Err("Start date must not be after end date");
        }
        Ok(Self { start, end })
    }

    /// Range covering the `days` days ending on `today`
    pub fn trailing_days(today: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self {
            start: today - chrono::Duration::days(span),
            end: today,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_clamps_per_page() {
        let p = Pagination { page: 0, per_page: 500 }.normalized();
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, MAX_PER_PAGE);

        let p = Pagination { page: 3, per_page: 0 }.normalized();
        assert_eq!(p.per_page, 1);
    }

    #[test]
    fn test_pagination_offset() {
        let p = Pagination { page: 3, per_page: 20 };
        assert_eq!(p.offset(), 40);
        assert_eq!(p.limit(), 20);
    }

    #[test]
    fn test_pagination_meta() {
        let p = Pagination { page: 2, per_page: 10 };
        let meta = p.meta(25);
        assert_eq!(meta.total_items, 25);
        assert_eq!(meta.total_pages, 3);

        assert_eq!(p.meta(0).total_pages, 0);
    }

    #[test]
    fn test_date_range_ordering() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(DateRange::new(a, b).is_err());
        assert!(DateRange::new(b, a).is_ok());
    }

    #[test]
    fn test_trailing_days() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let range = DateRange::trailing_days(today, 7);
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!(range.contains(today));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
    }
}
