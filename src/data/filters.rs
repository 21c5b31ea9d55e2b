//! List query planning.
//!
//! Untrusted `page`, `page_size` and `sort` values are validated against the
//! configured bounds and sort allow-list, then turned into a [`QueryPlan`].
//! Validation must run before planning: [`Filters::plan`] treats a sort value
//! outside the allow-list as a broken invariant and panics rather than
//! passing it on to storage.

use serde::Serialize;

use crate::config::PaginationConfig;
use crate::data::validator::{permitted_value, Validator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: String,
    pub sort_safelist: Vec<String>,
}

/// Bounded, validated instructions for the storage collaborator. Rows are
/// ordered by `sort_column` in `direction`, then by id ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub sort_column: String,
    pub direction: SortDirection,
    pub limit: i64,
    pub offset: i64,
}

/// Pagination details returned next to a page of results. All zero when no
/// rows matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageMetadata {
    #[serde(skip_serializing_if = "is_zero")]
    pub current_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub page_size: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub first_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub total_records: i64,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

impl Filters {
    pub fn validate(&self, v: &mut Validator, limits: &PaginationConfig) {
        v.check(self.page > 0, "page", "must be greater than zero");
        v.check(
            self.page <= limits.max_page,
            "page",
            &format!("must be a maximum of {}", limits.max_page),
        );

        v.check(self.page_size > 0, "page_size", "must be greater than zero");
        v.check(
            self.page_size <= limits.max_page_size,
            "page_size",
            &format!("must be a maximum of {}", limits.max_page_size),
        );

        v.check(
            permitted_value(&self.sort, &self.sort_safelist),
            "sort",
            "invalid sort value",
        );
    }

    /// Column named by the allow-list entry that exactly matches `sort`.
    ///
    /// # Panics
    ///
    /// Panics if `sort` is not in the allow-list, which means the caller
    /// skipped [`Filters::validate`].
    pub fn sort_column(&self) -> &str {
        match self.sort_safelist.iter().find(|safe| **safe == self.sort) {
            Some(safe) => safe.strip_prefix('-').unwrap_or(safe),
            None => panic!("unsafe sort parameter: {}", self.sort),
        }
    }

    pub fn sort_direction(&self) -> SortDirection {
        if self.sort.starts_with('-') {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        }
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).max(0).saturating_mul(self.page_size)
    }

    /// # Panics
    ///
    /// See [`Filters::sort_column`].
    pub fn plan(&self) -> QueryPlan {
        QueryPlan {
            sort_column: self.sort_column().to_string(),
            direction: self.sort_direction(),
            limit: self.limit(),
            offset: self.offset(),
        }
    }
}

pub fn calculate_metadata(total_records: i64, page: i64, page_size: i64) -> PageMetadata {
    if total_records == 0 {
        return PageMetadata::default();
    }

    PageMetadata {
        current_page: page,
        page_size,
        first_page: 1,
        last_page: (total_records + page_size - 1) / page_size,
        total_records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(page: i64, page_size: i64, sort: &str) -> Filters {
        Filters {
            page,
            page_size,
            sort: sort.to_string(),
            sort_safelist: PaginationConfig::default().sort_safelist,
        }
    }

    fn violations(f: &Filters) -> Validator {
        let mut v = Validator::new();
        f.validate(&mut v, &PaginationConfig::default());
        v
    }

    #[test]
    fn test_valid_filters() {
        assert!(violations(&filters(1, 20, "-year")).valid());
    }

    #[test]
    fn test_each_violation_names_its_field() {
        let v = violations(&filters(0, 20, "id"));
        assert_eq!(v.errors().fields().collect::<Vec<_>>(), vec!["page"]);

        let v = violations(&filters(1, 500, "id"));
        assert_eq!(v.errors().get("page_size"), Some("must be a maximum of 100"));

        let v = violations(&filters(1, 20, "unknown"));
        assert_eq!(v.errors().get("sort"), Some("invalid sort value"));
    }

    #[test]
    fn test_all_violations_reported_together() {
        let v = violations(&filters(0, 500, "unknown"));
        let fields: Vec<_> = v.errors().fields().collect();
        assert_eq!(fields, vec!["page", "page_size", "sort"]);
    }

    #[test]
    fn test_page_upper_bound() {
        let v = violations(&filters(10_000_001, 20, "id"));
        assert_eq!(v.errors().get("page"), Some("must be a maximum of 10000000"));
        assert!(violations(&filters(10_000_000, 20, "id")).valid());
    }

    #[test]
    fn test_sort_must_match_exactly() {
        assert!(!violations(&filters(1, 20, "--year")).valid());
        assert!(!violations(&filters(1, 20, "Year")).valid());
        assert!(!violations(&filters(1, 20, "year ")).valid());
    }

    #[test]
    fn test_plan() {
        let plan = filters(3, 10, "-title").plan();
        assert_eq!(
            plan,
            QueryPlan {
                sort_column: "title".to_string(),
                direction: SortDirection::Descending,
                limit: 10,
                offset: 20,
            }
        );
        assert_eq!(filters(1, 10, "year").sort_direction(), SortDirection::Ascending);
    }

    #[test]
    fn test_offset_at_page_ceiling() {
        assert_eq!(filters(10_000_000, 100, "id").offset(), 999_999_900);
        // Unvalidated extremes clamp instead of overflowing.
        assert_eq!(filters(i64::MAX / 100, 1000, "id").offset(), i64::MAX);
        assert_eq!(filters(0, 10, "id").offset(), 0);
    }

    #[test]
    #[should_panic(expected = "unsafe sort parameter")]
    fn test_plan_without_validation_panics() {
        filters(1, 10, "rating; DROP TABLE movies").plan();
    }

    #[test]
    fn test_metadata() {
        assert_eq!(
            calculate_metadata(25, 3, 10),
            PageMetadata {
                current_page: 3,
                page_size: 10,
                first_page: 1,
                last_page: 3,
                total_records: 25,
            }
        );
        assert_eq!(calculate_metadata(20, 1, 10).last_page, 2);
        assert_eq!(calculate_metadata(0, 4, 10), PageMetadata::default());
    }

    #[test]
    fn test_empty_metadata_serializes_empty() {
        let json = serde_json::to_value(PageMetadata::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
