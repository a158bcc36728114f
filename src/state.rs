use std::collections::BTreeSet;

use strum::{AsRefStr, Display, EnumIter, EnumString};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 20;

/// The search, filter, sort and pagination parameters driving the arts
/// listing request.
///
/// This is the in-memory form. Absent price bounds are `None` here and only
/// become the `-1` sentinel when a [`SearchRequest`](crate::request_body::SearchRequest)
/// is built for the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryState {
    pub search: String,
    pub filter: Filter,
    pub sort: Sort,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Filter {
    pub tags: BTreeSet<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
}

/// Sort order. An empty `by` means no explicit sort.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sort {
    pub by: String,
    pub asc: bool,
}

/// 1-based page cursor. Values are not validated on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl QueryState {
    /// Default state with a configured page size.
    pub fn with_limit(limit: i64) -> Self {
        QueryState {
            pagination: Pagination {
                limit,
                ..Pagination::default()
            },
            ..QueryState::default()
        }
    }

    /// Adds the tag if missing, removes it otherwise. Returns whether the tag
    /// is selected afterwards.
    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        if self.filter.tags.remove(tag) {
            false
        } else {
            self.filter.tags.insert(tag.to_owned());
            true
        }
    }

    /// Parsed sort field, `Ok(None)` when no explicit sort is set.
    pub fn sort_field(&self) -> Result<Option<SortField>, strum::ParseError> {
        if self.sort.by.is_empty() {
            return Ok(None);
        }
        self.sort.by.parse::<SortField>().map(Some)
    }
}

/// Fields the search endpoint knows how to sort by.
#[derive(AsRefStr, EnumIter, EnumString, Debug, Display, PartialEq, Eq, Copy, Clone)]
#[strum(serialize_all = "camelCase")]
pub enum SortField {
    TotalDownloads,
    WeeklyDownloads,
    MonthlyDownloads,
    YearlyDownloads,
    TotalStars,
    WeeklyStars,
    MonthlyStars,
    YearlyStars,
    Price,
}
