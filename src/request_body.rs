//! Wire form of a [`QueryState`].
//!
//! A [`SearchRequest`] is what travels in the search request body and in the
//! `req` URL parameter. It is always built as a new value; the state it was
//! built from is left untouched, so an unset price bound stays unset in memory
//! even after it has been sent as `-1`.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ArtQueryError;
use crate::state::{Filter, Pagination, QueryState, Sort, DEFAULT_LIMIT, DEFAULT_PAGE};

/// Wire encoding of "no bound" for the price filters.
pub const NO_BOUND: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SearchRequest {
    pub search: String,
    pub filter: FilterBody,
    pub sort: SortBody,
    pub pagination: PaginationBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterBody {
    pub tags: Vec<String>,
    #[serde(deserialize_with = "deserialize_bound")]
    pub min_price: i64,
    #[serde(deserialize_with = "deserialize_bound")]
    pub max_price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SortBody {
    pub by: String,
    pub asc: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationBody {
    pub page: i64,
    pub limit: i64,
}

impl Default for FilterBody {
    fn default() -> Self {
        FilterBody {
            tags: Vec::new(),
            min_price: NO_BOUND,
            max_price: NO_BOUND,
        }
    }
}

impl Default for PaginationBody {
    fn default() -> Self {
        PaginationBody {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

// Older clients sent `null` for an unset bound.
fn deserialize_bound<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(NO_BOUND))
}

fn encode_bound(bound: Option<i64>) -> i64 {
    bound.unwrap_or(NO_BOUND)
}

fn decode_bound(bound: i64) -> Option<i64> {
    if bound < 0 {
        None
    } else {
        Some(bound)
    }
}

impl SearchRequest {
    pub fn from_state(state: &QueryState) -> Self {
        SearchRequest {
            search: state.search.clone(),
            filter: FilterBody {
                tags: state.filter.tags.iter().cloned().collect(),
                min_price: encode_bound(state.filter.min_price),
                max_price: encode_bound(state.filter.max_price),
            },
            sort: SortBody {
                by: state.sort.by.clone(),
                asc: state.sort.asc,
            },
            pagination: PaginationBody {
                page: state.pagination.page,
                limit: state.pagination.limit,
            },
        }
    }

    pub fn into_state(self) -> QueryState {
        QueryState {
            search: self.search,
            filter: Filter {
                tags: self.filter.tags.into_iter().collect(),
                min_price: decode_bound(self.filter.min_price),
                max_price: decode_bound(self.filter.max_price),
            },
            sort: Sort {
                by: self.sort.by,
                asc: self.sort.asc,
            },
            pagination: Pagination {
                page: self.pagination.page,
                limit: self.pagination.limit,
            },
        }
    }

    pub fn to_json(&self) -> Result<String, ArtQueryError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a JSON payload. Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, ArtQueryError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Offset of the first row on the requested page, `None` if it does not
    /// fit in an `i64`.
    pub fn offset(&self) -> Option<i64> {
        self.pagination
            .page
            .checked_sub(1)?
            .checked_mul(self.pagination.limit)
    }
}

/// Serializes the state for the search request body.
pub fn request_body(state: &QueryState) -> Result<String, ArtQueryError> {
    SearchRequest::from_state(state).to_json()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_min_price_scenario() {
        let state = QueryState {
            filter: Filter {
                min_price: Some(50),
                ..Filter::default()
            },
            ..QueryState::default()
        };

        let body: serde_json::Value =
            serde_json::from_str(&request_body(&state).unwrap()).unwrap();

        assert_eq!(body["filter"]["minPrice"], json!(50));
        assert_eq!(body["filter"]["maxPrice"], json!(-1));
        assert_eq!(body["pagination"], json!({ "page": 1, "limit": 20 }));
    }

    #[test]
    fn test_building_does_not_touch_state() {
        let state = QueryState::default();
        let before = state.clone();

        let request = SearchRequest::from_state(&state);

        assert_eq!(request.filter.min_price, NO_BOUND);
        assert_eq!(request.filter.max_price, NO_BOUND);
        assert_eq!(state, before);
        assert_eq!(state.filter.min_price, None);
    }

    #[test]
    fn test_wire_never_contains_null_bounds() {
        let json = request_body(&QueryState::default()).unwrap();
        assert!(!json.contains("null"));
    }

    #[test]
    fn test_partial_payload_merges_with_defaults() {
        let request = SearchRequest::from_json(r#"{"search":"abc"}"#).unwrap();
        let state = request.into_state();

        let expected = QueryState {
            search: "abc".into(),
            ..QueryState::default()
        };
        assert_eq!(state, expected);
    }

    #[test]
    fn test_partial_nested_payload() {
        let request =
            SearchRequest::from_json(r#"{"filter":{"tags":["cat"]},"pagination":{"page":3}}"#)
                .unwrap();

        assert_eq!(request.filter.tags, vec!["cat".to_string()]);
        assert_eq!(request.filter.min_price, NO_BOUND);
        assert_eq!(request.pagination.page, 3);
        assert_eq!(request.pagination.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_null_bounds_are_accepted() {
        let request =
            SearchRequest::from_json(r#"{"filter":{"minPrice":null,"maxPrice":300}}"#).unwrap();
        assert_eq!(request.filter.min_price, NO_BOUND);
        assert_eq!(request.filter.max_price, 300);

        let state = request.into_state();
        assert_eq!(state.filter.min_price, None);
        assert_eq!(state.filter.max_price, Some(300));
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let err = SearchRequest::from_json("{not json").unwrap_err();
        assert!(matches!(err, ArtQueryError::MalformedResponse(_)));

        let err = SearchRequest::from_json(r#"{"pagination":{"page":"one"}}"#).unwrap_err();
        assert!(matches!(err, ArtQueryError::MalformedResponse(_)));
    }

    #[test]
    fn test_offset() {
        let mut request = SearchRequest::default();
        assert_eq!(request.offset(), Some(0));
        request.pagination = PaginationBody { page: 3, limit: 20 };
        assert_eq!(request.offset(), Some(40));
        request.pagination = PaginationBody {
            page: 3,
            limit: i64::MAX,
        };
        assert_eq!(request.offset(), None);
    }

    fn arb_state() -> impl Strategy<Value = QueryState> {
        (
            "[a-z ]{0,12}",
            prop::collection::btree_set("[a-z]{1,8}", 0..4),
            prop::option::of(0i64..10_000),
            prop::option::of(0i64..10_000),
            "(|price|weeklyStars)",
            any::<bool>(),
            -3i64..50,
            1i64..100,
        )
            .prop_map(|(search, tags, min, max, by, asc, page, limit)| QueryState {
                search,
                filter: Filter {
                    tags,
                    min_price: min,
                    max_price: max,
                },
                sort: Sort { by, asc },
                pagination: Pagination { page, limit },
            })
    }

    proptest! {
        #[test]
        fn prop_serialization_is_stable(state in arb_state()) {
            let first = request_body(&state).unwrap();
            let decoded = SearchRequest::from_json(&first).unwrap().into_state();
            let second = request_body(&decoded).unwrap();
            prop_assert_eq!(first, second);
            prop_assert_eq!(decoded, state);
        }
    }
}
