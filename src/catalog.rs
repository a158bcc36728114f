use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::ArtQueryError;
use crate::request_body::{SearchRequest, NO_BOUND};
use crate::state::SortField;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Art {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub creator: String,
    pub price: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub stats: ArtStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ArtStats {
    pub total_downloads: i64,
    pub weekly_downloads: i64,
    pub monthly_downloads: i64,
    pub yearly_downloads: i64,
    pub total_stars: i64,
    pub weekly_stars: i64,
    pub monthly_stars: i64,
    pub yearly_stars: i64,
}

impl ArtStats {
    fn get(&self, field: SortField) -> i64 {
        match field {
            SortField::TotalDownloads => self.total_downloads,
            SortField::WeeklyDownloads => self.weekly_downloads,
            SortField::MonthlyDownloads => self.monthly_downloads,
            SortField::YearlyDownloads => self.yearly_downloads,
            SortField::TotalStars => self.total_stars,
            SortField::WeeklyStars => self.weekly_stars,
            SortField::MonthlyStars => self.monthly_stars,
            SortField::YearlyStars => self.yearly_stars,
            // Price is not a statistic; handled by Art::sort_key
            SortField::Price => 0,
        }
    }
}

impl Art {
    fn sort_key(&self, field: SortField) -> i64 {
        match field {
            SortField::Price => self.price,
            _ => self.stats.get(field),
        }
    }

    fn matches_search(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.creator.to_lowercase().contains(needle)
    }

    fn has_all_tags(&self, tags: &[String]) -> bool {
        tags.iter().all(|tag| self.tags.iter().any(|t| t == tag))
    }
}

/// One page of search results. `total` counts every match, not just the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
    pub total: u64,
    pub items: Vec<Art>,
}

/// Read-only, in-memory set of arts answering search requests.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    arts: Vec<Art>,
}

impl Catalog {
    pub fn new(arts: Vec<Art>) -> Self {
        Catalog { arts }
    }

    /// Loads a JSON array of arts.
    pub fn from_json_file(path: &Path) -> Result<Self, ArtQueryError> {
        let text = fs::read_to_string(path)?;
        let arts: Vec<Art> = serde_json::from_str(&text)?;
        info!("Loaded {} arts from {}", arts.len(), path.display());
        Ok(Catalog { arts })
    }

    pub fn len(&self) -> usize {
        self.arts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arts.is_empty()
    }

    pub fn find_many(&self, req: &SearchRequest) -> Result<SearchPage, ArtQueryError> {
        let sort_field = validate(req)?;

        let needle = req.search.trim().to_lowercase();
        let min = req.filter.min_price;
        let max = req.filter.max_price;

        let mut matches: Vec<&Art> = self
            .arts
            .iter()
            .filter(|art| needle.is_empty() || art.matches_search(&needle))
            .filter(|art| art.has_all_tags(&req.filter.tags))
            .filter(|art| min == NO_BOUND || art.price >= min)
            .filter(|art| max == NO_BOUND || art.price <= max)
            .collect();

        if let Some(field) = sort_field {
            // Stable sort keeps catalog order among equal keys
            matches.sort_by(|a, b| {
                let ord = a.sort_key(field).cmp(&b.sort_key(field));
                if req.sort.asc {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }

        let offset = req.offset().ok_or_else(|| {
            ArtQueryError::InvalidQuery(format!(
                "page {} is out of range for limit {}",
                req.pagination.page, req.pagination.limit
            ))
        })?;

        let total = matches.len() as u64;
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(req.pagination.limit).unwrap_or(usize::MAX);

        let items: Vec<Art> = matches
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        debug!(
            "Search '{}' matched {} arts, returning {}",
            req.search,
            total,
            items.len()
        );

        Ok(SearchPage { total, items })
    }
}

fn validate(req: &SearchRequest) -> Result<Option<SortField>, ArtQueryError> {
    if req.pagination.page < 1 {
        return Err(ArtQueryError::InvalidQuery(format!(
            "page must be at least 1, got {}",
            req.pagination.page
        )));
    }
    if req.pagination.limit < 1 {
        return Err(ArtQueryError::InvalidQuery(format!(
            "limit must be at least 1, got {}",
            req.pagination.limit
        )));
    }
    if req.filter.min_price < NO_BOUND || req.filter.max_price < NO_BOUND {
        return Err(ArtQueryError::InvalidQuery(
            "price bounds must be -1 or non-negative".to_string(),
        ));
    }
    if req.filter.min_price != NO_BOUND
        && req.filter.max_price != NO_BOUND
        && req.filter.min_price > req.filter.max_price
    {
        return Err(ArtQueryError::InvalidQuery(
            "minPrice is greater than maxPrice".to_string(),
        ));
    }
    if req.sort.by.is_empty() {
        return Ok(None);
    }
    req.sort
        .by
        .parse::<SortField>()
        .map(Some)
        .map_err(|_| ArtQueryError::InvalidQuery("invalid sorting type".to_string()))
}
