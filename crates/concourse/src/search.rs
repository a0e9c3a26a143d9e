//! Query matching over points of interest.
//!
//! A query is split on whitespace into lowercase terms. A point of interest
//! matches when *every* term is a substring of its name, its description or
//! one of its tags. The empty query matches everything.

use crate::poi::{PoiId, PointOfInterest};

/// Lowercase whitespace-separated terms of `query`.
#[must_use]
pub fn tokenize(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

fn matches_term(poi: &PointOfInterest, term: &str) -> bool {
    poi.name.to_lowercase().contains(term)
        || poi.description.to_lowercase().contains(term)
        || poi.tags.iter().any(|tag| tag.to_lowercase().contains(term))
}

/// Whether `poi` matches all of `terms`.
#[must_use]
pub fn matches(poi: &PointOfInterest, terms: &[String]) -> bool {
    terms.iter().all(|term| matches_term(poi, term))
}

/// Points of interest matching `query`, in their original order.
#[must_use]
pub fn filter<'a>(pois: &'a [PointOfInterest], query: &str) -> Vec<&'a PointOfInterest> {
    let terms = tokenize(query);
    pois.iter().filter(|poi| matches(poi, &terms)).collect()
}

/// The first match of a non-empty query.
#[must_use]
pub fn top_match<'a>(pois: &'a [PointOfInterest], query: &str) -> Option<&'a PointOfInterest> {
    let terms = tokenize(query);
    if terms.is_empty() {
        return None;
    }
    pois.iter().find(|poi| matches(poi, &terms))
}

/// What the shell should do after the query changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Nothing changed.
    Unchanged,
    /// A new top match; focus the camera on it.
    Focus(PoiId),
    /// The query matches nothing; drop the highlight but keep the camera.
    Cleared,
    /// The query was emptied; return to the overview.
    Reset,
}

/// Tracks the query and its highlighted top match across edits.
#[derive(Debug, Default, Clone)]
pub struct SearchState {
    query: String,
    highlighted: Option<PoiId>,
}

impl SearchState {
    /// The current query text.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Whether a non-blank query is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.query.trim().is_empty()
    }

    /// The current top match.
    #[must_use]
    pub fn highlighted(&self) -> Option<PoiId> {
        self.highlighted
    }

    /// Replace the query and recompute the highlight.
    pub fn set_query(&mut self, pois: &[PointOfInterest], query: &str) -> SearchOutcome {
        if query == self.query {
            return SearchOutcome::Unchanged;
        }
        self.query = query.to_string();

        let top = top_match(pois, query).map(|poi| poi.id);
        let was_highlighted = self.highlighted;
        self.highlighted = top;

        match top {
            Some(id) if was_highlighted != Some(id) => SearchOutcome::Focus(id),
            Some(_) => SearchOutcome::Unchanged,
            None if !self.is_active() => SearchOutcome::Reset,
            None if was_highlighted.is_some() => SearchOutcome::Cleared,
            None => SearchOutcome::Unchanged,
        }
    }
}
