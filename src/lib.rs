//! News Aggregator - merges many unreliable article feeds into one list
//!
//! Feeds for a locale are fetched concurrently, normalized, deduplicated by
//! link, sorted newest first and capped. Successful results are mirrored into
//! an optional sqlite store that is served when live fetching fails.

pub mod aggregator;
pub mod article;
pub mod config;
pub mod db;
pub mod fetcher;
pub mod normalize;
pub mod persistence;
pub mod routes;
pub mod service;
pub mod sources;

#[cfg(test)]
mod test_support;
