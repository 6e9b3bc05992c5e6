//! Pure read path over the replica
//!
//! Filtering and ordering never mutate; shells call these on every render.

use serde::Serialize;

use crate::model::{Category, Prompt, Snapshot};

/// Category filter: everything, or one folder by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(String),
}

impl CategoryFilter {
    /// Parse the wire value: the literal `all`, or a category id
    pub fn parse(raw: &str) -> CategoryFilter {
        if raw == "all" {
            CategoryFilter::All
        } else {
            CategoryFilter::Category(raw.to_string())
        }
    }
}

/// Sort order for the prompt grid; every key orders descending
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    DateCreated,
    LastUsed,
    UsageCount,
    Rating,
}

impl SortKey {
    /// Parse the wire value; anything unrecognized falls back to the default
    pub fn parse(raw: &str) -> SortKey {
        match raw {
            "last_used" => SortKey::LastUsed,
            "usage_count" => SortKey::UsageCount,
            "rating" => SortKey::Rating,
            _ => SortKey::DateCreated,
        }
    }
}

/// Prompt grid query
#[derive(Debug, Clone, Default)]
pub struct PromptQuery {
    pub category: CategoryFilter,
    pub search: String,
    pub sort: SortKey,
}

/// Filter and order prompts for display
///
/// Search matches a lowercased substring of title or content. Sorting is
/// stable: prompts with equal keys keep their replica order, newest-created
/// first for fresh entries.
pub fn run(snapshot: &Snapshot, query: &PromptQuery) -> Vec<Prompt> {
    let needle = query.search.to_lowercase();

    let mut filtered: Vec<Prompt> = snapshot
        .prompts
        .iter()
        .filter(|p| match &query.category {
            CategoryFilter::All => true,
            CategoryFilter::Category(id) => p.category_id.as_deref() == Some(id.as_str()),
        })
        .filter(|p| {
            needle.is_empty()
                || p.title.to_lowercase().contains(&needle)
                || p.content.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect();

    match query.sort {
        SortKey::DateCreated => filtered.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        // A prompt never copied sorts as if last used at the epoch
        SortKey::LastUsed => filtered.sort_by(|a, b| {
            let a_used = a.last_used_at.map(|t| t.timestamp_millis()).unwrap_or(0);
            let b_used = b.last_used_at.map(|t| t.timestamp_millis()).unwrap_or(0);
            b_used.cmp(&a_used)
        }),
        SortKey::UsageCount => filtered.sort_by(|a, b| b.copy_count.cmp(&a.copy_count)),
        SortKey::Rating => filtered.sort_by(|a, b| b.rating.cmp(&a.rating)),
    }

    filtered
}

/// Sidebar datum: a category plus how many prompts it holds
#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    #[serde(flatten)]
    pub category: Category,
    pub count: usize,
}

/// Per-category prompt counts, in replica order
pub fn category_counts(snapshot: &Snapshot) -> Vec<CategoryCount> {
    snapshot
        .categories
        .iter()
        .map(|category| CategoryCount {
            count: snapshot
                .prompts
                .iter()
                .filter(|p| p.category_id.as_deref() == Some(category.id.as_str()))
                .count(),
            category: category.clone(),
        })
        .collect()
}
