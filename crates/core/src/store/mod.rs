//! In-memory replica of the phone's prompt library
//!
//! All reads come from memory. Every mutation lands in memory first, then
//! re-serializes the full replica into the persisted mirror and notifies
//! subscribers.

use std::sync::Mutex;

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::db::{kv, Db};
use crate::errors::{CompanionError, Result};
use crate::events::{AppEvent, EventBus};
use crate::exchange::{self, ImportOutcome};
use crate::model::{self, Category, CategoryDraft, Prompt, PromptDraft, Snapshot, Tag};

pub mod query;

pub use query::{category_counts, CategoryCount, CategoryFilter, PromptQuery, SortKey};

/// A prompt with its category and tags resolved for display
///
/// Dangling category references resolve to nothing here; shells present
/// those as "General".
#[derive(Debug, Clone, Serialize)]
pub struct PromptDetail {
    pub prompt: Prompt,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
}

impl PromptDetail {
    /// Display name, with the fallback uncategorized prompts get
    pub fn category_name(&self) -> &str {
        self.category
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or("General")
    }
}

/// Replica plus its persistence mirror
pub struct ReplicaStore {
    state: Mutex<Snapshot>,
    db: Db,
    events: EventBus,
}

impl ReplicaStore {
    pub fn new(db: Db, events: EventBus) -> ReplicaStore {
        ReplicaStore {
            state: Mutex::new(Snapshot::default()),
            db,
            events,
        }
    }

    /// Replace the whole replica with an inbound snapshot
    pub async fn bulk_load(&self, snapshot: Snapshot) -> Result<()> {
        debug!(
            prompts = snapshot.prompts.len(),
            categories = snapshot.categories.len(),
            tags = snapshot.tags.len(),
            "loading replica"
        );

        {
            let mut state = self.state.lock().unwrap();
            *state = snapshot;
        }

        self.mirror().await?;
        self.events.emit(AppEvent::ReplicaChanged);
        Ok(())
    }

    /// Create a prompt from an editor draft; newest prompts sit first
    pub async fn create_prompt(&self, draft: PromptDraft) -> Result<Prompt> {
        draft.validate()?;

        let prompt = {
            let mut state = self.state.lock().unwrap();
            let tag_ids = resolve_tag_ids(&mut state.tags, draft.tag_names());

            let prompt = Prompt {
                id: model::fresh_id(),
                title: draft.title.trim().to_string(),
                content: draft.content.trim().to_string(),
                notes: draft.normalized_notes(),
                category_id: normalize_category(draft.category_id.as_deref()),
                tag_ids,
                rating: draft.rating,
                copy_count: 0,
                created_at: Utc::now(),
                last_used_at: None,
                modified_at: None,
            };
            state.prompts.insert(0, prompt.clone());
            prompt
        };

        self.mirror().await?;
        self.events.emit(AppEvent::ReplicaChanged);
        Ok(prompt)
    }

    /// Overwrite the named fields of an existing prompt
    ///
    /// Identity, creation time, and copy bookkeeping never move here.
    pub async fn update_prompt(&self, id: &str, draft: PromptDraft) -> Result<Prompt> {
        draft.validate()?;

        let prompt = {
            let mut state = self.state.lock().unwrap();
            let idx = state
                .prompts
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(|| CompanionError::NotFound(format!("prompt {}", id)))?;

            let tag_ids = resolve_tag_ids(&mut state.tags, draft.tag_names());

            let prompt = &mut state.prompts[idx];
            prompt.title = draft.title.trim().to_string();
            prompt.content = draft.content.trim().to_string();
            prompt.notes = draft.normalized_notes();
            prompt.category_id = normalize_category(draft.category_id.as_deref());
            prompt.tag_ids = tag_ids;
            prompt.rating = draft.rating;
            prompt.modified_at = Some(Utc::now());
            prompt.clone()
        };

        self.mirror().await?;
        self.events.emit(AppEvent::ReplicaChanged);
        Ok(prompt)
    }

    /// Remove a prompt; absent ids are a quiet no-op
    pub async fn delete_prompt(&self, id: &str) -> Result<bool> {
        let removed = {
            let mut state = self.state.lock().unwrap();
            let before = state.prompts.len();
            state.prompts.retain(|p| p.id != id);
            state.prompts.len() != before
        };

        if removed {
            self.mirror().await?;
            self.events.emit(AppEvent::ReplicaChanged);
        }
        Ok(removed)
    }

    /// Bump the copy counter and stamp last use; absent ids are a no-op
    pub async fn record_copy(&self, id: &str) -> Result<Option<Prompt>> {
        let updated = {
            let mut state = self.state.lock().unwrap();
            state.prompts.iter_mut().find(|p| p.id == id).map(|prompt| {
                prompt.copy_count += 1;
                prompt.last_used_at = Some(Utc::now());
                prompt.clone()
            })
        };

        if updated.is_some() {
            self.mirror().await?;
            self.events.emit(AppEvent::ReplicaChanged);
        }
        Ok(updated)
    }

    /// Create a category, or rename/recolor an existing one
    pub async fn save_category(
        &self,
        draft: CategoryDraft,
        existing_id: Option<&str>,
    ) -> Result<Category> {
        draft.validate()?;

        let category = {
            let mut state = self.state.lock().unwrap();
            match existing_id {
                Some(id) => {
                    let category = state
                        .categories
                        .iter_mut()
                        .find(|c| c.id == id)
                        .ok_or_else(|| CompanionError::NotFound(format!("category {}", id)))?;
                    category.name = draft.name.trim().to_string();
                    category.color = draft.color.clone();
                    category.clone()
                },
                None => {
                    let category = Category {
                        id: model::fresh_id(),
                        name: draft.name.trim().to_string(),
                        icon: model::DEFAULT_CATEGORY_ICON.to_string(),
                        color: draft.color.clone(),
                    };
                    state.categories.push(category.clone());
                    category
                },
            }
        };

        self.mirror().await?;
        self.events.emit(AppEvent::ReplicaChanged);
        Ok(category)
    }

    /// Merge an imported snapshot; ids already held are left untouched
    pub async fn merge_snapshot(&self, incoming: Snapshot) -> Result<ImportOutcome> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            exchange::merge(&mut state, incoming)
        };

        self.mirror().await?;
        self.events.emit(AppEvent::ReplicaChanged);
        Ok(outcome)
    }

    /// Empty the replica and drop the persisted mirror (disconnect path)
    pub async fn clear(&self) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            *state = Snapshot::default();
        }

        kv::remove(&self.db, kv::SESSION_SNAPSHOT).await?;
        self.events.emit(AppEvent::ReplicaChanged);
        Ok(())
    }

    /// Clone of the full replica
    pub fn snapshot(&self) -> Snapshot {
        self.state.lock().unwrap().clone()
    }

    /// Filtered, ordered prompt list for the grid
    pub fn query(&self, query: &PromptQuery) -> Vec<Prompt> {
        query::run(&self.state.lock().unwrap(), query)
    }

    /// One prompt with category and tags resolved
    pub fn prompt_detail(&self, id: &str) -> Option<PromptDetail> {
        let state = self.state.lock().unwrap();
        let prompt = state.prompts.iter().find(|p| p.id == id)?.clone();

        let category = prompt
            .category_id
            .as_deref()
            .and_then(|cid| state.categories.iter().find(|c| c.id == cid))
            .cloned();
        let tags = state
            .tags
            .iter()
            .filter(|t| prompt.tag_ids.contains(&t.id))
            .cloned()
            .collect();

        Some(PromptDetail {
            prompt,
            category,
            tags,
        })
    }

    /// Sidebar counts, in replica order
    pub fn category_counts(&self) -> Vec<CategoryCount> {
        query::category_counts(&self.state.lock().unwrap())
    }

    /// Total number of prompts held
    pub fn prompt_count(&self) -> usize {
        self.state.lock().unwrap().prompts.len()
    }

    /// Serialize the replica into the mirror key
    async fn mirror(&self) -> Result<()> {
        let json = {
            let state = self.state.lock().unwrap();
            serde_json::to_string(&*state)?
        };
        kv::set(&self.db, kv::SESSION_SNAPSHOT, &json).await
    }
}

/// Map tag names to ids, creating missing tags once
///
/// Matching is case-insensitive on the tag name; the id list keeps the
/// input order with duplicates collapsed.
fn resolve_tag_ids(tags: &mut Vec<Tag>, names: Vec<String>) -> Vec<String> {
    let mut ids: Vec<String> = Vec::with_capacity(names.len());

    for name in names {
        let id = match tags
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(&name))
        {
            Some(tag) => tag.id.clone(),
            None => {
                let tag = Tag {
                    id: model::fresh_id(),
                    name,
                    color: model::DEFAULT_COLOR.to_string(),
                };
                let id = tag.id.clone();
                tags.push(tag);
                id
            },
        };

        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    ids
}

/// The editor submits an empty select value when no category applies
fn normalize_category(raw: Option<&str>) -> Option<String> {
    match raw {
        None | Some("") => None,
        Some(id) => Some(id.to_string()),
    }
}
