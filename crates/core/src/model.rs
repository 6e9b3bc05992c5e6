//! Replica entity types, drafts, and validation
//!
//! Field names serialize in camelCase to match the sync payload, the mirror,
//! and the export document.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{CompanionError, Result};

/// Display color assigned when the user picks none
pub const DEFAULT_COLOR: &str = "#6366F1";
/// Icon tag assigned to new categories
pub const DEFAULT_CATEGORY_ICON: &str = "folder";
/// Upper bound of the star rating
pub const MAX_RATING: u8 = 5;

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_icon() -> String {
    DEFAULT_CATEGORY_ICON.to_string()
}

fn default_created_at() -> DateTime<Utc> {
    Utc::now()
}

fn default_rating() -> u8 {
    3
}

/// Mint a fresh entity id
pub fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

/// A saved prompt as delivered by the mobile app
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub copy_count: u64,
    #[serde(default = "default_created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

/// A prompt folder shown in the sidebar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_color")]
    pub color: String,
}

/// A label attachable to any number of prompts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
}

/// Full replica contents, as synced, mirrored, and exported
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub prompts: Vec<Prompt>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty() && self.categories.is_empty() && self.tags.is_empty()
    }

    /// Sample data for demos and fixtures, shaped like a real phone payload
    pub fn demo() -> Snapshot {
        let now = Utc::now();
        Snapshot {
            categories: vec![
                Category {
                    id: "cat_general".into(),
                    name: "General".into(),
                    icon: "folder".into(),
                    color: "#6366F1".into(),
                },
                Category {
                    id: "cat_articles".into(),
                    name: "Articles".into(),
                    icon: "article".into(),
                    color: "#8B5CF6".into(),
                },
                Category {
                    id: "cat_video".into(),
                    name: "Video".into(),
                    icon: "video".into(),
                    color: "#EC4899".into(),
                },
                Category {
                    id: "cat_images".into(),
                    name: "Images".into(),
                    icon: "image".into(),
                    color: "#10B981".into(),
                },
                Category {
                    id: "cat_marketing".into(),
                    name: "Marketing".into(),
                    icon: "campaign".into(),
                    color: "#F59E0B".into(),
                },
            ],
            tags: vec![
                Tag {
                    id: "tag1".into(),
                    name: "AI".into(),
                    color: "#10B981".into(),
                },
                Tag {
                    id: "tag2".into(),
                    name: "Writing".into(),
                    color: "#3B82F6".into(),
                },
                Tag {
                    id: "tag3".into(),
                    name: "Creative".into(),
                    color: "#EC4899".into(),
                },
            ],
            prompts: vec![
                Prompt {
                    id: "1".into(),
                    title: "Blog Article Generator".into(),
                    content: "Write a comprehensive blog article about [TOPIC].\n\nStructure:\n- Hook: Engaging opening\n- Introduction: Set context\n- Body: 3-5 sections\n- Conclusion: Call to action\n\nTone: Professional yet conversational".into(),
                    notes: Some("Great for SEO content".into()),
                    category_id: Some("cat_articles".into()),
                    tag_ids: vec!["tag1".into(), "tag2".into()],
                    rating: 5,
                    copy_count: 42,
                    created_at: now - Duration::days(7),
                    last_used_at: Some(now - Duration::days(1)),
                    modified_at: None,
                },
                Prompt {
                    id: "2".into(),
                    title: "YouTube Script Template".into(),
                    content: "Create a YouTube video script for [TOPIC].\n\nHOOK (0-5 sec)\nINTRO (5-30 sec)\nCONTENT: Main points\nENGAGEMENT: Like, subscribe\nCTA: Next steps".into(),
                    notes: None,
                    category_id: Some("cat_video".into()),
                    tag_ids: vec!["tag1".into(), "tag3".into()],
                    rating: 4,
                    copy_count: 28,
                    created_at: now - Duration::days(12),
                    last_used_at: Some(now - Duration::days(3)),
                    modified_at: None,
                },
                Prompt {
                    id: "3".into(),
                    title: "Product Description".into(),
                    content: "Write a compelling product description for [PRODUCT].\n\nHeadline\nKey benefits\nPain points\nSocial proof\nCall to action".into(),
                    notes: Some("For e-commerce".into()),
                    category_id: Some("cat_marketing".into()),
                    tag_ids: vec!["tag2".into()],
                    rating: 5,
                    copy_count: 56,
                    created_at: now - Duration::days(16),
                    last_used_at: Some(now - Duration::days(2)),
                    modified_at: None,
                },
            ],
        }
    }
}

/// Editor form contents for creating or updating a prompt
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    /// Comma-separated tag names as typed by the user
    #[serde(default)]
    pub tags: String,
    #[serde(default = "default_rating")]
    pub rating: u8,
}

impl PromptDraft {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() || self.content.trim().is_empty() {
            return Err(CompanionError::Validation(
                "Please fill in title and content".to_string(),
            ));
        }
        if self.rating > MAX_RATING {
            return Err(CompanionError::Validation(format!(
                "rating must be at most {}",
                MAX_RATING
            )));
        }
        Ok(())
    }

    /// Tag names split from the comma-separated input, blanks dropped
    pub fn tag_names(&self) -> Vec<String> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Notes normalized the way the editor submits them: trimmed, empty as None
    pub fn normalized_notes(&self) -> Option<String> {
        match self.notes.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(notes) => Some(notes.to_string()),
        }
    }
}

/// Editor form contents for creating or renaming a category
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
}

impl CategoryDraft {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CompanionError::Validation(
                "Please enter a category name".to_string(),
            ));
        }
        Ok(())
    }
}
