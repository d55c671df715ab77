//! Testimonial model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::record::{new_id, Record};
use super::status::ContentStatus;

/// Client testimonial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testimonial {
    pub id: String,
    pub client_name: String,
    /// Job title or relation, e.g. "Homeowner"
    #[serde(default)]
    pub client_title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    pub content: String,
    /// 1 to 5 stars
    #[serde(default = "default_rating")]
    pub rating: i32,
    /// Project the testimonial refers to
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub status: ContentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_rating() -> i32 {
    5
}

impl Testimonial {
    pub fn new(client_name: String, content: String, rating: i32) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            client_name,
            client_title: None,
            company: None,
            content,
            rating,
            project: None,
            photo: None,
            featured: false,
            status: ContentStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_public(&self) -> bool {
        self.status == ContentStatus::Published
    }
}

impl Record for Testimonial {
    const COLLECTION: &'static str = "testimonials";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateTestimonialInput {
    #[validate(length(min = 1, max = 120, message = "client_name must be 1-120 characters"))]
    pub client_name: String,
    #[serde(default)]
    pub client_title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[validate(length(min = 1, max = 2000, message = "content must be 1-2000 characters"))]
    pub content: String,
    #[serde(default = "default_rating")]
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: i32,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    #[validate(url)]
    pub photo: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub status: Option<ContentStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateTestimonialInput {
    #[validate(length(min = 1, max = 120, message = "client_name must be 1-120 characters"))]
    pub client_name: Option<String>,
    pub client_title: Option<String>,
    pub company: Option<String>,
    #[validate(length(min = 1, max = 2000, message = "content must be 1-2000 characters"))]
    pub content: Option<String>,
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: Option<i32>,
    pub project: Option<String>,
    #[validate(url)]
    pub photo: Option<String>,
    pub featured: Option<bool>,
    pub status: Option<ContentStatus>,
    pub change_summary: Option<String>,
}
