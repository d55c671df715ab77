//! Contact form message model

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::record::{new_id, Record};

/// Message sent through the public contact form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
    /// Listing the visitor asked about
    #[serde(default)]
    pub property_slug: Option<String>,
    #[serde(default)]
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

impl Record for ContactMessage {
    const COLLECTION: &'static str = "contact-messages";

    fn id(&self) -> &str {
        &self.id
    }
}

impl From<ContactInput> for ContactMessage {
    fn from(input: ContactInput) -> Self {
        Self {
            id: new_id(),
            name: input.name.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            phone: input.phone.filter(|p| !p.trim().is_empty()),
            subject: input.subject.filter(|s| !s.trim().is_empty()),
            message: input.message,
            property_slug: input.property_slug,
            status: ContactStatus::New,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    #[default]
    New,
    Read,
    Archived,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::New => "new",
            ContactStatus::Read => "read",
            ContactStatus::Archived => "archived",
        }
    }
}

impl std::str::FromStr for ContactStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(ContactStatus::New),
            "read" => Ok(ContactStatus::Read),
            "archived" => Ok(ContactStatus::Archived),
            _ => Err(anyhow::anyhow!("Invalid contact status: {}", s)),
        }
    }
}

/// Digits with the usual separators and an optional leading `+`. Blank is
/// allowed and stored as no phone.
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\+?[0-9][0-9 ()./-]{5,})?\s*$").expect("phone pattern is valid")
});

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ContactInput {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 40), regex(path = *PHONE_RE, message = "invalid phone number"))]
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub subject: Option<String>,
    #[validate(length(min = 10, max = 5000, message = "message must be 10-5000 characters"))]
    pub message: String,
    #[serde(default)]
    pub property_slug: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateContactStatusInput {
    pub status: ContactStatus,
}
