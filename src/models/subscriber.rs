//! Newsletter subscriber model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::record::{new_id, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsletterSubscriber {
    pub id: String,
    /// Lowercased email address (unique)
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: SubscriberStatus,
    /// Where the signup came from, e.g. "footer"
    #[serde(default)]
    pub source: Option<String>,
    pub subscribed_at: DateTime<Utc>,
    #[serde(default)]
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

impl NewsletterSubscriber {
    pub fn new(email: String, name: Option<String>, source: Option<String>) -> Self {
        Self {
            id: new_id(),
            email,
            name,
            status: SubscriberStatus::Active,
            source,
            subscribed_at: Utc::now(),
            unsubscribed_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SubscriberStatus::Active
    }
}

impl Record for NewsletterSubscriber {
    const COLLECTION: &'static str = "newsletter-subscribers";

    fn id(&self) -> &str {
        &self.id
    }

    fn key(&self) -> &str {
        &self.email
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    #[default]
    Active,
    Unsubscribed,
}

impl SubscriberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriberStatus::Active => "active",
            SubscriberStatus::Unsubscribed => "unsubscribed",
        }
    }
}

impl std::str::FromStr for SubscriberStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SubscriberStatus::Active),
            "unsubscribed" => Ok(SubscriberStatus::Unsubscribed),
            _ => Err(anyhow::anyhow!("Invalid subscriber status: {}", s)),
        }
    }
}

/// Public signup form
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SubscribeInput {
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 120))]
    pub name: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UnsubscribeInput {
    #[validate(email(message = "invalid email address"))]
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_input_rejects_bad_email() {
        let input = SubscribeInput {
            email: "not-an-email".to_string(),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_key_is_email() {
        let s = NewsletterSubscriber::new("a@b.com".to_string(), None, None);
        assert_eq!(s.key(), "a@b.com");
        assert!(s.is_active());
    }
}
