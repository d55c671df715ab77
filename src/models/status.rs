//! Publication status shared by blog posts, properties and testimonials

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Content publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    /// Draft - not visible to public
    #[default]
    Draft,
    /// Published - visible to public
    Published,
    /// Scheduled - becomes published at `scheduled_for`
    Scheduled,
}

impl ContentStatus {
    /// Convert status to its storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Published => "published",
            ContentStatus::Scheduled => "scheduled",
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(ContentStatus::Draft),
            "published" => Ok(ContentStatus::Published),
            "scheduled" => Ok(ContentStatus::Scheduled),
            _ => Err(anyhow::anyhow!("Invalid content status: {}", s)),
        }
    }
}

/// Publication fields of a schedulable record.
///
/// Keeps `published_at` / `scheduled_for` consistent with `status`:
/// published records always carry `published_at`, scheduled records always
/// carry `scheduled_for`, and a schedule that is already due is published
/// immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Publication {
    pub status: ContentStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl Publication {
    /// Resolve the requested status at `now`.
    ///
    /// Returns an error message when a schedule is requested without a date.
    pub fn resolve(mut self, now: DateTime<Utc>) -> Result<Self, String> {
        match self.status {
            ContentStatus::Draft => {
                self.published_at = None;
                self.scheduled_for = None;
            }
            ContentStatus::Published => {
                self.published_at.get_or_insert(now);
                self.scheduled_for = None;
            }
            ContentStatus::Scheduled => {
                let at = self
                    .scheduled_for
                    .ok_or_else(|| "scheduled_for is required for scheduled content".to_string())?;
                if at <= now {
                    self.status = ContentStatus::Published;
                    self.published_at = Some(at);
                    self.scheduled_for = None;
                } else {
                    self.published_at = None;
                }
            }
        }
        Ok(self)
    }

    /// Whether the record is due for promotion at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ContentStatus::Scheduled && self.scheduled_for.is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn publication(status: ContentStatus) -> Publication {
        Publication {
            status,
            published_at: None,
            scheduled_for: None,
        }
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [ContentStatus::Draft, ContentStatus::Published, ContentStatus::Scheduled] {
            assert_eq!(status.as_str().parse::<ContentStatus>().unwrap(), status);
        }
        assert!("archived".parse::<ContentStatus>().is_err());
        assert_eq!("PUBLISHED".parse::<ContentStatus>().unwrap(), ContentStatus::Published);
    }

    #[test]
    fn test_publish_sets_published_at() {
        let now = Utc::now();
        let resolved = publication(ContentStatus::Published).resolve(now).unwrap();
        assert_eq!(resolved.published_at, Some(now));
    }

    #[test]
    fn test_publish_keeps_existing_published_at() {
        let now = Utc::now();
        let earlier = now - Duration::days(3);
        let mut p = publication(ContentStatus::Published);
        p.published_at = Some(earlier);
        assert_eq!(p.resolve(now).unwrap().published_at, Some(earlier));
    }

    #[test]
    fn test_draft_clears_dates() {
        let now = Utc::now();
        let mut p = publication(ContentStatus::Draft);
        p.published_at = Some(now);
        let resolved = p.resolve(now).unwrap();
        assert!(resolved.published_at.is_none());
        assert!(resolved.scheduled_for.is_none());
    }

    #[test]
    fn test_schedule_requires_date() {
        assert!(publication(ContentStatus::Scheduled).resolve(Utc::now()).is_err());
    }

    #[test]
    fn test_future_schedule_stays_scheduled() {
        let now = Utc::now();
        let mut p = publication(ContentStatus::Scheduled);
        p.scheduled_for = Some(now + Duration::hours(2));
        let resolved = p.resolve(now).unwrap();
        assert_eq!(resolved.status, ContentStatus::Scheduled);
        assert!(resolved.published_at.is_none());
        assert!(!resolved.is_due(now));
        assert!(resolved.is_due(now + Duration::hours(3)));
    }

    #[test]
    fn test_past_schedule_publishes_immediately() {
        let now = Utc::now();
        let at = now - Duration::minutes(5);
        let mut p = publication(ContentStatus::Scheduled);
        p.scheduled_for = Some(at);
        let resolved = p.resolve(now).unwrap();
        assert_eq!(resolved.status, ContentStatus::Published);
        assert_eq!(resolved.published_at, Some(at));
        assert!(resolved.scheduled_for.is_none());
    }
}
