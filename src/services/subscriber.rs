//! Newsletter subscriber service

use anyhow::Context;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use super::activity::{ActivityService, Actor};
use super::content::non_blank;
use crate::db::Repository;
use crate::models::{
    NewsletterSubscriber, Record, SubscribeInput, SubscriberStatus, UnsubscribeInput,
};

#[derive(Debug, Error)]
pub enum SubscriberError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationErrors),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// What a signup did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Created,
    AlreadyActive,
    Resubscribed,
}

pub struct SubscriberService {
    repo: Arc<dyn Repository<NewsletterSubscriber>>,
    activity: Arc<ActivityService>,
}

impl SubscriberService {
    pub fn new(
        repo: Arc<dyn Repository<NewsletterSubscriber>>,
        activity: Arc<ActivityService>,
    ) -> Self {
        Self { repo, activity }
    }

    /// Sign up an address. Repeating a signup is harmless.
    pub async fn subscribe(
        &self,
        mut input: SubscribeInput,
    ) -> Result<(NewsletterSubscriber, SubscribeOutcome), SubscriberError> {
        input.email = input.email.trim().to_lowercase();
        input.validate()?;

        let existing = self
            .repo
            .get_by_key(&input.email)
            .await
            .context("Failed to look up subscriber")?;

        match existing {
            Some(subscriber) if subscriber.is_active() => {
                Ok((subscriber, SubscribeOutcome::AlreadyActive))
            }
            Some(mut subscriber) => {
                subscriber.status = SubscriberStatus::Active;
                subscriber.subscribed_at = Utc::now();
                subscriber.unsubscribed_at = None;
                if let Some(name) = non_blank(input.name) {
                    subscriber.name = Some(name);
                }
                let subscriber = self
                    .repo
                    .update(&subscriber)
                    .await
                    .context("Failed to resubscribe")?;
                tracing::info!("Resubscribed {}", subscriber.email);
                Ok((subscriber, SubscribeOutcome::Resubscribed))
            }
            None => {
                let subscriber = NewsletterSubscriber::new(
                    input.email,
                    non_blank(input.name),
                    non_blank(input.source),
                );
                let subscriber = self
                    .repo
                    .create(&subscriber)
                    .await
                    .context("Failed to create subscriber")?;
                tracing::info!("New newsletter subscriber {}", subscriber.email);
                Ok((subscriber, SubscribeOutcome::Created))
            }
        }
    }

    /// Unsubscribe an address; unknown or already unsubscribed addresses are a no-op
    pub async fn unsubscribe(&self, mut input: UnsubscribeInput) -> Result<(), SubscriberError> {
        input.email = input.email.trim().to_lowercase();
        input.validate()?;

        let Some(mut subscriber) = self
            .repo
            .get_by_key(&input.email)
            .await
            .context("Failed to look up subscriber")?
        else {
            tracing::warn!("Unsubscribe for unknown address {}", input.email);
            return Ok(());
        };
        if !subscriber.is_active() {
            return Ok(());
        }

        subscriber.status = SubscriberStatus::Unsubscribed;
        subscriber.unsubscribed_at = Some(Utc::now());
        self.repo
            .update(&subscriber)
            .await
            .context("Failed to unsubscribe")?;
        tracing::info!("Unsubscribed {}", subscriber.email);
        Ok(())
    }

    /// Newest first
    pub async fn list(
        &self,
        status: Option<SubscriberStatus>,
    ) -> Result<Vec<NewsletterSubscriber>, SubscriberError> {
        let mut subscribers = self
            .repo
            .list_all()
            .await
            .context("Failed to list subscribers")?;
        if let Some(status) = status {
            subscribers.retain(|s| s.status == status);
        }
        subscribers.sort_by(|a, b| b.subscribed_at.cmp(&a.subscribed_at));
        Ok(subscribers)
    }

    pub async fn delete(&self, id: &str, actor: &Actor) -> Result<(), SubscriberError> {
        let subscriber = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get subscriber")?
            .ok_or_else(|| SubscriberError::NotFound(format!("Subscriber {}", id)))?;
        self.repo
            .delete(id)
            .await
            .context("Failed to delete subscriber")?;

        tracing::info!("Deleted subscriber {}", subscriber.email);
        self.activity
            .record(
                actor,
                "delete",
                NewsletterSubscriber::COLLECTION,
                Some(id),
                json!({ "email": subscriber.email }),
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Repositories;

    fn service(dir: &std::path::Path) -> SubscriberService {
        let repos = Repositories::json(dir);
        SubscriberService::new(
            repos.subscribers.clone(),
            Arc::new(ActivityService::new(repos.activity.clone())),
        )
    }

    fn signup(email: &str) -> SubscribeInput {
        SubscribeInput {
            email: email.to_string(),
            name: Some("Kim".to_string()),
            source: Some("footer".to_string()),
        }
    }

    #[tokio::test]
    async fn test_subscribe_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        let (created, outcome) = service.subscribe(signup(" Kim@Example.com ")).await.unwrap();
        assert_eq!(outcome, SubscribeOutcome::Created);
        assert_eq!(created.email, "kim@example.com");

        let (_, outcome) = service.subscribe(signup("kim@example.com")).await.unwrap();
        assert_eq!(outcome, SubscribeOutcome::AlreadyActive);

        service
            .unsubscribe(UnsubscribeInput {
                email: "KIM@example.com".into(),
            })
            .await
            .unwrap();
        let unsubscribed = service.list(Some(SubscriberStatus::Unsubscribed)).await.unwrap();
        assert_eq!(unsubscribed.len(), 1);
        assert!(unsubscribed[0].unsubscribed_at.is_some());

        let (again, outcome) = service.subscribe(signup("kim@example.com")).await.unwrap();
        assert_eq!(outcome, SubscribeOutcome::Resubscribed);
        assert_eq!(again.id, created.id);
        assert!(again.unsubscribed_at.is_none());
        assert_eq!(service.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_email() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let err = service.subscribe(signup("nope")).await.unwrap_err();
        assert!(matches!(err, SubscriberError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let (s, _) = service.subscribe(signup("a@b.co")).await.unwrap();

        service.delete(&s.id, &Actor::system()).await.unwrap();
        assert!(service.list(None).await.unwrap().is_empty());
        assert!(matches!(
            service.delete(&s.id, &Actor::system()).await,
            Err(SubscriberError::NotFound(_))
        ));
    }
}
