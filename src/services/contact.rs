//! Contact form service

use anyhow::Context;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use super::activity::{ActivityService, Actor};
use super::mail::Mailer;
use crate::db::Repository;
use crate::models::{ContactInput, ContactMessage, ContactStatus, Record};

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationErrors),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub struct ContactService {
    repo: Arc<dyn Repository<ContactMessage>>,
    activity: Arc<ActivityService>,
    mailer: Arc<Mailer>,
}

impl ContactService {
    pub fn new(
        repo: Arc<dyn Repository<ContactMessage>>,
        activity: Arc<ActivityService>,
        mailer: Arc<Mailer>,
    ) -> Self {
        Self {
            repo,
            activity,
            mailer,
        }
    }

    /// Store a contact form submission and notify the office.
    ///
    /// A failed notification is logged; the message is kept either way.
    pub async fn submit(&self, mut input: ContactInput) -> Result<ContactMessage, ContactError> {
        input.email = input.email.trim().to_string();
        input.validate()?;

        let message = self
            .repo
            .create(&ContactMessage::from(input))
            .await
            .context("Failed to store contact message")?;
        tracing::info!("Received contact message {} from {}", message.id, message.email);

        if let Err(e) = self.mailer.notify_contact(&message).await {
            tracing::error!("Failed to send contact notification for {}: {:#}", message.id, e);
        }
        Ok(message)
    }

    /// Newest first
    pub async fn list(
        &self,
        status: Option<ContactStatus>,
    ) -> Result<Vec<ContactMessage>, ContactError> {
        let mut messages = self
            .repo
            .list_all()
            .await
            .context("Failed to list contact messages")?;
        if let Some(status) = status {
            messages.retain(|m| m.status == status);
        }
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(messages)
    }

    pub async fn set_status(
        &self,
        id: &str,
        status: ContactStatus,
        actor: &Actor,
    ) -> Result<ContactMessage, ContactError> {
        let mut message = self.get(id).await?;
        if message.status == status {
            return Ok(message);
        }
        message.status = status;
        let message = self
            .repo
            .update(&message)
            .await
            .context("Failed to update contact message")?;

        self.activity
            .record(
                actor,
                "update",
                ContactMessage::COLLECTION,
                Some(id),
                json!({ "status": status.as_str() }),
            )
            .await;
        Ok(message)
    }

    pub async fn delete(&self, id: &str, actor: &Actor) -> Result<(), ContactError> {
        let message = self.get(id).await?;
        self.repo
            .delete(id)
            .await
            .context("Failed to delete contact message")?;

        tracing::info!("Deleted contact message {}", id);
        self.activity
            .record(
                actor,
                "delete",
                ContactMessage::COLLECTION,
                Some(id),
                json!({ "email": message.email }),
            )
            .await;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<ContactMessage, ContactError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get contact message")?
            .ok_or_else(|| ContactError::NotFound(format!("Contact message {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MailConfig;
    use crate::db::Repositories;

    fn service(dir: &std::path::Path) -> ContactService {
        let repos = Repositories::json(dir);
        ContactService::new(
            repos.contacts.clone(),
            Arc::new(ActivityService::new(repos.activity.clone())),
            Arc::new(Mailer::new(MailConfig::default())),
        )
    }

    fn input(message: &str) -> ContactInput {
        ContactInput {
            name: "Omar".into(),
            email: " omar@example.com".into(),
            message: message.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_submit_and_triage() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let actor = Actor::system();

        let msg = service
            .submit(input("Please call me about the duplex."))
            .await
            .unwrap();
        assert_eq!(msg.status, ContactStatus::New);
        assert_eq!(msg.email, "omar@example.com");

        let read = service.set_status(&msg.id, ContactStatus::Read, &actor).await.unwrap();
        assert_eq!(read.status, ContactStatus::Read);
        assert!(service.list(Some(ContactStatus::New)).await.unwrap().is_empty());
        assert_eq!(service.list(None).await.unwrap().len(), 1);

        service.delete(&msg.id, &actor).await.unwrap();
        assert!(matches!(
            service.set_status(&msg.id, ContactStatus::Archived, &actor).await,
            Err(ContactError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_rejects_short_message() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let err = service.submit(input("hi")).await.unwrap_err();
        assert!(matches!(err, ContactError::InvalidInput(_)));
        assert!(service.list(None).await.unwrap().is_empty());
    }
}
