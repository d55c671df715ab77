//! Testimonial service

use anyhow::Context;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use super::activity::{ActivityService, Actor};
use super::content::{non_blank, ContentError};
use super::version::VersionService;
use crate::db::Repository;
use crate::models::{
    ContentStatus, ContentVersion, CreateTestimonialInput, Record, Testimonial,
    UpdateTestimonialInput,
};

pub struct TestimonialService {
    repo: Arc<dyn Repository<Testimonial>>,
    versions: Arc<VersionService>,
    activity: Arc<ActivityService>,
}

/// Testimonials have no publication date to schedule against
fn check_status(status: ContentStatus) -> Result<ContentStatus, ContentError> {
    if status == ContentStatus::Scheduled {
        return Err(ContentError::Validation(
            "testimonials cannot be scheduled".to_string(),
        ));
    }
    Ok(status)
}

impl TestimonialService {
    pub fn new(
        repo: Arc<dyn Repository<Testimonial>>,
        versions: Arc<VersionService>,
        activity: Arc<ActivityService>,
    ) -> Self {
        Self {
            repo,
            versions,
            activity,
        }
    }

    pub async fn list(
        &self,
        status: Option<ContentStatus>,
    ) -> Result<Vec<Testimonial>, ContentError> {
        let mut items = self
            .repo
            .list_all()
            .await
            .context("Failed to list testimonials")?;
        if let Some(status) = status {
            items.retain(|t| t.status == status);
        }
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    /// Published testimonials, featured ones first
    pub async fn list_public(&self, featured: Option<bool>) -> Result<Vec<Testimonial>, ContentError> {
        let mut items = self.list(Some(ContentStatus::Published)).await?;
        if let Some(featured) = featured {
            items.retain(|t| t.featured == featured);
        }
        items.sort_by(|a, b| b.featured.cmp(&a.featured));
        Ok(items)
    }

    pub async fn get(&self, id: &str) -> Result<Testimonial, ContentError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get testimonial")?
            .ok_or_else(|| ContentError::NotFound(format!("Testimonial {}", id)))
    }

    pub async fn create(
        &self,
        input: CreateTestimonialInput,
        actor: &Actor,
    ) -> Result<Testimonial, ContentError> {
        input.validate()?;
        let status = check_status(input.status.unwrap_or_default())?;

        let mut testimonial = Testimonial::new(
            input.client_name.trim().to_string(),
            input.content.trim().to_string(),
            input.rating,
        );
        testimonial.client_title = non_blank(input.client_title);
        testimonial.company = non_blank(input.company);
        testimonial.project = non_blank(input.project);
        testimonial.photo = non_blank(input.photo);
        testimonial.featured = input.featured;
        testimonial.status = status;

        let testimonial = self
            .repo
            .create(&testimonial)
            .await
            .context("Failed to create testimonial")?;

        tracing::info!("Created testimonial from {}", testimonial.client_name);
        self.activity
            .record(
                actor,
                "create",
                Testimonial::COLLECTION,
                Some(&testimonial.id),
                json!({ "client_name": testimonial.client_name }),
            )
            .await;
        Ok(testimonial)
    }

    pub async fn update(
        &self,
        id: &str,
        input: UpdateTestimonialInput,
        actor: &Actor,
    ) -> Result<Testimonial, ContentError> {
        input.validate()?;
        let current = self.get(id).await?;
        let mut testimonial = current.clone();

        if let Some(name) = input.client_name {
            testimonial.client_name = name.trim().to_string();
        }
        if input.client_title.is_some() {
            testimonial.client_title = non_blank(input.client_title);
        }
        if input.company.is_some() {
            testimonial.company = non_blank(input.company);
        }
        if let Some(content) = input.content {
            testimonial.content = content.trim().to_string();
        }
        if let Some(rating) = input.rating {
            testimonial.rating = rating;
        }
        if input.project.is_some() {
            testimonial.project = non_blank(input.project);
        }
        if input.photo.is_some() {
            testimonial.photo = non_blank(input.photo);
        }
        if let Some(featured) = input.featured {
            testimonial.featured = featured;
        }
        if let Some(status) = input.status {
            testimonial.status = check_status(status)?;
        }

        if testimonial == current {
            return Ok(current);
        }
        testimonial.updated_at = Utc::now();

        self.versions
            .snapshot(&current, actor, non_blank(input.change_summary))
            .await?;
        let testimonial = self
            .repo
            .update(&testimonial)
            .await
            .context("Failed to update testimonial")?;

        self.activity
            .record(
                actor,
                "update",
                Testimonial::COLLECTION,
                Some(id),
                json!({ "client_name": testimonial.client_name, "status": testimonial.status }),
            )
            .await;
        Ok(testimonial)
    }

    pub async fn delete(&self, id: &str, actor: &Actor) -> Result<(), ContentError> {
        let testimonial = self.get(id).await?;
        self.versions
            .snapshot(&testimonial, actor, Some("Deleted".to_string()))
            .await?;
        self.repo
            .delete(id)
            .await
            .context("Failed to delete testimonial")?;

        tracing::info!("Deleted testimonial {}", id);
        self.activity
            .record(
                actor,
                "delete",
                Testimonial::COLLECTION,
                Some(id),
                json!({ "client_name": testimonial.client_name }),
            )
            .await;
        Ok(())
    }

    pub async fn versions(&self, id: &str) -> Result<Vec<ContentVersion>, ContentError> {
        Ok(self.versions.list(Testimonial::COLLECTION, id).await?)
    }

    pub async fn restore(
        &self,
        id: &str,
        version: i32,
        actor: &Actor,
    ) -> Result<Testimonial, ContentError> {
        let saved = self
            .versions
            .get(Testimonial::COLLECTION, id, version)
            .await?
            .ok_or_else(|| {
                ContentError::NotFound(format!("Version {} of testimonial {}", version, id))
            })?;

        let mut testimonial: Testimonial = serde_json::from_value(saved.snapshot)
            .context("Stored version is not a valid testimonial")?;
        testimonial.id = id.to_string();
        testimonial.updated_at = Utc::now();

        let current = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get testimonial")?;
        let testimonial = match current {
            Some(current) => {
                self.versions
                    .snapshot(&current, actor, Some(format!("Before restoring version {}", version)))
                    .await?;
                self.repo.update(&testimonial).await
            }
            None => self.repo.create(&testimonial).await,
        }
        .context("Failed to restore testimonial")?;

        self.activity
            .record(
                actor,
                "restore",
                Testimonial::COLLECTION,
                Some(id),
                json!({ "version": version }),
            )
            .await;
        Ok(testimonial)
    }
}
