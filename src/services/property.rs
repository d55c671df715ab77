//! Property listing service

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use super::activity::{ActivityService, Actor};
use super::content::{non_blank, normalize_list, resolve_slug, ContentError};
use super::version::VersionService;
use crate::db::Repository;
use crate::models::{
    ContentStatus, ContentVersion, CreatePropertyInput, ListingKind, Property, PropertyType,
    Publication, Record, UpdatePropertyInput,
};

/// Public listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyFilter {
    pub property_type: Option<PropertyType>,
    pub listing: Option<ListingKind>,
    pub city: Option<String>,
    pub featured: Option<bool>,
}

impl PropertyFilter {
    fn matches(&self, p: &Property) -> bool {
        self.property_type.map_or(true, |t| p.property_type == t)
            && self.listing.map_or(true, |l| p.listing == l)
            && self
                .city
                .as_deref()
                .map_or(true, |c| p.city.eq_ignore_ascii_case(c.trim()))
            && self.featured.map_or(true, |f| p.featured == f)
    }
}

pub struct PropertyService {
    repo: Arc<dyn Repository<Property>>,
    versions: Arc<VersionService>,
    activity: Arc<ActivityService>,
}

impl PropertyService {
    pub fn new(
        repo: Arc<dyn Repository<Property>>,
        versions: Arc<VersionService>,
        activity: Arc<ActivityService>,
    ) -> Self {
        Self {
            repo,
            versions,
            activity,
        }
    }

    pub async fn list(&self, status: Option<ContentStatus>) -> Result<Vec<Property>, ContentError> {
        let mut properties = self.repo.list_all().await.context("Failed to list properties")?;
        if let Some(status) = status {
            properties.retain(|p| p.status == status);
        }
        properties.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(properties)
    }

    /// Published listings: featured first, then most recently published
    pub async fn list_public(&self, filter: &PropertyFilter) -> Result<Vec<Property>, ContentError> {
        let mut properties = self.repo.list_all().await.context("Failed to list properties")?;
        properties.retain(|p| p.is_public() && filter.matches(p));
        properties.sort_by(|a, b| {
            b.featured
                .cmp(&a.featured)
                .then_with(|| b.published_at.cmp(&a.published_at))
        });
        Ok(properties)
    }

    pub async fn get(&self, id: &str) -> Result<Property, ContentError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get property")?
            .ok_or_else(|| ContentError::NotFound(format!("Property {}", id)))
    }

    pub async fn get_public(&self, slug: &str) -> Result<Property, ContentError> {
        self.repo
            .get_by_key(slug)
            .await
            .context("Failed to get property by slug")?
            .filter(Property::is_public)
            .ok_or_else(|| ContentError::NotFound(format!("Property {}", slug)))
    }

    pub async fn create(
        &self,
        input: CreatePropertyInput,
        actor: &Actor,
    ) -> Result<Property, ContentError> {
        input.validate()?;

        let title = input.title.trim().to_string();
        let slug = resolve_slug(self.repo.as_ref(), input.slug.as_deref(), &title, None).await?;

        let mut property = Property::new(slug, title, input.property_type, input.listing);
        property.description = input.description;
        property.price = input.price;
        property.location = input.location.trim().to_string();
        property.city = input.city.trim().to_string();
        property.bedrooms = input.bedrooms;
        property.bathrooms = input.bathrooms;
        property.area_sqft = input.area_sqft;
        property.features = normalize_list(input.features);
        property.images = normalize_list(input.images);
        property.featured = input.featured;

        let publication = Publication {
            status: input.status.unwrap_or_default(),
            published_at: None,
            scheduled_for: input.scheduled_for,
        }
        .resolve(property.created_at)
        .map_err(ContentError::Validation)?;
        property.set_publication(publication);

        let property = self
            .repo
            .create(&property)
            .await
            .context("Failed to create property")?;

        tracing::info!("Created property {} ({})", property.slug, property.status);
        self.activity
            .record(
                actor,
                "create",
                Property::COLLECTION,
                Some(&property.id),
                json!({ "title": property.title, "status": property.status }),
            )
            .await;

        Ok(property)
    }

    pub async fn update(
        &self,
        id: &str,
        input: UpdatePropertyInput,
        actor: &Actor,
    ) -> Result<Property, ContentError> {
        input.validate()?;
        let current = self.get(id).await?;
        let now = Utc::now();
        let mut property = current.clone();

        if let Some(title) = input.title {
            property.title = title.trim().to_string();
        }
        if let Some(slug) = input.slug {
            if slug != property.slug {
                property.slug =
                    resolve_slug(self.repo.as_ref(), Some(&slug), &property.title, Some(id)).await?;
            }
        }
        if let Some(description) = input.description {
            property.description = description;
        }
        if let Some(property_type) = input.property_type {
            property.property_type = property_type;
        }
        if let Some(listing) = input.listing {
            property.listing = listing;
        }
        if input.price.is_some() {
            property.price = input.price;
        }
        if let Some(location) = input.location {
            property.location = location.trim().to_string();
        }
        if let Some(city) = input.city {
            property.city = city.trim().to_string();
        }
        if input.bedrooms.is_some() {
            property.bedrooms = input.bedrooms;
        }
        if input.bathrooms.is_some() {
            property.bathrooms = input.bathrooms;
        }
        if input.area_sqft.is_some() {
            property.area_sqft = input.area_sqft;
        }
        if let Some(features) = input.features {
            property.features = normalize_list(features);
        }
        if let Some(images) = input.images {
            property.images = normalize_list(images);
        }
        if let Some(featured) = input.featured {
            property.featured = featured;
        }

        let mut publication = property.publication();
        if let Some(status) = input.status {
            publication.status = status;
        }
        if input.scheduled_for.is_some() {
            publication.scheduled_for = input.scheduled_for;
        }
        property.set_publication(publication.resolve(now).map_err(ContentError::Validation)?);

        property.updated_at = current.updated_at;
        if property == current {
            return Ok(current);
        }
        property.updated_at = now;

        self.versions
            .snapshot(&current, actor, non_blank(input.change_summary))
            .await?;
        let property = self
            .repo
            .update(&property)
            .await
            .context("Failed to update property")?;

        tracing::info!("Updated property {}", property.slug);
        self.activity
            .record(
                actor,
                "update",
                Property::COLLECTION,
                Some(&property.id),
                json!({ "title": property.title, "status": property.status }),
            )
            .await;

        Ok(property)
    }

    pub async fn delete(&self, id: &str, actor: &Actor) -> Result<(), ContentError> {
        let property = self.get(id).await?;
        self.versions
            .snapshot(&property, actor, Some("Deleted".to_string()))
            .await?;
        self.repo
            .delete(id)
            .await
            .context("Failed to delete property")?;

        tracing::info!("Deleted property {}", property.slug);
        self.activity
            .record(
                actor,
                "delete",
                Property::COLLECTION,
                Some(id),
                json!({ "title": property.title }),
            )
            .await;
        Ok(())
    }

    pub async fn versions(&self, id: &str) -> Result<Vec<ContentVersion>, ContentError> {
        Ok(self.versions.list(Property::COLLECTION, id).await?)
    }

    /// Bring back the state saved in `version`, recreating the listing if it
    /// was deleted
    pub async fn restore(
        &self,
        id: &str,
        version: i32,
        actor: &Actor,
    ) -> Result<Property, ContentError> {
        let saved = self
            .versions
            .get(Property::COLLECTION, id, version)
            .await?
            .ok_or_else(|| ContentError::NotFound(format!("Version {} of property {}", version, id)))?;

        let mut property: Property = serde_json::from_value(saved.snapshot)
            .context("Stored version is not a valid property")?;
        property.id = id.to_string();

        let slug = property.slug.clone();
        property.slug =
            resolve_slug(self.repo.as_ref(), Some(&slug), &property.title, Some(id)).await?;

        let now = Utc::now();
        property.set_publication(
            property
                .publication()
                .resolve(now)
                .map_err(ContentError::Validation)?,
        );
        property.updated_at = now;

        let current = self.repo.get_by_id(id).await.context("Failed to get property")?;
        let property = match current {
            Some(current) => {
                self.versions
                    .snapshot(&current, actor, Some(format!("Before restoring version {}", version)))
                    .await?;
                self.repo.update(&property).await
            }
            None => self.repo.create(&property).await,
        }
        .context("Failed to restore property")?;

        tracing::info!("Restored property {} to version {}", property.slug, version);
        self.activity
            .record(
                actor,
                "restore",
                Property::COLLECTION,
                Some(id),
                json!({ "version": version }),
            )
            .await;

        Ok(property)
    }

    /// Publish scheduled listings whose time has come
    pub async fn publish_due(&self, now: DateTime<Utc>) -> Result<usize, ContentError> {
        let due: Vec<Property> = self
            .repo
            .list_all()
            .await
            .context("Failed to list properties")?
            .into_iter()
            .filter(|p| p.publication().is_due(now))
            .collect();

        let mut published = 0;
        for mut property in due {
            property.set_publication(
                property
                    .publication()
                    .resolve(now)
                    .map_err(ContentError::Validation)?,
            );
            property.updated_at = now;
            match self.repo.update(&property).await {
                Ok(_) => {
                    published += 1;
                    tracing::info!("Published scheduled property {}", property.slug);
                    self.activity
                        .record(
                            &Actor::system(),
                            "publish",
                            Property::COLLECTION,
                            Some(&property.id),
                            json!({ "title": property.title }),
                        )
                        .await;
                }
                Err(e) => tracing::error!("Failed to publish property {}: {:#}", property.slug, e),
            }
        }
        Ok(published)
    }
}
