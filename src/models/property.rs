//! Property listing model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::record::{new_id, Record};
use super::status::{ContentStatus, Publication};

/// Property listing entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub property_type: PropertyType,
    /// Market state of the listing
    #[serde(default)]
    pub listing: ListingKind,
    /// Publication status on the site
    #[serde(default)]
    pub status: ContentStatus,
    /// Asking price or monthly rent
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub bedrooms: Option<i32>,
    #[serde(default)]
    pub bathrooms: Option<f64>,
    #[serde(default)]
    pub area_sqft: Option<f64>,
    #[serde(default)]
    pub features: Vec<String>,
    /// Image URLs, first one is the cover
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    /// Create a new draft listing
    pub fn new(slug: String, title: String, property_type: PropertyType, listing: ListingKind) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            slug,
            title,
            description: String::new(),
            property_type,
            listing,
            status: ContentStatus::Draft,
            price: None,
            location: String::new(),
            city: String::new(),
            bedrooms: None,
            bathrooms: None,
            area_sqft: None,
            features: Vec::new(),
            images: Vec::new(),
            featured: false,
            published_at: None,
            scheduled_for: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn publication(&self) -> Publication {
        Publication {
            status: self.status,
            published_at: self.published_at,
            scheduled_for: self.scheduled_for,
        }
    }

    pub fn set_publication(&mut self, publication: Publication) {
        self.status = publication.status;
        self.published_at = publication.published_at;
        self.scheduled_for = publication.scheduled_for;
    }

    pub fn is_public(&self) -> bool {
        self.status == ContentStatus::Published
    }
}

impl Record for Property {
    const COLLECTION: &'static str = "properties";

    fn id(&self) -> &str {
        &self.id
    }

    fn key(&self) -> &str {
        &self.slug
    }
}

/// Kind of property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    #[default]
    Residential,
    Commercial,
    Land,
    Industrial,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Residential => "residential",
            PropertyType::Commercial => "commercial",
            PropertyType::Land => "land",
            PropertyType::Industrial => "industrial",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "residential" => Ok(PropertyType::Residential),
            "commercial" => Ok(PropertyType::Commercial),
            "land" => Ok(PropertyType::Land),
            "industrial" => Ok(PropertyType::Industrial),
            _ => Err(anyhow::anyhow!("Invalid property type: {}", s)),
        }
    }
}

/// Market state of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListingKind {
    #[default]
    ForSale,
    ForRent,
    Sold,
    UnderConstruction,
}

impl ListingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingKind::ForSale => "for_sale",
            ListingKind::ForRent => "for_rent",
            ListingKind::Sold => "sold",
            ListingKind::UnderConstruction => "under_construction",
        }
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "for_sale" => Ok(ListingKind::ForSale),
            "for_rent" => Ok(ListingKind::ForRent),
            "sold" => Ok(ListingKind::Sold),
            "under_construction" => Ok(ListingKind::UnderConstruction),
            _ => Err(anyhow::anyhow!("Invalid listing kind: {}", s)),
        }
    }
}

/// Input for creating a listing
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreatePropertyInput {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub property_type: PropertyType,
    #[serde(default)]
    pub listing: ListingKind,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "price cannot be negative"))]
    pub price: Option<f64>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    #[validate(range(min = 0, max = 100))]
    pub bedrooms: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0))]
    pub bathrooms: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub area_sqft: Option<f64>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub status: Option<ContentStatus>,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// Input for updating a listing
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdatePropertyInput {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub slug: Option<String>,
    pub description: Option<String>,
    pub property_type: Option<PropertyType>,
    pub listing: Option<ListingKind>,
    #[validate(range(min = 0.0, message = "price cannot be negative"))]
    pub price: Option<f64>,
    pub location: Option<String>,
    pub city: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub bedrooms: Option<i32>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub bathrooms: Option<f64>,
    #[validate(range(min = 0.0))]
    pub area_sqft: Option<f64>,
    pub features: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub status: Option<ContentStatus>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub change_summary: Option<String>,
}
