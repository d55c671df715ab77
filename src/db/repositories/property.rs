//! Property table mapping

use anyhow::Result;
use sqlx::postgres::{PgRow, Postgres};
use sqlx::query_builder::Separated;
use sqlx::Row;

use super::postgres::{get_parsed, PgRecord};
use crate::models::Property;

impl PgRecord for Property {
    const TABLE: &'static str = "properties";
    const KEY_COLUMN: &'static str = "slug";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "slug",
        "title",
        "description",
        "property_type",
        "listing",
        "status",
        "price",
        "location",
        "city",
        "bedrooms",
        "bathrooms",
        "area_sqft",
        "features",
        "images",
        "featured",
        "published_at",
        "scheduled_for",
        "created_at",
        "updated_at",
    ];
    const ORDER_BY: &'static str = "created_at, id";

    fn push_binds(&self, values: &mut Separated<'_, '_, Postgres, &'static str>) {
        values
            .push_bind(self.id.clone())
            .push_bind(self.slug.clone())
            .push_bind(self.title.clone())
            .push_bind(self.description.clone())
            .push_bind(self.property_type.as_str())
            .push_bind(self.listing.as_str())
            .push_bind(self.status.as_str())
            .push_bind(self.price)
            .push_bind(self.location.clone())
            .push_bind(self.city.clone())
            .push_bind(self.bedrooms)
            .push_bind(self.bathrooms)
            .push_bind(self.area_sqft)
            .push_bind(self.features.clone())
            .push_bind(self.images.clone())
            .push_bind(self.featured)
            .push_bind(self.published_at)
            .push_bind(self.scheduled_for)
            .push_bind(self.created_at)
            .push_bind(self.updated_at);
    }

    fn from_row(row: &PgRow) -> Result<Self> {
        Ok(Property {
            id: row.try_get("id")?,
            slug: row.try_get("slug")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            property_type: get_parsed(row, "property_type")?,
            listing: get_parsed(row, "listing")?,
            status: get_parsed(row, "status")?,
            price: row.try_get("price")?,
            location: row.try_get("location")?,
            city: row.try_get("city")?,
            bedrooms: row.try_get("bedrooms")?,
            bathrooms: row.try_get("bathrooms")?,
            area_sqft: row.try_get("area_sqft")?,
            features: row.try_get("features")?,
            images: row.try_get("images")?,
            featured: row.try_get("featured")?,
            published_at: row.try_get("published_at")?,
            scheduled_for: row.try_get("scheduled_for")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::postgres::test_support::fresh_pool;
    use super::super::{PgRepository, Repository};
    use super::*;
    use crate::models::{ListingKind, PropertyType};

    #[tokio::test]
    #[ignore = "Requires PostgreSQL server"]
    async fn test_property_roundtrip() {
        let repo = PgRepository::<Property>::new(fresh_pool().await);

        let mut p = Property::new(
            "harbor-loft".into(),
            "Harbor Loft".into(),
            PropertyType::Commercial,
            ListingKind::ForRent,
        );
        p.price = Some(2500.0);
        p.bedrooms = Some(2);
        p.images = vec!["https://cdn.example.com/a.jpg".into()];
        repo.create(&p).await.expect("create");

        let loaded = repo.get_by_key("harbor-loft").await.unwrap().unwrap();
        assert_eq!(loaded.property_type, PropertyType::Commercial);
        assert_eq!(loaded.listing, ListingKind::ForRent);
        assert_eq!(loaded.price, Some(2500.0));
        assert_eq!(loaded.images.len(), 1);
    }
}
