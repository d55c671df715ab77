//! Pieces shared by the blog, property and testimonial services

use anyhow::Context;
use thiserror::Error;
use validator::ValidationErrors;

use super::slug::{generate_slug, next_free_slug};
use crate::db::Repository;
use crate::models::Record;

/// Error type for content operations
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Field-level validation failures of an input DTO
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationErrors),

    #[error("Slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Pick the slug for a record.
///
/// An explicit slug is normalized and must be free (`DuplicateSlug`
/// otherwise). Without one, the slug is derived from `title` and suffixed
/// with `-2`, `-3`, ... until it is free. `current_id` is the record being
/// edited, whose own slug never counts as taken.
pub(crate) async fn resolve_slug<T: Record>(
    repo: &dyn Repository<T>,
    requested: Option<&str>,
    title: &str,
    current_id: Option<&str>,
) -> Result<String, ContentError> {
    let others: Vec<String> = repo
        .list_all()
        .await
        .context("Failed to check slug uniqueness")?
        .into_iter()
        .filter(|r| Some(r.id()) != current_id)
        .map(|r| r.key().to_string())
        .collect();
    let taken = |slug: &str| others.iter().any(|s| s == slug);

    match requested.map(str::trim).filter(|s| !s.is_empty()) {
        Some(requested) => {
            let slug = generate_slug(requested);
            if slug.is_empty() {
                return Err(ContentError::Validation(format!("invalid slug: {}", requested)));
            }
            if taken(&slug) {
                return Err(ContentError::DuplicateSlug(slug));
            }
            Ok(slug)
        }
        None => {
            let base = generate_slug(title);
            if base.is_empty() {
                return Err(ContentError::Validation(
                    "a slug cannot be derived from the title, please provide one".to_string(),
                ));
            }
            Ok(next_free_slug(&base, taken))
        }
    }
}

/// Trim, drop empties and duplicates, keep first-seen order
pub(crate) fn normalize_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|existing| existing == item) {
            out.push(item.to_string());
        }
    }
    out
}

/// Treat blank strings as unset
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::JsonRepository;
    use crate::models::BlogPost;

    #[tokio::test]
    async fn test_resolve_slug() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonRepository::<BlogPost>::new(dir.path());
        let existing = BlogPost::new("market-update".into(), "x".into(), "b".into(), "a".into());
        repo.create(&existing).await.unwrap();

        let generated = resolve_slug(&repo, None, "Market Update", None).await.unwrap();
        assert_eq!(generated, "market-update-2");

        let explicit = resolve_slug(&repo, Some("Market Update"), "t", None).await;
        assert!(matches!(explicit, Err(ContentError::DuplicateSlug(_))));

        let own = resolve_slug(&repo, Some("market-update"), "t", Some(&existing.id)).await;
        assert_eq!(own.unwrap(), "market-update");

        let blank = resolve_slug(&repo, Some("   "), "???", None).await;
        assert!(matches!(blank, Err(ContentError::Validation(_))));
    }

    #[test]
    fn test_normalize_list() {
        let tags = vec![" news ".into(), "".into(), "news".into(), "homes".into()];
        assert_eq!(normalize_list(tags), vec!["news".to_string(), "homes".to_string()]);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" a ".into())), Some("a".into()));
        assert_eq!(non_blank(None), None);
    }
}
