//! Blog post service
//!
//! Business rules for blog posts:
//! - slugs are generated from the title when not supplied and stay unique
//! - Markdown is rendered to `content_html` on every content change
//! - status changes keep `published_at` / `scheduled_for` consistent
//! - every update and delete snapshots the previous state first
//! - public reads only ever see published posts

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use super::activity::{ActivityService, Actor};
use super::content::{non_blank, normalize_list, resolve_slug, ContentError};
use super::markdown::MarkdownRenderer;
use super::version::VersionService;
use crate::db::Repository;
use crate::models::{
    BlogPost, ContentStatus, ContentVersion, CreateBlogPostInput, Publication, Record,
    UpdateBlogPostInput,
};

const EXCERPT_LENGTH: usize = 200;

/// Public listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlogFilter {
    pub category: Option<String>,
    pub tag: Option<String>,
}

pub struct BlogService {
    repo: Arc<dyn Repository<BlogPost>>,
    versions: Arc<VersionService>,
    activity: Arc<ActivityService>,
    markdown: MarkdownRenderer,
}

impl BlogService {
    pub fn new(
        repo: Arc<dyn Repository<BlogPost>>,
        versions: Arc<VersionService>,
        activity: Arc<ActivityService>,
        markdown: MarkdownRenderer,
    ) -> Self {
        Self {
            repo,
            versions,
            activity,
            markdown,
        }
    }

    /// All posts for the admin panel, newest first
    pub async fn list(&self, status: Option<ContentStatus>) -> Result<Vec<BlogPost>, ContentError> {
        let mut posts = self.repo.list_all().await.context("Failed to list blog posts")?;
        if let Some(status) = status {
            posts.retain(|p| p.status == status);
        }
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    /// Published posts, most recently published first
    pub async fn list_public(&self, filter: &BlogFilter) -> Result<Vec<BlogPost>, ContentError> {
        let mut posts = self.repo.list_all().await.context("Failed to list blog posts")?;
        posts.retain(|p| {
            p.is_public()
                && filter.category.as_deref().map_or(true, |c| {
                    p.category.as_deref().is_some_and(|pc| pc.eq_ignore_ascii_case(c))
                })
                && filter
                    .tag
                    .as_deref()
                    .map_or(true, |t| p.tags.iter().any(|pt| pt.eq_ignore_ascii_case(t)))
        });
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(posts)
    }

    pub async fn get(&self, id: &str) -> Result<BlogPost, ContentError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get blog post")?
            .ok_or_else(|| ContentError::NotFound(format!("Blog post {}", id)))
    }

    /// Fetch a published post by slug and count the view
    pub async fn view_public(&self, slug: &str) -> Result<BlogPost, ContentError> {
        let post = self
            .repo
            .get_by_key(slug)
            .await
            .context("Failed to get blog post by slug")?
            .filter(BlogPost::is_public)
            .ok_or_else(|| ContentError::NotFound(format!("Blog post {}", slug)))?;

        match self.repo.increment(&post.id, "views").await {
            Ok(Some(counted)) => Ok(counted),
            Ok(None) => Err(ContentError::NotFound(format!("Blog post {}", slug))),
            Err(e) => {
                tracing::warn!("Failed to count view for {}: {:#}", post.slug, e);
                Ok(post)
            }
        }
    }

    pub async fn create(
        &self,
        input: CreateBlogPostInput,
        actor: &Actor,
    ) -> Result<BlogPost, ContentError> {
        input.validate()?;

        let title = input.title.trim().to_string();
        let slug = resolve_slug(self.repo.as_ref(), input.slug.as_deref(), &title, None).await?;
        let author = non_blank(input.author)
            .or_else(|| actor.username.clone())
            .unwrap_or_default();

        let mut post = BlogPost::new(slug, title, input.content, author);
        post.content_html = self.markdown.render(&post.content);
        post.excerpt = non_blank(input.excerpt)
            .unwrap_or_else(|| self.markdown.excerpt(&post.content, EXCERPT_LENGTH));
        post.category = non_blank(input.category);
        post.tags = normalize_list(input.tags);
        post.featured_image = non_blank(input.featured_image);

        let publication = Publication {
            status: input.status.unwrap_or_default(),
            published_at: None,
            scheduled_for: input.scheduled_for,
        }
        .resolve(post.created_at)
        .map_err(ContentError::Validation)?;
        post.set_publication(publication);

        let post = self
            .repo
            .create(&post)
            .await
            .context("Failed to create blog post")?;

        tracing::info!("Created blog post {} ({})", post.slug, post.status);
        self.activity
            .record(
                actor,
                "create",
                BlogPost::COLLECTION,
                Some(&post.id),
                json!({ "title": post.title, "status": post.status }),
            )
            .await;

        Ok(post)
    }

    pub async fn update(
        &self,
        id: &str,
        input: UpdateBlogPostInput,
        actor: &Actor,
    ) -> Result<BlogPost, ContentError> {
        input.validate()?;
        let current = self.get(id).await?;
        if !input.has_changes() {
            return Ok(current);
        }

        let now = Utc::now();
        let mut post = current.clone();

        if let Some(title) = input.title {
            post.title = title.trim().to_string();
        }
        if let Some(slug) = input.slug {
            if slug != post.slug {
                post.slug =
                    resolve_slug(self.repo.as_ref(), Some(&slug), &post.title, Some(&post.id)).await?;
            }
        }
        if let Some(content) = input.content {
            post.content_html = self.markdown.render(&content);
            post.content = content;
        }
        if let Some(excerpt) = input.excerpt {
            post.excerpt = non_blank(Some(excerpt))
                .unwrap_or_else(|| self.markdown.excerpt(&post.content, EXCERPT_LENGTH));
        }
        if let Some(author) = input.author {
            post.author = author.trim().to_string();
        }
        if let Some(category) = input.category {
            post.category = non_blank(Some(category));
        }
        if let Some(tags) = input.tags {
            post.tags = normalize_list(tags);
        }
        if input.featured_image.is_some() {
            post.featured_image = non_blank(input.featured_image);
        }

        let mut publication = post.publication();
        if let Some(status) = input.status {
            publication.status = status;
        }
        if input.scheduled_for.is_some() {
            publication.scheduled_for = input.scheduled_for;
        }
        post.set_publication(publication.resolve(now).map_err(ContentError::Validation)?);

        post.updated_at = current.updated_at;
        if post == current {
            return Ok(current);
        }
        post.updated_at = now;

        self.versions
            .snapshot(&current, actor, input.change_summary)
            .await?;
        let post = self
            .repo
            .update(&post)
            .await
            .context("Failed to update blog post")?;

        tracing::info!("Updated blog post {}", post.slug);
        self.activity
            .record(
                actor,
                "update",
                BlogPost::COLLECTION,
                Some(&post.id),
                json!({ "title": post.title, "status": post.status }),
            )
            .await;

        Ok(post)
    }

    pub async fn delete(&self, id: &str, actor: &Actor) -> Result<(), ContentError> {
        let post = self.get(id).await?;
        self.versions
            .snapshot(&post, actor, Some("Deleted".to_string()))
            .await?;
        self.repo
            .delete(id)
            .await
            .context("Failed to delete blog post")?;

        tracing::info!("Deleted blog post {}", post.slug);
        self.activity
            .record(
                actor,
                "delete",
                BlogPost::COLLECTION,
                Some(id),
                json!({ "title": post.title }),
            )
            .await;
        Ok(())
    }

    pub async fn versions(&self, id: &str) -> Result<Vec<ContentVersion>, ContentError> {
        Ok(self.versions.list(BlogPost::COLLECTION, id).await?)
    }

    /// Bring back the state saved in `version`.
    ///
    /// The current state is snapshotted first, so a restore can be undone.
    /// A deleted post is recreated.
    pub async fn restore(
        &self,
        id: &str,
        version: i32,
        actor: &Actor,
    ) -> Result<BlogPost, ContentError> {
        let saved = self
            .versions
            .get(BlogPost::COLLECTION, id, version)
            .await?
            .ok_or_else(|| ContentError::NotFound(format!("Version {} of blog post {}", version, id)))?;

        let mut post: BlogPost = serde_json::from_value(saved.snapshot)
            .context("Stored version is not a valid blog post")?;
        post.id = id.to_string();

        let slug = post.slug.clone();
        post.slug = resolve_slug(self.repo.as_ref(), Some(&slug), &post.title, Some(id)).await?;

        let now = Utc::now();
        post.set_publication(post.publication().resolve(now).map_err(ContentError::Validation)?);
        post.updated_at = now;

        let current = self.repo.get_by_id(id).await.context("Failed to get blog post")?;
        let post = match current {
            Some(current) => {
                post.views = current.views;
                self.versions
                    .snapshot(&current, actor, Some(format!("Before restoring version {}", version)))
                    .await?;
                self.repo.update(&post).await
            }
            None => self.repo.create(&post).await,
        }
        .context("Failed to restore blog post")?;

        tracing::info!("Restored blog post {} to version {}", post.slug, version);
        self.activity
            .record(
                actor,
                "restore",
                BlogPost::COLLECTION,
                Some(id),
                json!({ "version": version }),
            )
            .await;

        Ok(post)
    }

    /// Publish scheduled posts whose time has come. Returns how many changed.
    pub async fn publish_due(&self, now: DateTime<Utc>) -> Result<usize, ContentError> {
        let due: Vec<BlogPost> = self
            .repo
            .list_all()
            .await
            .context("Failed to list blog posts")?
            .into_iter()
            .filter(|p| p.publication().is_due(now))
            .collect();

        let mut published = 0;
        for mut post in due {
            post.set_publication(post.publication().resolve(now).map_err(ContentError::Validation)?);
            post.updated_at = now;
            match self.repo.update(&post).await {
                Ok(_) => {
                    published += 1;
                    tracing::info!("Published scheduled blog post {}", post.slug);
                    self.activity
                        .record(
                            &Actor::system(),
                            "publish",
                            BlogPost::COLLECTION,
                            Some(&post.id),
                            json!({ "title": post.title }),
                        )
                        .await;
                }
                Err(e) => tracing::error!("Failed to publish blog post {}: {:#}", post.slug, e),
            }
        }
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Repositories;
    use chrono::Duration;

    struct Fixture {
        _dir: tempfile::TempDir,
        service: BlogService,
        repos: Repositories,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let repos = Repositories::json(dir.path());
        let service = BlogService::new(
            repos.blog_posts.clone(),
            Arc::new(VersionService::new(repos.versions.clone())),
            Arc::new(ActivityService::new(repos.activity.clone())),
            MarkdownRenderer::new(),
        );
        Fixture {
            _dir: dir,
            service,
            repos,
        }
    }

    fn actor() -> Actor {
        Actor {
            user_id: Some("u1".into()),
            username: Some("ana".into()),
            ip_address: None,
        }
    }

    fn input(title: &str) -> CreateBlogPostInput {
        CreateBlogPostInput {
            title: title.to_string(),
            content: "Our **new** project broke ground this week.".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_generates_slug_html_and_excerpt() {
        let f = fixture();
        let post = f.service.create(input("Ground Breaking!"), &actor()).await.unwrap();

        assert_eq!(post.slug, "ground-breaking");
        assert!(post.content_html.contains("<strong>new</strong>"));
        assert_eq!(post.excerpt, "Our new project broke ground this week.");
        assert_eq!(post.author, "ana");
        assert_eq!(post.status, ContentStatus::Draft);

        let log = f.repos.activity.list_all().await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action, "create");
    }

    #[tokio::test]
    async fn test_explicit_duplicate_slug_conflicts() {
        let f = fixture();
        f.service.create(input("Same"), &actor()).await.unwrap();

        let generated = f.service.create(input("Same"), &actor()).await.unwrap();
        assert_eq!(generated.slug, "same-2");

        let mut explicit = input("Other");
        explicit.slug = Some("same".into());
        let err = f.service.create(explicit, &actor()).await.unwrap_err();
        assert!(matches!(err, ContentError::DuplicateSlug(_)));
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let f = fixture();
        let err = f.service.create(input(""), &actor()).await.unwrap_err();
        assert!(matches!(err, ContentError::InvalidInput(_)));

        let mut scheduled = input("Later");
        scheduled.status = Some(ContentStatus::Scheduled);
        let err = f.service.create(scheduled, &actor()).await.unwrap_err();
        assert!(matches!(err, ContentError::Validation(_)));
    }

    #[tokio::test]
    async fn test_public_reads_only_published() {
        let f = fixture();
        let draft = f.service.create(input("Draft"), &actor()).await.unwrap();
        let mut published = input("Live");
        published.status = Some(ContentStatus::Published);
        published.tags = vec!["News".into()];
        let live = f.service.create(published, &actor()).await.unwrap();
        assert!(live.published_at.is_some());

        let public = f.service.list_public(&BlogFilter::default()).await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, live.id);

        let tagged = BlogFilter {
            tag: Some("news".into()),
            ..Default::default()
        };
        assert_eq!(f.service.list_public(&tagged).await.unwrap().len(), 1);

        assert!(matches!(
            f.service.view_public(&draft.slug).await,
            Err(ContentError::NotFound(_))
        ));
        let viewed = f.service.view_public("live").await.unwrap();
        assert_eq!(viewed.views, 1);
        assert_eq!(f.service.get(&live.id).await.unwrap().views, 1);
    }

    #[tokio::test]
    async fn test_update_snapshots_and_rerenders() {
        let f = fixture();
        let post = f.service.create(input("Original"), &actor()).await.unwrap();

        let update = UpdateBlogPostInput {
            content: Some("# Changed".into()),
            change_summary: Some("rewrite".into()),
            ..Default::default()
        };
        let updated = f.service.update(&post.id, update, &actor()).await.unwrap();
        assert!(updated.content_html.contains("<h1>Changed</h1>"));

        let versions = f.service.versions(&post.id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].change_summary.as_deref(), Some("rewrite"));
        assert_eq!(versions[0].snapshot["content"], post.content);
    }

    #[tokio::test]
    async fn test_update_with_same_values_is_a_no_op() {
        let f = fixture();
        let post = f.service.create(input("Steady"), &actor()).await.unwrap();

        let same = UpdateBlogPostInput {
            title: Some("Steady".into()),
            content: Some(post.content.clone()),
            status: Some(ContentStatus::Draft),
            ..Default::default()
        };
        let unchanged = f.service.update(&post.id, same, &actor()).await.unwrap();
        assert_eq!(unchanged.updated_at, post.updated_at);
        assert!(f.service.versions(&post.id).await.unwrap().is_empty());

        let log = f.repos.activity.list_all().await.unwrap();
        assert!(log.iter().all(|entry| entry.action != "update"));
    }

    #[tokio::test]
    async fn test_concurrent_views_are_all_counted() {
        let f = fixture();
        let mut published = input("Popular");
        published.status = Some(ContentStatus::Published);
        let post = f.service.create(published, &actor()).await.unwrap();

        let (a, b, c, d) = tokio::join!(
            f.service.view_public("popular"),
            f.service.view_public("popular"),
            f.service.view_public("popular"),
            f.service.view_public("popular"),
        );
        for viewed in [a, b, c, d] {
            viewed.unwrap();
        }
        assert_eq!(f.service.get(&post.id).await.unwrap().views, 4);
    }

    #[tokio::test]
    async fn test_restore_previous_version() {
        let f = fixture();
        let post = f.service.create(input("Original"), &actor()).await.unwrap();
        let update = UpdateBlogPostInput {
            title: Some("Renamed".into()),
            ..Default::default()
        };
        f.service.update(&post.id, update, &actor()).await.unwrap();

        let restored = f.service.restore(&post.id, 1, &actor()).await.unwrap();
        assert_eq!(restored.title, "Original");
        assert_eq!(f.service.versions(&post.id).await.unwrap().len(), 2);

        assert!(matches!(
            f.service.restore(&post.id, 9, &actor()).await,
            Err(ContentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_restore_deleted_post() {
        let f = fixture();
        let post = f.service.create(input("Gone"), &actor()).await.unwrap();
        f.service.delete(&post.id, &actor()).await.unwrap();
        assert!(matches!(f.service.get(&post.id).await, Err(ContentError::NotFound(_))));

        let restored = f.service.restore(&post.id, 1, &actor()).await.unwrap();
        assert_eq!(restored.id, post.id);
        assert_eq!(f.service.get(&post.id).await.unwrap().slug, "gone");
    }

    #[tokio::test]
    async fn test_publish_due() {
        let f = fixture();
        let at = Utc::now() + Duration::hours(1);
        let mut scheduled = input("Soon");
        scheduled.status = Some(ContentStatus::Scheduled);
        scheduled.scheduled_for = Some(at);
        let post = f.service.create(scheduled, &actor()).await.unwrap();
        assert_eq!(post.status, ContentStatus::Scheduled);

        assert_eq!(f.service.publish_due(Utc::now()).await.unwrap(), 0);
        assert_eq!(f.service.publish_due(at + Duration::seconds(1)).await.unwrap(), 1);

        let post = f.service.get(&post.id).await.unwrap();
        assert_eq!(post.status, ContentStatus::Published);
        assert_eq!(post.published_at, Some(at));
        assert!(post.scheduled_for.is_none());
    }
}
