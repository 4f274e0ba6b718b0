use chrono::Utc;
use std::sync::Arc;

use crate::auth::IdentityGate;
use crate::models::{NewPost, Post, PostChanges, PostInput, SessionContext};
use crate::slug::derive_slug;
use crate::store::PostStore;
use crate::{Error, Result};

/// Checked fields ready to be written.
struct Validated {
    title: String,
    slug: String,
    content: String,
    excerpt: Option<String>,
    published: bool,
}

fn validate(input: PostInput) -> Result<Validated> {
    let (Some(title), Some(content)) = (
        input.title.filter(|t| !t.trim().is_empty()),
        input.content.filter(|c| !c.trim().is_empty()),
    ) else {
        return Err(Error::invalid("Title and content are required"));
    };

    let slug = derive_slug(&title);
    if slug.is_empty() {
        return Err(Error::invalid(
            "Title must contain at least one letter or digit",
        ));
    }

    Ok(Validated {
        title,
        slug,
        content,
        excerpt: input.excerpt.filter(|e| !e.trim().is_empty()),
        published: input.published.unwrap_or(false),
    })
}

/// Create, update and delete of posts, gated on an authenticated session.
#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn PostStore>,
    gate: Arc<dyn IdentityGate>,
}

impl PostService {
    pub fn new(store: Arc<dyn PostStore>, gate: Arc<dyn IdentityGate>) -> Self {
        Self { store, gate }
    }

    pub async fn create_post(&self, ctx: &SessionContext, input: PostInput) -> Result<Post> {
        let principal = self.gate.require_session(ctx).await?;
        let post = validate(input)?;

        if self.store.find_by_slug(&post.slug).await?.is_some() {
            tracing::debug!("Slug {} already taken", post.slug);
            return Err(crate::store::slug_conflict());
        }

        let now = Utc::now();
        let post = self
            .store
            .insert(NewPost {
                title: post.title,
                slug: post.slug,
                content: post.content,
                excerpt: post.excerpt,
                published: post.published,
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(
            "Post {} ({}) created by {}",
            post.id,
            post.slug,
            principal.email
        );
        Ok(post)
    }

    /// Replaces the post's fields and re-derives its slug from the new title.
    ///
    /// Unlike create, there is no lookup for another post holding the new slug; a collision
    /// surfaces as `Conflict` from the store's own uniqueness guarantee.
    pub async fn update_post(
        &self,
        ctx: &SessionContext,
        id: i64,
        input: PostInput,
    ) -> Result<Post> {
        let principal = self.gate.require_session(ctx).await?;
        let post = validate(input)?;

        let post = self
            .store
            .update(
                id,
                PostChanges {
                    title: post.title,
                    slug: post.slug,
                    content: post.content,
                    excerpt: post.excerpt,
                    published: post.published,
                    updated_at: Utc::now(),
                },
            )
            .await?;

        tracing::info!(
            "Post {} ({}) updated by {}",
            post.id,
            post.slug,
            principal.email
        );
        Ok(post)
    }

    pub async fn delete_post(&self, ctx: &SessionContext, id: i64) -> Result<Post> {
        let principal = self.gate.require_session(ctx).await?;
        let post = self.store.delete(id).await?;

        tracing::info!(
            "Post {} ({}) deleted by {}",
            post.id,
            post.slug,
            principal.email
        );
        Ok(post)
    }

    pub async fn get_post(&self, id: i64) -> Result<Post> {
        self.store.find_by_id(id).await?.ok_or(Error::NotFound)
    }

    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        self.store.list_all().await
    }

    pub async fn list_published(&self, limit: u32) -> Result<Vec<Post>> {
        self.store.list_published(limit).await
    }

    /// Drafts are reported as missing.
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Post> {
        self.store
            .find_by_slug(slug)
            .await?
            .filter(|post| post.published)
            .ok_or(Error::NotFound)
    }
}
