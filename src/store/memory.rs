use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{slug_conflict, PostStore, SessionStore};
use crate::models::{NewPost, Post, PostChanges, Session};
use crate::{Error, Result};

#[derive(Default)]
struct Posts {
    last_id: i64,
    rows: BTreeMap<i64, Post>,
}

impl Posts {
    fn slug_taken(&self, slug: &str, except: Option<i64>) -> bool {
        self.rows
            .values()
            .any(|post| post.slug == slug && Some(post.id) != except)
    }
}

/// Process-local post storage. Writes hold one lock for the whole check-then-write, which
/// stands in for the unique index a database would provide.
#[derive(Default)]
pub struct MemoryPostStore {
    posts: RwLock<Posts>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>> {
        Ok(self.posts.read().await.rows.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let posts = self.posts.read().await;
        Ok(posts.rows.values().find(|post| post.slug == slug).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self.posts.read().await.rows.values().cloned().collect();
        posts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(posts)
    }

    async fn list_published(&self, limit: u32) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .posts
            .read()
            .await
            .rows
            .values()
            .filter(|post| post.published)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        posts.truncate(limit as usize);
        Ok(posts)
    }

    async fn insert(&self, post: NewPost) -> Result<Post> {
        let mut posts = self.posts.write().await;
        if posts.slug_taken(&post.slug, None) {
            return Err(slug_conflict());
        }

        posts.last_id += 1;
        let post = Post {
            id: posts.last_id,
            title: post.title,
            slug: post.slug,
            content: post.content,
            excerpt: post.excerpt,
            published: post.published,
            created_at: post.created_at,
            updated_at: post.updated_at,
        };
        posts.rows.insert(post.id, post.clone());

        Ok(post)
    }

    async fn update(&self, id: i64, changes: PostChanges) -> Result<Post> {
        let mut posts = self.posts.write().await;
        if !posts.rows.contains_key(&id) {
            return Err(Error::NotFound);
        }
        if posts.slug_taken(&changes.slug, Some(id)) {
            return Err(slug_conflict());
        }

        let post = posts.rows.get_mut(&id).ok_or(Error::NotFound)?;
        post.title = changes.title;
        post.slug = changes.slug;
        post.content = changes.content;
        post.excerpt = changes.excerpt;
        post.published = changes.published;
        post.updated_at = changes.updated_at;

        Ok(post.clone())
    }

    async fn delete(&self, id: i64) -> Result<Post> {
        self.posts
            .write()
            .await
            .rows
            .remove(&id)
            .ok_or(Error::NotFound)
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    /// Also drops every session that has already expired.
    async fn create(&self, session: Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        sessions.retain(|_, existing| !existing.is_expired(now));
        sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(token).cloned())
    }

    async fn delete(&self, token: &str) -> Result<()> {
        self.sessions.write().await.remove(token);
        Ok(())
    }
}
