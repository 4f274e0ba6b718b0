mod memory;
mod postgres;

pub use memory::{MemoryPostStore, MemorySessionStore};
pub use postgres::{PgPostStore, PgSessionStore};

use async_trait::async_trait;

use crate::models::{NewPost, Post, PostChanges, Session};
use crate::Result;

/// Persistent record of posts.
///
/// Implementations guarantee that no two posts ever share a slug: a write that would
/// produce a duplicate fails with [`crate::Error::Conflict`], even under concurrent callers.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// All posts, oldest first.
    async fn list_all(&self) -> Result<Vec<Post>>;

    /// Published posts, newest first.
    async fn list_published(&self, limit: u32) -> Result<Vec<Post>>;

    async fn insert(&self, post: NewPost) -> Result<Post>;

    /// Fails with [`crate::Error::NotFound`] when `id` is absent.
    async fn update(&self, id: i64, changes: PostChanges) -> Result<Post>;

    /// Returns the removed post; fails with [`crate::Error::NotFound`] when `id` is absent.
    async fn delete(&self, id: i64) -> Result<Post>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: Session) -> Result<()>;

    async fn find(&self, token: &str) -> Result<Option<Session>>;

    async fn delete(&self, token: &str) -> Result<()>;
}

pub(crate) fn slug_conflict() -> crate::Error {
    crate::Error::Conflict("A post with this title already exists".to_string())
}
