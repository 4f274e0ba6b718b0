mod post;
mod session;

pub use post::{NewPost, Post, PostChanges, PostInput};
pub use session::{Principal, Session, SessionContext};

use serde::{Deserialize, Serialize};

/// An uploaded file as exposed to the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub key: String,
    pub url: String,
}
