use async_trait::async_trait;
use chrono::Utc;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};

use crate::models::StoredFile;
use crate::{Error, Result};

/// Storage for files uploaded through the admin panel.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn list_files(&self) -> Result<Vec<StoredFile>>;

    /// Stores `bytes` and returns the key it was saved under.
    async fn upload_file(&self, bytes: &[u8], name: &str) -> Result<String>;

    async fn delete_file(&self, key: &str) -> Result<()>;
}

/// Bytes that cannot appear raw in a single URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Accepts only a single, normal path component.
fn plain_file_name(name: &str) -> Result<&str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part.to_str() == Some(name) => Ok(name),
        _ => Err(Error::invalid(format!("Invalid file name: {:?}", name))),
    }
}

/// Files kept in a directory on local disk and served from `base_url`.
pub struct LocalFileStore {
    root: PathBuf,
    base_url: String,
}

impl LocalFileStore {
    pub async fn open(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;

        Ok(Self {
            root,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The local route prefix uploads are served under, or `None` when `base_url` points
    /// somewhere else (a CDN or another host) and the files are not served by this app.
    pub fn mount_path(&self) -> Option<&str> {
        let path = self.base_url.as_str();
        let local = path.starts_with('/') && !path.starts_with("//") && path.len() > 1;
        local.then_some(path)
    }

    fn url_for(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.base_url,
            utf8_percent_encode(key, PATH_SEGMENT)
        )
    }

    /// Writes a file that must not exist yet; an existing key is a `Conflict`.
    async fn write_new(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.root.join(key))
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::Conflict(format!("File {} already exists", key)));
            }
            Err(e) => return Err(e.into()),
        };

        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn list_files(&self) -> Result<Vec<StoredFile>> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(key) = entry.file_name().to_str() {
                files.push(StoredFile {
                    key: key.to_string(),
                    url: self.url_for(key),
                });
            }
        }

        files.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(files)
    }

    async fn upload_file(&self, bytes: &[u8], name: &str) -> Result<String> {
        let name = plain_file_name(name.trim())?;
        let key = format!("{}-{}", Utc::now().timestamp_millis(), name);

        self.write_new(&key, bytes).await?;

        tracing::info!("Stored upload {} ({} bytes)", key, bytes.len());
        Ok(key)
    }

    async fn delete_file(&self, key: &str) -> Result<()> {
        let key = plain_file_name(key)?;

        match fs::remove_file(self.root.join(key)).await {
            Ok(()) => {
                tracing::info!("Deleted upload {}", key);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn temp_store() -> LocalFileStore {
        let root = std::env::temp_dir().join(format!("folio-files-{}", Uuid::new_v4()));
        LocalFileStore::open(root, "/uploads/").await.unwrap()
    }

    #[test]
    fn test_plain_file_name() {
        assert!(plain_file_name("photo.png").is_ok());
        assert!(plain_file_name("").is_err());
        assert!(plain_file_name("..").is_err());
        assert!(plain_file_name(".").is_err());
        assert!(plain_file_name("../secret").is_err());
        assert!(plain_file_name("a/b.png").is_err());
        assert!(plain_file_name("/etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_upload_list_delete() {
        let store = temp_store().await;

        let key = store.upload_file(b"hello", "hello.txt").await.unwrap();
        assert!(key.ends_with("-hello.txt"));

        let files = store.list_files().await.unwrap();
        assert_eq!(
            files,
            vec![StoredFile {
                key: key.clone(),
                url: format!("/uploads/{}", key),
            }]
        );
        assert_eq!(
            fs::read(store.root().join(&key)).await.unwrap(),
            b"hello".to_vec()
        );

        store.delete_file(&key).await.unwrap();
        assert!(store.list_files().await.unwrap().is_empty());
        assert!(matches!(
            store.delete_file(&key).await,
            Err(Error::NotFound)
        ));

        fs::remove_dir_all(store.root()).await.unwrap();
    }

    #[tokio::test]
    async fn test_urls_escape_reserved_characters() {
        let store = temp_store().await;

        let key = store.upload_file(b"x", "50% off #1?.txt").await.unwrap();
        assert!(key.ends_with("-50% off #1?.txt"));

        let files = store.list_files().await.unwrap();
        let prefix = key.trim_end_matches("-50% off #1?.txt");
        assert_eq!(
            files[0].url,
            format!("/uploads/{}-50%25%20off%20%231%3F.txt", prefix)
        );

        fs::remove_dir_all(store.root()).await.unwrap();
    }

    #[tokio::test]
    async fn test_existing_key_is_not_overwritten() {
        let store = temp_store().await;

        store.write_new("same.txt", b"first").await.unwrap();
        assert!(matches!(
            store.write_new("same.txt", b"second").await,
            Err(Error::Conflict(_))
        ));
        assert_eq!(
            fs::read(store.root().join("same.txt")).await.unwrap(),
            b"first".to_vec()
        );

        fs::remove_dir_all(store.root()).await.unwrap();
    }

    #[tokio::test]
    async fn test_mount_path() {
        let root = std::env::temp_dir().join(format!("folio-mount-{}", Uuid::new_v4()));

        let local = LocalFileStore::open(&root, "/media/").await.unwrap();
        assert_eq!(local.mount_path(), Some("/media"));

        let cdn = LocalFileStore::open(&root, "https://cdn.example.com/u")
            .await
            .unwrap();
        assert_eq!(cdn.mount_path(), None);
        assert_eq!(
            cdn.url_for("1-a b.png"),
            "https://cdn.example.com/u/1-a%20b.png"
        );

        let bare = LocalFileStore::open(&root, "/").await.unwrap();
        assert_eq!(bare.mount_path(), None);

        fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let store = temp_store().await;

        assert!(matches!(
            store.upload_file(b"x", "../escape.txt").await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            store.delete_file("../escape.txt").await,
            Err(Error::InvalidInput(_))
        ));

        fs::remove_dir_all(store.root()).await.unwrap();
    }
}
