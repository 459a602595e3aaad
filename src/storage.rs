use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

// 1. StorageService Contract
/// StorageService
///
/// Defines the abstract contract for all interactions with the upload storage layer.
/// This trait allows us to swap the concrete implementation, from the real disk-backed
/// client (DiskStorageClient) in production to the in-memory Mock (MockStorageService)
/// during testing, without affecting the calling handlers.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured upload directories exist. Safe to call at startup;
    /// directory creation is idempotent.
    async fn ensure_upload_dirs(&self);

    /// Persists an uploaded file and returns the public path it is served under.
    ///
    /// # Arguments
    /// * `subdir`: The version subdirectory under the upload root ("" or "v2").
    /// * `filename`: The final file name, already unique per upload.
    /// * `bytes`: The raw file content.
    async fn save_upload(&self, subdir: &str, filename: &str, bytes: &[u8])
    -> Result<String, String>;
}

// 2. The Real Implementation (Local Disk)
/// DiskStorageClient
///
/// The concrete implementation persisting uploads under the configured upload
/// directory. The same directory is mounted as a static file service, so the
/// returned path is immediately servable.
#[derive(Clone)]
pub struct DiskStorageClient {
    root: PathBuf,
}

impl DiskStorageClient {
    /// Constructs the client over the configured upload root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl StorageService for DiskStorageClient {
    /// ensure_upload_dirs
    ///
    /// Creates the upload root and the version subdirectory if missing.
    async fn ensure_upload_dirs(&self) {
        let _ = tokio::fs::create_dir_all(&self.root).await;
        let _ = tokio::fs::create_dir_all(self.root.join("v2")).await;
    }

    /// save_upload
    ///
    /// Writes the file under the sanitized key and returns the `/uploads/...`
    /// path the static file service exposes it at.
    async fn save_upload(
        &self,
        subdir: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String, String> {
        let key = sanitize_key(&format!("{}/{}", subdir, filename));
        if key.is_empty() {
            return Err("invalid upload key".to_string());
        }

        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| e.to_string())?;

        Ok(format!("/uploads/{}", key))
    }
}

/// sanitize_key
///
/// Utility function to prevent path traversal attacks by removing directory
/// navigation components (e.g., `..`, `.`) from a user-provided key segment.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

// 3. The Mock Implementation (For Unit Tests)
/// MockStorageService
///
/// A mock implementation of `StorageService` used exclusively for unit and
/// integration testing. This allows us to test the upload handler logic without
/// touching the filesystem, isolating the test boundary.
#[derive(Clone)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

impl Default for MockStorageService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_upload_dirs(&self) {
        // No-op in mock environment.
    }

    async fn save_upload(
        &self,
        subdir: &str,
        filename: &str,
        _bytes: &[u8],
    ) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }

        let key = sanitize_key(&format!("{}/{}", subdir, filename));
        if key.is_empty() {
            return Err("invalid upload key".to_string());
        }

        // Returns the same path shape the disk client produces, for mock assertions.
        Ok(format!("/uploads/{}", key))
    }
}

/// StorageState
///
/// The concrete type used to share the storage service access across the application state.
pub type StorageState = Arc<dyn StorageService>;
