use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{ImageId, ImageRecord},
    protocol::ImageUpload,
};

pub mod config;
mod controller;
pub mod error;
mod fixture;
mod remote;

pub use config::{BackendKind, GallerySettings};
pub use controller::{
    ActiveView, GalleryController, GalleryEvent, GallerySnapshot, Notification, Severity,
    SyncOutcome,
};
pub use error::{StoreError, StoreResult};
pub use fixture::{seed_records, FixtureFaults, FixtureLatency, FixtureStore, StoreOperation};
pub use remote::RemoteStore;

/// Data access boundary between gallery state and whatever actually keeps the
/// images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// All records, or only those carrying `tag` when one is given.
    async fn list(&self, tag: Option<&str>) -> StoreResult<Vec<ImageRecord>>;
    /// Stores a new image; the store assigns the identifier and timestamp.
    async fn create(&self, upload: ImageUpload) -> StoreResult<ImageRecord>;
    /// Removes a record. Deleting an unknown identifier succeeds.
    async fn delete(&self, id: &ImageId) -> StoreResult<()>;
}

/// Which boundary variant to run against. Chosen once when the store is built.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    Fixture(FixtureLatency),
    Remote { api_url: String },
}

impl StoreBackend {
    pub fn from_settings(settings: &GallerySettings) -> Self {
        match settings.backend {
            BackendKind::Fixture => {
                StoreBackend::Fixture(FixtureLatency::from_override(settings.fixture_latency_ms))
            }
            BackendKind::Remote => StoreBackend::Remote {
                api_url: settings.api_url.clone(),
            },
        }
    }
}

pub fn build_store(backend: StoreBackend) -> StoreResult<Arc<dyn ImageStore>> {
    Ok(match backend {
        StoreBackend::Fixture(latency) => Arc::new(FixtureStore::seeded(latency)),
        StoreBackend::Remote { api_url } => Arc::new(RemoteStore::new(&api_url)?),
    })
}
