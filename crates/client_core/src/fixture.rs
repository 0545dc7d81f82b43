//! In-memory image store that stands in for a real backend.
//!
//! Every call sleeps for a configurable latency before touching the
//! collection, so callers observe the same suspension points they would
//! against a network service. Faults can be armed per operation to exercise
//! failure paths.

use std::{collections::HashSet, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::{ImageId, ImageRecord},
    protocol::ImageUpload,
};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::{ImageStore, StoreError, StoreResult};

const DEFAULT_LIST_LATENCY: Duration = Duration::from_millis(800);
const DEFAULT_CREATE_LATENCY: Duration = Duration::from_millis(1000);
const DEFAULT_DELETE_LATENCY: Duration = Duration::from_millis(500);
const PLACEHOLDER_IMAGE_BASE: &str = "https://source.unsplash.com/random/800x600?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureLatency {
    pub list: Duration,
    pub create: Duration,
    pub delete: Duration,
}

impl Default for FixtureLatency {
    fn default() -> Self {
        Self {
            list: DEFAULT_LIST_LATENCY,
            create: DEFAULT_CREATE_LATENCY,
            delete: DEFAULT_DELETE_LATENCY,
        }
    }
}

impl FixtureLatency {
    pub fn none() -> Self {
        Self::uniform(Duration::ZERO)
    }

    pub fn uniform(latency: Duration) -> Self {
        Self {
            list: latency,
            create: latency,
            delete: latency,
        }
    }

    /// Default per-operation latencies unless a uniform override in
    /// milliseconds is given.
    pub fn from_override(override_ms: Option<u64>) -> Self {
        match override_ms {
            Some(ms) => Self::uniform(Duration::from_millis(ms)),
            None => Self::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    List,
    Create,
    Delete,
}

impl StoreOperation {
    fn name(self) -> &'static str {
        match self {
            StoreOperation::List => "list",
            StoreOperation::Create => "create",
            StoreOperation::Delete => "delete",
        }
    }
}

/// Operations that fail after their simulated latency elapses.
#[derive(Debug, Clone, Default)]
pub struct FixtureFaults {
    failing: HashSet<StoreOperation>,
}

impl FixtureFaults {
    pub fn failing(operations: impl IntoIterator<Item = StoreOperation>) -> Self {
        Self {
            failing: operations.into_iter().collect(),
        }
    }

    pub fn fails(&self, operation: StoreOperation) -> bool {
        self.failing.contains(&operation)
    }
}

pub fn seed_records() -> Vec<ImageRecord> {
    let now = Utc::now();
    let seed = |id: &str, title: &str, url: &str, tags: &[&str]| ImageRecord {
        id: ImageId::new(id),
        title: title.to_string(),
        image_url: url.to_string(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        created_at: now,
    };

    vec![
        seed(
            "1",
            "Mountain Landscape",
            "https://images.unsplash.com/photo-1506905925346-21bda4d32df4",
            &["nature", "mountains", "landscape"],
        ),
        seed(
            "2",
            "City Skyline",
            "https://images.unsplash.com/photo-1477959858617-67f85cf4f1df",
            &["city", "urban", "architecture"],
        ),
        seed(
            "3",
            "Beach Sunset",
            "https://images.unsplash.com/photo-1507525428034-b723cf961d3e",
            &["beach", "sunset", "ocean"],
        ),
        seed(
            "4",
            "Forest Path",
            "https://images.unsplash.com/photo-1441974231531-c6227db76b6e",
            &["nature", "forest", "trees"],
        ),
    ]
}

pub struct FixtureStore {
    latency: FixtureLatency,
    records: RwLock<Vec<ImageRecord>>,
    faults: Mutex<FixtureFaults>,
}

impl FixtureStore {
    pub fn new(records: Vec<ImageRecord>, latency: FixtureLatency) -> Self {
        Self {
            latency,
            records: RwLock::new(records),
            faults: Mutex::new(FixtureFaults::default()),
        }
    }

    pub fn seeded(latency: FixtureLatency) -> Self {
        Self::new(seed_records(), latency)
    }

    pub async fn set_faults(&self, faults: FixtureFaults) {
        *self.faults.lock().await = faults;
    }

    async fn simulate(&self, operation: StoreOperation, latency: Duration) -> StoreResult<()> {
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.faults.lock().await.fails(operation) {
            return Err(StoreError::Unavailable(format!(
                "simulated {} failure",
                operation.name()
            )));
        }
        Ok(())
    }
}

fn placeholder_image_url(tags: &[String]) -> String {
    format!("{PLACEHOLDER_IMAGE_BASE}{}", tags.join(","))
}

#[async_trait]
impl ImageStore for FixtureStore {
    async fn list(&self, tag: Option<&str>) -> StoreResult<Vec<ImageRecord>> {
        self.simulate(StoreOperation::List, self.latency.list).await?;
        let records = self.records.read().await;
        let listed: Vec<ImageRecord> = match tag {
            Some(tag) => records
                .iter()
                .filter(|record| record.has_tag(tag))
                .cloned()
                .collect(),
            None => records.clone(),
        };
        debug!(tag = ?tag, count = listed.len(), "fixture: listed images");
        Ok(listed)
    }

    async fn create(&self, upload: ImageUpload) -> StoreResult<ImageRecord> {
        self.simulate(StoreOperation::Create, self.latency.create)
            .await?;
        if upload.title.trim().is_empty() {
            return Err(StoreError::Rejected("title must not be empty".into()));
        }

        // The file bytes are not kept; the placeholder stands in for them.
        let record = ImageRecord {
            id: ImageId(Uuid::new_v4().simple().to_string()),
            title: upload.title,
            image_url: placeholder_image_url(&upload.tags),
            tags: upload.tags,
            created_at: Utc::now(),
        };
        self.records.write().await.insert(0, record.clone());
        debug!(
            id = %record.id,
            filename = %upload.image.filename,
            size_bytes = upload.image.bytes.len(),
            "fixture: created image"
        );
        Ok(record)
    }

    async fn delete(&self, id: &ImageId) -> StoreResult<()> {
        self.simulate(StoreOperation::Delete, self.latency.delete)
            .await?;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|record| &record.id != id);
        if records.len() == before {
            debug!(%id, "fixture: delete of unknown image ignored");
        } else {
            debug!(%id, "fixture: deleted image");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/fixture_tests.rs"]
mod tests;
