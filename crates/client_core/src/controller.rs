//! Gallery state and its reconciliation with an [`ImageStore`].
//!
//! The controller is the only owner of the displayed collection. Views read
//! snapshots and act through [`GalleryController::refresh`],
//! [`GalleryController::submit_upload`] and
//! [`GalleryController::request_delete`]. Store failures never escape: they
//! surface as error notifications on the event channel and leave the
//! collection as it was.
//!
//! Refresh results are sequenced against mutations. Only the most recent
//! refresh may replace the collection. Uploads and deletes applied while it
//! is in flight are recorded and replayed on top of its listing, so a slow
//! listing never resurrects a deleted record or drops a fresh upload.

use std::sync::Arc;

use shared::{
    domain::{derive_tags, ImageId, ImageRecord},
    protocol::ImageUpload,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::ImageStore;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveView {
    #[default]
    Gallery,
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    fn info(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            severity: Severity::Info,
        }
    }

    fn error(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            severity: Severity::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryEvent {
    Notification(Notification),
    CollectionUpdated { count: usize },
    ViewChanged(ActiveView),
}

/// What an operation did to the local collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied,
    /// A newer refresh was issued before this one settled.
    Discarded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct GallerySnapshot {
    pub records: Vec<ImageRecord>,
    pub loading: bool,
    pub active_view: ActiveView,
    pub tags: Vec<String>,
}

enum PendingMutation {
    Created(ImageRecord),
    Deleted(ImageId),
}

struct GalleryState {
    records: Vec<ImageRecord>,
    loading: bool,
    active_view: ActiveView,
    latest_refresh: u64,
    refresh_in_flight: bool,
    mutation_epoch: u64,
    /// Mutations applied while a refresh is in flight, tagged with the epoch
    /// they produced.
    pending: Vec<(u64, PendingMutation)>,
}

impl GalleryState {
    fn record_mutation(&mut self, mutation: PendingMutation) {
        self.mutation_epoch += 1;
        if self.refresh_in_flight {
            self.pending.push((self.mutation_epoch, mutation));
        }
    }
}

/// Applies mutations newer than `since` to a listing, oldest first.
fn replay_pending(
    records: &mut Vec<ImageRecord>,
    pending: Vec<(u64, PendingMutation)>,
    since: u64,
) -> usize {
    let mut replayed = 0;
    for (_, mutation) in pending.into_iter().filter(|(epoch, _)| *epoch > since) {
        replayed += 1;
        match mutation {
            PendingMutation::Created(record) => {
                if !records.iter().any(|existing| existing.id == record.id) {
                    records.insert(0, record);
                }
            }
            PendingMutation::Deleted(id) => records.retain(|record| record.id != id),
        }
    }
    replayed
}

pub struct GalleryController {
    store: Arc<dyn ImageStore>,
    inner: Mutex<GalleryState>,
    events: broadcast::Sender<GalleryEvent>,
}

impl GalleryController {
    /// The gallery counts as loading until its first refresh settles.
    pub fn new(store: Arc<dyn ImageStore>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            store,
            inner: Mutex::new(GalleryState {
                records: Vec::new(),
                loading: true,
                active_view: ActiveView::default(),
                latest_refresh: 0,
                refresh_in_flight: false,
                mutation_epoch: 0,
                pending: Vec::new(),
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<GalleryEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: GalleryEvent) {
        let _ = self.events.send(event);
    }

    fn notify(&self, notification: Notification) {
        self.emit(GalleryEvent::Notification(notification));
    }

    pub async fn refresh(&self) -> SyncOutcome {
        let (ticket, epoch) = {
            let mut guard = self.inner.lock().await;
            guard.loading = true;
            guard.refresh_in_flight = true;
            guard.latest_refresh += 1;
            (guard.latest_refresh, guard.mutation_epoch)
        };
        debug!(ticket, "gallery: refreshing");

        let result = self.store.list(None).await;

        let mut guard = self.inner.lock().await;
        if guard.latest_refresh != ticket {
            drop(guard);
            match result {
                Ok(_) => warn!(ticket, "gallery: discarding superseded image listing"),
                Err(err) => warn!(ticket, error = %err, "gallery: superseded refresh failed"),
            }
            return SyncOutcome::Discarded;
        }

        guard.loading = false;
        guard.refresh_in_flight = false;
        let pending = std::mem::take(&mut guard.pending);

        match result {
            Ok(mut records) => {
                let replayed = replay_pending(&mut records, pending, epoch);
                guard.records = records;
                let count = guard.records.len();
                drop(guard);
                info!(count, replayed, "gallery: loaded images");
                self.emit(GalleryEvent::CollectionUpdated { count });
                SyncOutcome::Applied
            }
            Err(err) => {
                drop(guard);
                warn!(error = %err, "gallery: failed to load images");
                self.notify(Notification::error(
                    "Failed to load images",
                    "There was a problem retrieving the images",
                ));
                SyncOutcome::Failed
            }
        }
    }

    pub async fn submit_upload(&self, upload: ImageUpload) -> SyncOutcome {
        debug!(title = %upload.title, tags = ?upload.tags, "gallery: uploading image");
        let record = match self.store.create(upload).await {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "gallery: upload failed");
                self.notify(Notification::error(
                    "Upload failed",
                    "There was a problem uploading your image",
                ));
                return SyncOutcome::Failed;
            }
        };

        let count = {
            let mut guard = self.inner.lock().await;
            if guard.records.iter().any(|existing| existing.id == record.id) {
                warn!(id = %record.id, "gallery: store reused an identifier; replacing record");
                guard.records.retain(|existing| existing.id != record.id);
            }
            info!(id = %record.id, title = %record.title, "gallery: image uploaded");
            guard.records.insert(0, record.clone());
            guard.record_mutation(PendingMutation::Created(record));
            guard.active_view = ActiveView::Gallery;
            guard.records.len()
        };

        self.emit(GalleryEvent::CollectionUpdated { count });
        self.emit(GalleryEvent::ViewChanged(ActiveView::Gallery));
        self.notify(Notification::info(
            "Image uploaded",
            "Your image has been uploaded successfully",
        ));
        SyncOutcome::Applied
    }

    pub async fn request_delete(&self, id: &ImageId) -> SyncOutcome {
        debug!(%id, "gallery: deleting image");
        if let Err(err) = self.store.delete(id).await {
            warn!(%id, error = %err, "gallery: delete failed");
            self.notify(Notification::error(
                "Delete failed",
                "There was a problem deleting the image",
            ));
            return SyncOutcome::Failed;
        }

        let count = {
            let mut guard = self.inner.lock().await;
            guard.records.retain(|record| &record.id != id);
            guard.record_mutation(PendingMutation::Deleted(id.clone()));
            guard.records.len()
        };
        info!(%id, "gallery: image deleted");

        self.emit(GalleryEvent::CollectionUpdated { count });
        self.notify(Notification::info(
            "Image deleted",
            "The image has been removed successfully",
        ));
        SyncOutcome::Applied
    }

    /// Recomputed from the current collection on every call.
    pub async fn derived_tags(&self) -> Vec<String> {
        derive_tags(&self.inner.lock().await.records)
    }

    pub async fn records(&self) -> Vec<ImageRecord> {
        self.inner.lock().await.records.clone()
    }

    /// The collection narrowed to one tag, as the gallery filter shows it.
    pub async fn visible_records(&self, tag: Option<&str>) -> Vec<ImageRecord> {
        let guard = self.inner.lock().await;
        match tag {
            Some(tag) => guard
                .records
                .iter()
                .filter(|record| record.has_tag(tag))
                .cloned()
                .collect(),
            None => guard.records.clone(),
        }
    }

    pub async fn is_loading(&self) -> bool {
        self.inner.lock().await.loading
    }

    pub async fn active_view(&self) -> ActiveView {
        self.inner.lock().await.active_view
    }

    pub async fn set_active_view(&self, view: ActiveView) {
        let changed = {
            let mut guard = self.inner.lock().await;
            let changed = guard.active_view != view;
            guard.active_view = view;
            changed
        };
        if changed {
            self.emit(GalleryEvent::ViewChanged(view));
        }
    }

    pub async fn snapshot(&self) -> GallerySnapshot {
        let guard = self.inner.lock().await;
        GallerySnapshot {
            records: guard.records.clone(),
            loading: guard.loading,
            active_view: guard.active_view,
            tags: derive_tags(&guard.records),
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
