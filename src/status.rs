use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Lifecycle of a single download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Queued,
    FetchingInfo,
    Downloading,
    Converting,
    Completed,
    Failed,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Completed | Stage::Failed)
    }
}

/// The file a completed download produced.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedFile {
    pub path: String,
    pub size: u64,
}

/// Snapshot of a download's state, as returned by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadStatus {
    pub stage: Stage,
    pub progress: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<CompletedFile>,
    pub updated_at: DateTime<Utc>,
}

impl DownloadStatus {
    fn new(stage: Stage) -> Self {
        DownloadStatus {
            stage,
            progress: 0.0,
            message: None,
            file: None,
            updated_at: Utc::now(),
        }
    }
}

/// Shared map of download id to status. Cloning is cheap; all clones share
/// the same underlying map. The poll endpoint reads while the worker task
/// for each download writes.
#[derive(Clone, Default)]
pub struct StatusRegistry {
    inner: Arc<RwLock<HashMap<Uuid, DownloadStatus>>>,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new download and return its server-generated id.
    pub async fn insert_queued(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.inner
            .write()
            .await
            .insert(id, DownloadStatus::new(Stage::Queued));
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<DownloadStatus> {
        self.inner.read().await.get(id).cloned()
    }

    async fn update(&self, id: &Uuid, f: impl FnOnce(&mut DownloadStatus)) {
        if let Some(status) = self.inner.write().await.get_mut(id) {
            f(status);
            status.updated_at = Utc::now();
        }
    }

    pub async fn set_stage(&self, id: &Uuid, stage: Stage) {
        self.update(id, |s| s.stage = stage).await;
    }

    pub async fn set_progress(&self, id: &Uuid, percent: f32) {
        self.update(id, |s| s.progress = percent).await;
    }

    pub async fn complete(&self, id: &Uuid, file: CompletedFile) {
        self.update(id, |s| {
            s.stage = Stage::Completed;
            s.progress = 100.0;
            s.file = Some(file);
        })
        .await;
    }

    pub async fn fail(&self, id: &Uuid, message: impl Into<String>) {
        self.update(id, |s| {
            s.stage = Stage::Failed;
            s.message = Some(message.into());
        })
        .await;
    }
}
