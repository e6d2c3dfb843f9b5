//! Records returned by the management API.
//!
//! Only the fields the operations read are modelled; everything else in a
//! response is ignored. Every field is optional because the API only returns
//! what was asked for through `fields=`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const VOLUMES_PATH: &str = "/api/storage/volumes";
pub const SNAPMIRROR_PATH: &str = "/api/snapmirror/relationships";
pub const JOBS_PATH: &str = "/api/cluster/jobs";

const GIB: u64 = 1024 * 1024 * 1024;

pub fn volume_path(uuid: &Uuid) -> String {
    format!("{}/{}", VOLUMES_PATH, uuid)
}

pub fn snapshots_path(volume_uuid: &Uuid) -> String {
    format!("{}/{}/snapshots", VOLUMES_PATH, volume_uuid)
}

pub fn snapshot_path(volume_uuid: &Uuid, snapshot_uuid: &Uuid) -> String {
    format!("{}/{}", snapshots_path(volume_uuid), snapshot_uuid)
}

pub fn relationship_path(uuid: &Uuid) -> String {
    format!("{}/{}", SNAPMIRROR_PATH, uuid)
}

pub fn transfers_path(relationship_uuid: &Uuid) -> String {
    format!("{}/transfers", relationship_path(relationship_uuid))
}

pub fn job_path(uuid: &str) -> String {
    format!("{}/{}", JOBS_PATH, uuid)
}

/// `{ "name": ... }` reference used throughout the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathRef {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeRecord {
    #[serde(default)]
    pub uuid: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub space: Option<VolumeSpace>,
    #[serde(default)]
    pub nas: Option<PathRef>,
    #[serde(default)]
    pub clone: Option<VolumeClone>,
    #[serde(default)]
    pub files: Option<VolumeFiles>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeSpace {
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub used: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeClone {
    #[serde(default)]
    pub is_flexclone: Option<bool>,
    #[serde(default)]
    pub parent_volume: Option<NamedRef>,
    #[serde(default)]
    pub parent_snapshot: Option<NamedRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeFiles {
    #[serde(default)]
    pub maximum: Option<u64>,
}

impl VolumeRecord {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn junction_path(&self) -> &str {
        self.nas
            .as_ref()
            .and_then(|nas| nas.path.as_deref())
            .unwrap_or_default()
    }

    /// `(size, used)` in whole GiB, only when the API reported usage
    pub fn space_gib(&self) -> Option<(u64, u64)> {
        let space = self.space.as_ref()?;
        let used = space.used?;
        let size = space.size.unwrap_or_default();
        Some((size / GIB, used / GIB))
    }

    pub fn parent_volume(&self) -> &str {
        self.clone
            .as_ref()
            .and_then(|c| c.parent_volume.as_ref())
            .and_then(|p| p.name.as_deref())
            .unwrap_or_default()
    }

    pub fn parent_snapshot(&self) -> &str {
        self.clone
            .as_ref()
            .and_then(|c| c.parent_snapshot.as_ref())
            .and_then(|p| p.name.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    #[serde(default)]
    pub uuid: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapmirrorRecord {
    #[serde(default)]
    pub uuid: Option<Uuid>,
    #[serde(default)]
    pub source: Option<PathRef>,
    #[serde(default)]
    pub destination: Option<PathRef>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub transfer: Option<TransferStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferStatus {
    #[serde(default)]
    pub state: Option<String>,
}

impl SnapmirrorRecord {
    pub fn source_path(&self) -> &str {
        self.source
            .as_ref()
            .and_then(|s| s.path.as_deref())
            .unwrap_or_default()
    }

    pub fn destination_path(&self) -> &str {
        self.destination
            .as_ref()
            .and_then(|d| d.path.as_deref())
            .unwrap_or_default()
    }

    /// Transfer state, reported only while a transfer is active
    pub fn transfer_status(&self) -> &str {
        self.transfer
            .as_ref()
            .and_then(|t| t.state.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or("idle")
    }
}

/// Asynchronous job state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Paused,
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(default)]
    pub uuid: Option<String>,
    pub state: JobState,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}
