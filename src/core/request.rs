//! Request bodies for the mutating calls.

use crate::domain::config::VolumeDefaults;
use crate::domain::error::CeResult;
use serde::Serialize;
use serde_json::{json, Value};

/// Volume type requested at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeType {
    /// Read-write volume
    Rw,
    /// Data-protection volume, used as a mirror destination
    Dp,
}

impl std::fmt::Display for VolumeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolumeType::Rw => write!(f, "rw"),
            VolumeType::Dp => write!(f, "dp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Name {
    pub name: String,
}

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NasSettings {
    pub path: String,
    pub uid: u32,
    pub gid: u32,
    pub unix_permissions: u32,
    pub export_policy: Name,
    pub security_style: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpaceSettings {
    pub snapshot: SnapshotReserve,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotReserve {
    pub reserve_percent: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Guarantee {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Efficiency {
    pub policy: Name,
}

/// Body of `POST /api/storage/volumes` for a new volume
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeCreate {
    pub name: String,
    pub svm: Name,
    #[serde(rename = "type")]
    pub volume_type: VolumeType,
    pub aggregates: Vec<Name>,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nas: Option<NasSettings>,
    pub snapshot_policy: Name,
    pub space: SpaceSettings,
    pub guarantee: Guarantee,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub efficiency: Option<Efficiency>,
}

impl VolumeCreate {
    /// Combine the configured defaults with the per-call arguments.
    ///
    /// Mirror destinations (`dp`) cannot carry NAS attributes, so the whole
    /// `nas` block is left out for them.
    pub fn from_defaults(
        defaults: &VolumeDefaults,
        vserver: &str,
        name: &str,
        junction_path: &str,
        volume_type: VolumeType,
    ) -> CeResult<Self> {
        let nas = match volume_type {
            VolumeType::Rw => Some(NasSettings {
                path: junction_path.to_string(),
                uid: defaults.uid,
                gid: defaults.gid,
                unix_permissions: defaults.unix_permissions,
                export_policy: Name::new(&defaults.export_policy),
                security_style: defaults.security_style.clone(),
            }),
            VolumeType::Dp => None,
        };

        Ok(Self {
            name: name.to_string(),
            svm: Name::new(vserver),
            volume_type,
            aggregates: defaults.aggregates.iter().map(Name::new).collect(),
            size: defaults.size_bytes()?,
            nas,
            snapshot_policy: Name::new(&defaults.snapshot_policy),
            space: SpaceSettings {
                snapshot: SnapshotReserve {
                    reserve_percent: defaults.snapshot_reserve_percent,
                },
            },
            guarantee: Guarantee {
                kind: defaults.guarantee.clone(),
            },
            efficiency: defaults.efficiency_policy.as_ref().map(|policy| Efficiency {
                policy: Name::new(policy),
            }),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JunctionPath {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloneSpec {
    pub is_flexclone: bool,
    pub parent_snapshot: Name,
    pub parent_volume: Name,
}

/// Body of `POST /api/storage/volumes` for a FlexClone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloneCreate {
    pub svm: Name,
    pub name: String,
    pub nas: JunctionPath,
    pub clone: CloneSpec,
}

impl CloneCreate {
    pub fn new(
        vserver: &str,
        parent_volume: &str,
        clone_name: &str,
        parent_snapshot: &str,
        junction_path: &str,
    ) -> Self {
        Self {
            svm: Name::new(vserver),
            name: clone_name.to_string(),
            nas: JunctionPath {
                path: junction_path.to_string(),
            },
            clone: CloneSpec {
                is_flexclone: true,
                parent_snapshot: Name::new(parent_snapshot),
                parent_volume: Name::new(parent_volume),
            },
        }
    }
}

/// Body of `POST /api/snapmirror/relationships`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MirrorCreate {
    pub source: JunctionPath,
    pub destination: JunctionPath,
}

impl MirrorCreate {
    pub fn new(vserver: &str, source_volume: &str, destination_volume: &str) -> Self {
        Self {
            source: JunctionPath {
                path: svm_volume_path(vserver, source_volume),
            },
            destination: JunctionPath {
                path: svm_volume_path(vserver, destination_volume),
            },
        }
    }
}

/// `svm:volume` endpoint notation used by SnapMirror
pub fn svm_volume_path(vserver: &str, volume: &str) -> String {
    format!("{}:{}", vserver, volume)
}

pub fn max_files_patch(maximum: u64) -> Value {
    json!({ "files": { "maximum": maximum } })
}

pub fn junction_patch(junction_path: &str) -> Value {
    json!({ "nas": { "path": junction_path } })
}

pub fn snapshot_create(name: &str) -> Value {
    json!({ "name": name })
}
