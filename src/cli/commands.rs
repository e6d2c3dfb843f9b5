use crate::cli::args::{Args, StorageCommand};
use crate::cli::output::{ConsoleWriter, OutputWriter};
use crate::core::api::{collect_records, find_one, ApiRequest, Query, RestApi};
use crate::core::jobs::JobWatcher;
use crate::core::request::{
    junction_patch, max_files_patch, snapshot_create, svm_volume_path, CloneCreate, MirrorCreate,
    VolumeCreate, VolumeType,
};
use crate::core::resources::{
    relationship_path, snapshot_path, snapshots_path, transfers_path, volume_path,
    SnapmirrorRecord, SnapshotRecord, VolumeRecord, SNAPMIRROR_PATH, VOLUMES_PATH,
};
use crate::domain::config::CeConfig;
use crate::domain::error::{CeError, CeResult};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::rest::OntapClient;
use serde_json::json;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Execute CLI command
pub async fn execute_command(args: Args) -> CeResult<()> {
    let writer = ConsoleWriter::new(args.format.clone());
    let config_manager = ConfigManager::new();

    if args.init_config {
        let path = config_manager.init_project_config(&std::env::current_dir()?)?;
        writer.write_message(&format!("Wrote configuration template to {}", path.display()))?;
        return Ok(());
    }

    // Flags are checked before anything touches the config or the network
    let command = args.storage_command()?;

    let config = if let Some(config_path) = &args.config {
        config_manager.load_config_from_path(Path::new(config_path))?
    } else {
        config_manager.load_config()?
    };

    if !args.quiet {
        init_logging(&config.logging.level, args.debug)?;
    }

    let client = OntapClient::new(&config.cluster)?;
    info!(
        "Running {} against {} (vserver {})",
        command.operation(),
        client.base_url(),
        config.cluster.vserver
    );

    StorageOperations::new(&client, &config, &writer)
        .execute(&command)
        .await
}

/// The storage operations, one method per operation.
///
/// Every failing step prints its own message before the error propagates.
pub struct StorageOperations<'a> {
    api: &'a dyn RestApi,
    config: &'a CeConfig,
    writer: &'a dyn OutputWriter,
    jobs: JobWatcher,
}

impl<'a> StorageOperations<'a> {
    pub fn new(api: &'a dyn RestApi, config: &'a CeConfig, writer: &'a dyn OutputWriter) -> Self {
        Self {
            api,
            config,
            writer,
            jobs: JobWatcher::from_config(&config.cluster),
        }
    }

    pub fn with_job_watcher(mut self, jobs: JobWatcher) -> Self {
        self.jobs = jobs;
        self
    }

    pub async fn execute(&self, command: &StorageCommand) -> CeResult<()> {
        match command {
            StorageCommand::ListVolumes { pattern } => self.list_volumes(pattern).await,
            StorageCommand::CreateVolume { volume, junction_path } => {
                self.create_volume(volume, junction_path, VolumeType::Rw).await
            }
            StorageCommand::DeleteVolume { volume } => self.delete_volume(volume).await,
            StorageCommand::RemountVolume { volume, junction_path } => {
                self.remount_volume(volume, junction_path).await
            }
            StorageCommand::ListSnapshots { volume } => self.list_snapshots(volume).await,
            StorageCommand::CreateSnapshot { volume, snapshot } => {
                self.create_snapshot(volume, snapshot).await
            }
            StorageCommand::DeleteSnapshot { volume, snapshot } => {
                self.delete_snapshot(volume, snapshot).await
            }
            StorageCommand::ListClones { pattern } => self.list_clones(pattern).await,
            StorageCommand::CreateClone {
                volume,
                clone,
                snapshot,
                junction_path,
            } => self.create_clone(volume, clone, snapshot, junction_path).await,
            StorageCommand::ListMirrors => self.list_mirrors().await,
            StorageCommand::CreateMirror { source, destination } => {
                self.create_mirror(source, destination).await
            }
            StorageCommand::UpdateMirror { destination } => self.update_mirror(destination).await,
            StorageCommand::DeleteMirror { destination } => self.delete_mirror(destination).await,
        }
    }

    pub async fn list_volumes(&self, pattern: &str) -> CeResult<()> {
        self.say(&format!("Getting list of volumes that match: {}", pattern))?;

        let query = Query::new()
            .with("svm.name", self.vserver())
            .fields("name,space.used,space.size,nas.path");
        let volumes: Vec<VolumeRecord> = self.report(
            collect_records(self.api, VOLUMES_PATH, query).await,
            "Error retrieving volume list.",
        )?;

        let matching: Vec<VolumeRecord> = volumes
            .into_iter()
            .filter(|v| v.name().contains(pattern))
            .collect();
        info!("{} volumes match '{}'", matching.len(), pattern);

        self.writer.write_volumes(&matching)?;
        Ok(())
    }

    pub async fn create_volume(
        &self,
        name: &str,
        junction_path: &str,
        volume_type: VolumeType,
    ) -> CeResult<()> {
        match volume_type {
            VolumeType::Dp => self.say(&format!("Creating mirror volume: {}", name))?,
            VolumeType::Rw => self.say(&format!(
                "Creating volume: {} with junction-path {}",
                name, junction_path
            ))?,
        }

        let body = VolumeCreate::from_defaults(
            &self.config.volume,
            self.vserver(),
            name,
            junction_path,
            volume_type,
        )?;
        self.submit(
            ApiRequest::post(VOLUMES_PATH, serde_json::to_value(&body)?),
            "Error creating volume!",
        )
        .await?;
        self.say("Volume created successfully.")?;

        let max_files = self.config.volume.max_files;
        if max_files > 0 && volume_type == VolumeType::Rw {
            self.set_max_files(name, max_files).await?;
        }
        Ok(())
    }

    async fn set_max_files(&self, name: &str, max_files: u64) -> CeResult<()> {
        let failure = "Error finding new volume to set maxfiles!";
        let volume = self.report(self.find_volume(name, "uuid,files.maximum").await, failure)?;
        let volume = self.report(
            volume.ok_or_else(|| {
                CeError::InvalidResponse(format!("volume {} not found after creation", name))
            }),
            failure,
        )?;
        let uuid = self.report(record_uuid(volume.uuid, "volume"), failure)?;

        self.submit(
            ApiRequest::patch(volume_path(&uuid), max_files_patch(max_files)),
            "Error setting maxfiles on volume!",
        )
        .await?;
        self.say("Volume maxfiles updated successfully.")
    }

    pub async fn delete_volume(&self, name: &str) -> CeResult<()> {
        self.say(&format!("Deleting volume: {}", name))?;

        let failure = "Error finding volume to be deleted!";
        let Some(volume) = self.report(self.find_volume(name, "uuid").await, failure)? else {
            return self.not_found("Error: Volume not found!");
        };
        let uuid = self.report(record_uuid(volume.uuid, "volume"), failure)?;

        self.submit(ApiRequest::delete(volume_path(&uuid)), "Error deleting volume!")
            .await?;
        self.say("Volume deleted.")
    }

    pub async fn remount_volume(&self, name: &str, junction_path: &str) -> CeResult<()> {
        self.say(&format!(
            "Re-mounting volume: {} with junction of {}",
            name, junction_path
        ))?;

        let failure = "Error finding volume to be remounted!";
        let Some(volume) = self.report(self.find_volume(name, "uuid,nas.path").await, failure)?
        else {
            return self.not_found("Volume not found!");
        };
        let uuid = self.report(record_uuid(volume.uuid, "volume"), failure)?;

        self.submit(
            ApiRequest::patch(volume_path(&uuid), junction_patch(junction_path)),
            "Error remounting volume!",
        )
        .await?;
        self.say("Volume remounted successfully.")
    }

    pub async fn list_snapshots(&self, volume_name: &str) -> CeResult<()> {
        self.say(&format!("Getting list of snapshots on volume: {}", volume_name))?;

        let Some(volume_uuid) = self
            .volume_uuid(volume_name, "Error finding volume for snapshot listing!")
            .await?
        else {
            return self.not_found("Volume not found!");
        };

        let snapshots: Vec<SnapshotRecord> = self.report(
            collect_records(
                self.api,
                &snapshots_path(&volume_uuid),
                Query::new().fields("name,create_time"),
            )
            .await,
            "Error retrieving snapshot list.",
        )?;

        self.writer.write_snapshots(volume_name, &snapshots)?;
        Ok(())
    }

    pub async fn create_snapshot(&self, volume_name: &str, snapshot_name: &str) -> CeResult<()> {
        let Some(volume_uuid) = self
            .volume_uuid(volume_name, "Error finding volume for snapshot creation!")
            .await?
        else {
            return self.not_found("Volume not found!");
        };

        self.say(&format!(
            "Creating snapshot {} in volume {}",
            snapshot_name, volume_name
        ))?;
        self.submit(
            ApiRequest::post(snapshots_path(&volume_uuid), snapshot_create(snapshot_name)),
            "Error creating snapshot!",
        )
        .await?;
        self.say("Created snapshot.")
    }

    pub async fn delete_snapshot(&self, volume_name: &str, snapshot_name: &str) -> CeResult<()> {
        let Some(volume_uuid) = self
            .volume_uuid(volume_name, "Error finding volume for snapshot deletion!")
            .await?
        else {
            return self.not_found("Volume not found!");
        };

        let failure = "Error finding snapshot!";
        let query = Query::new().with("name", snapshot_name).fields("uuid,name");
        let found: Option<SnapshotRecord> = self.report(
            find_one(self.api, &snapshots_path(&volume_uuid), query).await,
            failure,
        )?;
        let Some(snapshot) = found else {
            return self.not_found("Snapshot not found!");
        };
        let snapshot_uuid = self.report(record_uuid(snapshot.uuid, "snapshot"), failure)?;

        self.say(&format!(
            "Deleting snapshot {} in volume {}",
            snapshot_name, volume_name
        ))?;
        self.submit(
            ApiRequest::delete(snapshot_path(&volume_uuid, &snapshot_uuid)),
            "Error deleting snapshot!",
        )
        .await?;
        self.say("Deleted snapshot.")
    }

    pub async fn list_clones(&self, pattern: &str) -> CeResult<()> {
        self.say(&format!("Getting list of clones that match: {}", pattern))?;

        let query = Query::new()
            .with("svm.name", self.vserver())
            .with("clone.is_flexclone", true)
            .fields("name,clone,nas.path");
        let clones: Vec<VolumeRecord> = self.report(
            collect_records(self.api, VOLUMES_PATH, query).await,
            "Error retrieving volume list.",
        )?;

        let matching: Vec<VolumeRecord> = clones
            .into_iter()
            .filter(|v| v.name().contains(pattern))
            .collect();

        self.writer.write_clones(&matching)?;
        Ok(())
    }

    pub async fn create_clone(
        &self,
        parent_volume: &str,
        clone_name: &str,
        parent_snapshot: &str,
        junction_path: &str,
    ) -> CeResult<()> {
        self.say(&format!(
            "Creating clone volume {} of parent volume {} with snapshot {} and junction-path {}",
            clone_name, parent_volume, parent_snapshot, junction_path
        ))?;

        let body = CloneCreate::new(
            self.vserver(),
            parent_volume,
            clone_name,
            parent_snapshot,
            junction_path,
        );
        self.submit(
            ApiRequest::post(VOLUMES_PATH, serde_json::to_value(&body)?),
            "Error creating clone!",
        )
        .await?;
        self.say("Volume clone created successfully.")
    }

    pub async fn list_mirrors(&self) -> CeResult<()> {
        self.say("Getting list snapmirror relationships.")?;

        let query = Query::new()
            .with("destination.svm.name", self.vserver())
            .fields("state,transfer,source.path,destination.path");
        let mirrors: Vec<SnapmirrorRecord> = self.report(
            collect_records(self.api, SNAPMIRROR_PATH, query).await,
            "Error retrieving mirror relationship list.",
        )?;

        self.writer.write_mirrors(&mirrors)?;
        Ok(())
    }

    /// Create the `dp` destination volume, the relationship, then run the
    /// first transfer.
    pub async fn create_mirror(&self, source: &str, destination: &str) -> CeResult<()> {
        self.create_volume(destination, "", VolumeType::Dp).await?;

        self.say(&format!("Creating mirror {} of source {}", destination, source))?;
        let body = MirrorCreate::new(self.vserver(), source, destination);
        self.submit(
            ApiRequest::post(SNAPMIRROR_PATH, serde_json::to_value(&body)?),
            "Error creating mirror!",
        )
        .await?;
        self.say("Mirror created successfully.")?;

        self.update_mirror(destination).await
    }

    pub async fn update_mirror(&self, destination: &str) -> CeResult<()> {
        let Some(uuid) = self.mirror_uuid(destination).await? else {
            return self.not_found("Mirror not found.");
        };

        self.say(&format!("Updating mirror {}", destination))?;
        self.submit(
            ApiRequest::post(transfers_path(&uuid), json!({})),
            "Error updating mirror!",
        )
        .await?;
        self.say("Mirror updated.")
    }

    pub async fn delete_mirror(&self, destination: &str) -> CeResult<()> {
        let Some(uuid) = self.mirror_uuid(destination).await? else {
            return self.not_found("Mirror not found.");
        };

        self.say(&format!("Deleting mirror {}", destination))?;
        self.submit(
            ApiRequest::delete(relationship_path(&uuid)),
            "Error deleting mirror!",
        )
        .await?;
        self.say("Mirror deleted.")
    }

    fn vserver(&self) -> &str {
        &self.config.cluster.vserver
    }

    async fn find_volume(&self, name: &str, fields: &str) -> CeResult<Option<VolumeRecord>> {
        let query = Query::new()
            .with("name", name)
            .with("svm.name", self.vserver())
            .fields(fields);
        find_one(self.api, VOLUMES_PATH, query).await
    }

    async fn volume_uuid(&self, name: &str, failure: &str) -> CeResult<Option<Uuid>> {
        let found = self.report(self.find_volume(name, "uuid").await, failure)?;
        match found {
            Some(volume) => self.report(record_uuid(volume.uuid, "volume"), failure).map(Some),
            None => Ok(None),
        }
    }

    async fn mirror_uuid(&self, destination: &str) -> CeResult<Option<Uuid>> {
        let failure = "Error finding mirror volume!";
        let query = Query::new()
            .with("destination.path", svm_volume_path(self.vserver(), destination))
            .with("destination.svm.name", self.vserver())
            .fields("uuid");
        let found: Option<SnapmirrorRecord> =
            self.report(find_one(self.api, SNAPMIRROR_PATH, query).await, failure)?;
        match found {
            Some(mirror) => self.report(record_uuid(mirror.uuid, "relationship"), failure).map(Some),
            None => Ok(None),
        }
    }

    /// Send a mutating request and wait for the job it may start
    async fn submit(&self, request: ApiRequest, failure: &str) -> CeResult<()> {
        let outcome = async {
            let response = self.api.send(request).await?;
            self.jobs.wait(self.api, &response).await
        }
        .await;
        self.report(outcome, failure)
    }

    /// Print the step's failure message before handing the error back
    fn report<T>(&self, result: CeResult<T>, failure: &str) -> CeResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                debug!("{}: {}", failure, e);
                self.writer.write_error(failure)?;
                Err(e)
            }
        }
    }

    fn say(&self, message: &str) -> CeResult<()> {
        self.writer.write_message(message)?;
        Ok(())
    }

    fn not_found(&self, message: &str) -> CeResult<()> {
        self.writer.write_error(message)?;
        Ok(())
    }
}

fn record_uuid(uuid: Option<Uuid>, kind: &str) -> CeResult<Uuid> {
    uuid.ok_or_else(|| CeError::InvalidResponse(format!("{} record has no uuid", kind)))
}
