use async_trait::async_trait;
use ontapce::cli::args::StorageCommand;
use ontapce::cli::commands::StorageOperations;
use ontapce::cli::output::{OutputError, OutputWriter};
use ontapce::core::api::{ApiRequest, HttpMethod, RestApi};
use ontapce::core::request::VolumeType;
use ontapce::core::resources::{SnapmirrorRecord, SnapshotRecord, VolumeRecord};
use ontapce::domain::config::parse_size;
use ontapce::infrastructure::config::ConfigManager;
use ontapce::{CeConfig, CeError, CeResult, JobWatcher};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;

/// Cluster stand-in holding a volume table, answering the calls the
/// volume operations make.
#[derive(Default)]
struct FakeCluster {
    volumes: Mutex<Vec<Value>>,
    log: Mutex<Vec<String>>,
}

#[async_trait]
impl RestApi for FakeCluster {
    async fn send(&self, request: ApiRequest) -> CeResult<Value> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{} {}", request.method, request.path));

        let mut volumes = self.volumes.lock().unwrap();
        match (request.method, request.path.as_str()) {
            (HttpMethod::Get, "/api/storage/volumes") => {
                let name = request.query.get("name");
                let records: Vec<Value> = volumes
                    .iter()
                    .filter(|v| name.map_or(true, |n| v["name"] == n))
                    .cloned()
                    .collect();
                Ok(json!({ "records": records, "num_records": records.len() }))
            }
            (HttpMethod::Post, "/api/storage/volumes") => {
                let mut body = request.body.unwrap_or_default();
                if volumes.iter().any(|v| v["name"] == body["name"]) {
                    return Err(CeError::Api {
                        status: 409,
                        code: Some("917536".to_string()),
                        message: "Duplicate volume name".to_string(),
                    });
                }
                body["uuid"] = json!(format!("00000000-0000-4000-8000-{:012}", volumes.len() + 1));
                volumes.push(body);
                Ok(json!({ "job": { "uuid": "11111111-2222-4333-8444-555555555555" } }))
            }
            (HttpMethod::Get, "/api/cluster/jobs/11111111-2222-4333-8444-555555555555") => {
                Ok(json!({ "state": "success", "message": "success" }))
            }
            (HttpMethod::Delete, path) => {
                let uuid = path.rsplit('/').next().unwrap_or_default().to_string();
                volumes.retain(|v| v["uuid"] != uuid.as_str());
                Ok(Value::Null)
            }
            (HttpMethod::Patch, _) => Ok(Value::Null),
            _ => Err(CeError::Api {
                status: 404,
                code: None,
                message: format!("no route for {}", request.path),
            }),
        }
    }
}

#[derive(Default)]
struct CapturingWriter {
    messages: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    volumes: Mutex<Vec<String>>,
}

impl OutputWriter for CapturingWriter {
    fn write_volumes(&self, volumes: &[VolumeRecord]) -> Result<(), OutputError> {
        let mut listed = self.volumes.lock().unwrap();
        listed.clear();
        listed.extend(volumes.iter().map(|v| v.name().to_string()));
        Ok(())
    }

    fn write_snapshots(&self, _volume: &str, _snapshots: &[SnapshotRecord]) -> Result<(), OutputError> {
        Ok(())
    }

    fn write_clones(&self, _clones: &[VolumeRecord]) -> Result<(), OutputError> {
        Ok(())
    }

    fn write_mirrors(&self, _mirrors: &[SnapmirrorRecord]) -> Result<(), OutputError> {
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        self.errors.lock().unwrap().push(error.to_string());
        Ok(())
    }
}

/// Integration tests for the ontapce library
#[cfg(test)]
mod integration_tests {
    use super::*;

    fn operations<'a>(
        cluster: &'a FakeCluster,
        config: &'a CeConfig,
        writer: &'a CapturingWriter,
    ) -> StorageOperations<'a> {
        StorageOperations::new(cluster, config, writer)
            .with_job_watcher(JobWatcher::new(Duration::from_secs(5), Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_volume_lifecycle() {
        let cluster = FakeCluster::default();
        let config = CeConfig::default();
        let writer = CapturingWriter::default();
        let ops = operations(&cluster, &config, &writer);

        for name in ["build123", "build124", "scratch"] {
            ops.execute(&StorageCommand::CreateVolume {
                volume: name.to_string(),
                junction_path: format!("/builds/{}", name),
            })
            .await
            .unwrap();
        }

        ops.execute(&StorageCommand::ListVolumes { pattern: "build".to_string() })
            .await
            .unwrap();
        assert_eq!(*writer.volumes.lock().unwrap(), vec!["build123", "build124"]);

        ops.execute(&StorageCommand::DeleteVolume { volume: "build123".to_string() })
            .await
            .unwrap();
        ops.execute(&StorageCommand::ListVolumes { pattern: "build".to_string() })
            .await
            .unwrap();
        assert_eq!(*writer.volumes.lock().unwrap(), vec!["build124"]);

        // deleting it again only reports that it is gone
        ops.execute(&StorageCommand::DeleteVolume { volume: "build123".to_string() })
            .await
            .unwrap();
        assert_eq!(*writer.errors.lock().unwrap(), vec!["Error: Volume not found!"]);
    }

    #[tokio::test]
    async fn test_duplicate_volume_fails() {
        let cluster = FakeCluster::default();
        let config = CeConfig::default();
        let writer = CapturingWriter::default();
        let ops = operations(&cluster, &config, &writer);

        ops.create_volume("build123", "/builds/build123", VolumeType::Rw)
            .await
            .unwrap();
        let err = ops
            .create_volume("build123", "/builds/build123", VolumeType::Rw)
            .await
            .unwrap_err();

        assert!(matches!(err, CeError::Api { status: 409, .. }));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(*writer.errors.lock().unwrap(), vec!["Error creating volume!"]);
    }

    #[tokio::test]
    async fn test_create_volume_polls_job_before_max_files() {
        let cluster = FakeCluster::default();
        let config = CeConfig::default();
        let writer = CapturingWriter::default();

        operations(&cluster, &config, &writer)
            .create_volume("build123", "/builds/build123", VolumeType::Rw)
            .await
            .unwrap();

        let log = cluster.log.lock().unwrap().clone();
        assert_eq!(log[0], "POST /api/storage/volumes");
        assert_eq!(log[1], "GET /api/cluster/jobs/11111111-2222-4333-8444-555555555555");
        assert_eq!(log[2], "GET /api/storage/volumes");
        assert!(log[3].starts_with("PATCH /api/storage/volumes/00000000-0000-4000-8000-"));
    }

    #[test]
    fn test_config_defaults() {
        let config = CeConfig::default();

        assert_eq!(config.cluster.host, "vs1");
        assert_eq!(config.cluster.username, "vsadmin");
        assert_eq!(config.cluster.vserver, "vs1");
        assert_eq!(config.volume.aggregates, vec!["aggr1".to_string()]);
        assert_eq!(config.volume.size_bytes().unwrap(), 10240u64 << 30);
        assert_eq!(config.volume.max_files, 75_000_000);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_manager_project_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let manager = ConfigManager::with_paths(None, None);
        let path = manager.init_project_config(temp_dir.path()).unwrap();

        let with_project = ConfigManager::with_paths(None, Some(path));
        let config = with_project.load_config().unwrap();
        assert_eq!(config.volume.snapshot_policy, "none");
        assert_eq!(config.cluster.poll_timeout_secs, 120);
    }

    proptest! {
        #[test]
        fn test_parse_size_units(value in 0u64..16_000, unit in 0usize..5) {
            let suffixes = ["k", "m", "g", "t", "p"];
            let parsed = parse_size(&format!("{}{}", value, suffixes[unit])).unwrap();
            prop_assert_eq!(parsed, value << (10 * (unit as u32 + 1)));

            let upper = parse_size(&format!("{}{}B", value, suffixes[unit].to_uppercase())).unwrap();
            prop_assert_eq!(upper, parsed);
        }

        #[test]
        fn test_parse_size_rejects_garbage(text in "[a-z]{1,3}") {
            prop_assert!(parse_size(&text).is_err());
        }
    }
}
