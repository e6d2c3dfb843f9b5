use crate::core::api::{ApiRequest, Query, RestApi};
use crate::core::resources::{job_path, JobRecord, JobState};
use crate::domain::config::ClusterConfig;
use crate::domain::error::{CeError, CeResult};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Waits for the asynchronous jobs started by mutating calls.
///
/// The cluster answers long-running POST/PATCH/DELETE requests with
/// `202 Accepted` and a `{"job": {"uuid": ...}}` body; the change is only
/// done once the job reaches `success`.
#[derive(Debug, Clone)]
pub struct JobWatcher {
    timeout: Duration,
    interval: Duration,
}

impl JobWatcher {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub fn from_config(cluster: &ClusterConfig) -> Self {
        Self::new(
            Duration::from_secs(cluster.poll_timeout_secs),
            Duration::from_secs(cluster.poll_interval_secs),
        )
    }

    /// Block until the job referenced by `response` finishes.
    ///
    /// Responses without a job reference return immediately.
    pub async fn wait(&self, api: &dyn RestApi, response: &Value) -> CeResult<()> {
        let Some(uuid) = job_uuid(response) else {
            return Ok(());
        };

        info!("Waiting for job {}", uuid);
        // a timeout past the clock's range means no deadline
        let deadline = Instant::now().checked_add(self.timeout);

        loop {
            let request = ApiRequest::get(job_path(&uuid))
                .with_query(Query::new().fields("state,message,code"));
            let body = api.send(request).await?;
            let job: JobRecord = serde_json::from_value(body)
                .map_err(|e| CeError::InvalidResponse(format!("job {}: {}", uuid, e)))?;

            match job.state {
                JobState::Success => {
                    debug!("Job {} succeeded", uuid);
                    return Ok(());
                }
                JobState::Failure => {
                    return Err(CeError::Job {
                        code: job.code.as_ref().map(code_to_string),
                        message: job.message.unwrap_or_else(|| "no message".to_string()),
                    });
                }
                state => debug!("Job {} is {:?}", uuid, state),
            }

            if matches!(deadline, Some(deadline) if Instant::now() >= deadline) {
                return Err(CeError::JobTimeout {
                    uuid,
                    seconds: self.timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

impl Default for JobWatcher {
    fn default() -> Self {
        Self::from_config(&ClusterConfig::default())
    }
}

fn job_uuid(response: &Value) -> Option<String> {
    response
        .get("job")?
        .get("uuid")?
        .as_str()
        .map(str::to_string)
}

fn code_to_string(code: &Value) -> String {
    match code {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
