use crate::core::api::{ApiRequest, RestApi};
use crate::domain::{config::ClusterConfig, error::{CeError, CeResult}};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Blocking HTTPS client for the management API.
///
/// Each request runs on tokio's blocking pool; the caller awaits it before
/// issuing the next one.
pub struct OntapClient {
    agent: ureq::Agent,
    base_url: String,
    auth_header: String,
}

impl OntapClient {
    pub fn new(cluster: &ClusterConfig) -> CeResult<Self> {
        if !cluster.verify_tls {
            warn!("TLS certificate verification is disabled for {}", cluster.host);
        }

        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(!cluster.verify_tls)
            .danger_accept_invalid_hostnames(!cluster.verify_tls)
            .build()
            .map_err(|e| CeError::Transport(format!("TLS setup failed: {}", e)))?;

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(cluster.request_timeout_secs))
            .user_agent(concat!("ontapce/", env!("CARGO_PKG_VERSION")))
            .tls_connector(Arc::new(connector))
            .build();

        Ok(Self {
            agent,
            base_url: base_url(&cluster.host),
            auth_header: basic_auth(&cluster.username, &cluster.password),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RestApi for OntapClient {
    async fn send(&self, request: ApiRequest) -> CeResult<Value> {
        let agent = self.agent.clone();
        let url = format!("{}{}", self.base_url, request.path);
        let auth = self.auth_header.clone();

        debug!("{} {} {:?}", request.method, url, request.query);
        if let Some(body) = &request.body {
            trace!("Request body: {}", body);
        }

        tokio::task::spawn_blocking(move || execute(&agent, &url, &auth, &request))
            .await
            .map_err(|e| CeError::Transport(format!("request task failed: {}", e)))?
    }
}

fn execute(agent: &ureq::Agent, url: &str, auth: &str, request: &ApiRequest) -> CeResult<Value> {
    let mut call = agent
        .request(&request.method.to_string(), url)
        .set("Authorization", auth)
        .set("Accept", "application/json");
    for (key, value) in request.query.iter() {
        call = call.query(key, value);
    }

    let result = match &request.body {
        Some(body) => call
            .set("Content-Type", "application/json")
            .send_string(&serde_json::to_string(body)?),
        None => call.call(),
    };

    match result {
        Ok(response) => {
            debug!("{} {} -> {}", request.method, url, response.status());
            let text = response.into_string()?;
            trace!("Response body: {}", text);
            decode_body(&text)
        }
        Err(ureq::Error::Status(status, response)) => {
            let text = response.into_string().unwrap_or_default();
            debug!("{} {} -> {}: {}", request.method, url, status, text);
            Err(api_error(status, &text))
        }
        Err(ureq::Error::Transport(transport)) => Err(CeError::Transport(transport.to_string())),
    }
}

/// `https://<host>` unless the host already names a scheme
pub fn base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("https://") || host.starts_with("http://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

pub fn basic_auth(username: &str, password: &str) -> String {
    let credentials = format!("{}:{}", username, password);
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(credentials)
    )
}

fn decode_body(text: &str) -> CeResult<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text)
        .map_err(|e| CeError::InvalidResponse(format!("body is not JSON: {}", e)))
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<Value>,
}

/// Map a non-success answer to an API error, keeping the cluster's message
fn api_error(status: u16, text: &str) -> CeError {
    match serde_json::from_str::<ErrorEnvelope>(text) {
        Ok(envelope) => CeError::Api {
            status,
            code: envelope.error.code.map(|code| match code {
                Value::String(s) => s,
                other => other.to_string(),
            }),
            message: envelope
                .error
                .message
                .unwrap_or_else(|| "no error message".to_string()),
        },
        Err(_) => CeError::Api {
            status,
            code: None,
            message: if text.trim().is_empty() {
                "empty response".to_string()
            } else {
                text.trim().to_string()
            },
        },
    }
}
