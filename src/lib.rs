//! ontapce Library
//!
//! Volume, snapshot, FlexClone and SnapMirror operations against a storage
//! cluster's REST management API.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use domain::error::{CeError, CeResult};
pub use domain::config::CeConfig;
pub use core::api::{ApiRequest, RestApi};
pub use core::jobs::JobWatcher;
pub use infrastructure::rest::OntapClient;
