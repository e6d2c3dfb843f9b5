// REST module - HTTPS client for the cluster management API
pub mod client;

pub use client::OntapClient;
