// Core module - REST plumbing, request bodies and job tracking
pub mod api;
pub mod jobs;
pub mod request;
pub mod resources;
