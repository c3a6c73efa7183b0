pub mod config;
pub mod logging;

pub mod archive;
pub mod chapter;
pub mod control;
pub mod coordinator;
pub mod fetcher;
pub mod maintenance;
pub mod manifest;
pub mod pacing;
pub mod pipeline;
pub mod resume;
pub mod retry;
