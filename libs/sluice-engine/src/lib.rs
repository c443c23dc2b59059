pub mod committer;
pub mod config;
pub mod error;
pub mod fs;
pub mod plugin_host;
pub mod runner;
pub mod task;
