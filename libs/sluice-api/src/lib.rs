pub mod config;
pub mod decoder;
pub mod error;
pub mod ffi;
pub mod record;
pub mod task;
pub mod util;
pub mod writer;

pub use sluice_api_derive::ConfigParams;
