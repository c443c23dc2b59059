pub mod config;
pub mod error;
pub mod inspect;
pub mod params;
pub mod run;
