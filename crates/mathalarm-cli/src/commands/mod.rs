pub mod config;
pub mod drill;
pub mod run;
