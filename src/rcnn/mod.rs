pub mod bbox;
pub mod config;
