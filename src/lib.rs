pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod files;
pub mod markdown;
pub mod models;
pub mod publishing;
pub mod slug;
pub mod store;
pub mod web;

pub use crate::config::Config;
pub use crate::error::{Error, Result};
