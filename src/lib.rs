//! Magazzino Tool Inventory
//!
//! Tracks workshop tools: how many units exist, how many are available, which
//! operators hold how many, and every checkout and return, persisted in a
//! single CSV inventory file and served as a REST JSON API.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
