//! Library Desk
//!
//! Catalogue, author and customer reports plus transactional borrow/return for
//! a small library backed by PostgreSQL.

use std::sync::Arc;

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared by every command
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repository: repository::Repository,
    pub services: Arc<services::Services>,
}
