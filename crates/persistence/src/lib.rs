//! Persistence layer for SkyAid.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations and transactional workflows
//! - SQL migrations under `src/migrations`

pub mod db;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod repositories;

pub use error::WorkflowError;
