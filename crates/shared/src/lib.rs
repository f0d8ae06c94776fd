//! Shared utilities and common types for the SkyAid dispatch backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Coordinate and payload validation
//! - Bearer token validation for the external auth provider
//! - Cursor-based pagination

pub mod jwt;
pub mod pagination;
pub mod validation;
