//! Domain layer for the SkyAid dispatch backend.
//!
//! This crate contains:
//! - Domain models (Emergency, SearchAssignment, Finding, Notification, UserProfile)
//! - Status state machines for emergencies and assignments
//! - Dispatch logic: distance math, operator matching, search areas
//! - Push notification and change-event abstractions

pub mod models;
pub mod services;
