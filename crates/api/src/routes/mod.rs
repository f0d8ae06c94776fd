//! HTTP route handlers.

pub mod assignments;
pub mod emergencies;
pub mod events;
pub mod health;
pub mod notifications;
pub mod profile;
