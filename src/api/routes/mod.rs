//! API Routes
//!
//! Route handlers organized by functionality.

pub mod appointments;
pub mod auth;
pub mod health;
