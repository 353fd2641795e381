//! mefm-core - Core library for mefm
//!
//! This crate provides the comment thread model of the practitioner
//! directory: the two-level comment index, status transitions, the display
//! policy, moderation, and the persistence and identity seams.

pub mod error;
pub mod types;
pub mod config;
pub mod comment;
pub mod store;
pub mod identity;
pub mod moderation;

pub use error::{MefmError, Result};
pub use types::*;
