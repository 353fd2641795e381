//! Comment thread module
//!
//! Holds the two-level comment index, status transitions, validation and
//! the display policy.

pub mod model;
pub mod manager;
pub mod index;
pub mod validator;
pub mod builder;
pub mod policy;
pub mod inflight;

pub use model::*;
pub use manager::CommentManager;
pub use index::{CommentIndex, Thread, ThreadEntry};
pub use validator::CommentValidator;
pub use builder::CommentBuilder;
pub use policy::{render_text, DisplayEntry, DisplayPolicy, BLOCKED_PLACEHOLDER};
