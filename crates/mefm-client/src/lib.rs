//! mefm-client - HTTP persistence client for mefm
//!
//! This crate implements the comment store against the directory's REST
//! backend.

mod http_store;

pub use http_store::HttpCommentStore;
