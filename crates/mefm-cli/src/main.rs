//! mefm - comments and moderation for the practitioner directory
//!
//! ## Quick Start
//!
//! ```bash
//! # Point mefm at the backend and pick a user
//! mefm config init --backend http://localhost:8080 --user-id 7 --username robert
//!
//! # Read the threads on a practitioner
//! mefm comments list 42
//!
//! # Reply to a thread
//! mefm comments reply 42 1001 "Same experience here"
//!
//! # Review flagged comments
//! mefm moderate queue --status flagged
//! ```

mod commands;

#[tokio::main]
async fn main() {
    if let Err(err) = commands::run().await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
