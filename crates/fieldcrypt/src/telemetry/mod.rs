//! Structured logging setup for hosts that do not install their own subscriber.
//!
//! # Telemetry invariants
//!
//! - **No key material, plaintext or ciphertext** may appear in any event
//!   field. Events carry field names, algorithm names and error codes only.
//! - Log level is configurable via `FIELDCRYPT__LOG_LEVEL` (default: `info`);
//!   `RUST_LOG` takes precedence when set.

pub mod init;

pub use init::init_tracing;
