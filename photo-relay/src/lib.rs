//! Photo Relay service
//!
//! Accepts a photo upload, forwards it with a fixed instruction to a
//! generative image API and hands the generated image back to the browser.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Generative image API client
pub mod generation;

/// Uploaded and generated image types
pub mod image;

/// HTML pages
pub mod pages;

/// Upload relay
pub mod relay;

/// HTTP routes
pub mod routes;

/// Server startup
pub mod server;

/// Temp file storage
pub mod storage;

/// Configuration and error types
pub mod types;
