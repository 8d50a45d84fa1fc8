//! Linkshelf: an offline-first bookmark sync core.
//!
//! Bookmarks are written to a local SQLite store first and mirrored to a
//! hosted backend, with a durable queue replaying anything the backend has not
//! acknowledged. The library exposes every module for the RPC binary and the
//! integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
