//! docsnaps - watch published documents and keep a snapshot of every change.
//!
//! Plugins describe which documents to watch. Installing a plugin loads its
//! company, service, document and language hierarchy into SQLite; each run
//! fetches every enabled document instance concurrently, applies the
//! plugin's transforms and stores a snapshot when the text changed.

pub mod cli;
pub mod config;
pub mod http_client;
pub mod models;
pub mod plugins;
pub mod repository;
pub mod schema;
pub mod services;
