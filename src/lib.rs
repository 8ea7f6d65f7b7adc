//! BookDex - book catalog ingestion and browsing system.
//!
//! Scrapes a retail book site with a browser-first extraction pipeline,
//! normalizes the results, and reconciles them into a SQLite catalog
//! served over a JSON API.

pub mod cli;
pub mod config;
pub mod models;
pub mod repository;
pub mod schema;
pub mod scrapers;
pub mod server;
pub mod services;
