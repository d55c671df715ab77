//! Keystone - Real estate marketing site and content management
//!
//! This library provides the storage, services and HTTP API behind the
//! Keystone site, plus the JSON to PostgreSQL migration tools.

pub mod api;
pub mod config;
pub mod db;
pub mod migration;
pub mod models;
pub mod services;
