//! Shared types and configuration for Tillbook.
//!
//! This crate provides common types used across all other crates:
//! - Pagination types for list endpoints
//! - Configuration management

pub mod config;
pub mod types;

pub use config::AppConfig;
