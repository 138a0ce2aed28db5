//! Civic issue reporting core.
//!
//! Submissions pass through [`validate::validate`] before reaching an
//! [`store::IssueStore`]; listings are produced by [`query::query`]; status
//! changes go through [`workflow::transition`].

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod memory;
pub mod models;
pub mod query;
pub mod store;
pub mod validate;
pub mod workflow;

pub use error::{CivicError, Result};
