//! Core types for the txfs transactional file store.
//!
//! This crate provides the building blocks shared across txfs components:
//! - The error taxonomy and crate-wide [`Result`] alias
//! - Store configuration ([`StoreConfig`]) and durability tuning ([`SyncMode`])

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;

pub use config::{StoreConfig, SyncMode};
pub use error::{Error, Result};
