//! Shared storage-integration domain primitives.
//!
//! This crate owns the deterministic half of provisioning: lifecycle and
//! callback contracts, configuration validation, resource naming, IAM policy
//! documents, and warehouse statement construction. It intentionally excludes
//! AWS SDK, HTTP, and Lambda runtime concerns.

pub mod config;
pub mod contract;
pub mod error;
pub mod identity;
pub mod naming;
pub mod policy;
pub mod statements;
