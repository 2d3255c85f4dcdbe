//! AWS-oriented adapters and handlers for storage-integration provisioning.
//!
//! This crate owns runtime integration details: the Lambda lifecycle handler,
//! the warehouse session client, and the collaborator traits the binary binds
//! to AWS SDK clients. Contracts, configuration, and policy documents live in
//! `storage_integration_core`.

pub mod adapters;
pub mod handlers;
