//! Integration tests for provisioning operations.
//!
//! Every test starts from the seeded fixture directory (see
//! `common::fixtures`) and inspects the directory state and the request
//! journal afterwards.

pub mod partial_failure;
pub mod passwords;
pub mod rename;
pub mod update_pipeline;
