//! Test data generation and mock collaborators shared across the workspace's
//! test suites. Not for production use.

pub mod datagen;
pub mod mocks;
pub mod multistore;
