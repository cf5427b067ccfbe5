//! Shared scaffolding for the `meridian-pipeline` binary.

pub mod common;
