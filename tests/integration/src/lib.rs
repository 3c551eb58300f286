//! Integration test utilities for parley
//!
//! This crate provides a mock REST API and gateway that the real client
//! connects to over loopback.

pub mod fixtures;
pub mod gateway;
pub mod helpers;

pub use fixtures::*;
pub use gateway::{Connection, ScriptedGateway, Step};
pub use helpers::*;
