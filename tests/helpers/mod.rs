//! Test helpers module
//!
//! This module provides utilities and helpers for testing the EventHub client.
//! It includes a mock marketplace/gateway server, test data builders and a
//! unified test context.

#![allow(dead_code)]

pub mod api_mock;
pub mod test_context;
pub mod test_data;

pub use api_mock::*;
pub use test_context::*;
pub use test_data::*;
