//! TaskPay payments backend library.
//!
//! The binary in `main.rs` wires these modules together; integration
//! tests drive them directly against an in-memory database.

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod escrow;
pub mod models;
pub mod processor;
pub mod verification;
pub mod webhook;
