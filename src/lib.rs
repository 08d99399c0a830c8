//! Soroban payment verifier.
//!
//! Records merchant payments and confirms them on-chain by invoking the
//! `verify_payment` entry point of a Soroban contract.

pub mod api;
pub mod app;
pub mod domain;
pub mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
