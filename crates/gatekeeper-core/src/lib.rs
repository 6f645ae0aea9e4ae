//! # Gatekeeper Core
//!
//! The domain layer of the admission-control subsystem.
//! This crate contains policies, request classification and decision accounting
//! with zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;

pub use error::PolicyError;
