//! Domain models for specification verification.
//!
//! This module contains the core domain types including requirements,
//! specification identifiers, and configuration.

/// Requirement record and verification kinds.
pub mod requirement;
pub use requirement::{Requirement, SourceLocation, VerificationKind};

mod config;
pub use config::Config;

/// Specification identifier (`PREFIX-NNN`) types and parsing.
pub mod spec_id;
pub use spec_id::{Error as SpecIdError, SpecId};
