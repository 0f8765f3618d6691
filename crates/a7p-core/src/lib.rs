//! # a7p-core
//!
//! A library for reading, validating, repairing and writing `.a7p` ballistic
//! profile archives.
//!
//! This crate provides the core functionality for:
//! - Splitting archives into payload and checksum and verifying the digest
//! - Decoding payloads into a typed [`Profile`] without losing unknown fields
//! - Converting scaled integers to physical units and back
//! - Validating profiles against range, enum, reference, ordering and
//!   cross-field rules
//! - Recovering damaged archives with recorded corrections
//! - Synchronising or offsetting the zero of a profile
//!
//! ## Architecture
//!
//! - [`archive`]: container codec and checksum
//! - [`schema`]: typed profile and wire mapping
//! - [`units`]: scale table
//! - [`validate`]: rules and the rule registry
//! - [`recover`]: recovery state machine
//! - [`zero`]: zero sync and click offsets
//! - [`distances`]: distance presets and table maintenance
//! - [`factory`]: profile builder
//! - [`pipeline`]: archive-level [`load`] and [`dump`]
//! - [`error`]: error types
//!
//! The engine performs no I/O; callers hand in and take out byte buffers.
//!
//! ## Example
//!
//! ```
//! use a7p_core::{dump, load, EngineConfig, Mode, ProfileBuilder, RuleRegistry};
//!
//! let profile = ProfileBuilder::new().name("308 Match").build();
//! let bytes = dump(&profile, Mode::Strict, RuleRegistry::shared())?;
//!
//! let loaded = load(bytes, &EngineConfig::default(), RuleRegistry::shared())?;
//! assert_eq!(loaded.profile.profile_name, "308 Match");
//! # Ok::<(), a7p_core::Error>(())
//! ```
//!
//! ## Extensibility
//!
//! Validation rules implement [`validate::Rule`] and are added to a
//! [`RuleRegistry`]; correction policies are set per field with
//! [`RuleRegistry::with_clamp_policy`].

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod archive;
pub mod distances;
pub mod error;
pub mod factory;
pub mod pipeline;
pub mod recover;
pub mod schema;
pub mod units;
pub mod validate;
pub mod zero;

// Re-export primary types for convenience
pub use archive::{Archive, Checksum, StoredChecksum, VerificationResult};
pub use distances::DistancePreset;
pub use error::{Error, Result};
pub use factory::ProfileBuilder;
pub use pipeline::{dump, load, EngineConfig, Loaded};
pub use recover::{Recovery, RecoveryOutcome, RecoveryState};
pub use schema::{CoefRow, DType, EnumValue, GType, Profile, SwPos, TwistDir};
pub use validate::{ClampPolicy, Correction, Mode, RuleRegistry, Severity, Violation};
pub use zero::{ZeroAdjustment, ZeroOffset, ZeroReference};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
