//! Archive-level load and dump.
//!
//! [`load`] runs the whole read path: split the container, verify the
//! checksum, decode, validate and, when enabled, recover. [`dump`] validates
//! a profile and packs it into archive bytes.

use crate::archive::{self, Archive, VerificationResult};
use crate::error::{Error, Result};
use crate::recover::{Recovery, RecoveryOutcome, DEFAULT_MAX_PASSES};
use crate::schema::{self, Profile};
use crate::validate::{has_errors, Correction, Mode, RuleRegistry, Violation};
use bytes::Bytes;
use tracing::debug;

/// Configuration for [`load`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Validation mode
    pub mode: Mode,
    /// Attempt recovery on checksum mismatch or validation errors
    pub recover: bool,
    /// Upper bound on recovery passes
    pub max_recovery_passes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Strict,
            recover: false,
            max_recovery_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the validation mode
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable or disable recovery
    pub fn recover(mut self, enabled: bool) -> Self {
        self.recover = enabled;
        self
    }

    /// Set the maximum number of recovery passes
    pub fn max_recovery_passes(mut self, passes: usize) -> Self {
        self.max_recovery_passes = passes;
        self
    }
}

/// A successfully loaded archive
#[derive(Debug, Clone)]
pub struct Loaded {
    /// Decoded, possibly corrected profile
    pub profile: Profile,
    /// Outcome of the checksum check on the input bytes
    pub verification: VerificationResult,
    /// Warning-severity violations
    pub warnings: Vec<Violation>,
    /// Corrections applied by recovery
    pub corrections: Vec<Correction>,
}

impl Loaded {
    /// Returns true if recovery changed anything
    pub fn was_recovered(&self) -> bool {
        !self.corrections.is_empty()
    }
}

/// Loads an archive.
///
/// Without recovery a checksum mismatch fails with
/// [`Error::ChecksumMismatch`] and error-severity violations fail with
/// [`Error::Validation`] carrying every violation found. With recovery both
/// are corrected where possible; otherwise the recovery error is returned.
/// Decode and container errors are always fatal.
pub fn load(
    data: impl Into<Bytes>,
    config: &EngineConfig,
    registry: &RuleRegistry,
) -> Result<Loaded> {
    let archive = Archive::open(data)?;
    let verification = archive.verify();

    if config.recover {
        let outcome = Recovery::new(registry)
            .mode(config.mode)
            .max_passes(config.max_recovery_passes)
            .recover_archive(archive.payload(), verification);

        return match outcome {
            RecoveryOutcome::Intact { profile, warnings } => Ok(Loaded {
                profile,
                verification,
                warnings,
                corrections: Vec::new(),
            }),
            RecoveryOutcome::Recovered {
                profile,
                corrections,
                warnings,
            } => Ok(Loaded {
                profile,
                verification,
                warnings,
                corrections,
            }),
            RecoveryOutcome::Unrecoverable { error, .. } => Err(error),
        };
    }

    verification.into_result()?;
    let profile = schema::decode(archive.payload())?;
    let violations = registry.validate(&profile, config.mode);
    if has_errors(&violations) {
        debug!("Archive failed validation");
        return Err(Error::Validation(violations));
    }

    Ok(Loaded {
        profile,
        verification,
        warnings: violations,
        corrections: Vec::new(),
    })
}

/// Validates `profile` and packs it into archive bytes.
///
/// Fails with [`Error::Validation`] if any error-severity violation is found;
/// [`Mode::Unsafe`] skips validation.
pub fn dump(profile: &Profile, mode: Mode, registry: &RuleRegistry) -> Result<Vec<u8>> {
    let violations = registry.validate(profile, mode);
    if has_errors(&violations) {
        return Err(Error::Validation(violations));
    }
    Ok(archive::pack(&schema::encode(profile)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::ProfileBuilder;
    use pretty_assertions::assert_eq;

    fn bytes_of(profile: &Profile) -> Vec<u8> {
        archive::pack(&schema::encode(profile))
    }

    #[test]
    fn test_dump_then_load() {
        let profile = ProfileBuilder::new().name("Dump").build();
        let bytes = dump(&profile, Mode::Strict, RuleRegistry::shared()).unwrap();

        let loaded = load(bytes, &EngineConfig::default(), RuleRegistry::shared()).unwrap();
        assert_eq!(loaded.profile, profile);
        assert!(loaded.verification.is_verified());
        assert!(!loaded.was_recovered());
    }

    #[test]
    fn test_dump_rejects_invalid_profile() {
        let mut profile = ProfileBuilder::new().build();
        profile.b_weight = -5;

        let err = dump(&profile, Mode::Strict, RuleRegistry::shared()).unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert!(dump(&profile, Mode::Unsafe, RuleRegistry::shared()).is_ok());
    }

    #[test]
    fn test_load_rejects_checksum_mismatch() {
        let mut bytes = bytes_of(&ProfileBuilder::new().build());
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        let err = load(bytes, &EngineConfig::default(), RuleRegistry::shared()).unwrap_err();
        assert!(matches!(err, Error::ChecksumMismatch { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_recovery_rewrites_non_hex_checksum() {
        let profile = ProfileBuilder::new().build();
        let mut bytes = bytes_of(&profile);
        bytes[5] = b'z';

        let err =
            load(bytes.clone(), &EngineConfig::default(), RuleRegistry::shared()).unwrap_err();
        assert!(matches!(err, Error::ChecksumMismatch { .. }));

        let config = EngineConfig::new().recover(true);
        let loaded = load(bytes, &config, RuleRegistry::shared()).unwrap();
        assert_eq!(loaded.profile, profile);
        assert_eq!(loaded.corrections.len(), 1);
        assert_eq!(loaded.corrections[0].path, "checksum");

        let saved = dump(&loaded.profile, Mode::Strict, RuleRegistry::shared()).unwrap();
        assert!(Archive::open(saved).unwrap().verify().is_verified());
    }

    #[test]
    fn test_load_reports_all_violations() {
        let mut profile = ProfileBuilder::new().build();
        profile.b_weight = -5;
        profile.c_zero_air_humidity = 101;

        let err = load(
            bytes_of(&profile),
            &EngineConfig::default(),
            RuleRegistry::shared(),
        )
        .unwrap_err();
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_load_unsafe_skips_validation() {
        let mut profile = ProfileBuilder::new().build();
        profile.b_weight = -5;

        let config = EngineConfig::new().mode(Mode::Unsafe);
        let loaded = load(bytes_of(&profile), &config, RuleRegistry::shared()).unwrap();
        assert_eq!(loaded.profile.b_weight, -5);
    }

    #[test]
    fn test_load_with_recovery() {
        let mut profile = ProfileBuilder::new().build();
        profile.b_weight = -5;

        let config = EngineConfig::new().recover(true);
        let loaded = load(bytes_of(&profile), &config, RuleRegistry::shared()).unwrap();
        assert!(loaded.was_recovered());
        assert_eq!(loaded.profile.b_weight, 10);
    }

    #[test]
    fn test_load_short_input() {
        let err = load(&b"abc"[..], &EngineConfig::default(), RuleRegistry::shared()).unwrap_err();
        assert!(matches!(err, Error::ArchiveFormat { .. }));
    }
}
