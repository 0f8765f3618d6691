//! Recovery of damaged archives.
//!
//! Recovery is a small state machine:
//!
//! ```text
//! Intact ──────────────► (done)
//! ChecksumMismatch ──► Decoded ──► validate
//!                                   ├─ no errors ─────────► Recovered
//!                                   └─ errors ─► repair ──┬► Recovered
//!                                                         └► Unrecoverable
//! ```
//!
//! Repairs run in passes. Each pass asks every rule that reported an error to
//! repair the profile, in registry order, then validates again. Recovery
//! stops when no errors remain, when a rule has no strategy for its
//! violation, when a pass changes nothing, or after the configured number of
//! passes. An unrecoverable profile is returned unmodified.

use crate::archive::VerificationResult;
use crate::error::{Error, Result};
use crate::schema::{self, Profile};
use crate::validate::{has_errors, Correction, Mode, Repair, RuleRegistry, Violation};
use std::collections::BTreeSet;
use tracing::{debug, trace, warn};

/// Default upper bound on repair passes
pub const DEFAULT_MAX_PASSES: usize = 4;

/// Rule id recorded for a rewritten checksum
pub const CHECKSUM_RULE: &str = "integrity.checksum";

/// Where an archive ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    /// Checksum verified and no error violations
    Intact,
    /// Stored checksum did not match the payload
    ChecksumMismatch,
    /// Payload decoded despite the mismatch
    Decoded,
    /// Every problem was corrected
    Recovered,
    /// Recovery gave up
    Unrecoverable,
}

/// Final result of a recovery attempt
#[derive(Debug)]
pub enum RecoveryOutcome {
    /// Nothing needed fixing
    Intact {
        /// The profile as decoded
        profile: Profile,
        /// Warning-severity violations
        warnings: Vec<Violation>,
    },
    /// The profile was corrected
    Recovered {
        /// Corrected profile
        profile: Profile,
        /// Every change made, in order
        corrections: Vec<Correction>,
        /// Warning-severity violations left after correction
        warnings: Vec<Violation>,
    },
    /// The profile could not be corrected
    Unrecoverable {
        /// The profile as decoded, unmodified; `None` if decoding failed
        profile: Option<Profile>,
        /// Violations found before recovery started
        violations: Vec<Violation>,
        /// Why recovery failed
        error: Error,
    },
}

impl RecoveryOutcome {
    /// Terminal state of this outcome
    pub fn state(&self) -> RecoveryState {
        match self {
            Self::Intact { .. } => RecoveryState::Intact,
            Self::Recovered { .. } => RecoveryState::Recovered,
            Self::Unrecoverable { .. } => RecoveryState::Unrecoverable,
        }
    }

    /// Corrections applied; empty unless recovered
    pub fn corrections(&self) -> &[Correction] {
        match self {
            Self::Recovered { corrections, .. } => corrections,
            Self::Intact { .. } | Self::Unrecoverable { .. } => &[],
        }
    }

    /// Resulting profile, if one is available
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Self::Intact { profile, .. } | Self::Recovered { profile, .. } => Some(profile),
            Self::Unrecoverable { profile, .. } => profile.as_ref(),
        }
    }

    /// Returns the profile and its corrections, or the recovery error
    pub fn into_result(self) -> Result<(Profile, Vec<Correction>)> {
        match self {
            Self::Intact { profile, .. } => Ok((profile, Vec::new())),
            Self::Recovered {
                profile,
                corrections,
                ..
            } => Ok((profile, corrections)),
            Self::Unrecoverable { error, .. } => Err(error),
        }
    }
}

/// Drives repairs using the rules of a registry
#[derive(Debug, Clone, Copy)]
pub struct Recovery<'a> {
    registry: &'a RuleRegistry,
    mode: Mode,
    max_passes: usize,
}

impl<'a> Recovery<'a> {
    /// Recovery with the rules and correction policies of `registry`
    pub fn new(registry: &'a RuleRegistry) -> Self {
        Self {
            registry,
            mode: Mode::Strict,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    /// Validation mode; [`Mode::Unsafe`] limits recovery to the checksum
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Upper bound on repair passes
    pub fn max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes.max(1);
        self
    }

    /// Recovers an archive payload given the outcome of its checksum check
    pub fn recover_archive(
        &self,
        payload: &[u8],
        verification: VerificationResult,
    ) -> RecoveryOutcome {
        let mut corrections = Vec::new();
        if let VerificationResult::Mismatch { stored, computed } = verification {
            trace!("Recovery state: {:?}", RecoveryState::ChecksumMismatch);
            warn!("Checksum mismatch, decoding without integrity check");
            corrections.push(Correction::new(
                "checksum",
                CHECKSUM_RULE,
                stored.to_string(),
                computed.to_hex(),
            ));
        }

        let profile = match schema::decode(payload) {
            Ok(profile) => profile,
            Err(error) => {
                debug!("Payload cannot be decoded: {}", error);
                return RecoveryOutcome::Unrecoverable {
                    profile: None,
                    violations: Vec::new(),
                    error,
                };
            }
        };
        trace!("Recovery state: {:?}", RecoveryState::Decoded);

        self.repair(profile, corrections)
    }

    /// Recovers an already decoded profile
    pub fn recover_profile(&self, profile: Profile) -> RecoveryOutcome {
        self.repair(profile, Vec::new())
    }

    fn repair(&self, original: Profile, mut corrections: Vec<Correction>) -> RecoveryOutcome {
        let initial = self.registry.validate(&original, self.mode);
        if !has_errors(&initial) {
            return finish(original, corrections, initial);
        }

        let mut profile = original.clone();
        let mut violations = initial.clone();

        for pass in 1..=self.max_passes {
            let failing: BTreeSet<&str> = violations
                .iter()
                .filter(|v| v.is_error())
                .map(|v| v.rule)
                .collect();
            debug!("Recovery pass {}: {} failing rule(s)", pass, failing.len());

            let before = corrections.len();
            for rule in self.registry.rules().filter(|r| failing.contains(r.id())) {
                let repair = rule.repair(&mut profile, self.registry.policies(), &mut corrections);
                if repair == Repair::NoStrategy {
                    return unrecoverable(
                        original,
                        initial,
                        format!("no correction strategy for rule '{}'", rule.id()),
                    );
                }
            }
            for correction in &corrections[before..] {
                debug!("Corrected {}", correction);
            }

            violations = self.registry.validate(&profile, self.mode);
            if !has_errors(&violations) {
                return finish(profile, corrections, violations);
            }
            if corrections.len() == before {
                return unrecoverable(original, initial, "corrections made no progress");
            }
        }

        unrecoverable(
            original,
            initial,
            format!("errors remain after {} recovery passes", self.max_passes),
        )
    }
}

fn finish(
    profile: Profile,
    corrections: Vec<Correction>,
    warnings: Vec<Violation>,
) -> RecoveryOutcome {
    if corrections.is_empty() {
        RecoveryOutcome::Intact { profile, warnings }
    } else {
        debug!("Recovered with {} correction(s)", corrections.len());
        RecoveryOutcome::Recovered {
            profile,
            corrections,
            warnings,
        }
    }
}

fn unrecoverable(
    profile: Profile,
    violations: Vec<Violation>,
    reason: impl Into<String>,
) -> RecoveryOutcome {
    let reason = reason.into();
    debug!("Recovery failed: {}", reason);
    let errors: Vec<Violation> = violations.iter().filter(|v| v.is_error()).cloned().collect();
    RecoveryOutcome::Unrecoverable {
        profile: Some(profile),
        violations,
        error: Error::unrecoverable(reason, errors),
    }
}

/// Recovers an archive payload with the standard rules
pub fn recover(payload: &[u8], verification: VerificationResult) -> RecoveryOutcome {
    Recovery::new(RuleRegistry::shared()).recover_archive(payload, verification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{Archive, Checksum};
    use crate::factory::ProfileBuilder;
    use crate::schema::{EnumValue, GType, SwPos, TwistDir};
    use crate::units::FieldId;
    use crate::validate::ClampPolicy;
    use pretty_assertions::assert_eq;

    fn recover_profile(profile: Profile) -> RecoveryOutcome {
        Recovery::new(RuleRegistry::shared()).recover_profile(profile)
    }

    #[test]
    fn test_valid_profile_is_intact() {
        let outcome = recover_profile(ProfileBuilder::new().build());
        assert_eq!(outcome.state(), RecoveryState::Intact);
        assert!(outcome.corrections().is_empty());
    }

    #[test]
    fn test_negative_weight_clamped_to_minimum() {
        let mut profile = ProfileBuilder::new().build();
        profile.b_weight = -5;

        let outcome = recover_profile(profile);
        assert_eq!(outcome.state(), RecoveryState::Recovered);
        assert_eq!(outcome.corrections().len(), 1);
        assert_eq!(outcome.corrections()[0].path, "b_weight");
        assert_eq!(outcome.corrections()[0].after, "10");
        assert_eq!(outcome.profile().unwrap().b_weight, 10);
    }

    #[test]
    fn test_documented_default_policy() {
        let registry = RuleRegistry::standard()
            .with_clamp_policy(FieldId::BulletWeight, ClampPolicy::DocumentedDefault);
        let mut profile = ProfileBuilder::new().build();
        profile.b_weight = -5;

        let (fixed, _) = Recovery::new(&registry)
            .recover_profile(profile)
            .into_result()
            .unwrap();
        assert_eq!(fixed.b_weight, 3000);
    }

    #[test]
    fn test_unordered_distances_keep_switch_targets() {
        let mut profile = ProfileBuilder::new().build();
        profile.distances = vec![100, 300, 200];
        profile.c_zero_distance_idx = 1;
        profile.switches[0] = SwPos::by_index(255, 0, 1, 1);

        let (fixed, corrections) = recover_profile(profile).into_result().unwrap();
        assert_eq!(fixed.distances, vec![100, 200, 300]);
        assert_eq!(fixed.c_zero_distance_idx, 2);
        assert_eq!(fixed.switches[0].distance, 2);

        let changes: Vec<_> = corrections
            .iter()
            .map(|c| (c.rule, c.path.as_str(), c.after.as_str()))
            .collect();
        assert_eq!(
            changes,
            vec![
                ("order.distances", "distances", "[100, 200, 300]"),
                ("order.distances", "c_zero_distance_idx", "2"),
                ("order.distances", "switches[0].distance", "2"),
            ]
        );
    }

    #[test]
    fn test_several_problems_in_one_pass() {
        let mut profile = ProfileBuilder::new().build();
        profile.twist_dir = EnumValue::Unknown(3);
        profile.c_zero_distance_idx = 999;
        profile.short_name_bot = "far too long".into();
        profile.switches.truncate(2);

        let (fixed, corrections) = recover_profile(profile).into_result().unwrap();
        assert_eq!(fixed.twist_dir, EnumValue::Known(TwistDir::Left));
        assert_eq!(fixed.c_zero_distance_idx as usize, fixed.distances.len() - 1);
        assert_eq!(fixed.short_name_bot, "far too");
        assert_eq!(fixed.switches.len(), 4);

        let rules: Vec<_> = corrections.iter().map(|c| c.rule).collect();
        assert_eq!(
            rules,
            vec![
                "length.short_name_bot",
                "enum.twist_dir",
                "ref.c_zero_distance_idx",
                "cross.switch_count"
            ]
        );
    }

    #[test]
    fn test_recovery_is_idempotent() {
        let mut profile = ProfileBuilder::new().build();
        profile.b_weight = -5;
        profile.bc_type = EnumValue::Unknown(17);
        profile.distances = vec![300, 100, 100];

        let (once, corrections) = recover_profile(profile).into_result().unwrap();
        assert!(!corrections.is_empty());

        let again = recover_profile(once.clone());
        assert_eq!(again.state(), RecoveryState::Intact);
        assert_eq!(again.profile(), Some(&once));
    }

    #[test]
    fn test_empty_drag_table_is_unrecoverable() {
        let mut profile = ProfileBuilder::new().build();
        profile.coef_rows.clear();
        profile.b_weight = -5;
        let original = profile.clone();

        let outcome = recover_profile(profile);
        assert_eq!(outcome.state(), RecoveryState::Unrecoverable);
        assert_eq!(outcome.profile(), Some(&original));
        match outcome {
            RecoveryOutcome::Unrecoverable { violations, error, .. } => {
                assert_eq!(violations.len(), 2);
                assert!(matches!(error, Error::Unrecoverable { .. }));
            }
            other => panic!("unexpected outcome {:?}", other.state()),
        }
    }

    #[test]
    fn test_checksum_mismatch_recorded() {
        let profile = ProfileBuilder::new().drag(GType::G1, vec![(0.5, 0.0)]).build();
        let payload = schema::encode(&profile);
        let mut bytes = vec![b'0'; 32];
        bytes.extend_from_slice(&payload);

        let archive = Archive::open(bytes).unwrap();
        let verification = archive.verify();
        assert!(!verification.is_verified());

        let outcome = recover(archive.payload(), verification);
        assert_eq!(outcome.state(), RecoveryState::Recovered);
        assert_eq!(outcome.corrections().len(), 1);
        assert_eq!(outcome.corrections()[0].rule, CHECKSUM_RULE);
        assert_eq!(outcome.corrections()[0].before, "0".repeat(32));
        assert_eq!(outcome.corrections()[0].after, Checksum::of(&payload).to_hex());
    }

    #[test]
    fn test_undecodable_payload() {
        let payload = [0x0A, 0x10, 0x01];
        let verification = VerificationResult::Verified(Checksum::of(&payload));
        let outcome = recover(&payload, verification);
        assert_eq!(outcome.state(), RecoveryState::Unrecoverable);
        assert!(outcome.profile().is_none());
    }

    #[test]
    fn test_unsafe_mode_only_fixes_checksum() {
        let mut profile = ProfileBuilder::new().build();
        profile.b_weight = -5;

        let outcome = Recovery::new(RuleRegistry::shared())
            .mode(Mode::Unsafe)
            .recover_profile(profile);
        assert_eq!(outcome.state(), RecoveryState::Intact);
        assert_eq!(outcome.profile().unwrap().b_weight, -5);
    }
}
