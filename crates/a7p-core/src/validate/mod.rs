//! Profile validation.
//!
//! Validation runs every rule of a [`RuleRegistry`] over a [`Profile`] and
//! collects [`Violation`]s. Rules never mutate the profile while checking; the
//! recovery engine calls [`Rule::repair`] separately.
//!
//! ## Rule classes
//!
//! - range: a numeric field or table element outside its declared bounds
//! - enum: an enum field holding an undeclared wire value
//! - ref: an index that does not point into `distances`
//! - order: `distances` or `coef_rows` not strictly ascending
//! - length: a string longer than the device accepts
//! - cross: a named predicate over several fields, see [`cross`]
//!
//! Rules run in registration order, so identical input always yields an
//! identical violation list.
//!
//! ## Extensibility
//!
//! Custom rules implement [`Rule`]:
//!
//! ```
//! use a7p_core::validate::{Rule, RuleRegistry, Severity, Violation};
//! use a7p_core::Profile;
//!
//! struct NamedProfile;
//!
//! impl Rule for NamedProfile {
//!     fn id(&self) -> &'static str {
//!         "custom.profile_name_present"
//!     }
//!
//!     fn check(&self, profile: &Profile, out: &mut Vec<Violation>) {
//!         if profile.profile_name.is_empty() {
//!             out.push(Violation::new(
//!                 "profile_name",
//!                 self.id(),
//!                 Severity::Warning,
//!                 "profile has no name",
//!                 "",
//!             ));
//!         }
//!     }
//! }
//!
//! let mut registry = RuleRegistry::standard();
//! registry.register(NamedProfile);
//! ```

pub mod cross;
mod rules;

use crate::schema::Profile;
use crate::units::FieldId;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

pub use rules::{RangeSpec, RANGES};

/// How strictly a profile is checked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Run every rule
    #[default]
    Strict,
    /// Skip validation entirely
    Unsafe,
}

/// Violation severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Suspicious but accepted
    Warning,
    /// The device would reject or misread the profile
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// A single failed rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Field path, e.g. `coef_rows[3].mv`
    pub path: String,
    /// Identifier of the rule that failed
    pub rule: &'static str,
    /// Severity
    pub severity: Severity,
    /// Human-readable explanation
    pub message: String,
    /// Offending value as displayed to the user
    pub value: String,
}

impl Violation {
    /// Creates a new violation
    pub fn new(
        path: impl Into<String>,
        rule: &'static str,
        severity: Severity,
        message: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            rule,
            severity,
            message: message.into(),
            value: value.into(),
        }
    }

    /// Shorthand for an error-severity violation
    pub fn error(
        path: impl Into<String>,
        rule: &'static str,
        message: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(path, rule, Severity::Error, message, value)
    }

    /// Returns true for error severity
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} (value: {}, rule: {})",
            self.severity, self.path, self.message, self.value, self.rule
        )
    }
}

/// A change applied by a rule's repair strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    /// Field path that was changed
    pub path: String,
    /// Rule whose violation triggered the change
    pub rule: &'static str,
    /// Value before the change
    pub before: String,
    /// Value after the change
    pub after: String,
}

impl Correction {
    /// Creates a new correction record
    pub fn new(
        path: impl Into<String>,
        rule: &'static str,
        before: impl Into<String>,
        after: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            rule,
            before: before.into(),
            after: after.into(),
        }
    }
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {} ({})", self.path, self.before, self.after, self.rule)
    }
}

/// Result of asking a rule to repair its violations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repair {
    /// The strategy ran; corrections were recorded for every change
    Applied,
    /// The rule has no correction strategy for what it found
    NoStrategy,
}

/// Correction policy for out-of-range scalar fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClampPolicy {
    /// Clamp to the closest declared bound
    NearestBound,
    /// Replace with the field's documented default (see [`RANGES`])
    DocumentedDefault,
    /// Replace with a fixed raw value
    Value(i32),
}

/// Per-field correction policies consulted by [`Rule::repair`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairPolicies {
    clamp: BTreeMap<FieldId, ClampPolicy>,
}

impl RepairPolicies {
    /// Policy for `field`, [`ClampPolicy::NearestBound`] unless overridden
    pub fn clamp(&self, field: FieldId) -> ClampPolicy {
        self.clamp
            .get(&field)
            .copied()
            .unwrap_or(ClampPolicy::NearestBound)
    }

    /// Overrides the policy for `field`
    pub fn set_clamp(&mut self, field: FieldId, policy: ClampPolicy) {
        self.clamp.insert(field, policy);
    }
}

/// A named, side-effect-free check over a profile with an optional repair
pub trait Rule: Send + Sync {
    /// Stable identifier, reported in every violation this rule emits
    fn id(&self) -> &'static str;

    /// Appends a violation for every failure found in `profile`
    fn check(&self, profile: &Profile, out: &mut Vec<Violation>);

    /// Brings `profile` back in line with this rule, recording each change
    fn repair(
        &self,
        profile: &mut Profile,
        policies: &RepairPolicies,
        out: &mut Vec<Correction>,
    ) -> Repair {
        let _ = (profile, policies, out);
        Repair::NoStrategy
    }
}

/// Ordered, immutable collection of rules
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
    policies: RepairPolicies,
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.rule_ids())
            .field("policies", &self.policies)
            .finish()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl RuleRegistry {
    /// Registry with no rules
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            policies: RepairPolicies::default(),
        }
    }

    /// Registry with every built-in rule
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for rule in rules::standard_rules() {
            registry.rules.push(rule);
        }
        for rule in cross::standard_rules() {
            registry.register(rule);
        }
        registry
    }

    /// Shared instance of [`RuleRegistry::standard`]
    pub fn shared() -> &'static RuleRegistry {
        static STANDARD: OnceLock<RuleRegistry> = OnceLock::new();
        STANDARD.get_or_init(RuleRegistry::standard)
    }

    /// Appends a rule; it runs after every rule registered before it
    pub fn register(&mut self, rule: impl Rule + 'static) -> &mut Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Overrides the correction policy for a scalar field
    pub fn with_clamp_policy(mut self, field: FieldId, policy: ClampPolicy) -> Self {
        self.policies.set_clamp(field, policy);
        self
    }

    /// Correction policies used during recovery
    pub fn policies(&self) -> &RepairPolicies {
        &self.policies
    }

    /// Identifiers of all rules in evaluation order
    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> + '_ {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Validates a profile.
    ///
    /// [`Mode::Unsafe`] skips every rule and returns an empty list.
    pub fn validate(&self, profile: &Profile, mode: Mode) -> Vec<Violation> {
        if mode == Mode::Unsafe {
            debug!("Validation skipped (unsafe mode)");
            return Vec::new();
        }

        let mut violations = Vec::new();
        for rule in &self.rules {
            rule.check(profile, &mut violations);
        }

        debug!(
            "Validation finished: {} error(s), {} warning(s)",
            violations.iter().filter(|v| v.is_error()).count(),
            violations.iter().filter(|v| !v.is_error()).count()
        );
        violations
    }
}

/// Validates a profile against the standard rules
pub fn validate(profile: &Profile, mode: Mode) -> Vec<Violation> {
    RuleRegistry::shared().validate(profile, mode)
}

/// Returns true if any violation has error severity
pub fn has_errors(violations: &[Violation]) -> bool {
    violations.iter().any(Violation::is_error)
}

/// Short rendering of an integer table for violation and correction records
pub(crate) fn summarize(values: &[i32]) -> String {
    if values.len() > 6 {
        let head: Vec<_> = values[..3].iter().map(i32::to_string).collect();
        let tail: Vec<_> = values[values.len() - 3..].iter().map(i32::to_string).collect();
        format!("[{}, ..., {}] ({} items)", head.join(", "), tail.join(", "), values.len())
    } else {
        let all: Vec<_> = values.iter().map(i32::to_string).collect();
        format!("[{}]", all.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::ProfileBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_profile_is_valid() {
        let profile = ProfileBuilder::new().build();
        let violations = validate(&profile, Mode::Strict);
        assert_eq!(violations, Vec::new());
    }

    #[test]
    fn test_unsafe_skips_everything() {
        let mut profile = ProfileBuilder::new().build();
        profile.b_weight = -5;
        profile.distances.clear();
        assert!(validate(&profile, Mode::Unsafe).is_empty());
    }

    #[test]
    fn test_negative_weight_single_error() {
        let mut profile = ProfileBuilder::new().build();
        profile.b_weight = -5;

        let violations = validate(&profile, Mode::Strict);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "b_weight");
        assert_eq!(violations[0].rule, "range.b_weight");
        assert_eq!(violations[0].severity, Severity::Error);
    }

    #[test]
    fn test_validation_is_deterministic() {
        let mut profile = ProfileBuilder::new().build();
        profile.b_weight = -5;
        profile.distances = vec![100, 300, 200];
        profile.short_name_top = "much too long".into();

        assert_eq!(
            validate(&profile, Mode::Strict),
            validate(&profile, Mode::Strict)
        );
    }

    #[test]
    fn test_rule_ids_are_unique() {
        let registry = RuleRegistry::standard();
        let mut ids = registry.rule_ids();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn test_policy_override() {
        let registry =
            RuleRegistry::standard()
                .with_clamp_policy(FieldId::ZeroAirPressure, ClampPolicy::Value(10000));
        assert_eq!(
            registry.policies().clamp(FieldId::ZeroAirPressure),
            ClampPolicy::Value(10000)
        );
        assert_eq!(
            registry.policies().clamp(FieldId::BulletWeight),
            ClampPolicy::NearestBound
        );
    }

    #[test]
    fn test_violation_display() {
        let v = Violation::error("coef_rows[3].mv", "range.coef_rows.mv", "out of range", "-1");
        assert_eq!(
            v.to_string(),
            "error coef_rows[3].mv: out of range (value: -1, rule: range.coef_rows.mv)"
        );
    }
}
