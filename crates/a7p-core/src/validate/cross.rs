//! Named predicates over several fields.
//!
//! Each predicate is a plain function so callers can evaluate it without a
//! registry, e.g. `cross::bullet_length_vs_diameter(&profile)`.

use super::{Correction, Repair, RepairPolicies, Rule, Severity, Violation};
use crate::factory::default_switches;
use crate::schema::{GType, Profile};

/// Minimum number of sight switches
pub const MIN_SWITCHES: usize = 4;

/// Maximum drag rows for the G1 and G7 models
pub const MAX_STANDARD_ROWS: usize = 5;

/// Maximum drag rows for a custom drag curve
pub const MAX_CUSTOM_ROWS: usize = 200;

/// A cross-field rule built from a predicate and an optional fix
#[derive(Clone, Copy)]
pub struct CrossFieldRule {
    /// Rule identifier
    pub id: &'static str,
    /// Path reported in the violation
    pub path: &'static str,
    /// Severity of a failure
    pub severity: Severity,
    /// Explanation reported in the violation
    pub message: &'static str,
    /// Returns true when the profile satisfies the rule
    pub holds: fn(&Profile) -> bool,
    /// Describes the offending value
    pub value: fn(&Profile) -> String,
    /// Brings the profile back in line, if a fix exists
    pub fix: Option<fn(&mut Profile, &mut Vec<Correction>)>,
}

impl std::fmt::Debug for CrossFieldRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossFieldRule")
            .field("id", &self.id)
            .field("severity", &self.severity)
            .finish()
    }
}

impl Rule for CrossFieldRule {
    fn id(&self) -> &'static str {
        self.id
    }

    fn check(&self, profile: &Profile, out: &mut Vec<Violation>) {
        if !(self.holds)(profile) {
            out.push(Violation::new(
                self.path,
                self.id,
                self.severity,
                self.message,
                (self.value)(profile),
            ));
        }
    }

    fn repair(
        &self,
        profile: &mut Profile,
        _: &RepairPolicies,
        out: &mut Vec<Correction>,
    ) -> Repair {
        match self.fix {
            Some(fix) => {
                if !(self.holds)(profile) {
                    fix(profile, out);
                }
                Repair::Applied
            }
            None => Repair::NoStrategy,
        }
    }
}

/// Row capacity of the profile's drag model, if the model is declared
pub fn coef_row_capacity(profile: &Profile) -> Option<usize> {
    match profile.bc_type.known()? {
        GType::G1 | GType::G7 => Some(MAX_STANDARD_ROWS),
        GType::Custom => Some(MAX_CUSTOM_ROWS),
    }
}

/// The drag table has at least one row
pub fn coef_rows_present(profile: &Profile) -> bool {
    !profile.coef_rows.is_empty()
}

/// The drag table fits the capacity of its model
pub fn coef_rows_within_capacity(profile: &Profile) -> bool {
    coef_row_capacity(profile).map_or(true, |max| profile.coef_rows.len() <= max)
}

/// There are at least [`MIN_SWITCHES`] switches
pub fn switch_count(profile: &Profile) -> bool {
    profile.switches.len() >= MIN_SWITCHES
}

/// The bullet is not shorter than it is wide
pub fn bullet_length_vs_diameter(profile: &Profile) -> bool {
    profile.b_length >= profile.b_diameter
}

/// The barrel has a twist rate
pub fn twist_rate_nonzero(profile: &Profile) -> bool {
    profile.r_twist != 0
}

fn truncate_coef_rows(profile: &mut Profile, out: &mut Vec<Correction>) {
    if let Some(max) = coef_row_capacity(profile) {
        let before = profile.coef_rows.len();
        profile.coef_rows.truncate(max);
        out.push(Correction::new(
            "coef_rows",
            "cross.coef_rows_capacity",
            format!("{} rows", before),
            format!("{} rows", max),
        ));
    }
}

fn pad_switches(profile: &mut Profile, out: &mut Vec<Correction>) {
    let before = profile.switches.len();
    let missing = MIN_SWITCHES.saturating_sub(before);
    profile
        .switches
        .extend(default_switches().into_iter().skip(before).take(missing));
    out.push(Correction::new(
        "switches",
        "cross.switch_count",
        format!("{} switches", before),
        format!("{} switches", profile.switches.len()),
    ));
}

/// Every built-in cross-field rule, in evaluation order
pub fn standard_rules() -> Vec<CrossFieldRule> {
    vec![
        CrossFieldRule {
            id: "cross.coef_rows_present",
            path: "coef_rows",
            severity: Severity::Error,
            message: "expected at least one drag row",
            holds: coef_rows_present,
            value: |p| format!("{} rows", p.coef_rows.len()),
            fix: None,
        },
        CrossFieldRule {
            id: "cross.coef_rows_capacity",
            path: "coef_rows",
            severity: Severity::Error,
            message: "too many drag rows for the drag model (G1/G7 allow 5, CUSTOM allows 200)",
            holds: coef_rows_within_capacity,
            value: |p| format!("{} rows", p.coef_rows.len()),
            fix: Some(truncate_coef_rows),
        },
        CrossFieldRule {
            id: "cross.switch_count",
            path: "switches",
            severity: Severity::Error,
            message: "expected at least 4 switches",
            holds: switch_count,
            value: |p| format!("{} switches", p.switches.len()),
            fix: Some(pad_switches),
        },
        CrossFieldRule {
            id: "cross.bullet_length_vs_diameter",
            path: "b_length",
            severity: Severity::Warning,
            message: "bullet is shorter than its diameter",
            holds: bullet_length_vs_diameter,
            value: |p| format!("length {}, diameter {}", p.b_length, p.b_diameter),
            fix: None,
        },
        CrossFieldRule {
            id: "cross.twist_rate_nonzero",
            path: "r_twist",
            severity: Severity::Warning,
            message: "twist rate is zero",
            holds: twist_rate_nonzero,
            value: |p| p.r_twist.to_string(),
            fix: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::ProfileBuilder;
    use crate::schema::{CoefRow, EnumValue, SwPos};
    use crate::validate::{validate, Mode};
    use pretty_assertions::assert_eq;

    fn rule(id: &str) -> CrossFieldRule {
        standard_rules().into_iter().find(|r| r.id == id).unwrap()
    }

    #[test]
    fn test_capacity_depends_on_drag_model() {
        let mut profile = ProfileBuilder::new().build();
        profile.coef_rows = (0..6).map(|i| CoefRow::new(3000, i * 1000)).collect();
        assert!(!coef_rows_within_capacity(&profile));

        profile.bc_type = GType::Custom.into();
        assert!(coef_rows_within_capacity(&profile));

        profile.bc_type = EnumValue::Unknown(5);
        assert!(coef_rows_within_capacity(&profile));
    }

    #[test]
    fn test_capacity_repair_truncates() {
        let mut profile = ProfileBuilder::new().build();
        profile.coef_rows = (0..7).map(|i| CoefRow::new(3000, i * 1000)).collect();

        let mut out = Vec::new();
        let repair = rule("cross.coef_rows_capacity").repair(
            &mut profile,
            &RepairPolicies::default(),
            &mut out,
        );
        assert_eq!(repair, Repair::Applied);
        assert_eq!(profile.coef_rows.len(), MAX_STANDARD_ROWS);
        assert_eq!(out[0].before, "7 rows");
    }

    #[test]
    fn test_missing_rows_cannot_be_repaired() {
        let mut profile = ProfileBuilder::new().build();
        profile.coef_rows.clear();

        let violations = validate(&profile, Mode::Strict);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, "cross.coef_rows_present");

        let mut out = Vec::new();
        let repair = rule("cross.coef_rows_present").repair(
            &mut profile,
            &RepairPolicies::default(),
            &mut out,
        );
        assert_eq!(repair, Repair::NoStrategy);
    }

    #[test]
    fn test_switches_padded_with_defaults() {
        let mut profile = ProfileBuilder::new().build();
        profile.switches = vec![SwPos::by_value(7, 1, 2, 50000)];

        let mut out = Vec::new();
        rule("cross.switch_count").repair(&mut profile, &RepairPolicies::default(), &mut out);

        assert_eq!(profile.switches.len(), MIN_SWITCHES);
        assert_eq!(profile.switches[0], SwPos::by_value(7, 1, 2, 50000));
        assert_eq!(&profile.switches[1..], &default_switches()[1..]);
    }

    #[test]
    fn test_short_bullet_is_a_warning() {
        let mut profile = ProfileBuilder::new().build();
        profile.b_length = 200;
        profile.b_diameter = 308;

        let violations = validate(&profile, Mode::Strict);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, "cross.bullet_length_vs_diameter");
        assert_eq!(violations[0].severity, Severity::Warning);
    }

    #[test]
    fn test_zero_twist_is_a_warning() {
        let mut profile = ProfileBuilder::new().build();
        profile.r_twist = 0;
        assert!(!twist_rate_nonzero(&profile));

        let violations = validate(&profile, Mode::Strict);
        assert_eq!(violations.len(), 1);
        assert!(!violations[0].is_error());
    }
}
