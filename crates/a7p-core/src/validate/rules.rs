//! Built-in single-field, table and reference rules.

use super::{summarize, ClampPolicy, Correction, Repair, RepairPolicies, Rule, Violation};
use crate::distances;
use crate::schema::{DType, DeclaredEnum, EnumValue, GType, Profile, TwistDir};
use crate::units::{self, FieldId};

/// Maximum number of entries in the distance table
pub(crate) const MAX_DISTANCES: usize = 200;

/// Switch `c_idx` value meaning "no click table"
pub(crate) const UNUSED_C_IDX: i32 = 255;

/// Declared bounds of a scalar field, in physical units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeSpec {
    /// Rule identifier
    pub id: &'static str,
    /// Field the bounds apply to
    pub field: FieldId,
    /// Lower bound, inclusive
    pub min: f64,
    /// Upper bound, inclusive
    pub max: f64,
    /// Raw value restored by [`ClampPolicy::DocumentedDefault`]
    pub fallback: i32,
}

impl RangeSpec {
    /// Bounds in raw units as `(low, high)`
    pub fn raw_bounds(&self) -> (i32, i32) {
        let a = units::to_raw(self.field, self.min);
        let b = units::to_raw(self.field, self.max);
        (a.min(b), a.max(b))
    }
}

const fn range(id: &'static str, field: FieldId, min: f64, max: f64, fallback: i32) -> RangeSpec {
    RangeSpec {
        id,
        field,
        min,
        max,
        fallback,
    }
}

/// Declared bounds of every scalar field
pub const RANGES: &[RangeSpec] = &[
    range("range.zero_x", FieldId::ZeroX, -200.0, 200.0, 0),
    range("range.zero_y", FieldId::ZeroY, -200.0, 200.0, 0),
    range("range.sc_height", FieldId::SightHeight, -5000.0, 5000.0, 90),
    range("range.r_twist", FieldId::TwistRate, 0.0, 100.0, 10),
    range("range.c_muzzle_velocity", FieldId::MuzzleVelocity, 10.0, 3000.0, 8000),
    range("range.c_zero_temperature", FieldId::CartridgeTemperature, -100.0, 100.0, 15),
    range("range.c_t_coeff", FieldId::PowderSensitivity, 0.0, 5.0, 1000),
    range("range.c_zero_air_temperature", FieldId::ZeroAirTemperature, -100.0, 100.0, 15),
    range("range.c_zero_air_pressure", FieldId::ZeroAirPressure, 300.0, 1500.0, 10000),
    range("range.c_zero_air_humidity", FieldId::ZeroAirHumidity, 0.0, 100.0, 50),
    range("range.c_zero_w_pitch", FieldId::ZeroPitch, -90.0, 90.0, 0),
    range("range.c_zero_p_temperature", FieldId::ZeroPowderTemperature, -100.0, 100.0, 15),
    range("range.b_diameter", FieldId::BulletDiameter, 0.001, 50.0, 338),
    range("range.b_weight", FieldId::BulletWeight, 1.0, 6553.5, 3000),
    range("range.b_length", FieldId::BulletLength, 0.01, 200.0, 1700),
];

/// Bounds of one distance table entry or literal switch distance, metres
const DISTANCE_RANGE: (f64, f64) = (1.0, 3000.0);

pub(crate) fn standard_rules() -> Vec<Box<dyn Rule>> {
    let mut rules: Vec<Box<dyn Rule>> = Vec::new();

    for field in StringField::ALL {
        rules.push(Box::new(StringRule { field }));
    }
    for spec in RANGES {
        rules.push(Box::new(RangeRule::new(spec)));
    }
    rules.push(Box::new(EnumRule::<TwistDir> {
        id: "enum.twist_dir",
        path: "twist_dir",
        get: |p| p.twist_dir,
        set: |p, v| p.twist_dir = v.into(),
    }));
    rules.push(Box::new(EnumRule::<GType> {
        id: "enum.bc_type",
        path: "bc_type",
        get: |p| p.bc_type,
        set: |p, v| p.bc_type = v.into(),
    }));
    for check in [TableCheck::Count, TableCheck::Range, TableCheck::Order] {
        rules.push(Box::new(DistanceTableRule { check }));
    }
    rules.push(Box::new(ZeroIndexRule));
    for check in SwitchCheck::ALL {
        rules.push(Box::new(SwitchRule { check }));
    }
    for check in [CoefCheck::Coefficient, CoefCheck::Breakpoint, CoefCheck::Order] {
        rules.push(Box::new(CoefRowRule { check }));
    }
    rules
}

/// Clamps `value` into `[lo, hi]`, recording a correction if it changed
fn clamp_into(
    value: &mut i32,
    lo: i32,
    hi: i32,
    path: String,
    rule: &'static str,
    out: &mut Vec<Correction>,
) {
    let clamped = (*value).clamp(lo, hi);
    if clamped != *value {
        out.push(Correction::new(path, rule, value.to_string(), clamped.to_string()));
        *value = clamped;
    }
}

// Strings

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringField {
    ProfileName,
    CartridgeName,
    BulletName,
    ShortNameTop,
    ShortNameBot,
    UserNote,
    Caliber,
    DeviceUuid,
}

impl StringField {
    const ALL: [StringField; 8] = [
        StringField::ProfileName,
        StringField::CartridgeName,
        StringField::BulletName,
        StringField::ShortNameTop,
        StringField::ShortNameBot,
        StringField::UserNote,
        StringField::Caliber,
        StringField::DeviceUuid,
    ];

    fn name(self) -> &'static str {
        match self {
            StringField::ProfileName => "profile_name",
            StringField::CartridgeName => "cartridge_name",
            StringField::BulletName => "bullet_name",
            StringField::ShortNameTop => "short_name_top",
            StringField::ShortNameBot => "short_name_bot",
            StringField::UserNote => "user_note",
            StringField::Caliber => "caliber",
            StringField::DeviceUuid => "device_uuid",
        }
    }

    fn rule_id(self) -> &'static str {
        match self {
            StringField::ProfileName => "length.profile_name",
            StringField::CartridgeName => "length.cartridge_name",
            StringField::BulletName => "length.bullet_name",
            StringField::ShortNameTop => "length.short_name_top",
            StringField::ShortNameBot => "length.short_name_bot",
            StringField::UserNote => "length.user_note",
            StringField::Caliber => "length.caliber",
            StringField::DeviceUuid => "length.device_uuid",
        }
    }

    /// Length a value must stay strictly below, in chars
    fn limit(self) -> usize {
        match self {
            StringField::ShortNameTop | StringField::ShortNameBot => 8,
            StringField::UserNote => 1024,
            StringField::ProfileName
            | StringField::CartridgeName
            | StringField::BulletName
            | StringField::Caliber
            | StringField::DeviceUuid => 50,
        }
    }

    fn get(self, p: &Profile) -> &String {
        match self {
            StringField::ProfileName => &p.profile_name,
            StringField::CartridgeName => &p.cartridge_name,
            StringField::BulletName => &p.bullet_name,
            StringField::ShortNameTop => &p.short_name_top,
            StringField::ShortNameBot => &p.short_name_bot,
            StringField::UserNote => &p.user_note,
            StringField::Caliber => &p.caliber,
            StringField::DeviceUuid => &p.device_uuid,
        }
    }

    fn get_mut(self, p: &mut Profile) -> &mut String {
        match self {
            StringField::ProfileName => &mut p.profile_name,
            StringField::CartridgeName => &mut p.cartridge_name,
            StringField::BulletName => &mut p.bullet_name,
            StringField::ShortNameTop => &mut p.short_name_top,
            StringField::ShortNameBot => &mut p.short_name_bot,
            StringField::UserNote => &mut p.user_note,
            StringField::Caliber => &mut p.caliber,
            StringField::DeviceUuid => &mut p.device_uuid,
        }
    }
}

struct StringRule {
    field: StringField,
}

impl Rule for StringRule {
    fn id(&self) -> &'static str {
        self.field.rule_id()
    }

    fn check(&self, profile: &Profile, out: &mut Vec<Violation>) {
        let value = self.field.get(profile);
        let chars = value.chars().count();
        let limit = self.field.limit();
        if chars >= limit {
            out.push(Violation::error(
                self.field.name(),
                self.id(),
                format!("expected string shorter than {} characters, got {}", limit, chars),
                value.clone(),
            ));
        }
    }

    fn repair(
        &self,
        profile: &mut Profile,
        _: &RepairPolicies,
        out: &mut Vec<Correction>,
    ) -> Repair {
        let limit = self.field.limit();
        let value = self.field.get_mut(profile);
        if value.chars().count() >= limit {
            let truncated: String = value.chars().take(limit - 1).collect();
            out.push(Correction::new(
                self.field.name(),
                self.id(),
                value.clone(),
                truncated.clone(),
            ));
            *value = truncated;
        }
        Repair::Applied
    }
}

// Scalar ranges

struct RangeRule {
    spec: &'static RangeSpec,
    lo: i32,
    hi: i32,
}

impl RangeRule {
    fn new(spec: &'static RangeSpec) -> Self {
        let (lo, hi) = spec.raw_bounds();
        Self { spec, lo, hi }
    }
}

impl Rule for RangeRule {
    fn id(&self) -> &'static str {
        self.spec.id
    }

    fn check(&self, profile: &Profile, out: &mut Vec<Violation>) {
        let field = self.spec.field;
        let Some(value) = profile.scalar(field) else {
            return;
        };
        if !(self.lo..=self.hi).contains(&value) {
            out.push(Violation::error(
                field.name(),
                self.id(),
                format!(
                    "expected value in range [{}, {}] {}, got {}",
                    self.spec.min,
                    self.spec.max,
                    field.unit(),
                    units::format_physical(field, value)
                ),
                value.to_string(),
            ));
        }
    }

    fn repair(
        &self,
        profile: &mut Profile,
        policies: &RepairPolicies,
        out: &mut Vec<Correction>,
    ) -> Repair {
        let field = self.spec.field;
        let Some(slot) = profile.scalar_mut(field) else {
            return Repair::NoStrategy;
        };
        if (self.lo..=self.hi).contains(slot) {
            return Repair::Applied;
        }

        let replacement = match policies.clamp(field) {
            ClampPolicy::NearestBound => (*slot).clamp(self.lo, self.hi),
            ClampPolicy::DocumentedDefault => self.spec.fallback,
            ClampPolicy::Value(value) => value,
        };
        out.push(Correction::new(
            field.name(),
            self.id(),
            slot.to_string(),
            replacement.to_string(),
        ));
        *slot = replacement;
        Repair::Applied
    }
}

// Enums

struct EnumRule<T: DeclaredEnum> {
    id: &'static str,
    path: &'static str,
    get: fn(&Profile) -> EnumValue<T>,
    set: fn(&mut Profile, T),
}

fn expected_members<T: DeclaredEnum>() -> String {
    let labels: Vec<_> = T::MEMBERS.iter().map(|m| m.label()).collect();
    format!("expected one of [{}]", labels.join(", "))
}

impl<T: DeclaredEnum + Send + Sync> Rule for EnumRule<T> {
    fn id(&self) -> &'static str {
        self.id
    }

    fn check(&self, profile: &Profile, out: &mut Vec<Violation>) {
        if let EnumValue::Unknown(raw) = (self.get)(profile) {
            out.push(Violation::error(
                self.path,
                self.id,
                expected_members::<T>(),
                raw.to_string(),
            ));
        }
    }

    fn repair(
        &self,
        profile: &mut Profile,
        _: &RepairPolicies,
        out: &mut Vec<Correction>,
    ) -> Repair {
        if let EnumValue::Unknown(raw) = (self.get)(profile) {
            let member = T::nearest(raw);
            out.push(Correction::new(self.path, self.id, raw.to_string(), member.label()));
            (self.set)(profile, member);
        }
        Repair::Applied
    }
}

// Distance table

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableCheck {
    Count,
    Range,
    Order,
}

struct DistanceTableRule {
    check: TableCheck,
}

fn distance_bounds() -> (i32, i32) {
    (
        units::to_raw(FieldId::Distance, DISTANCE_RANGE.0),
        units::to_raw(FieldId::Distance, DISTANCE_RANGE.1),
    )
}

impl Rule for DistanceTableRule {
    fn id(&self) -> &'static str {
        match self.check {
            TableCheck::Count => "count.distances",
            TableCheck::Range => "range.distances",
            TableCheck::Order => "order.distances",
        }
    }

    fn check(&self, profile: &Profile, out: &mut Vec<Violation>) {
        let table = &profile.distances;
        match self.check {
            TableCheck::Count => {
                if table.is_empty() || table.len() > MAX_DISTANCES {
                    out.push(Violation::error(
                        "distances",
                        self.id(),
                        format!("expected 1 to {} distances, got {}", MAX_DISTANCES, table.len()),
                        summarize(table),
                    ));
                }
            }
            TableCheck::Range => {
                let (lo, hi) = distance_bounds();
                for (i, &d) in table.iter().enumerate() {
                    if !(lo..=hi).contains(&d) {
                        out.push(Violation::error(
                            format!("distances[{}]", i),
                            self.id(),
                            format!(
                                "expected distance in range [{}, {}] m, got {}",
                                DISTANCE_RANGE.0,
                                DISTANCE_RANGE.1,
                                units::format_physical(FieldId::Distance, d)
                            ),
                            d.to_string(),
                        ));
                    }
                }
            }
            TableCheck::Order => {
                if let Some(i) = table.windows(2).position(|w| w[0] >= w[1]) {
                    out.push(Violation::error(
                        format!("distances[{}]", i + 1),
                        self.id(),
                        "expected distances in strictly ascending order",
                        summarize(table),
                    ));
                }
            }
        }
    }

    fn repair(
        &self,
        profile: &mut Profile,
        _: &RepairPolicies,
        out: &mut Vec<Correction>,
    ) -> Repair {
        match self.check {
            TableCheck::Count => {
                if profile.distances.is_empty() {
                    return Repair::NoStrategy;
                }
                if profile.distances.len() > MAX_DISTANCES {
                    distances::truncate(profile, MAX_DISTANCES, self.id(), out);
                }
            }
            TableCheck::Range => {
                let (lo, hi) = distance_bounds();
                for (i, d) in profile.distances.iter_mut().enumerate() {
                    clamp_into(d, lo, hi, format!("distances[{}]", i), self.id(), out);
                }
            }
            TableCheck::Order => {
                distances::normalize(profile, self.id(), out);
            }
        }
        Repair::Applied
    }
}

struct ZeroIndexRule;

impl Rule for ZeroIndexRule {
    fn id(&self) -> &'static str {
        "ref.c_zero_distance_idx"
    }

    fn check(&self, profile: &Profile, out: &mut Vec<Violation>) {
        if profile.zero_distance().is_none() {
            out.push(Violation::error(
                "c_zero_distance_idx",
                self.id(),
                format!(
                    "expected an index into distances (0..{})",
                    profile.distances.len()
                ),
                profile.c_zero_distance_idx.to_string(),
            ));
        }
    }

    fn repair(
        &self,
        profile: &mut Profile,
        _: &RepairPolicies,
        out: &mut Vec<Correction>,
    ) -> Repair {
        if profile.distances.is_empty() {
            return Repair::NoStrategy;
        }
        let last = (profile.distances.len() - 1) as i32;
        clamp_into(
            &mut profile.c_zero_distance_idx,
            0,
            last,
            "c_zero_distance_idx".to_string(),
            self.id(),
            out,
        );
        Repair::Applied
    }
}

// Switches

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SwitchCheck {
    CIdx,
    ReticleIdx,
    Zoom,
    DistanceFrom,
    LiteralDistance,
    IndexReference,
}

impl SwitchCheck {
    const ALL: [SwitchCheck; 6] = [
        SwitchCheck::CIdx,
        SwitchCheck::ReticleIdx,
        SwitchCheck::Zoom,
        SwitchCheck::DistanceFrom,
        SwitchCheck::LiteralDistance,
        SwitchCheck::IndexReference,
    ];
}

struct SwitchRule {
    check: SwitchCheck,
}

/// Nearest valid `c_idx`: 0..=200 or the 255 "unused" marker
fn nearest_c_idx(value: i32) -> i32 {
    match value {
        v if v < 0 => 0,
        v if v <= 200 => v,
        v if v >= UNUSED_C_IDX => UNUSED_C_IDX,
        v if v - 200 <= UNUSED_C_IDX - v => 200,
        _ => UNUSED_C_IDX,
    }
}

impl Rule for SwitchRule {
    fn id(&self) -> &'static str {
        match self.check {
            SwitchCheck::CIdx => "range.switches.c_idx",
            SwitchCheck::ReticleIdx => "range.switches.reticle_idx",
            SwitchCheck::Zoom => "range.switches.zoom",
            SwitchCheck::DistanceFrom => "enum.switches.distance_from",
            SwitchCheck::LiteralDistance => "range.switches.distance",
            SwitchCheck::IndexReference => "ref.switches.distance",
        }
    }

    fn check(&self, profile: &Profile, out: &mut Vec<Violation>) {
        let table_len = profile.distances.len();
        let (lo, hi) = distance_bounds();

        for (i, sw) in profile.switches.iter().enumerate() {
            let failure = match self.check {
                SwitchCheck::CIdx => (nearest_c_idx(sw.c_idx) != sw.c_idx).then(|| {
                    (
                        "c_idx",
                        "expected 255 (unused) or a value in range [0, 200]".to_string(),
                        sw.c_idx,
                    )
                }),
                SwitchCheck::ReticleIdx => (!(0..=255).contains(&sw.reticle_idx)).then(|| {
                    (
                        "reticle_idx",
                        "expected integer value in range [0, 255]".to_string(),
                        sw.reticle_idx,
                    )
                }),
                SwitchCheck::Zoom => (!(0..=4).contains(&sw.zoom)).then(|| {
                    ("zoom", "expected integer value in range [0, 4]".to_string(), sw.zoom)
                }),
                SwitchCheck::DistanceFrom => match sw.distance_from {
                    EnumValue::Unknown(raw) => {
                        Some(("distance_from", expected_members::<DType>(), raw))
                    }
                    EnumValue::Known(_) => None,
                },
                SwitchCheck::LiteralDistance => match sw.distance_from {
                    EnumValue::Known(DType::Value) if !(lo..=hi).contains(&sw.distance) => Some((
                        "distance",
                        format!(
                            "expected distance in range [{}, {}] m, got {}",
                            DISTANCE_RANGE.0,
                            DISTANCE_RANGE.1,
                            units::format_physical(FieldId::Distance, sw.distance)
                        ),
                        sw.distance,
                    )),
                    EnumValue::Known(_) | EnumValue::Unknown(_) => None,
                },
                SwitchCheck::IndexReference => match sw.distance_from {
                    EnumValue::Known(DType::Index)
                        if usize::try_from(sw.distance).map_or(true, |idx| idx >= table_len) =>
                    {
                        Some((
                            "distance",
                            format!("expected an index into distances (0..{})", table_len),
                            sw.distance,
                        ))
                    }
                    EnumValue::Known(_) | EnumValue::Unknown(_) => None,
                },
            };

            if let Some((field, message, value)) = failure {
                out.push(Violation::error(
                    format!("switches[{}].{}", i, field),
                    self.id(),
                    message,
                    value.to_string(),
                ));
            }
        }
    }

    fn repair(
        &self,
        profile: &mut Profile,
        _: &RepairPolicies,
        out: &mut Vec<Correction>,
    ) -> Repair {
        let id = self.id();
        let table_len = profile.distances.len();
        let (lo, hi) = distance_bounds();

        if self.check == SwitchCheck::IndexReference && table_len == 0 {
            let dangling = profile
                .switches
                .iter()
                .any(|sw| sw.distance_from == EnumValue::Known(DType::Index));
            return if dangling { Repair::NoStrategy } else { Repair::Applied };
        }

        for (i, sw) in profile.switches.iter_mut().enumerate() {
            match self.check {
                SwitchCheck::CIdx => {
                    let nearest = nearest_c_idx(sw.c_idx);
                    let path = format!("switches[{}].c_idx", i);
                    clamp_into(&mut sw.c_idx, nearest, nearest, path, id, out);
                }
                SwitchCheck::ReticleIdx => {
                    let path = format!("switches[{}].reticle_idx", i);
                    clamp_into(&mut sw.reticle_idx, 0, 255, path, id, out);
                }
                SwitchCheck::Zoom => {
                    clamp_into(&mut sw.zoom, 0, 4, format!("switches[{}].zoom", i), id, out);
                }
                SwitchCheck::DistanceFrom => {
                    if let EnumValue::Unknown(raw) = sw.distance_from {
                        let member = DType::nearest(raw);
                        out.push(Correction::new(
                            format!("switches[{}].distance_from", i),
                            id,
                            raw.to_string(),
                            member.label(),
                        ));
                        sw.distance_from = member.into();
                    }
                }
                SwitchCheck::LiteralDistance => {
                    if sw.distance_from == EnumValue::Known(DType::Value) {
                        let path = format!("switches[{}].distance", i);
                        clamp_into(&mut sw.distance, lo, hi, path, id, out);
                    }
                }
                SwitchCheck::IndexReference => {
                    if sw.distance_from == EnumValue::Known(DType::Index) {
                        let last = (table_len - 1) as i32;
                        let path = format!("switches[{}].distance", i);
                        clamp_into(&mut sw.distance, 0, last, path, id, out);
                    }
                }
            }
        }
        Repair::Applied
    }
}

// Drag table

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoefCheck {
    Coefficient,
    Breakpoint,
    Order,
}

struct CoefRowRule {
    check: CoefCheck,
}

/// Raw bounds of `(bc_cd, mv)` under the profile's drag model
fn coef_bounds(profile: &Profile) -> Option<((i32, i32), (i32, i32), FieldId)> {
    let breakpoint = profile.breakpoint_field()?;
    let max_breakpoint = match breakpoint {
        FieldId::MachBreakpoint => 10.0,
        _ => 3000.0,
    };
    Some((
        (0, units::to_raw(FieldId::DragCoefficient, 10.0)),
        (0, units::to_raw(breakpoint, max_breakpoint)),
        breakpoint,
    ))
}

impl Rule for CoefRowRule {
    fn id(&self) -> &'static str {
        match self.check {
            CoefCheck::Coefficient => "range.coef_rows.bc_cd",
            CoefCheck::Breakpoint => "range.coef_rows.mv",
            CoefCheck::Order => "order.coef_rows",
        }
    }

    fn check(&self, profile: &Profile, out: &mut Vec<Violation>) {
        // Rows are meaningless without a declared drag model; enum.bc_type reports that.
        let Some((bc_bounds, mv_bounds, breakpoint)) = coef_bounds(profile) else {
            return;
        };

        match self.check {
            CoefCheck::Coefficient => {
                for (i, row) in profile.coef_rows.iter().enumerate() {
                    if !(bc_bounds.0..=bc_bounds.1).contains(&row.bc_cd) {
                        out.push(Violation::error(
                            format!("coef_rows[{}].bc_cd", i),
                            self.id(),
                            format!(
                                "expected coefficient in range [0, 10], got {}",
                                units::format_physical(FieldId::DragCoefficient, row.bc_cd)
                            ),
                            row.bc_cd.to_string(),
                        ));
                    }
                }
            }
            CoefCheck::Breakpoint => {
                for (i, row) in profile.coef_rows.iter().enumerate() {
                    if !(mv_bounds.0..=mv_bounds.1).contains(&row.mv) {
                        out.push(Violation::error(
                            format!("coef_rows[{}].mv", i),
                            self.id(),
                            format!(
                                "expected breakpoint in range [{}, {}], got {}",
                                units::format_physical(breakpoint, mv_bounds.0),
                                units::format_physical(breakpoint, mv_bounds.1),
                                units::format_physical(breakpoint, row.mv)
                            ),
                            row.mv.to_string(),
                        ));
                    }
                }
            }
            CoefCheck::Order => {
                if let Some(i) = profile.coef_rows.windows(2).position(|w| w[0].mv >= w[1].mv) {
                    let mvs: Vec<_> = profile.coef_rows.iter().map(|r| r.mv).collect();
                    out.push(Violation::error(
                        format!("coef_rows[{}].mv", i + 1),
                        self.id(),
                        "expected rows in strictly ascending order of mv",
                        summarize(&mvs),
                    ));
                }
            }
        }
    }

    fn repair(
        &self,
        profile: &mut Profile,
        _: &RepairPolicies,
        out: &mut Vec<Correction>,
    ) -> Repair {
        let Some((bc_bounds, mv_bounds, _)) = coef_bounds(profile) else {
            return Repair::NoStrategy;
        };
        let id = self.id();

        match self.check {
            CoefCheck::Coefficient => {
                for (i, row) in profile.coef_rows.iter_mut().enumerate() {
                    let path = format!("coef_rows[{}].bc_cd", i);
                    clamp_into(&mut row.bc_cd, bc_bounds.0, bc_bounds.1, path, id, out);
                }
            }
            CoefCheck::Breakpoint => {
                for (i, row) in profile.coef_rows.iter_mut().enumerate() {
                    let path = format!("coef_rows[{}].mv", i);
                    clamp_into(&mut row.mv, mv_bounds.0, mv_bounds.1, path, id, out);
                }
            }
            CoefCheck::Order => {
                let mvs_before: Vec<_> = profile.coef_rows.iter().map(|r| r.mv).collect();
                profile.coef_rows.sort_by_key(|r| r.mv);
                profile.coef_rows.dedup_by_key(|r| r.mv);
                let mvs_after: Vec<_> = profile.coef_rows.iter().map(|r| r.mv).collect();
                if mvs_before != mvs_after {
                    out.push(Correction::new(
                        "coef_rows",
                        id,
                        summarize(&mvs_before),
                        summarize(&mvs_after),
                    ));
                }
            }
        }
        Repair::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::ProfileBuilder;
    use crate::schema::{CoefRow, SwPos};
    use crate::validate::Severity;
    use pretty_assertions::assert_eq;

    fn run(rule: &dyn Rule, profile: &Profile) -> Vec<Violation> {
        let mut out = Vec::new();
        rule.check(profile, &mut out);
        out
    }

    fn fix(rule: &dyn Rule, profile: &mut Profile) -> (Repair, Vec<Correction>) {
        let mut out = Vec::new();
        let repair = rule.repair(profile, &RepairPolicies::default(), &mut out);
        (repair, out)
    }

    #[test]
    fn test_range_bounds_respect_sign_inversion() {
        let spec = RANGES.iter().find(|s| s.field == FieldId::ZeroX).unwrap();
        assert_eq!(spec.raw_bounds(), (-200_000, 200_000));
    }

    #[test]
    fn test_range_boundaries_are_inclusive() {
        let rule = RangeRule::new(&RANGES[13]);
        assert_eq!(rule.spec.field, FieldId::BulletWeight);

        let mut profile = ProfileBuilder::new().build();
        profile.b_weight = 10;
        assert!(run(&rule, &profile).is_empty());
        profile.b_weight = 65535;
        assert!(run(&rule, &profile).is_empty());
        profile.b_weight = 9;
        assert_eq!(run(&rule, &profile).len(), 1);
    }

    #[test]
    fn test_range_repair_policies() {
        let rule = RangeRule::new(&RANGES[8]);
        assert_eq!(rule.spec.field, FieldId::ZeroAirPressure);

        let mut profile = ProfileBuilder::new().build();
        profile.c_zero_air_pressure = 20000;

        let mut policies = RepairPolicies::default();
        let mut out = Vec::new();
        rule.repair(&mut profile, &policies, &mut out);
        assert_eq!(profile.c_zero_air_pressure, 15000);

        profile.c_zero_air_pressure = 20000;
        policies.set_clamp(FieldId::ZeroAirPressure, ClampPolicy::DocumentedDefault);
        rule.repair(&mut profile, &policies, &mut out);
        assert_eq!(profile.c_zero_air_pressure, 10000);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_string_limits_are_exclusive() {
        let rule = StringRule {
            field: StringField::ShortNameBot,
        };
        let mut profile = ProfileBuilder::new().build();
        profile.short_name_bot = "1234567".into();
        assert!(run(&rule, &profile).is_empty());
        profile.short_name_bot = "12345678".into();
        assert_eq!(run(&rule, &profile).len(), 1);

        profile.profile_name = "x".repeat(50);
        let rule = StringRule {
            field: StringField::ProfileName,
        };
        assert_eq!(run(&rule, &profile).len(), 1);
        fix(&rule, &mut profile);
        assert_eq!(profile.profile_name.len(), 49);
    }

    #[test]
    fn test_bullet_length_lower_bound() {
        let spec = RANGES.iter().find(|s| s.field == FieldId::BulletLength).unwrap();
        assert_eq!(spec.raw_bounds(), (10, 200_000));
    }

    #[test]
    fn test_string_truncation_on_char_boundary() {
        let rule = StringRule {
            field: StringField::ShortNameTop,
        };
        let mut profile = ProfileBuilder::new().build();
        profile.short_name_top = "ÄÖÜäöüßéè".into();

        assert_eq!(run(&rule, &profile).len(), 1);
        let (_, corrections) = fix(&rule, &mut profile);
        assert_eq!(profile.short_name_top, "ÄÖÜäöüß");
        assert_eq!(corrections.len(), 1);
        assert!(run(&rule, &profile).is_empty());
    }

    #[test]
    fn test_distance_order_violation() {
        let rule = DistanceTableRule {
            check: TableCheck::Order,
        };
        let mut profile = ProfileBuilder::new().build();
        profile.distances = vec![100, 300, 200];
        profile.c_zero_distance_idx = 0;

        let violations = run(&rule, &profile);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "distances[2]");
    }

    #[test]
    fn test_oversized_table_keeps_shortest_distances() {
        let rule = DistanceTableRule {
            check: TableCheck::Count,
        };
        let mut profile = ProfileBuilder::new().build();
        profile.distances = (1..=250).rev().map(|m| m * 100).collect();
        profile.c_zero_distance_idx = 249;

        assert_eq!(run(&rule, &profile).len(), 1);
        let (repair, corrections) = fix(&rule, &mut profile);
        assert_eq!(repair, Repair::Applied);
        assert_eq!(profile.distances.len(), MAX_DISTANCES);
        assert_eq!(profile.distances[0], 100);
        assert_eq!(profile.zero_distance(), Some(100));
        assert!(corrections.iter().any(|c| c.path == "c_zero_distance_idx"));
        assert!(run(&rule, &profile).is_empty());
    }

    #[test]
    fn test_empty_distance_table_has_no_strategy() {
        let rule = DistanceTableRule {
            check: TableCheck::Count,
        };
        let mut profile = ProfileBuilder::new().build();
        profile.distances.clear();

        assert_eq!(run(&rule, &profile).len(), 1);
        assert_eq!(fix(&rule, &mut profile).0, Repair::NoStrategy);
    }

    #[test]
    fn test_zero_index_reindexed_to_last_entry() {
        let mut profile = ProfileBuilder::new().build();
        profile.c_zero_distance_idx = 500;

        assert_eq!(run(&ZeroIndexRule, &profile).len(), 1);
        fix(&ZeroIndexRule, &mut profile);
        assert_eq!(profile.c_zero_distance_idx as usize, profile.distances.len() - 1);
    }

    #[test]
    fn test_unknown_enum_replaced_by_nearest() {
        let rule = EnumRule::<TwistDir> {
            id: "enum.twist_dir",
            path: "twist_dir",
            get: |p| p.twist_dir,
            set: |p, v| p.twist_dir = v.into(),
        };
        let mut profile = ProfileBuilder::new().build();
        profile.twist_dir = EnumValue::Unknown(9);

        let violations = run(&rule, &profile);
        assert_eq!(violations[0].message, "expected one of [RIGHT, LEFT]");

        let (_, corrections) = fix(&rule, &mut profile);
        assert_eq!(profile.twist_dir, EnumValue::Known(TwistDir::Left));
        assert_eq!(corrections[0].after, "LEFT");
    }

    #[test]
    fn test_switch_checks() {
        let mut profile = ProfileBuilder::new().build();
        profile.switches = vec![
            SwPos::by_value(230, 0, 9, 10000),
            SwPos::by_index(255, 300, 1, 99),
            SwPos {
                distance_from: EnumValue::Unknown(4),
                ..SwPos::by_value(255, 0, 1, 10000)
            },
            SwPos::by_value(255, 0, 1, 0),
        ];

        let mut out = Vec::new();
        for check in SwitchCheck::ALL {
            SwitchRule { check }.check(&profile, &mut out);
        }
        let paths: Vec<_> = out.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "switches[0].c_idx",
                "switches[1].reticle_idx",
                "switches[0].zoom",
                "switches[2].distance_from",
                "switches[3].distance",
                "switches[1].distance",
            ]
        );
        assert!(out.iter().all(|v| v.severity == Severity::Error));
    }

    #[test]
    fn test_nearest_c_idx() {
        assert_eq!(nearest_c_idx(-4), 0);
        assert_eq!(nearest_c_idx(150), 150);
        assert_eq!(nearest_c_idx(210), 200);
        assert_eq!(nearest_c_idx(240), 255);
        assert_eq!(nearest_c_idx(1000), 255);
    }

    #[test]
    fn test_custom_drag_uses_mach_bounds() {
        let rule = CoefRowRule {
            check: CoefCheck::Breakpoint,
        };
        let mut profile = ProfileBuilder::new().build();
        profile.bc_type = GType::Custom.into();
        // 5.0 Mach is fine for CUSTOM, 12 Mach is not
        profile.coef_rows = vec![CoefRow::new(3000, 50000), CoefRow::new(2800, 120000)];

        let violations = run(&rule, &profile);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "coef_rows[1].mv");

        profile.bc_type = GType::G1.into();
        assert_eq!(run(&rule, &profile).len(), 2);
    }

    #[test]
    fn test_coef_rows_skipped_for_unknown_drag_model() {
        let rule = CoefRowRule {
            check: CoefCheck::Coefficient,
        };
        let mut profile = ProfileBuilder::new().build();
        profile.bc_type = EnumValue::Unknown(8);
        profile.coef_rows = vec![CoefRow::new(-1, 0)];
        assert!(run(&rule, &profile).is_empty());
    }

    #[test]
    fn test_coef_rows_sorted_and_deduplicated() {
        let rule = CoefRowRule {
            check: CoefCheck::Order,
        };
        let mut profile = ProfileBuilder::new().build();
        profile.coef_rows = vec![
            CoefRow::new(3000, 8000),
            CoefRow::new(3100, 6000),
            CoefRow::new(3200, 8000),
        ];

        assert_eq!(run(&rule, &profile).len(), 1);
        fix(&rule, &mut profile);
        assert_eq!(
            profile.coef_rows,
            vec![CoefRow::new(3100, 6000), CoefRow::new(3000, 8000)]
        );
        assert!(run(&rule, &profile).is_empty());
    }
}
