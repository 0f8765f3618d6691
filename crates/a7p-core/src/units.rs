//! Scaled-integer unit codec.
//!
//! Every numeric physical quantity in a profile is stored as an `int32`
//! multiplied by a fixed factor. [`SCALE_TABLE`] is the single source of truth
//! for those factors; nothing else in the crate hard-codes them.
//!
//! | field                    | unit    | multiplier |
//! |--------------------------|---------|-----------:|
//! | `zero_x`                 | click   |      -1000 |
//! | `zero_y`                 | click   |       1000 |
//! | `sc_height`              | mm      |          1 |
//! | `r_twist`                | inch    |        100 |
//! | `c_muzzle_velocity`      | m/s     |         10 |
//! | `c_zero_temperature`     | °C      |          1 |
//! | `c_t_coeff`              | %/°C    |       1000 |
//! | `c_zero_air_temperature` | °C      |          1 |
//! | `c_zero_air_pressure`    | hPa     |         10 |
//! | `c_zero_air_humidity`    | %       |          1 |
//! | `c_zero_w_pitch`         | degree  |         10 |
//! | `c_zero_p_temperature`   | °C      |          1 |
//! | `b_diameter`             | inch    |       1000 |
//! | `b_weight`               | grain   |         10 |
//! | `b_length`               | inch    |       1000 |
//! | `distances[]`            | m       |        100 |
//! | `coef_rows[].bc_cd`      | -       |      10000 |
//! | `coef_rows[].mv` (G1/G7) | m/s     |         10 |
//! | `coef_rows[].mv` (CUSTOM)| Mach    |      10000 |

use std::fmt;

/// Identifies a scaled quantity stored in a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldId {
    /// Horizontal zero, sign inverted
    ZeroX,
    /// Vertical zero
    ZeroY,
    /// Sight height over bore
    SightHeight,
    /// Barrel twist rate
    TwistRate,
    /// Muzzle velocity at the cartridge zero temperature
    MuzzleVelocity,
    /// Powder temperature the muzzle velocity was measured at
    CartridgeTemperature,
    /// Powder temperature sensitivity
    PowderSensitivity,
    /// Air temperature at zero
    ZeroAirTemperature,
    /// Air pressure at zero
    ZeroAirPressure,
    /// Air humidity at zero
    ZeroAirHumidity,
    /// Shot pitch at zero
    ZeroPitch,
    /// Powder temperature at zero
    ZeroPowderTemperature,
    /// Bullet diameter
    BulletDiameter,
    /// Bullet weight
    BulletWeight,
    /// Bullet length
    BulletLength,
    /// One entry of the distance table or a literal switch distance
    Distance,
    /// Ballistic or drag coefficient of a drag row
    DragCoefficient,
    /// Velocity breakpoint of a G1/G7 drag row
    VelocityBreakpoint,
    /// Mach breakpoint of a CUSTOM drag row
    MachBreakpoint,
}

/// Physical unit of a [`FieldId`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Sight adjustment click
    Click,
    /// Millimetre
    Millimeter,
    /// Inch
    Inch,
    /// Metre per second
    MeterPerSecond,
    /// Degree Celsius
    Celsius,
    /// Percent per degree Celsius
    PercentPerCelsius,
    /// Hectopascal
    HectoPascal,
    /// Percent
    Percent,
    /// Angular degree
    Degree,
    /// Grain
    Grain,
    /// Metre
    Meter,
    /// Mach number
    Mach,
    /// No unit
    Dimensionless,
}

impl Unit {
    /// Short symbol used in reports
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Click => "click",
            Unit::Millimeter => "mm",
            Unit::Inch => "in",
            Unit::MeterPerSecond => "m/s",
            Unit::Celsius => "°C",
            Unit::PercentPerCelsius => "%/°C",
            Unit::HectoPascal => "hPa",
            Unit::Percent => "%",
            Unit::Degree => "°",
            Unit::Grain => "gr",
            Unit::Meter => "m",
            Unit::Mach => "Mach",
            Unit::Dimensionless => "",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One row of the scale table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    /// Field this row describes
    pub field: FieldId,
    /// Field name as it appears in the schema
    pub name: &'static str,
    /// `raw = physical * multiplier`
    pub multiplier: f64,
    /// Physical unit
    pub unit: Unit,
}

const fn row(field: FieldId, name: &'static str, multiplier: f64, unit: Unit) -> Scale {
    Scale {
        field,
        name,
        multiplier,
        unit,
    }
}

/// Scale factors, indexed by `FieldId as usize`
pub const SCALE_TABLE: &[Scale] = &[
    row(FieldId::ZeroX, "zero_x", -1000.0, Unit::Click),
    row(FieldId::ZeroY, "zero_y", 1000.0, Unit::Click),
    row(FieldId::SightHeight, "sc_height", 1.0, Unit::Millimeter),
    row(FieldId::TwistRate, "r_twist", 100.0, Unit::Inch),
    row(FieldId::MuzzleVelocity, "c_muzzle_velocity", 10.0, Unit::MeterPerSecond),
    row(FieldId::CartridgeTemperature, "c_zero_temperature", 1.0, Unit::Celsius),
    row(FieldId::PowderSensitivity, "c_t_coeff", 1000.0, Unit::PercentPerCelsius),
    row(FieldId::ZeroAirTemperature, "c_zero_air_temperature", 1.0, Unit::Celsius),
    row(FieldId::ZeroAirPressure, "c_zero_air_pressure", 10.0, Unit::HectoPascal),
    row(FieldId::ZeroAirHumidity, "c_zero_air_humidity", 1.0, Unit::Percent),
    row(FieldId::ZeroPitch, "c_zero_w_pitch", 10.0, Unit::Degree),
    row(FieldId::ZeroPowderTemperature, "c_zero_p_temperature", 1.0, Unit::Celsius),
    row(FieldId::BulletDiameter, "b_diameter", 1000.0, Unit::Inch),
    row(FieldId::BulletWeight, "b_weight", 10.0, Unit::Grain),
    row(FieldId::BulletLength, "b_length", 1000.0, Unit::Inch),
    row(FieldId::Distance, "distance", 100.0, Unit::Meter),
    row(FieldId::DragCoefficient, "bc_cd", 10000.0, Unit::Dimensionless),
    row(FieldId::VelocityBreakpoint, "mv", 10.0, Unit::MeterPerSecond),
    row(FieldId::MachBreakpoint, "mv", 10000.0, Unit::Mach),
];

impl FieldId {
    /// Every field, in table order
    pub const ALL: [FieldId; 19] = [
        FieldId::ZeroX,
        FieldId::ZeroY,
        FieldId::SightHeight,
        FieldId::TwistRate,
        FieldId::MuzzleVelocity,
        FieldId::CartridgeTemperature,
        FieldId::PowderSensitivity,
        FieldId::ZeroAirTemperature,
        FieldId::ZeroAirPressure,
        FieldId::ZeroAirHumidity,
        FieldId::ZeroPitch,
        FieldId::ZeroPowderTemperature,
        FieldId::BulletDiameter,
        FieldId::BulletWeight,
        FieldId::BulletLength,
        FieldId::Distance,
        FieldId::DragCoefficient,
        FieldId::VelocityBreakpoint,
        FieldId::MachBreakpoint,
    ];

    /// Scale table row for this field
    pub fn scale(self) -> &'static Scale {
        &SCALE_TABLE[self as usize]
    }

    /// Schema name of this field
    pub fn name(self) -> &'static str {
        self.scale().name
    }

    /// Physical unit of this field
    pub fn unit(self) -> Unit {
        self.scale().unit
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Converts a stored integer into its physical value
pub fn to_physical(field: FieldId, raw: i32) -> f64 {
    f64::from(raw) / field.scale().multiplier
}

/// Converts a physical value into the stored integer.
///
/// Rounds half away from zero, then saturates to the `int32` range. NaN
/// maps to zero.
pub fn to_raw(field: FieldId, physical: f64) -> i32 {
    (physical * field.scale().multiplier).round() as i32
}

/// Formats a raw value in physical units, e.g. `1.5 in`
pub fn format_physical(field: FieldId, raw: i32) -> String {
    let value = to_physical(field, raw);
    match field.unit() {
        Unit::Dimensionless => format!("{}", value),
        unit => format!("{} {}", value, unit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_indexed_by_field() {
        assert_eq!(SCALE_TABLE.len(), FieldId::ALL.len());
        for (i, field) in FieldId::ALL.iter().enumerate() {
            assert_eq!(*field as usize, i);
            assert_eq!(SCALE_TABLE[i].field, *field);
        }
    }

    #[test]
    fn test_sign_inverted_zero_x() {
        assert_eq!(to_raw(FieldId::ZeroX, 10.0), -10000);
        assert_eq!(to_raw(FieldId::ZeroY, -20.0), -20000);
        assert_eq!(to_physical(FieldId::ZeroX, -1500), 1.5);
    }

    #[test]
    fn test_known_factors() {
        assert_eq!(to_raw(FieldId::TwistRate, 9.0), 900);
        assert_eq!(to_raw(FieldId::MuzzleVelocity, 800.0), 8000);
        assert_eq!(to_raw(FieldId::BulletWeight, 178.0), 1780);
        assert_eq!(to_raw(FieldId::Distance, 100.0), 10000);
        assert_eq!(to_raw(FieldId::DragCoefficient, 0.315), 3150);
        assert_eq!(to_physical(FieldId::SightHeight, 90), 90.0);
    }

    #[test]
    fn test_rounding_ties_away_from_zero() {
        assert_eq!(to_raw(FieldId::SightHeight, 2.5), 3);
        assert_eq!(to_raw(FieldId::SightHeight, -2.5), -3);
        assert_eq!(to_raw(FieldId::BulletWeight, 0.05), 1);
    }

    #[test]
    fn test_saturates_to_stored_width() {
        assert_eq!(to_raw(FieldId::Distance, 1e12), i32::MAX);
        assert_eq!(to_raw(FieldId::Distance, -1e12), i32::MIN);
        assert_eq!(to_raw(FieldId::Distance, f64::NAN), 0);
    }

    #[test]
    fn test_format_physical() {
        assert_eq!(format_physical(FieldId::BulletLength, 1500), "1.5 in");
        assert_eq!(format_physical(FieldId::DragCoefficient, 5000), "0.5");
    }
}
