//! Builder for new profiles.
//!
//! [`ProfileBuilder`] takes physical values and produces a [`Profile`] with
//! every field populated. The defaults describe a generic .308 load and pass
//! validation as-is.
//!
//! ```
//! use a7p_core::factory::ProfileBuilder;
//! use a7p_core::distances::DistancePreset;
//! use a7p_core::validate::{validate, Mode};
//!
//! let profile = ProfileBuilder::new()
//!     .name("6.5 Creedmoor")
//!     .bullet_weight(140.0)
//!     .muzzle_velocity(820.0)
//!     .distances(DistancePreset::Medium)
//!     .zero_distance(200.0)
//!     .build();
//!
//! assert_eq!(profile.short_name_bot, "140gr");
//! assert!(validate(&profile, Mode::Strict).is_empty());
//! ```

use crate::distances::DistancePreset;
use crate::schema::{CoefRow, GType, Profile, SwPos, TwistDir};
use crate::units::{self, FieldId};

/// Default switch set: zoom 1 to 4 at 100, 200, 300 and 1000 m
pub fn default_switches() -> Vec<SwPos> {
    [(1, 10000), (2, 20000), (3, 30000), (4, 100000)]
        .into_iter()
        .map(|(zoom, distance)| SwPos::by_value(255, 0, zoom, distance))
        .collect()
}

/// Source of the distance table
#[derive(Debug, Clone, PartialEq)]
pub enum DistanceSource {
    /// One of the predefined tables
    Preset(DistancePreset),
    /// Explicit distances in metres
    Custom(Vec<f64>),
}

impl From<DistancePreset> for DistanceSource {
    fn from(preset: DistancePreset) -> Self {
        Self::Preset(preset)
    }
}

impl From<Vec<f64>> for DistanceSource {
    fn from(meters: Vec<f64>) -> Self {
        Self::Custom(meters)
    }
}

/// Builds a [`Profile`] from physical values
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    name: String,
    short_name_top: Option<String>,
    short_name_bot: Option<String>,
    user_note: String,
    caliber: String,
    cartridge_name: String,
    bullet_name: String,
    device_uuid: String,

    zero: (f64, f64),
    zero_distance: f64,
    zero_pitch: f64,
    air_temperature: i32,
    air_pressure: f64,
    air_humidity: i32,
    powder_temperature: i32,

    sight_height: i32,
    twist_rate: f64,
    twist_dir: TwistDir,

    muzzle_velocity: f64,
    cartridge_temperature: i32,
    powder_sensitivity: f64,

    bullet_diameter: f64,
    bullet_weight: f64,
    bullet_length: f64,
    drag_type: GType,
    drag_model: Vec<(f64, f64)>,

    distances: DistanceSource,
    switches: Vec<SwPos>,
}

impl Default for ProfileBuilder {
    fn default() -> Self {
        Self {
            name: "New profile".to_string(),
            short_name_top: None,
            short_name_bot: None,
            user_note: String::new(),
            caliber: "New caliber".to_string(),
            cartridge_name: "New cartridge".to_string(),
            bullet_name: "New bullet".to_string(),
            device_uuid: String::new(),
            zero: (0.0, 0.0),
            zero_distance: 100.0,
            zero_pitch: 0.0,
            air_temperature: 15,
            air_pressure: 1000.0,
            air_humidity: 50,
            powder_temperature: 15,
            sight_height: 90,
            twist_rate: 9.0,
            twist_dir: TwistDir::Right,
            muzzle_velocity: 800.0,
            cartridge_temperature: 15,
            powder_sensitivity: 1.5,
            bullet_diameter: 0.308,
            bullet_weight: 178.0,
            bullet_length: 1.2,
            drag_type: GType::G7,
            drag_model: vec![(1.0, 0.0)],
            distances: DistanceSource::Preset(DistancePreset::Long),
            switches: default_switches(),
        }
    }
}

impl ProfileBuilder {
    /// Creates a builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile name; also the source of the default top short name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Top short name, defaults to the first 6 characters of the name
    pub fn short_name_top(mut self, value: impl Into<String>) -> Self {
        self.short_name_top = Some(value.into());
        self
    }

    /// Bottom short name, defaults to the bullet weight, e.g. `178gr`
    pub fn short_name_bot(mut self, value: impl Into<String>) -> Self {
        self.short_name_bot = Some(value.into());
        self
    }

    /// Free-form note
    pub fn user_note(mut self, value: impl Into<String>) -> Self {
        self.user_note = value.into();
        self
    }

    /// Caliber label
    pub fn caliber(mut self, value: impl Into<String>) -> Self {
        self.caliber = value.into();
        self
    }

    /// Cartridge name
    pub fn cartridge_name(mut self, value: impl Into<String>) -> Self {
        self.cartridge_name = value.into();
        self
    }

    /// Bullet name
    pub fn bullet_name(mut self, value: impl Into<String>) -> Self {
        self.bullet_name = value.into();
        self
    }

    /// Device identifier
    pub fn device_uuid(mut self, value: impl Into<String>) -> Self {
        self.device_uuid = value.into();
        self
    }

    /// Zero in clicks
    pub fn zero(mut self, x: f64, y: f64) -> Self {
        self.zero = (x, y);
        self
    }

    /// Zero distance in metres; merged into the distance table if missing
    pub fn zero_distance(mut self, meters: f64) -> Self {
        self.zero_distance = meters;
        self
    }

    /// Shot pitch at zero, degrees
    pub fn zero_pitch(mut self, degrees: f64) -> Self {
        self.zero_pitch = degrees;
        self
    }

    /// Atmosphere at zero: °C, hPa, %
    pub fn zero_atmosphere(mut self, temperature: i32, pressure: f64, humidity: i32) -> Self {
        self.air_temperature = temperature;
        self.air_pressure = pressure;
        self.air_humidity = humidity;
        self
    }

    /// Powder temperature at zero, °C
    pub fn zero_powder_temperature(mut self, celsius: i32) -> Self {
        self.powder_temperature = celsius;
        self
    }

    /// Sight height, mm
    pub fn sight_height(mut self, mm: i32) -> Self {
        self.sight_height = mm;
        self
    }

    /// Twist rate in inches per turn and its direction
    pub fn twist(mut self, inches: f64, direction: TwistDir) -> Self {
        self.twist_rate = inches;
        self.twist_dir = direction;
        self
    }

    /// Muzzle velocity, m/s
    pub fn muzzle_velocity(mut self, mps: f64) -> Self {
        self.muzzle_velocity = mps;
        self
    }

    /// Powder temperature the muzzle velocity was measured at, °C
    pub fn cartridge_temperature(mut self, celsius: i32) -> Self {
        self.cartridge_temperature = celsius;
        self
    }

    /// Powder temperature sensitivity, %/°C
    pub fn powder_sensitivity(mut self, value: f64) -> Self {
        self.powder_sensitivity = value;
        self
    }

    /// Bullet diameter, inches
    pub fn bullet_diameter(mut self, inches: f64) -> Self {
        self.bullet_diameter = inches;
        self
    }

    /// Bullet weight, grains
    pub fn bullet_weight(mut self, grains: f64) -> Self {
        self.bullet_weight = grains;
        self
    }

    /// Bullet length, inches
    pub fn bullet_length(mut self, inches: f64) -> Self {
        self.bullet_length = inches;
        self
    }

    /// Drag model and its `(coefficient, breakpoint)` table.
    ///
    /// Breakpoints are m/s for G1/G7 and Mach for CUSTOM.
    pub fn drag(mut self, model: GType, rows: Vec<(f64, f64)>) -> Self {
        self.drag_type = model;
        self.drag_model = rows;
        self
    }

    /// Distance table
    pub fn distances(mut self, source: impl Into<DistanceSource>) -> Self {
        self.distances = source.into();
        self
    }

    /// Sight switches
    pub fn switches(mut self, switches: Vec<SwPos>) -> Self {
        self.switches = switches;
        self
    }

    /// Assembles the profile
    pub fn build(self) -> Profile {
        let mut distances = match &self.distances {
            DistanceSource::Preset(preset) => preset.raw(),
            DistanceSource::Custom(meters) => meters
                .iter()
                .map(|&m| units::to_raw(FieldId::Distance, m))
                .collect(),
        };
        let zero = units::to_raw(FieldId::Distance, self.zero_distance);
        distances.push(zero);
        distances.sort_unstable();
        distances.dedup();
        let zero_idx = distances.binary_search(&zero).unwrap_or_default() as i32;

        let breakpoint = match self.drag_type {
            GType::Custom => FieldId::MachBreakpoint,
            GType::G1 | GType::G7 => FieldId::VelocityBreakpoint,
        };
        let coef_rows = self
            .drag_model
            .iter()
            .map(|&(coeff, mv)| {
                CoefRow::new(
                    units::to_raw(FieldId::DragCoefficient, coeff),
                    units::to_raw(breakpoint, mv),
                )
            })
            .collect();

        let short_name_top = self
            .short_name_top
            .unwrap_or_else(|| self.name.chars().take(6).collect());
        let short_name_bot = self
            .short_name_bot
            .unwrap_or_else(|| format_weight(self.bullet_weight));

        Profile {
            profile_name: self.name,
            cartridge_name: self.cartridge_name,
            bullet_name: self.bullet_name,
            short_name_top,
            short_name_bot,
            user_note: self.user_note,
            caliber: self.caliber,
            device_uuid: self.device_uuid,
            zero_x: units::to_raw(FieldId::ZeroX, self.zero.0),
            zero_y: units::to_raw(FieldId::ZeroY, self.zero.1),
            sc_height: self.sight_height,
            r_twist: units::to_raw(FieldId::TwistRate, self.twist_rate),
            twist_dir: self.twist_dir.into(),
            c_muzzle_velocity: units::to_raw(FieldId::MuzzleVelocity, self.muzzle_velocity),
            c_zero_temperature: self.cartridge_temperature,
            c_t_coeff: units::to_raw(FieldId::PowderSensitivity, self.powder_sensitivity),
            c_zero_distance_idx: zero_idx,
            c_zero_air_temperature: self.air_temperature,
            c_zero_air_pressure: units::to_raw(FieldId::ZeroAirPressure, self.air_pressure),
            c_zero_air_humidity: self.air_humidity,
            c_zero_w_pitch: units::to_raw(FieldId::ZeroPitch, self.zero_pitch),
            c_zero_p_temperature: self.powder_temperature,
            b_diameter: units::to_raw(FieldId::BulletDiameter, self.bullet_diameter),
            b_weight: units::to_raw(FieldId::BulletWeight, self.bullet_weight),
            b_length: units::to_raw(FieldId::BulletLength, self.bullet_length),
            bc_type: self.drag_type.into(),
            switches: self.switches,
            distances,
            coef_rows,
            ..Default::default()
        }
    }
}

/// `178gr`, or `178.5gr` for fractional weights
fn format_weight(grains: f64) -> String {
    if grains.fract() == 0.0 {
        format!("{:.0}gr", grains)
    } else {
        format!("{:.1}gr", grains)
    }
}
