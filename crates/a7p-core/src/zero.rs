//! Zero synchronisation and click offsets.
//!
//! Two ways to change a profile's zero:
//!
//! - **Sync** transplants the zero of a reference profile: `zero_x`/`zero_y`,
//!   the zero distance and the conditions at zero are copied in raw units.
//! - **Offset** adds click deltas to `zero_x`/`zero_y`, each converted with
//!   its own sign convention.
//!
//! [`ZeroAdjustment`] holds exactly one of the two.

use crate::distances;
use crate::error::{Error, Result};
use crate::schema::Profile;
use crate::units::{self, FieldId};
use std::fmt;
use tracing::debug;

/// Zero-related fields of a reference profile, in raw units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZeroReference {
    /// Horizontal zero
    pub zero_x: i32,
    /// Vertical zero
    pub zero_y: i32,
    /// Zero distance
    pub zero_distance: i32,
    /// Air temperature at zero
    pub air_temperature: i32,
    /// Air pressure at zero
    pub air_pressure: i32,
    /// Air humidity at zero
    pub air_humidity: i32,
    /// Shot pitch at zero
    pub pitch: i32,
    /// Powder temperature at zero
    pub powder_temperature: i32,
}

impl ZeroReference {
    /// Extracts the zero of `profile`.
    ///
    /// Fails if the zero index does not point into the distance table.
    pub fn from_profile(profile: &Profile) -> Result<Self> {
        let zero_distance = profile.zero_distance().ok_or_else(|| {
            Error::zero_distance(format!(
                "reference zero index {} is outside its distance table",
                profile.c_zero_distance_idx
            ))
        })?;

        Ok(Self {
            zero_x: profile.zero_x,
            zero_y: profile.zero_y,
            zero_distance,
            air_temperature: profile.c_zero_air_temperature,
            air_pressure: profile.c_zero_air_pressure,
            air_humidity: profile.c_zero_air_humidity,
            pitch: profile.c_zero_w_pitch,
            powder_temperature: profile.c_zero_p_temperature,
        })
    }

    /// Zero as clicks
    pub fn clicks(&self) -> ZeroOffset {
        ZeroOffset::new(
            units::to_physical(FieldId::ZeroX, self.zero_x),
            units::to_physical(FieldId::ZeroY, self.zero_y),
        )
    }
}

/// A pair of click values, horizontal and vertical
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ZeroOffset {
    /// Horizontal clicks
    pub x: f64,
    /// Vertical clicks
    pub y: f64,
}

impl ZeroOffset {
    /// Creates an offset from click values
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Zero of `profile` as clicks
    pub fn of(profile: &Profile) -> Self {
        Self::new(
            units::to_physical(FieldId::ZeroX, profile.zero_x),
            units::to_physical(FieldId::ZeroY, profile.zero_y),
        )
    }
}

impl fmt::Display for ZeroOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `+ 0.0` turns the -0 of a sign-inverted zero into 0
        write!(f, "X: {}, Y: {}", self.x + 0.0, self.y + 0.0)
    }
}

/// Requested change to a profile's zero
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZeroAdjustment {
    /// Transplant the zero of a reference profile
    Sync(ZeroReference),
    /// Add click deltas to the current zero
    Offset(ZeroOffset),
}

impl ZeroAdjustment {
    /// Applies the adjustment to `profile`
    pub fn apply(&self, profile: &mut Profile) -> Result<()> {
        match self {
            ZeroAdjustment::Sync(reference) => sync_zero(profile, reference),
            ZeroAdjustment::Offset(offset) => {
                apply_offset(profile, *offset);
                Ok(())
            }
        }
    }
}

/// Click deltas that move `target`'s zero onto `reference`'s.
///
/// Both zeros must be taken at the same distance: `zero_distance` metres if
/// given, otherwise the target's own zero distance.
pub fn compute_offset(
    reference: &ZeroReference,
    target: &Profile,
    zero_distance: Option<f64>,
) -> Result<ZeroOffset> {
    let distance = match zero_distance {
        Some(meters) => units::to_raw(FieldId::Distance, meters),
        None => target.zero_distance().ok_or_else(|| {
            Error::zero_distance(format!(
                "zero index {} is outside the distance table",
                target.c_zero_distance_idx
            ))
        })?,
    };

    if distance != reference.zero_distance {
        return Err(Error::zero_distance(format!(
            "reference is zeroed at {}, target at {}",
            units::format_physical(FieldId::Distance, reference.zero_distance),
            units::format_physical(FieldId::Distance, distance)
        )));
    }

    let current = ZeroOffset::of(target);
    let wanted = reference.clicks();
    Ok(ZeroOffset::new(wanted.x - current.x, wanted.y - current.y))
}

/// Adds click deltas to the zero of `target`
pub fn apply_offset(target: &mut Profile, offset: ZeroOffset) {
    let dx = units::to_raw(FieldId::ZeroX, offset.x);
    let dy = units::to_raw(FieldId::ZeroY, offset.y);
    target.zero_x = target.zero_x.saturating_add(dx);
    target.zero_y = target.zero_y.saturating_add(dy);
    debug!("Zero offset by {}: raw ({}, {})", offset, dx, dy);
}

/// Copies the zero of `reference` onto `target`.
///
/// The reference zero distance is merged into the target's distance table.
pub fn sync_zero(target: &mut Profile, reference: &ZeroReference) -> Result<()> {
    let meters = units::to_physical(FieldId::Distance, reference.zero_distance);
    distances::update_distances(target, None, Some(meters))?;

    target.zero_x = reference.zero_x;
    target.zero_y = reference.zero_y;
    target.c_zero_air_temperature = reference.air_temperature;
    target.c_zero_air_pressure = reference.air_pressure;
    target.c_zero_air_humidity = reference.air_humidity;
    target.c_zero_w_pitch = reference.pitch;
    target.c_zero_p_temperature = reference.powder_temperature;

    debug!("Zero synced to {}", reference.clicks());
    Ok(())
}
