//! Typed profile record and its wire mapping.
//!
//! [`decode`] turns payload bytes into a [`Profile`]; [`encode`] does the
//! inverse. Decoding only fails on framing errors: out-of-range values, unknown
//! enum numbers and unknown fields all survive decoding so that validation and
//! recovery can see them.
//!
//! ## Unknown fields
//!
//! Fields the engine does not understand are kept as raw bytes on every
//! message: the `Payload` envelope, the `Profile` and each `SwPos` and
//! `CoefRow` entry. They are re-emitted after the known fields of their
//! message on encode, so a canonical archive decodes and re-encodes to
//! identical bytes.

mod proto;
mod wire;

use crate::error::Result;
use crate::units::FieldId;
use prost::Message;
use std::fmt;
use tracing::trace;

pub use proto::{DType, GType, TwistDir};

use proto::{
    CoefRowMessage, PayloadMessage, ProfileMessage, SwPosMessage, COEF_ROW_LAST_FIELD,
    PAYLOAD_PROFILE_FIELD, PROFILE_COEF_ROWS_FIELD, PROFILE_LAST_FIELD, PROFILE_SWITCHES_FIELD,
    SWPOS_LAST_FIELD,
};

/// An enum with a closed set of declared members
pub trait DeclaredEnum: Copy + Eq + Into<i32> + TryFrom<i32> + 'static {
    /// Every declared member, ordered by wire value
    const MEMBERS: &'static [Self];

    /// Schema label of the member, e.g. `"RIGHT"`
    fn label(self) -> &'static str;

    /// Member whose wire value is closest to `raw`; ties pick the lower value
    fn nearest(raw: i32) -> Self {
        let mut best = Self::MEMBERS[0];
        for &member in Self::MEMBERS {
            let distance = (i64::from(member.into()) - i64::from(raw)).abs();
            let best_distance = (i64::from(best.into()) - i64::from(raw)).abs();
            if distance < best_distance {
                best = member;
            }
        }
        best
    }
}

impl DeclaredEnum for TwistDir {
    const MEMBERS: &'static [Self] = &[TwistDir::Right, TwistDir::Left];

    fn label(self) -> &'static str {
        match self {
            TwistDir::Right => "RIGHT",
            TwistDir::Left => "LEFT",
        }
    }
}

impl DeclaredEnum for GType {
    const MEMBERS: &'static [Self] = &[GType::G1, GType::G7, GType::Custom];

    fn label(self) -> &'static str {
        match self {
            GType::G1 => "G1",
            GType::G7 => "G7",
            GType::Custom => "CUSTOM",
        }
    }
}

impl DeclaredEnum for DType {
    const MEMBERS: &'static [Self] = &[DType::Value, DType::Index];

    fn label(self) -> &'static str {
        match self {
            DType::Value => "VALUE",
            DType::Index => "INDEX",
        }
    }
}

/// Value of an enum field as read from the wire
///
/// Archives may carry numbers outside the declared members; those are kept as
/// `Unknown` so validation can report them instead of decoding failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumValue<T> {
    /// A declared member
    Known(T),
    /// A wire value with no declared member
    Unknown(i32),
}

impl<T: DeclaredEnum> EnumValue<T> {
    /// Classifies a wire value
    pub fn from_raw(raw: i32) -> Self {
        match T::try_from(raw) {
            Ok(member) => Self::Known(member),
            Err(_) => Self::Unknown(raw),
        }
    }

    /// Wire value
    pub fn raw(self) -> i32 {
        match self {
            Self::Known(member) => member.into(),
            Self::Unknown(raw) => raw,
        }
    }

    /// Declared member, if any
    pub fn known(self) -> Option<T> {
        match self {
            Self::Known(member) => Some(member),
            Self::Unknown(_) => None,
        }
    }
}

impl<T: DeclaredEnum> fmt::Display for EnumValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(member) => f.write_str(member.label()),
            Self::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

impl<T> From<T> for EnumValue<T> {
    fn from(member: T) -> Self {
        Self::Known(member)
    }
}

impl<T: Default> Default for EnumValue<T> {
    fn default() -> Self {
        Self::Known(T::default())
    }
}

/// Raw bytes of fields the schema does not declare, in original order
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UnknownFields(Vec<u8>);

impl UnknownFields {
    /// Wraps already-encoded field bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Encoded field bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns true if no unknown fields were captured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, field: &[u8]) {
        self.0.extend_from_slice(field);
    }
}

/// One sight switch position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwPos {
    /// Click table index, 255 when unused
    pub c_idx: i32,
    /// Reticle index
    pub reticle_idx: i32,
    /// Zoom step
    pub zoom: i32,
    /// Literal distance (m ×100) or index into `distances`
    pub distance: i32,
    /// Interpretation of `distance`
    pub distance_from: EnumValue<DType>,
    /// Undeclared fields of this entry
    pub unknown_fields: UnknownFields,
}

impl SwPos {
    /// Switch bound to a literal distance in raw units
    pub fn by_value(c_idx: i32, reticle_idx: i32, zoom: i32, distance: i32) -> Self {
        Self {
            c_idx,
            reticle_idx,
            zoom,
            distance,
            distance_from: DType::Value.into(),
            unknown_fields: UnknownFields::default(),
        }
    }

    /// Switch bound to an entry of the distance table
    pub fn by_index(c_idx: i32, reticle_idx: i32, zoom: i32, index: i32) -> Self {
        Self {
            c_idx,
            reticle_idx,
            zoom,
            distance: index,
            distance_from: DType::Index.into(),
            unknown_fields: UnknownFields::default(),
        }
    }
}

/// One drag table breakpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoefRow {
    /// BC (G1/G7) or Cd (CUSTOM), ×10000
    pub bc_cd: i32,
    /// Velocity (m/s ×10) for G1/G7, Mach ×10000 for CUSTOM
    pub mv: i32,
    /// Undeclared fields of this entry
    pub unknown_fields: UnknownFields,
}

impl CoefRow {
    /// Creates a drag breakpoint from raw values
    pub fn new(bc_cd: i32, mv: i32) -> Self {
        Self {
            bc_cd,
            mv,
            unknown_fields: UnknownFields::default(),
        }
    }
}

/// A decoded ballistic profile
///
/// Numeric fields hold raw scaled integers; see [`crate::units`] for their
/// physical meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Profile {
    pub profile_name: String,
    pub cartridge_name: String,
    pub bullet_name: String,
    pub short_name_top: String,
    pub short_name_bot: String,
    pub user_note: String,
    pub caliber: String,
    pub device_uuid: String,

    pub zero_x: i32,
    pub zero_y: i32,
    pub sc_height: i32,
    pub r_twist: i32,
    pub twist_dir: EnumValue<TwistDir>,

    pub c_muzzle_velocity: i32,
    pub c_zero_temperature: i32,
    pub c_t_coeff: i32,

    pub c_zero_distance_idx: i32,
    pub c_zero_air_temperature: i32,
    pub c_zero_air_pressure: i32,
    pub c_zero_air_humidity: i32,
    pub c_zero_w_pitch: i32,
    pub c_zero_p_temperature: i32,

    pub b_diameter: i32,
    pub b_weight: i32,
    pub b_length: i32,

    pub bc_type: EnumValue<GType>,
    pub switches: Vec<SwPos>,
    pub distances: Vec<i32>,
    pub coef_rows: Vec<CoefRow>,

    /// Undeclared fields found inside the profile message
    pub unknown_fields: UnknownFields,
    /// Undeclared fields found in the enclosing envelope
    pub envelope_fields: UnknownFields,
}

impl Profile {
    /// Raw value of a scalar field; `None` for per-element fields
    pub fn scalar(&self, field: FieldId) -> Option<i32> {
        let value = match field {
            FieldId::ZeroX => self.zero_x,
            FieldId::ZeroY => self.zero_y,
            FieldId::SightHeight => self.sc_height,
            FieldId::TwistRate => self.r_twist,
            FieldId::MuzzleVelocity => self.c_muzzle_velocity,
            FieldId::CartridgeTemperature => self.c_zero_temperature,
            FieldId::PowderSensitivity => self.c_t_coeff,
            FieldId::ZeroAirTemperature => self.c_zero_air_temperature,
            FieldId::ZeroAirPressure => self.c_zero_air_pressure,
            FieldId::ZeroAirHumidity => self.c_zero_air_humidity,
            FieldId::ZeroPitch => self.c_zero_w_pitch,
            FieldId::ZeroPowderTemperature => self.c_zero_p_temperature,
            FieldId::BulletDiameter => self.b_diameter,
            FieldId::BulletWeight => self.b_weight,
            FieldId::BulletLength => self.b_length,
            FieldId::Distance
            | FieldId::DragCoefficient
            | FieldId::VelocityBreakpoint
            | FieldId::MachBreakpoint => return None,
        };
        Some(value)
    }

    /// Mutable access to a scalar field; `None` for per-element fields
    pub fn scalar_mut(&mut self, field: FieldId) -> Option<&mut i32> {
        let slot = match field {
            FieldId::ZeroX => &mut self.zero_x,
            FieldId::ZeroY => &mut self.zero_y,
            FieldId::SightHeight => &mut self.sc_height,
            FieldId::TwistRate => &mut self.r_twist,
            FieldId::MuzzleVelocity => &mut self.c_muzzle_velocity,
            FieldId::CartridgeTemperature => &mut self.c_zero_temperature,
            FieldId::PowderSensitivity => &mut self.c_t_coeff,
            FieldId::ZeroAirTemperature => &mut self.c_zero_air_temperature,
            FieldId::ZeroAirPressure => &mut self.c_zero_air_pressure,
            FieldId::ZeroAirHumidity => &mut self.c_zero_air_humidity,
            FieldId::ZeroPitch => &mut self.c_zero_w_pitch,
            FieldId::ZeroPowderTemperature => &mut self.c_zero_p_temperature,
            FieldId::BulletDiameter => &mut self.b_diameter,
            FieldId::BulletWeight => &mut self.b_weight,
            FieldId::BulletLength => &mut self.b_length,
            FieldId::Distance
            | FieldId::DragCoefficient
            | FieldId::VelocityBreakpoint
            | FieldId::MachBreakpoint => return None,
        };
        Some(slot)
    }

    /// Zero distance in raw units, if the zero index is valid
    pub fn zero_distance(&self) -> Option<i32> {
        usize::try_from(self.c_zero_distance_idx)
            .ok()
            .and_then(|idx| self.distances.get(idx).copied())
    }

    /// Unit of the `mv` column under the current drag model
    pub fn breakpoint_field(&self) -> Option<FieldId> {
        match self.bc_type {
            EnumValue::Known(GType::G1) | EnumValue::Known(GType::G7) => {
                Some(FieldId::VelocityBreakpoint)
            }
            EnumValue::Known(GType::Custom) => Some(FieldId::MachBreakpoint),
            EnumValue::Unknown(_) => None,
        }
    }
}

/// Decodes payload bytes into a profile.
///
/// Fails only when the bytes violate protobuf framing.
pub fn decode(payload: &[u8]) -> Result<Profile> {
    let message = PayloadMessage::decode(payload)?;

    let mut envelope_fields = UnknownFields::default();
    let mut unknown_fields = UnknownFields::default();
    let mut switch_fields = Vec::new();
    let mut row_fields = Vec::new();

    for span in wire::fields(payload) {
        let span = span?;
        if span.number == PAYLOAD_PROFILE_FIELD && span.wire_type == wire::WireType::Len {
            let inner = &payload[span.value.clone()];
            for inner_span in wire::fields(inner) {
                let inner_span = inner_span?;
                let entry = &inner[inner_span.value.clone()];
                match inner_span.number {
                    PROFILE_SWITCHES_FIELD => {
                        switch_fields.push(unknown_in(entry, SWPOS_LAST_FIELD)?);
                    }
                    PROFILE_COEF_ROWS_FIELD => {
                        row_fields.push(unknown_in(entry, COEF_ROW_LAST_FIELD)?);
                    }
                    n if n > PROFILE_LAST_FIELD => {
                        trace!("Keeping unknown profile field {}", n);
                        unknown_fields.push(&inner[inner_span.range]);
                    }
                    _ => {}
                }
            }
        } else {
            trace!("Keeping unknown envelope field {}", span.number);
            envelope_fields.push(&payload[span.range]);
        }
    }

    let mut profile = Profile::from(message.profile.unwrap_or_default());
    for (sw, fields) in profile.switches.iter_mut().zip(switch_fields) {
        sw.unknown_fields = fields;
    }
    for (row, fields) in profile.coef_rows.iter_mut().zip(row_fields) {
        row.unknown_fields = fields;
    }
    profile.unknown_fields = unknown_fields;
    profile.envelope_fields = envelope_fields;
    Ok(profile)
}

/// Collects the fields of an embedded message numbered above `last_known`
fn unknown_in(message: &[u8], last_known: u32) -> Result<UnknownFields> {
    let mut unknown = UnknownFields::default();
    for span in wire::fields(message) {
        let span = span?;
        if span.number > last_known {
            trace!("Keeping unknown entry field {}", span.number);
            unknown.push(&message[span.range]);
        }
    }
    Ok(unknown)
}

/// Encodes a profile into canonical payload bytes
pub fn encode(profile: &Profile) -> Vec<u8> {
    let inner = encode_profile(profile);

    let mut out = Vec::with_capacity(inner.len() + profile.envelope_fields.as_bytes().len() + 6);
    prost::encoding::encode_key(
        PAYLOAD_PROFILE_FIELD,
        prost::encoding::WireType::LengthDelimited,
        &mut out,
    );
    prost::encoding::encode_varint(inner.len() as u64, &mut out);
    out.extend_from_slice(&inner);
    out.extend_from_slice(profile.envelope_fields.as_bytes());
    out
}

/// Encodes the profile message in field order.
///
/// prost writes the scalar runs; switch and drag entries are framed here so
/// each can carry its own unknown fields.
fn encode_profile(profile: &Profile) -> Vec<u8> {
    let mut head = ProfileMessage::from(profile);
    let switches = std::mem::take(&mut head.switches);
    let coef_rows = std::mem::take(&mut head.coef_rows);
    let distances = ProfileMessage {
        distances: std::mem::take(&mut head.distances),
        ..Default::default()
    };
    let tail = ProfileMessage {
        caliber: std::mem::take(&mut head.caliber),
        device_uuid: std::mem::take(&mut head.device_uuid),
        ..Default::default()
    };

    let mut out = head.encode_to_vec();
    for (message, sw) in switches.iter().zip(&profile.switches) {
        encode_entry(PROFILE_SWITCHES_FIELD, message, &sw.unknown_fields, &mut out);
    }
    out.extend_from_slice(&distances.encode_to_vec());
    for (message, row) in coef_rows.iter().zip(&profile.coef_rows) {
        encode_entry(PROFILE_COEF_ROWS_FIELD, message, &row.unknown_fields, &mut out);
    }
    out.extend_from_slice(&tail.encode_to_vec());
    out.extend_from_slice(profile.unknown_fields.as_bytes());
    out
}

fn encode_entry(number: u32, message: &impl Message, unknown: &UnknownFields, out: &mut Vec<u8>) {
    let len = message.encoded_len() + unknown.as_bytes().len();
    prost::encoding::encode_key(number, prost::encoding::WireType::LengthDelimited, out);
    prost::encoding::encode_varint(len as u64, out);
    out.extend_from_slice(&message.encode_to_vec());
    out.extend_from_slice(unknown.as_bytes());
}

impl From<ProfileMessage> for Profile {
    fn from(m: ProfileMessage) -> Self {
        Self {
            profile_name: m.profile_name,
            cartridge_name: m.cartridge_name,
            bullet_name: m.bullet_name,
            short_name_top: m.short_name_top,
            short_name_bot: m.short_name_bot,
            user_note: m.user_note,
            caliber: m.caliber,
            device_uuid: m.device_uuid,
            zero_x: m.zero_x,
            zero_y: m.zero_y,
            sc_height: m.sc_height,
            r_twist: m.r_twist,
            twist_dir: EnumValue::from_raw(m.twist_dir),
            c_muzzle_velocity: m.c_muzzle_velocity,
            c_zero_temperature: m.c_zero_temperature,
            c_t_coeff: m.c_t_coeff,
            c_zero_distance_idx: m.c_zero_distance_idx,
            c_zero_air_temperature: m.c_zero_air_temperature,
            c_zero_air_pressure: m.c_zero_air_pressure,
            c_zero_air_humidity: m.c_zero_air_humidity,
            c_zero_w_pitch: m.c_zero_w_pitch,
            c_zero_p_temperature: m.c_zero_p_temperature,
            b_diameter: m.b_diameter,
            b_weight: m.b_weight,
            b_length: m.b_length,
            bc_type: EnumValue::from_raw(m.bc_type),
            switches: m
                .switches
                .into_iter()
                .map(|s| SwPos {
                    c_idx: s.c_idx,
                    reticle_idx: s.reticle_idx,
                    zoom: s.zoom,
                    distance: s.distance,
                    distance_from: EnumValue::from_raw(s.distance_from),
                    unknown_fields: UnknownFields::default(),
                })
                .collect(),
            distances: m.distances,
            coef_rows: m
                .coef_rows
                .into_iter()
                .map(|r| CoefRow::new(r.bc_cd, r.mv))
                .collect(),
            unknown_fields: UnknownFields::default(),
            envelope_fields: UnknownFields::default(),
        }
    }
}

impl From<&Profile> for ProfileMessage {
    fn from(p: &Profile) -> Self {
        Self {
            profile_name: p.profile_name.clone(),
            cartridge_name: p.cartridge_name.clone(),
            bullet_name: p.bullet_name.clone(),
            short_name_top: p.short_name_top.clone(),
            short_name_bot: p.short_name_bot.clone(),
            user_note: p.user_note.clone(),
            zero_x: p.zero_x,
            zero_y: p.zero_y,
            sc_height: p.sc_height,
            r_twist: p.r_twist,
            c_muzzle_velocity: p.c_muzzle_velocity,
            c_zero_temperature: p.c_zero_temperature,
            c_t_coeff: p.c_t_coeff,
            c_zero_distance_idx: p.c_zero_distance_idx,
            c_zero_air_temperature: p.c_zero_air_temperature,
            c_zero_air_pressure: p.c_zero_air_pressure,
            c_zero_air_humidity: p.c_zero_air_humidity,
            c_zero_w_pitch: p.c_zero_w_pitch,
            c_zero_p_temperature: p.c_zero_p_temperature,
            b_diameter: p.b_diameter,
            b_weight: p.b_weight,
            b_length: p.b_length,
            twist_dir: p.twist_dir.raw(),
            bc_type: p.bc_type.raw(),
            switches: p
                .switches
                .iter()
                .map(|s| SwPosMessage {
                    c_idx: s.c_idx,
                    reticle_idx: s.reticle_idx,
                    zoom: s.zoom,
                    distance: s.distance,
                    distance_from: s.distance_from.raw(),
                })
                .collect(),
            distances: p.distances.clone(),
            coef_rows: p
                .coef_rows
                .iter()
                .map(|r| CoefRowMessage {
                    bc_cd: r.bc_cd,
                    mv: r.mv,
                })
                .collect(),
            caliber: p.caliber.clone(),
            device_uuid: p.device_uuid.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Profile {
        Profile {
            profile_name: "308 Win".into(),
            short_name_top: "308".into(),
            zero_x: -1500,
            zero_y: 2000,
            sc_height: 90,
            r_twist: 1000,
            c_muzzle_velocity: 8000,
            b_weight: 1780,
            bc_type: GType::G7.into(),
            twist_dir: TwistDir::Left.into(),
            distances: vec![10000, 20000, 30000],
            c_zero_distance_idx: 1,
            switches: vec![SwPos::by_index(255, 0, 1, 2)],
            coef_rows: vec![CoefRow::new(2430, 0)],
            ..Default::default()
        }
    }

    #[test]
    fn test_encode_decode() {
        let profile = sample();
        let bytes = encode(&profile);
        assert_eq!(decode(&bytes).unwrap(), profile);
    }

    #[test]
    fn test_reencode_is_byte_identical() {
        let bytes = encode(&sample());
        let again = encode(&decode(&bytes).unwrap());
        assert_eq!(again, bytes);
    }

    #[test]
    fn test_unknown_enum_values_survive() {
        let mut profile = sample();
        profile.twist_dir = EnumValue::Unknown(7);
        profile.bc_type = EnumValue::Unknown(-1);

        let decoded = decode(&encode(&profile)).unwrap();
        assert_eq!(decoded.twist_dir, EnumValue::Unknown(7));
        assert_eq!(decoded.bc_type, EnumValue::Unknown(-1));
    }

    #[test]
    fn test_unknown_fields_preserved() {
        // Field 40 (varint 5) inside the profile message and field 2
        // (string "x") in the envelope.
        let mut inner = ProfileMessage::from(&sample()).encode_to_vec();
        inner.extend_from_slice(&[0xC0, 0x02, 0x05]);
        let mut bytes = Vec::new();
        prost::encoding::encode_key(1, prost::encoding::WireType::LengthDelimited, &mut bytes);
        prost::encoding::encode_varint(inner.len() as u64, &mut bytes);
        bytes.extend_from_slice(&inner);
        bytes.extend_from_slice(&[0x12, 0x01, b'x']);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.unknown_fields.as_bytes(), &[0xC0, 0x02, 0x05]);
        assert_eq!(decoded.envelope_fields.as_bytes(), &[0x12, 0x01, b'x']);
        assert_eq!(encode(&decoded), bytes);
    }

    #[test]
    fn test_unknown_entry_fields_preserved() {
        let mut profile = sample();
        profile.switches[0].unknown_fields = UnknownFields::from_bytes(vec![0x48, 0x07]);
        profile.coef_rows[0].unknown_fields = UnknownFields::from_bytes(vec![0x1A, 0x01, b'z']);
        let bytes = encode(&profile);

        // field 25, length 11: c_idx 255, zoom 1, distance 2, distance_from INDEX, field 9
        let entry = [
            0xCA, 0x01, 0x0B, 0x08, 0xFF, 0x01, 0x18, 0x01, 0x20, 0x02, 0x28, 0x01, 0x48, 0x07,
        ];
        assert!(bytes.windows(entry.len()).any(|w| w == entry));

        // prost still reads the known fields
        let message = PayloadMessage::decode(bytes.as_slice()).unwrap();
        assert_eq!(message.profile.unwrap().switches[0].distance, 2);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.switches[0].unknown_fields.as_bytes(), &[0x48, 0x07]);
        assert_eq!(decoded.coef_rows[0].unknown_fields.as_bytes(), &[0x1A, 0x01, b'z']);
        assert_eq!(encode(&decoded), bytes);
    }

    #[test]
    fn test_entry_fields_survive_reencode_of_foreign_bytes() {
        // A switch entry written by another tool with field 9 after the known ones
        let mut inner = ProfileMessage {
            profile_name: "x".into(),
            ..Default::default()
        }
        .encode_to_vec();
        inner.extend_from_slice(&[0xCA, 0x01, 0x04, 0x18, 0x02, 0x48, 0x07]);
        let mut bytes = vec![0x0A, inner.len() as u8];
        bytes.extend_from_slice(&inner);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.switches[0].zoom, 2);
        assert_eq!(encode(&decoded), bytes);
    }

    #[test]
    fn test_unknown_group_field_preserved() {
        let mut inner = ProfileMessage::from(&sample()).encode_to_vec();
        // field 40 start group, field 1 varint 5 inside, field 40 end group
        inner.extend_from_slice(&[0xC3, 0x02, 0x08, 0x05, 0xC4, 0x02]);
        let mut bytes = Vec::new();
        prost::encoding::encode_key(1, prost::encoding::WireType::LengthDelimited, &mut bytes);
        prost::encoding::encode_varint(inner.len() as u64, &mut bytes);
        bytes.extend_from_slice(&inner);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.unknown_fields.as_bytes(), &[0xC3, 0x02, 0x08, 0x05, 0xC4, 0x02]);
        assert_eq!(encode(&decoded), bytes);
    }

    #[test]
    fn test_truncated_payload_fails() {
        let bytes = encode(&sample());
        let err = decode(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_empty_payload_decodes_to_default() {
        assert_eq!(decode(&[]).unwrap(), Profile::default());
    }

    #[test]
    fn test_nearest_enum_member() {
        assert_eq!(TwistDir::nearest(5), TwistDir::Left);
        assert_eq!(TwistDir::nearest(-3), TwistDir::Right);
        assert_eq!(GType::nearest(3), GType::Custom);
        assert_eq!(DType::nearest(i32::MIN), DType::Value);
    }

    #[test]
    fn test_scalar_access() {
        let mut profile = sample();
        assert_eq!(profile.scalar(FieldId::BulletWeight), Some(1780));
        assert_eq!(profile.scalar(FieldId::Distance), None);

        *profile.scalar_mut(FieldId::ZeroY).unwrap() = 5;
        assert_eq!(profile.zero_y, 5);
    }

    #[test]
    fn test_zero_distance_lookup() {
        let mut profile = sample();
        assert_eq!(profile.zero_distance(), Some(20000));
        profile.c_zero_distance_idx = 3;
        assert_eq!(profile.zero_distance(), None);
        profile.c_zero_distance_idx = -1;
        assert_eq!(profile.zero_distance(), None);
    }
}
