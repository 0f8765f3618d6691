//! prost message definitions for the `profedit` wire schema.
//!
//! These mirror the device schema field for field. They are the decoding and
//! encoding surface only; the rest of the crate works with the typed
//! [`Profile`](super::Profile).

/// Top-level envelope written to `.a7p` files
#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct PayloadMessage {
    #[prost(message, optional, tag = "1")]
    pub(crate) profile: Option<ProfileMessage>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct ProfileMessage {
    #[prost(string, tag = "1")]
    pub(crate) profile_name: String,
    #[prost(string, tag = "2")]
    pub(crate) cartridge_name: String,
    #[prost(string, tag = "3")]
    pub(crate) bullet_name: String,
    #[prost(string, tag = "4")]
    pub(crate) short_name_top: String,
    #[prost(string, tag = "5")]
    pub(crate) short_name_bot: String,
    #[prost(string, tag = "6")]
    pub(crate) user_note: String,
    #[prost(int32, tag = "7")]
    pub(crate) zero_x: i32,
    #[prost(int32, tag = "8")]
    pub(crate) zero_y: i32,
    #[prost(int32, tag = "9")]
    pub(crate) sc_height: i32,
    #[prost(int32, tag = "10")]
    pub(crate) r_twist: i32,
    #[prost(int32, tag = "11")]
    pub(crate) c_muzzle_velocity: i32,
    #[prost(int32, tag = "12")]
    pub(crate) c_zero_temperature: i32,
    #[prost(int32, tag = "13")]
    pub(crate) c_t_coeff: i32,
    #[prost(int32, tag = "14")]
    pub(crate) c_zero_distance_idx: i32,
    #[prost(int32, tag = "15")]
    pub(crate) c_zero_air_temperature: i32,
    #[prost(int32, tag = "16")]
    pub(crate) c_zero_air_pressure: i32,
    #[prost(int32, tag = "17")]
    pub(crate) c_zero_air_humidity: i32,
    #[prost(int32, tag = "18")]
    pub(crate) c_zero_w_pitch: i32,
    #[prost(int32, tag = "19")]
    pub(crate) c_zero_p_temperature: i32,
    #[prost(int32, tag = "20")]
    pub(crate) b_diameter: i32,
    #[prost(int32, tag = "21")]
    pub(crate) b_weight: i32,
    #[prost(int32, tag = "22")]
    pub(crate) b_length: i32,
    #[prost(enumeration = "TwistDir", tag = "23")]
    pub(crate) twist_dir: i32,
    #[prost(enumeration = "GType", tag = "24")]
    pub(crate) bc_type: i32,
    #[prost(message, repeated, tag = "25")]
    pub(crate) switches: Vec<SwPosMessage>,
    #[prost(int32, repeated, packed = "true", tag = "26")]
    pub(crate) distances: Vec<i32>,
    #[prost(message, repeated, tag = "27")]
    pub(crate) coef_rows: Vec<CoefRowMessage>,
    #[prost(string, tag = "28")]
    pub(crate) caliber: String,
    #[prost(string, tag = "29")]
    pub(crate) device_uuid: String,
}

/// Highest field number of `ProfileMessage`
pub(crate) const PROFILE_LAST_FIELD: u32 = 29;

/// Field number of the profile inside the envelope
pub(crate) const PAYLOAD_PROFILE_FIELD: u32 = 1;

/// Field number of `ProfileMessage::switches`
pub(crate) const PROFILE_SWITCHES_FIELD: u32 = 25;

/// Field number of `ProfileMessage::coef_rows`
pub(crate) const PROFILE_COEF_ROWS_FIELD: u32 = 27;

/// Highest field number of `SwPosMessage`
pub(crate) const SWPOS_LAST_FIELD: u32 = 5;

/// Highest field number of `CoefRowMessage`
pub(crate) const COEF_ROW_LAST_FIELD: u32 = 2;

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct SwPosMessage {
    #[prost(int32, tag = "1")]
    pub(crate) c_idx: i32,
    #[prost(int32, tag = "2")]
    pub(crate) reticle_idx: i32,
    #[prost(int32, tag = "3")]
    pub(crate) zoom: i32,
    #[prost(int32, tag = "4")]
    pub(crate) distance: i32,
    #[prost(enumeration = "DType", tag = "5")]
    pub(crate) distance_from: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct CoefRowMessage {
    #[prost(int32, tag = "1")]
    pub(crate) bc_cd: i32,
    #[prost(int32, tag = "2")]
    pub(crate) mv: i32,
}

/// How a sight switch interprets its `distance`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum DType {
    /// `distance` is a literal distance in metres ×100
    Value = 0,
    /// `distance` is an index into the distance table
    Index = 1,
}

/// Drag model of the coefficient table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum GType {
    /// G1 standard projectile, BC against velocity
    G1 = 0,
    /// G7 standard projectile, BC against velocity
    G7 = 1,
    /// Custom drag curve, Cd against Mach
    Custom = 2,
}

/// Rifling direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum TwistDir {
    /// Right-hand twist
    Right = 0,
    /// Left-hand twist
    Left = 1,
}
