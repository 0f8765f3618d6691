//! Distance table maintenance.
//!
//! The distance table is the list of ranges the device computes holdovers
//! for. The zero index and every `INDEX` switch point into it, so any change
//! to the table has to carry those references along.

use crate::error::{Error, Result};
use crate::schema::{DType, EnumValue, Profile};
use crate::units::{self, FieldId};
use crate::validate::{summarize, Correction};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Predefined distance tables, in metres
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistancePreset {
    /// 25 to 400 m
    Subsonic,
    /// 100 to 700 m
    Low,
    /// 100 to 1000 m
    Medium,
    /// 100 to 1700 m
    Long,
    /// 100 to 2065 m
    Ultra,
}

impl DistancePreset {
    /// Every preset, shortest range first
    pub const ALL: [DistancePreset; 5] = [
        DistancePreset::Subsonic,
        DistancePreset::Low,
        DistancePreset::Medium,
        DistancePreset::Long,
        DistancePreset::Ultra,
    ];

    /// Table entries in whole metres
    pub fn meters(self) -> &'static [i32] {
        match self {
            DistancePreset::Subsonic => SUBSONIC,
            DistancePreset::Low => LOW,
            DistancePreset::Medium => MEDIUM,
            DistancePreset::Long => LONG,
            DistancePreset::Ultra => ULTRA,
        }
    }

    /// Table entries in raw units
    pub fn raw(self) -> Vec<i32> {
        self.meters()
            .iter()
            .map(|&m| units::to_raw(FieldId::Distance, f64::from(m)))
            .collect()
    }

    /// Lower-case name, as accepted by [`FromStr`]
    pub fn name(self) -> &'static str {
        match self {
            DistancePreset::Subsonic => "subsonic",
            DistancePreset::Low => "low",
            DistancePreset::Medium => "medium",
            DistancePreset::Long => "long",
            DistancePreset::Ultra => "ultra",
        }
    }
}

impl fmt::Display for DistancePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistancePreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::internal(format!("unknown distance preset '{}'", s)))
    }
}

const SUBSONIC: &[i32] = &[
    25, 50, 75, 100, 110, 120, 130, 140, 150, 155, 160, 165, 170, 175, 180, 185, 190, 195,
    200, 205, 210, 215, 220, 225, 230, 235, 240, 245, 250, 255, 260, 265, 270, 275, 280,
    285, 290, 295, 300, 305, 310, 315, 320, 325, 330, 335, 340, 345, 350, 355, 360, 365,
    370, 375, 380, 385, 390, 395, 400,
];

const LOW: &[i32] = &[
    100, 150, 200, 225, 250, 275, 300, 320, 340, 360, 380, 400, 410, 420, 430, 440, 450,
    460, 470, 480, 490, 500, 505, 510, 515, 520, 525, 530, 535, 540, 545, 550, 555, 560,
    565, 570, 575, 580, 585, 590, 595, 600, 605, 610, 615, 620, 625, 630, 635, 640, 645,
    650, 655, 660, 665, 670, 675, 680, 685, 690, 695, 700,
];

const MEDIUM: &[i32] = &[
    100, 200, 250, 300, 325, 350, 375, 400, 420, 440, 460, 480, 500, 520, 540, 560, 580,
    600, 610, 620, 630, 640, 650, 660, 670, 680, 690, 700, 710, 720, 730, 740, 750, 760,
    770, 780, 790, 800, 805, 810, 815, 820, 825, 830, 835, 840, 845, 850, 855, 860, 865,
    870, 875, 880, 885, 890, 895, 900, 905, 910, 915, 920, 925, 930, 935, 940, 945, 950,
    955, 960, 965, 970, 975, 980, 985, 990, 995, 1000,
];

const LONG: &[i32] = &[
    100, 200, 250, 300, 350, 400, 420, 440, 460, 480, 500, 520, 540, 560, 580, 600, 610,
    620, 630, 640, 650, 660, 670, 680, 690, 700, 710, 720, 730, 740, 750, 760, 770, 780,
    790, 800, 810, 820, 830, 840, 850, 860, 870, 880, 890, 900, 910, 920, 930, 940, 950,
    960, 970, 980, 990, 1000, 1005, 1010, 1015, 1020, 1025, 1030, 1035, 1040, 1045, 1050,
    1055, 1060, 1065, 1070, 1075, 1080, 1085, 1090, 1095, 1100, 1105, 1110, 1115, 1120,
    1125, 1130, 1135, 1140, 1145, 1150, 1155, 1160, 1165, 1170, 1175, 1180, 1185, 1190,
    1195, 1200, 1205, 1210, 1215, 1220, 1225, 1230, 1235, 1240, 1245, 1250, 1255, 1260,
    1265, 1270, 1275, 1280, 1285, 1290, 1295, 1300, 1305, 1310, 1315, 1320, 1325, 1330,
    1335, 1340, 1345, 1350, 1355, 1360, 1365, 1370, 1375, 1380, 1385, 1390, 1395, 1400,
    1405, 1410, 1415, 1420, 1425, 1430, 1435, 1440, 1445, 1450, 1455, 1460, 1465, 1470,
    1475, 1480, 1485, 1490, 1495, 1500, 1505, 1510, 1515, 1520, 1525, 1530, 1535, 1540,
    1545, 1550, 1555, 1560, 1565, 1570, 1575, 1580, 1585, 1590, 1595, 1600, 1605, 1610,
    1615, 1620, 1625, 1630, 1635, 1640, 1645, 1650, 1655, 1660, 1665, 1670, 1675, 1680,
    1685, 1690, 1695, 1700,
];

const ULTRA: &[i32] = &[
    100, 200, 250, 300, 350, 400, 450, 500, 520, 540, 560, 580, 600, 620, 640, 660, 680,
    700, 720, 740, 760, 780, 800, 820, 840, 860, 880, 900, 920, 940, 960, 980, 1000, 1010,
    1020, 1030, 1040, 1050, 1060, 1070, 1080, 1090, 1100, 1110, 1120, 1130, 1140, 1150,
    1160, 1170, 1180, 1190, 1200, 1210, 1220, 1230, 1240, 1250, 1260, 1270, 1280, 1290,
    1300, 1310, 1320, 1330, 1340, 1350, 1360, 1370, 1380, 1390, 1400, 1410, 1420, 1430,
    1440, 1450, 1460, 1470, 1480, 1490, 1500, 1505, 1510, 1515, 1520, 1525, 1530, 1535,
    1540, 1545, 1550, 1555, 1560, 1565, 1570, 1575, 1580, 1585, 1590, 1595, 1600, 1605,
    1610, 1615, 1620, 1625, 1630, 1635, 1640, 1645, 1650, 1655, 1660, 1665, 1670, 1675,
    1680, 1685, 1690, 1695, 1700, 1705, 1710, 1715, 1720, 1725, 1730, 1735, 1740, 1745,
    1750, 1755, 1760, 1765, 1770, 1775, 1780, 1785, 1790, 1795, 1800, 1805, 1810, 1815,
    1820, 1825, 1830, 1835, 1840, 1845, 1850, 1855, 1860, 1865, 1870, 1875, 1880, 1885,
    1890, 1895, 1900, 1905, 1910, 1915, 1920, 1925, 1930, 1935, 1940, 1945, 1950, 1955,
    1960, 1965, 1970, 1975, 1980, 1985, 1990, 1995, 2000, 2005, 2010, 2015, 2020, 2025,
    2030, 2035, 2040, 2045, 2050, 2055, 2060, 2065,
];

/// Physical targets of the references into the distance table
struct References {
    zero: Option<i32>,
    switches: Vec<Option<i32>>,
}

/// A reference moved by [`References::restore`]
struct Moved {
    path: String,
    before: String,
    after: String,
}

impl References {
    fn capture(profile: &Profile) -> Self {
        let switches = profile
            .switches
            .iter()
            .map(|sw| match sw.distance_from {
                EnumValue::Known(DType::Index) => usize::try_from(sw.distance)
                    .ok()
                    .and_then(|idx| profile.distances.get(idx).copied()),
                EnumValue::Known(DType::Value) | EnumValue::Unknown(_) => None,
            })
            .collect();
        Self {
            zero: profile.zero_distance(),
            switches,
        }
    }

    /// Points the references back at the same physical distances.
    ///
    /// A switch whose distance is no longer in the table becomes a `VALUE`
    /// switch holding that distance. A zero distance that is no longer in
    /// the table leaves the zero index as it was.
    fn restore(self, profile: &mut Profile) -> Vec<Moved> {
        let mut moved = Vec::new();

        if let Some(zero) = self.zero {
            if let Ok(idx) = profile.distances.binary_search(&zero) {
                let idx = idx as i32;
                if idx != profile.c_zero_distance_idx {
                    moved.push(Moved {
                        path: "c_zero_distance_idx".to_string(),
                        before: profile.c_zero_distance_idx.to_string(),
                        after: idx.to_string(),
                    });
                    profile.c_zero_distance_idx = idx;
                }
            }
        }

        for (i, (sw, target)) in profile.switches.iter_mut().zip(self.switches).enumerate() {
            let Some(target) = target else {
                continue;
            };
            match profile.distances.binary_search(&target) {
                Ok(idx) if idx as i32 == sw.distance => {}
                Ok(idx) => {
                    moved.push(Moved {
                        path: format!("switches[{}].distance", i),
                        before: sw.distance.to_string(),
                        after: idx.to_string(),
                    });
                    sw.distance = idx as i32;
                }
                Err(_) => {
                    moved.push(Moved {
                        path: format!("switches[{}]", i),
                        before: format!("INDEX {}", sw.distance),
                        after: format!("VALUE {}", target),
                    });
                    sw.distance = target;
                    sw.distance_from = DType::Value.into();
                }
            }
        }
        moved
    }
}

fn record(rule: &'static str, moved: Vec<Moved>, out: &mut Vec<Correction>) {
    out.extend(
        moved
            .into_iter()
            .map(|m| Correction::new(m.path, rule, m.before, m.after)),
    );
}

/// Sorts and de-duplicates the distance table, keeping every reference on
/// the distance it pointed at.
///
/// Records one correction for the table and one for every reference that
/// moved, all under `rule`. Returns true if the table changed.
pub fn normalize(profile: &mut Profile, rule: &'static str, out: &mut Vec<Correction>) -> bool {
    if profile.distances.windows(2).all(|w| w[0] < w[1]) {
        return false;
    }

    let before = summarize(&profile.distances);
    let refs = References::capture(profile);
    profile.distances.sort_unstable();
    profile.distances.dedup();
    out.push(Correction::new("distances", rule, before, summarize(&profile.distances)));
    record(rule, refs.restore(profile), out);

    debug!("Distance table normalized to {} entries", profile.distances.len());
    true
}

/// Cuts the distance table down to `max` entries.
///
/// The table is normalized first so the shortest distances survive. `INDEX`
/// switches that lose their target become `VALUE` switches; a lost zero
/// distance leaves a dangling zero index. Returns true if anything changed.
pub fn truncate(
    profile: &mut Profile,
    max: usize,
    rule: &'static str,
    out: &mut Vec<Correction>,
) -> bool {
    let mut changed = normalize(profile, rule, out);
    if profile.distances.len() > max {
        let before = summarize(&profile.distances);
        let refs = References::capture(profile);
        profile.distances.truncate(max);
        out.push(Correction::new("distances", rule, before, summarize(&profile.distances)));
        record(rule, refs.restore(profile), out);
        changed = true;
    }
    changed
}

/// Replaces the distance table and/or moves the zero distance.
///
/// The new table is `preset` if given, otherwise the current table. The zero
/// distance (`zero_distance` metres if given, otherwise the current one) is
/// merged in, then the table is sorted and de-duplicated. The zero index and
/// `INDEX` switches are re-pointed at the distances they referenced.
pub fn update_distances(
    profile: &mut Profile,
    preset: Option<DistancePreset>,
    zero_distance: Option<f64>,
) -> Result<()> {
    let zero = match zero_distance {
        Some(meters) => units::to_raw(FieldId::Distance, meters),
        None => profile.zero_distance().ok_or_else(|| {
            Error::zero_distance(format!(
                "zero index {} does not point into a table of {} distances",
                profile.c_zero_distance_idx,
                profile.distances.len()
            ))
        })?,
    };

    let mut refs = References::capture(profile);
    refs.zero = Some(zero);

    if let Some(preset) = preset {
        profile.distances = preset.raw();
    }
    profile.distances.push(zero);
    profile.distances.sort_unstable();
    profile.distances.dedup();
    let moved = refs.restore(profile);

    debug!(
        "Distances updated: {} entries, {} references moved, zero at {}",
        profile.distances.len(),
        moved.len(),
        units::format_physical(FieldId::Distance, zero)
    );
    Ok(())
}
