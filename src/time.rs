use std::cmp::Ordering;
use std::str::FromStr;

use hifitime::{Duration, Epoch, Unit};

use crate::constants::{Hours, DPI, SECONDS_PER_HOUR, T2000};
use crate::trackfill_errors::PipelineError;

/// Canonical UTC representation of an instant, used as an exact deduplication key.
///
/// Two epochs expressed in different time scales but denoting the same UTC instant
/// map to the same key.
pub type EpochKey = (i32, u8, u8, u8, u8, u8, u32);

/// Build the canonical UTC key of an epoch.
pub fn epoch_key(epoch: &Epoch) -> EpochKey {
    epoch.to_gregorian_utc()
}

/// Parse an ISO-8601 UTC date string into an [`Epoch`].
///
/// A trailing `Z` designator is accepted and stripped before parsing.
///
/// Argument
/// --------
/// * `date`: a date in the format `YYYY-MM-DDTHH:MM:SS[.fff][Z]`
///
/// Return
/// ------
/// * the parsed epoch, or [`PipelineError::InvalidEpoch`]
pub fn parse_epoch(date: &str) -> Result<Epoch, PipelineError> {
    let trimmed = date.trim();
    let trimmed = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    Epoch::from_str(trimmed).map_err(|_| PipelineError::InvalidEpoch(date.to_string()))
}

/// Format an epoch as an ISO-8601 UTC string with microsecond resolution.
pub fn to_iso8601(epoch: &Epoch) -> String {
    let (year, month, day, hour, minute, second, nanos) = epoch.to_gregorian_utc();
    format!(
        "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{:06}Z",
        nanos / 1_000
    )
}

/// Signed number of hours elapsed from `from` to `to`.
pub fn hours_between(from: &Epoch, to: &Epoch) -> Hours {
    (*to - *from).to_seconds() / SECONDS_PER_HOUR
}

/// Convert a number of hours into a [`Duration`].
pub fn hours(h: Hours) -> Duration {
    Unit::Hour * h
}

/// Total order on epochs used for every time sort in the crate.
pub fn by_time(a: &Epoch, b: &Epoch) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// Compute the Greenwich Mean Sidereal Time (GMST) in radians
/// for a given Modified Julian Date.
///
/// This function implements the IAU 1982 polynomial formula
/// for the mean sidereal time at 0h UT1, plus the fractional-day
/// correction term due to Earth's rotation rate.
///
/// # Arguments
/// * `tjm` - Modified Julian Date. UTC is used in place of UT1; the sub-second
///   difference is negligible for visibility gating.
///
/// # Returns
/// * GMST angle in radians, normalized to the interval [0, 2π).
pub fn gmst(tjm: f64) -> f64 {
    // Polynomial coefficients for GMST at 0h UT1 (in seconds)
    const C0: f64 = 24110.54841;
    const C1: f64 = 8640184.812866;
    const C2: f64 = 9.3104e-2;
    const C3: f64 = -6.2e-6;

    // Ratio of sidereal day to solar day
    const RAP: f64 = 1.00273790934;

    let itjm = tjm.floor();
    let t = (itjm - T2000) / 36525.0;

    let mut gmst0 = ((C3 * t + C2) * t + C1) * t + C0;
    gmst0 *= DPI / 86400.0;

    let h = (tjm - itjm) * DPI;
    (gmst0 + h * RAP).rem_euclid(DPI)
}

/// Serde adapter writing epochs as ISO-8601 UTC strings.
pub mod iso8601 {
    use hifitime::Epoch;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(epoch: &Epoch, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::to_iso8601(epoch))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Epoch, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_epoch(&raw).map_err(serde::de::Error::custom)
    }
}
