//! Cylindrical Earth-shadow illumination test.
//!
//! The Sun direction comes from the low-precision solar coordinates of the
//! Astronomical Almanac (≈ 0.01° over 1950–2050), and the Earth's shadow is modeled as
//! an infinite cylinder of radius [`EARTH_RADIUS_KM`] pointing away from the Sun.
//! Penumbra is not modeled.

use hifitime::Epoch;
use nalgebra::Vector3;

use super::SunlitCheck;
use crate::constants::{AU, EARTH_RADIUS_KM, T2000};

/// Geocentric Sun position in km, mean equator and equinox of date.
pub fn sun_position(epoch: &Epoch) -> Vector3<f64> {
    let n = epoch.to_mjd_utc_days() - T2000;

    let mean_longitude = (280.460 + 0.985_647_4 * n).to_radians();
    let mean_anomaly = (357.528 + 0.985_600_3 * n).to_radians();

    let ecliptic_longitude = mean_longitude
        + 1.915_f64.to_radians() * mean_anomaly.sin()
        + 0.020_f64.to_radians() * (2.0 * mean_anomaly).sin();
    let obliquity = (23.439 - 0.000_000_4 * n).to_radians();
    let distance =
        AU * (1.000_14 - 0.016_71 * mean_anomaly.cos() - 0.000_14 * (2.0 * mean_anomaly).cos());

    let (sin_l, cos_l) = ecliptic_longitude.sin_cos();
    Vector3::new(
        distance * cos_l,
        distance * obliquity.cos() * sin_l,
        distance * obliquity.sin() * sin_l,
    )
}

/// Sunlit unless inside the cylindrical shadow behind the Earth.
#[derive(Debug, Clone, Copy, Default)]
pub struct CylindricalEarthShadow;

impl SunlitCheck for CylindricalEarthShadow {
    fn is_sunlit(&self, position: &Vector3<f64>, epoch: Epoch) -> bool {
        let sun_dir = sun_position(&epoch).normalize();
        let along = position.dot(&sun_dir);
        if along >= 0.0 {
            return true;
        }
        (position - sun_dir * along).norm() > EARTH_RADIUS_KM
    }
}
