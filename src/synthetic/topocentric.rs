//! # Topocentric geometry
//!
//! Converts an Earth-centered inertial satellite position into the angles a ground
//! sensor would measure.
//!
//! ## Sensor position
//!
//! The site's geodetic latitude and height are turned into normalized parallax
//! coordinates `(ρ·cosφ, ρ·sinφ)` on the reference ellipsoid, giving the Earth-fixed
//! position
//!
//! ```text
//! r_ef = a · (ρcosφ·cosλ, ρcosφ·sinλ, ρsinφ)
//! ```
//!
//! which is rotated about the z-axis by the Greenwich Mean Sidereal Time to obtain the
//! inertial position. UTC stands in for UT1 and polar motion, precession and nutation
//! are ignored: the resulting sub-arcminute errors do not matter for visibility gating.
//!
//! ## Local frame
//!
//! With `θ = GMST + λ` the local sidereal angle and `φ` the geodetic latitude, the local
//! east/north/up basis in the inertial frame is
//!
//! ```text
//! up    = ( cosφ·cosθ,  cosφ·sinθ, sinφ)
//! east  = (-sinθ,       cosθ,      0   )
//! north = (-sinφ·cosθ, -sinφ·sinθ, cosφ)
//! ```

use hifitime::Epoch;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::constants::{
    Degree, Kilometer, Meter, Radian, DPI, EARTH_MAJOR_AXIS, EARTH_MINOR_AXIS,
};
use crate::time::gmst;

/// Ground sensor location on the reference ellipsoid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSite {
    pub name: String,
    /// Geodetic latitude, degrees
    pub latitude: Degree,
    /// East-positive longitude, degrees
    pub longitude: Degree,
    /// Height above the ellipsoid, meters
    pub altitude: Meter,
}

impl SensorSite {
    pub fn new(name: impl Into<String>, latitude: Degree, longitude: Degree, altitude: Meter) -> Self {
        SensorSite {
            name: name.into(),
            latitude,
            longitude,
            altitude,
        }
    }

    /// Normalized parallax coordinates `(ρ·cosφ, ρ·sinφ)` of the site.
    pub fn parallax(&self) -> (f64, f64) {
        lat_alt_to_parallax(self.latitude.to_radians(), self.altitude)
    }

    /// Earth-fixed position of the site in km.
    pub fn body_fixed_position(&self) -> Vector3<f64> {
        let (rho_cos_phi, rho_sin_phi) = self.parallax();
        let lon = self.longitude.to_radians();
        let a_km = EARTH_MAJOR_AXIS / 1000.0;

        Vector3::new(
            a_km * rho_cos_phi * lon.cos(),
            a_km * rho_cos_phi * lon.sin(),
            a_km * rho_sin_phi,
        )
    }

    /// Inertial position of the site in km at `epoch`.
    pub fn inertial_position(&self, epoch: &Epoch) -> Vector3<f64> {
        let theta = gmst(epoch.to_mjd_utc_days());
        let fixed = self.body_fixed_position();
        let (sin_t, cos_t) = theta.sin_cos();

        Vector3::new(
            cos_t * fixed.x - sin_t * fixed.y,
            sin_t * fixed.x + cos_t * fixed.y,
            fixed.z,
        )
    }
}

/// Angles and distance of a satellite as seen from a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TopocentricCoordinates {
    /// Topocentric right ascension, degrees in [0, 360)
    pub ra: Degree,
    /// Topocentric declination, degrees in [-90, 90]
    pub dec: Degree,
    pub elevation: Degree,
    /// Azimuth from north through east, degrees in [0, 360)
    pub azimuth: Degree,
    pub range: Kilometer,
}

/// Compute the normalized parallax coordinates of a geodetic position.
///
/// Arguments
/// ---------
/// * `lat`: geodetic latitude in radians
/// * `height`: height above the ellipsoid in meters
///
/// Return
/// ------
/// * `(ρ·cosφ, ρ·sinφ)` in units of the equatorial radius
pub fn lat_alt_to_parallax(lat: Radian, height: Meter) -> (f64, f64) {
    let axis_ratio = EARTH_MINOR_AXIS / EARTH_MAJOR_AXIS;

    // parametric latitude
    let u = (lat.sin() * axis_ratio).atan2(lat.cos());

    let rho_sin_phi = axis_ratio * u.sin() + (height / EARTH_MAJOR_AXIS) * lat.sin();
    let rho_cos_phi = u.cos() + (height / EARTH_MAJOR_AXIS) * lat.cos();

    (rho_cos_phi, rho_sin_phi)
}

/// Convert a Cartesian vector into right ascension, declination and norm.
///
/// Return
/// ------
/// * `(α, δ, ρ)` with `α ∈ [0, 2π)` and `δ ∈ [-π/2, π/2]` in radians; a null vector
///   gives `(0, 0, 0)`
/// Wrap an angle into `[0, full_turn)`.
///
/// `rem_euclid` rounds up to exactly `full_turn` for tiny negative inputs; that case maps to 0.
pub fn wrap_angle(angle: f64, full_turn: f64) -> f64 {
    let wrapped = angle.rem_euclid(full_turn);
    if wrapped >= full_turn {
        0.0
    } else {
        wrapped
    }
}

pub fn cartesian_to_radec(position: &Vector3<f64>) -> (Radian, Radian, f64) {
    let norm = position.norm();
    if norm == 0.0 {
        return (0.0, 0.0, 0.0);
    }

    let delta = (position.z / norm).clamp(-1.0, 1.0).asin();
    let alpha = wrap_angle(position.y.atan2(position.x), DPI);

    (alpha, delta, norm)
}

/// Observe an inertial satellite position from a sensor site.
///
/// Arguments
/// ---------
/// * `site`: the observing sensor
/// * `satellite`: satellite position in km, Earth-centered inertial frame
/// * `epoch`: instant of the observation
pub fn observe(
    site: &SensorSite,
    satellite: &Vector3<f64>,
    epoch: &Epoch,
) -> TopocentricCoordinates {
    let line_of_sight = satellite - site.inertial_position(epoch);
    let (alpha, delta, range) = cartesian_to_radec(&line_of_sight);

    let phi = site.latitude.to_radians();
    let theta = gmst(epoch.to_mjd_utc_days()) + site.longitude.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_t, cos_t) = theta.sin_cos();

    let up = Vector3::new(cos_phi * cos_t, cos_phi * sin_t, sin_phi);
    let east = Vector3::new(-sin_t, cos_t, 0.0);
    let north = Vector3::new(-sin_phi * cos_t, -sin_phi * sin_t, cos_phi);

    let (elevation, azimuth) = if range > 0.0 {
        let elevation = (line_of_sight.dot(&up) / range).clamp(-1.0, 1.0).asin();
        let azimuth = line_of_sight
            .dot(&east)
            .atan2(line_of_sight.dot(&north))
            .rem_euclid(DPI);
        (elevation, azimuth)
    } else {
        (0.0, 0.0)
    };

    TopocentricCoordinates {
        ra: alpha.to_degrees(),
        dec: delta.to_degrees(),
        elevation: elevation.to_degrees(),
        azimuth: azimuth.to_degrees() % 360.0,
        range,
    }
}
