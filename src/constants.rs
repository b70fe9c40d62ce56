//! # Constants and type definitions for trackfill
//!
//! This module centralizes the **physical constants**, **conversion factors**, and **common type
//! aliases** used throughout the pipeline.
//!
//! ## Overview
//!
//! - Geophysical constants (Earth gravitational parameter, ellipsoid axes)
//! - Unit conversions (degrees ↔ radians, arcseconds, days ↔ seconds)
//! - Regime boundaries on the semi-major axis
//! - Core type aliases used across the crate

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Number of seconds in an hour
pub const SECONDS_PER_HOUR: f64 = 3_600.0;

/// Earth gravitational parameter μ in km³/s²
pub const MU_EARTH: f64 = 398_600.441_8;

/// MJD epoch of J2000.0 (2000-01-01 12:00:00 TT)
pub const T2000: f64 = 51544.5;

/// Arcseconds → degrees
pub const ARCSEC_TO_DEG: f64 = 1.0 / 3_600.0;

/// Earth equatorial radius in meters (GRS1980/WGS84)
pub const EARTH_MAJOR_AXIS: f64 = 6_378_137.0;

/// Earth polar radius in meters (GRS1980/WGS84)
pub const EARTH_MINOR_AXIS: f64 = 6_356_752.3;

/// Mean Earth equatorial radius in kilometers, used for shadow and plausibility checks
pub const EARTH_RADIUS_KM: f64 = 6_378.0;

/// Astronomical Unit in kilometers (IAU 2012)
pub const AU: f64 = 149_597_870.7;

// -------------------------------------------------------------------------------------------------
// Regime boundaries (semi-major axis, km)
// -------------------------------------------------------------------------------------------------

/// Upper bound (exclusive) of the LEO regime
pub const LEO_MAX_SMA_KM: f64 = 8_378.0;

/// Upper bound (exclusive) of the MEO regime
pub const MEO_MAX_SMA_KM: f64 = 20_000.0;

/// Lower bound (inclusive) of the GEO regime
pub const GEO_MIN_SMA_KM: f64 = 42_164.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in kilometers
pub type Kilometer = f64;
/// Distance in meters
pub type Meter = f64;
/// Duration expressed in hours
pub type Hours = f64;

/// Catalog number of a satellite (NORAD id)
pub type SatelliteId = u32;

/// Track identifier, unique per satellite
pub type TrackId = u32;
