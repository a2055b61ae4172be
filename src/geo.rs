//! Coordinate handling: floating-point WGS84 on the client edge, fixed-point
//! integer grid everywhere the cryptography can see.
//!
//! All floating-point math happens before encryption (and after decryption);
//! the scheme itself only ever sees `i64` grid coordinates.

use serde::{Deserialize, Serialize};

use crate::error::{EplqError, Result};

/// Grid units per degree: six decimal digits of latitude/longitude precision
/// (~0.11 m at the equator). System-wide constant; changing it invalidates
/// every ciphertext and every serialized index.
pub const GRID_SCALE: f64 = 1_000_000.0;

/// Meters per degree of latitude (WGS84 mean).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Offsets shifting signed grid coordinates into the non-negative range the
/// sealed-payload decoder searches over.
pub const X_OFFSET: i64 = 180_000_000;
pub const Y_OFFSET: i64 = 90_000_000;

/// Width of the shifted coordinate domains, used as discrete-log bounds.
pub const X_DOMAIN: u64 = 2 * X_OFFSET as u64 + 1;
pub const Y_DOMAIN: u64 = 2 * Y_OFFSET as u64 + 1;

/// A plaintext WGS84 location.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// An integer grid coordinate: `x` is scaled longitude (with the
/// equirectangular correction applied), `y` is scaled latitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridPoint {
    pub x: i64,
    pub y: i64,
}

impl GridPoint {
    /// Squared Euclidean distance in grid units. `i128` so the worst-case
    /// domain corners cannot overflow.
    pub fn dist_sq(&self, other: &GridPoint) -> i128 {
        let dx = (self.x - other.x) as i128;
        let dy = (self.y - other.y) as i128;
        dx * dx + dy * dy
    }
}

/// Deployment-wide projection and query-radius configuration.
///
/// The reference latitude anchors the equirectangular correction applied to
/// longitudes so that Euclidean grid distance approximates metric distance.
/// All clients and the index owner must share one `GridConfig`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GridConfig {
    /// Reference latitude for the longitude correction, in degrees.
    pub ref_lat_deg: f64,
    /// Largest admissible query radius in meters. Bounding-region slack is
    /// sized against this, so queries beyond it would break conservative
    /// pruning and are rejected at token generation.
    pub max_radius_m: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            ref_lat_deg: 0.0,
            max_radius_m: 2_000.0,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.ref_lat_deg.is_finite() || self.ref_lat_deg.abs() > 85.0 {
            return Err(EplqError::Setup("reference latitude out of range"));
        }
        if !self.max_radius_m.is_finite() || self.max_radius_m <= 0.0 {
            return Err(EplqError::Setup("maximum query radius must be positive"));
        }
        // Evaluation costs O(sqrt(r^2)) group operations; past ~100 km the
        // scheme stops being usable and the slack arithmetic loses headroom.
        if self.max_radius_m > 100_000.0 {
            return Err(EplqError::Setup("maximum query radius too large"));
        }
        Ok(())
    }

    fn lng_correction(&self) -> f64 {
        self.ref_lat_deg.to_radians().cos()
    }

    /// Convert a WGS84 location to the fixed-point grid.
    pub fn encode(&self, p: GeoPoint) -> Result<GridPoint> {
        if !p.lat.is_finite() || p.lat.abs() > 90.0 {
            return Err(EplqError::Encoding("latitude out of range"));
        }
        if !p.lng.is_finite() || p.lng.abs() > 180.0 {
            return Err(EplqError::Encoding("longitude out of range"));
        }
        let x = (p.lng * self.lng_correction() * GRID_SCALE).round() as i64;
        let y = (p.lat * GRID_SCALE).round() as i64;
        Ok(GridPoint { x, y })
    }

    /// Inverse of [`encode`](Self::encode), up to grid precision.
    pub fn decode(&self, g: GridPoint) -> GeoPoint {
        GeoPoint {
            lat: g.y as f64 / GRID_SCALE,
            lng: g.x as f64 / (self.lng_correction() * GRID_SCALE),
        }
    }

    /// Convert a query radius in meters to grid units, rounding up so the
    /// encrypted predicate is never tighter than the requested circle.
    pub fn radius_to_units(&self, meters: f64) -> Result<u64> {
        if !meters.is_finite() || meters < 0.0 {
            return Err(EplqError::Encoding("radius must be non-negative"));
        }
        if meters > self.max_radius_m {
            return Err(EplqError::Encoding("radius exceeds configured maximum"));
        }
        Ok((meters * GRID_SCALE / METERS_PER_DEGREE).ceil() as u64)
    }

    /// Largest admissible radius in grid units; bounding-region slack is
    /// computed against this at index build time.
    pub fn max_radius_units(&self) -> u64 {
        (self.max_radius_m * GRID_SCALE / METERS_PER_DEGREE).ceil() as u64
    }
}

/// Great-circle distance in meters. Client-side display ordering only; the
/// encrypted predicate works on the planar grid.
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let r = 6_371_000.0;
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lng - a.lng).to_radians();

    let h = (dphi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * r * h.sqrt().atan2((1.0 - h).sqrt())
}
