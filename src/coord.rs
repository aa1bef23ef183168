//! Sky coordinates: parsing of the accepted coordinate notations and the
//! small amount of spherical geometry the pipeline needs.
//!
//! Accepted coordinate descriptors:
//! - sexagesimal `07:45:00.47,34:17:31.1` (RA in hours, Dec in degrees;
//!   whitespace may replace the colons),
//! - compact names `J081240.7+320809` (leading `J` optional),
//! - decimal degrees `122.223,-23.2322`.

use nalgebra::Vector3;

use crate::error::{HostPathError, Result};

/// Arcseconds per radian.
pub const ARCSEC_PER_RAD: f64 = 180.0 * 3600.0 / std::f64::consts::PI;

/// An ICRS position in degrees. RA is kept in `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyCoord {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

impl SkyCoord {
    /// Build a coordinate, wrapping RA into `[0, 360)`.
    ///
    /// Fails if either value is non-finite or `|dec| > 90`.
    pub fn new(ra_deg: f64, dec_deg: f64) -> Result<Self> {
        if !ra_deg.is_finite() || !dec_deg.is_finite() {
            return Err(HostPathError::malformed(
                "coord",
                format!("{ra_deg},{dec_deg}"),
                "coordinates must be finite",
            ));
        }
        if dec_deg.abs() > 90.0 {
            return Err(HostPathError::malformed(
                "coord",
                format!("{ra_deg},{dec_deg}"),
                "declination outside [-90, 90]",
            ));
        }
        Ok(Self {
            ra_deg: wrap_degrees(ra_deg),
            dec_deg,
        })
    }

    /// Unit vector pointing at this position on the celestial sphere.
    pub fn uvec(&self) -> Vector3<f64> {
        let (sin_ra, cos_ra) = self.ra_deg.to_radians().sin_cos();
        let (sin_dec, cos_dec) = self.dec_deg.to_radians().sin_cos();
        Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec)
    }

    /// Great-circle separation to `other`, in arcseconds.
    pub fn separation_arcsec(&self, other: &SkyCoord) -> f64 {
        let a = self.uvec();
        let b = other.uvec();
        // atan2 form stays accurate at arcsecond separations where acos does not.
        let cross = a.cross(&b).norm();
        let dot = a.dot(&b);
        cross.atan2(dot) * ARCSEC_PER_RAD
    }

    /// Gnomonic (TAN) projection of `point` onto the tangent plane at `self`.
    ///
    /// Returns `(x, y)` in arcseconds with `x` increasing to the east
    /// (increasing RA) and `y` to the north. Returns `None` for points on
    /// the opposite hemisphere.
    pub fn tangent_offset_arcsec(&self, point: &SkyCoord) -> Option<(f64, f64)> {
        let r = self.uvec();
        let s = point.uvec();
        let sdotr = s.dot(&r);
        if sdotr <= 0.0 {
            return None;
        }

        let (sin_ra, cos_ra) = self.ra_deg.to_radians().sin_cos();
        let (sin_dec, cos_dec) = self.dec_deg.to_radians().sin_cos();
        let east = Vector3::new(-sin_ra, cos_ra, 0.0);
        let north = Vector3::new(-sin_dec * cos_ra, -sin_dec * sin_ra, cos_dec);

        let x = s.dot(&east) / sdotr;
        let y = s.dot(&north) / sdotr;
        Some((x * ARCSEC_PER_RAD, y * ARCSEC_PER_RAD))
    }
}

/// Wrap an angle into `[0, 360)` degrees.
///
/// `rem_euclid` rounds tiny negative inputs up to exactly 360.0.
pub(crate) fn wrap_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

impl std::fmt::Display for SkyCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:+.6})", self.ra_deg, self.dec_deg)
    }
}

/// Parse a coordinate descriptor in any of the accepted notations.
pub fn parse_coord(input: &str) -> Result<SkyCoord> {
    let s = input.trim();
    if s.is_empty() {
        return Err(HostPathError::malformed("coord", input, "empty coordinate"));
    }

    if let Some((ra_str, dec_str)) = s.split_once(',') {
        if dec_str.contains(',') {
            return Err(HostPathError::malformed(
                "coord",
                input,
                "expected exactly two comma-separated fields",
            ));
        }
        let ra_str = ra_str.trim();
        let dec_str = dec_str.trim();
        if is_sexagesimal(ra_str) || is_sexagesimal(dec_str) {
            let ra_h = parse_sexagesimal(ra_str, input, 24.0)?;
            let dec = parse_sexagesimal(dec_str, input, 90.0)?;
            return SkyCoord::new(ra_h * 15.0, dec);
        }
        let ra: f64 = ra_str
            .parse()
            .map_err(|_| HostPathError::malformed("coord", input, "RA is not a number"))?;
        let dec: f64 = dec_str
            .parse()
            .map_err(|_| HostPathError::malformed("coord", input, "Dec is not a number"))?;
        return SkyCoord::new(ra, dec);
    }

    parse_compact_name(s, input)
}

fn is_sexagesimal(field: &str) -> bool {
    field.contains(':') || field.split_whitespace().count() > 1
}

/// Parse `[±]A:B:C` (or whitespace-separated) into decimal units of `A`.
fn parse_sexagesimal(field: &str, input: &str, limit: f64) -> Result<f64> {
    let (negative, body) = split_sign(field);
    let parts: Vec<&str> = body
        .split(|c: char| c == ':' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 3 {
        return Err(HostPathError::malformed(
            "coord",
            input,
            format!("sexagesimal field '{field}' needs three components"),
        ));
    }
    let mut values = [0.0f64; 3];
    for (v, p) in values.iter_mut().zip(&parts) {
        *v = p.parse().map_err(|_| {
            HostPathError::malformed("coord", input, format!("'{p}' is not a number"))
        })?;
    }
    sexagesimal_to_decimal(negative, values, limit, input)
}

/// Parse `J HHMMSS.s ±DDMMSS.s`.
fn parse_compact_name(s: &str, input: &str) -> Result<SkyCoord> {
    let body = s.strip_prefix('J').or_else(|| s.strip_prefix('j')).unwrap_or(s);
    let sign_pos = body.find(['+', '-']).ok_or_else(|| {
        HostPathError::malformed("coord", input, "compact name needs a signed declination")
    })?;
    let (ra_part, dec_part) = body.split_at(sign_pos);
    let (negative, dec_digits) = split_sign(dec_part);

    let ra = split_compact(ra_part, input)?;
    let dec = split_compact(dec_digits, input)?;
    let ra_h = sexagesimal_to_decimal(false, ra, 24.0, input)?;
    let dec = sexagesimal_to_decimal(negative, dec, 90.0, input)?;
    SkyCoord::new(ra_h * 15.0, dec)
}

/// Split `DDMMSS[.s]` into its three components.
fn split_compact(digits: &str, input: &str) -> Result<[f64; 3]> {
    let int_len = digits.find('.').unwrap_or(digits.len());
    if int_len != 6 || !digits[..int_len].bytes().all(|b| b.is_ascii_digit()) {
        return Err(HostPathError::malformed(
            "coord",
            input,
            format!("'{digits}' is not of the form DDMMSS[.s]"),
        ));
    }
    let parse = |p: &str| -> Result<f64> {
        p.parse()
            .map_err(|_| HostPathError::malformed("coord", input, format!("'{p}' is not a number")))
    };
    Ok([parse(&digits[0..2])?, parse(&digits[2..4])?, parse(&digits[4..])?])
}

fn split_sign(field: &str) -> (bool, &str) {
    let field = field.trim();
    if let Some(rest) = field.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = field.strip_prefix('+') {
        (false, rest)
    } else {
        (false, field)
    }
}

fn sexagesimal_to_decimal(negative: bool, v: [f64; 3], limit: f64, input: &str) -> Result<f64> {
    if v.iter().any(|x| !x.is_finite() || *x < 0.0) || v[1] >= 60.0 || v[2] >= 60.0 {
        return Err(HostPathError::malformed(
            "coord",
            input,
            "sexagesimal components out of range",
        ));
    }
    let value = v[0] + v[1] / 60.0 + v[2] / 3600.0;
    if value > limit || (limit == 24.0 && value >= 24.0) {
        return Err(HostPathError::malformed(
            "coord",
            input,
            format!("value {value} exceeds {limit}"),
        ));
    }
    Ok(if negative { -value } else { value })
}
