//! Transient localizations.
//!
//! Only elliptical regions are implemented. The ellipse axes are the 1-sigma
//! widths of a bivariate Gaussian on the tangent plane, in arcseconds, with
//! the major axis rotated `pa` degrees east of north.

use std::f64::consts::PI;

use crate::coord::{parse_coord, wrap_degrees, SkyCoord};
use crate::error::{HostPathError, Result};

/// Shape parameters of an elliptical localization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipseShape {
    /// Semi-major axis (arcsec).
    pub a: f64,
    /// Semi-minor axis (arcsec).
    pub b: f64,
    /// Position angle of the major axis, degrees east of north, in `[0, 360)`.
    pub pa: f64,
}

impl EllipseShape {
    /// Validate and build an ellipse. `pa` is wrapped into `[0, 360)`.
    pub fn new(a: f64, b: f64, pa: f64) -> Result<Self> {
        let input = format!("{a},{b},{pa}");
        if !(a.is_finite() && b.is_finite() && pa.is_finite()) {
            return Err(HostPathError::malformed(
                "lparam",
                input,
                "ellipse parameters must be finite",
            ));
        }
        if b < 0.0 || a < b {
            return Err(HostPathError::malformed(
                "lparam",
                input,
                "ellipse axes must satisfy a >= b >= 0",
            ));
        }
        Ok(Self {
            a,
            b,
            pa: wrap_degrees(pa),
        })
    }
}

/// A sky-plane region believed to contain the transient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyLocalization {
    pub center: SkyCoord,
    pub ellipse: EllipseShape,
}

impl SkyLocalization {
    pub fn new(center: SkyCoord, ellipse: EllipseShape) -> Self {
        Self { center, ellipse }
    }

    /// Gaussian localization density at tangent-plane offset `(x, y)`
    /// arcsec from the center (x east, y north), in arcsec⁻².
    ///
    /// `min_width` floors the axes so a degenerate (zero-width) axis still
    /// spreads over at least one integration cell.
    pub fn density(&self, x: f64, y: f64, min_width: f64) -> f64 {
        let sig_a = self.ellipse.a.max(min_width);
        let sig_b = self.ellipse.b.max(min_width);
        let (sin_pa, cos_pa) = self.ellipse.pa.to_radians().sin_cos();
        // Major axis points along (east, north) = (sin pa, cos pa).
        let u = x * sin_pa + y * cos_pa;
        let v = x * cos_pa - y * sin_pa;
        let chi2 = (u / sig_a).powi(2) + (v / sig_b).powi(2);
        (-0.5 * chi2).exp() / (2.0 * PI * sig_a * sig_b)
    }
}

/// Parse a localization of the given type from its coordinate descriptor and
/// comma-separated parameter string.
///
/// For `ellipse`, `lparam` must be exactly `a,b,pa`.
pub fn parse_localization(ltype: &str, coord: &str, lparam: &str) -> Result<SkyLocalization> {
    match ltype.trim().to_ascii_lowercase().as_str() {
        "ellipse" => {
            let center = parse_coord(coord)?;
            let ellipse = parse_ellipse_params(lparam)?;
            Ok(SkyLocalization::new(center, ellipse))
        }
        _ => Err(HostPathError::UnsupportedLocalizationType(ltype.to_string())),
    }
}

/// Parse `a,b,pa` into an [`EllipseShape`].
pub fn parse_ellipse_params(lparam: &str) -> Result<EllipseShape> {
    let fields: Vec<&str> = lparam.split(',').map(str::trim).collect();
    if fields.len() != 3 {
        return Err(HostPathError::malformed(
            "lparam",
            lparam,
            format!("ellipse needs 3 comma-separated fields, got {}", fields.len()),
        ));
    }
    let mut values = [0.0f64; 3];
    for (v, f) in values.iter_mut().zip(&fields) {
        *v = f.parse().map_err(|_| {
            HostPathError::malformed("lparam", lparam, format!("'{f}' is not a number"))
        })?;
    }
    let [a, b, pa] = values;
    EllipseShape::new(a, b, pa).map_err(|e| match e {
        HostPathError::MalformedLocalization { field, reason, .. } => {
            HostPathError::malformed(field, lparam, reason)
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exact_ellipse_values() {
        for (a, b, pa) in [(0.5, 0.3, 45.0), (11.0, 11.0, 0.0), (3.25, 0.0, 359.5)] {
            let s = format!("{a},{b},{pa}");
            let e = parse_ellipse_params(&s).unwrap();
            assert_eq!(e, EllipseShape { a, b, pa });
        }
    }

    #[test]
    fn wrong_field_count_is_malformed() {
        for bad in ["1,2", "1,2,3,4", "", "1"] {
            let err = parse_ellipse_params(bad).unwrap_err();
            assert!(
                matches!(err, HostPathError::MalformedLocalization { field: "lparam", .. }),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn non_numeric_is_malformed() {
        for bad in ["a,b,c", "1,2,x", "1,,3", "1,nan,3"] {
            assert!(matches!(
                parse_ellipse_params(bad),
                Err(HostPathError::MalformedLocalization { .. })
            ));
        }
    }

    #[test]
    fn axis_ordering_is_enforced() {
        assert!(parse_ellipse_params("1,2,0").is_err());
        assert!(parse_ellipse_params("1,-0.5,0").is_err());
    }

    #[test]
    fn position_angle_wraps() {
        let e = parse_ellipse_params("2,1,-90").unwrap();
        assert_eq!(e.pa, 270.0);
        let e = parse_ellipse_params("2,1,360").unwrap();
        assert_eq!(e.pa, 0.0);
    }

    #[test]
    fn tiny_negative_position_angle_stays_below_360() {
        let loc = parse_localization("ellipse", "10,10", "2,1,-1e-20").unwrap();
        assert!((0.0..360.0).contains(&loc.ellipse.pa), "pa = {}", loc.ellipse.pa);
        assert_eq!(loc.ellipse.pa, 0.0);
    }

    #[test]
    fn only_ellipse_is_supported() {
        let err = parse_localization("healpix", "10,10", "1,1,0").unwrap_err();
        assert!(matches!(err, HostPathError::UnsupportedLocalizationType(t) if t == "healpix"));

        let loc = parse_localization("ellipse", "128.68005,66.01075", "11.,11.,0.").unwrap();
        assert_eq!(loc.ellipse, EllipseShape { a: 11.0, b: 11.0, pa: 0.0 });
    }

    #[test]
    fn density_follows_position_angle() {
        let center = SkyCoord::new(0.0, 0.0).unwrap();
        // Major axis pointing east.
        let loc = SkyLocalization::new(center, EllipseShape::new(4.0, 1.0, 90.0).unwrap());
        let along = loc.density(3.0, 0.0, 0.0);
        let across = loc.density(0.0, 3.0, 0.0);
        assert!(along > across);

        let peak = loc.density(0.0, 0.0, 0.0);
        assert!((peak - 1.0 / (2.0 * PI * 4.0)).abs() < 1e-12);
    }
}
