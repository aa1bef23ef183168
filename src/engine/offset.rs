//! Offset priors p(ω|O): where on the sky a transient sits relative to its
//! host, as a function of angular offset θ and the host's size.
//!
//! Each family is a surface density on the tangent plane, truncated at
//! `theta_max · φ` with `φ = scale · ang_size`, and normalized analytically
//! over that disk.

use std::f64::consts::PI;
use std::str::FromStr;

use crate::error::{HostPathError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetPriorFamily {
    /// Flat out to the truncation radius.
    Uniform,
    /// ∝ φ / (θ + φ).
    Core,
    /// ∝ exp(−θ / φ).
    Exp,
}

impl OffsetPriorFamily {
    pub fn name(&self) -> &'static str {
        match self {
            OffsetPriorFamily::Uniform => "uniform",
            OffsetPriorFamily::Core => "core",
            OffsetPriorFamily::Exp => "exp",
        }
    }
}

impl FromStr for OffsetPriorFamily {
    type Err = HostPathError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uniform" => Ok(OffsetPriorFamily::Uniform),
            "core" => Ok(OffsetPriorFamily::Core),
            "exp" => Ok(OffsetPriorFamily::Exp),
            other => Err(HostPathError::invalid_config(
                "offset prior",
                format!("unknown family '{other}'"),
            )),
        }
    }
}

/// Offset prior configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetPrior {
    pub family: OffsetPriorFamily,
    /// Truncation radius in units of φ.
    pub theta_max: f64,
    /// Multiplier turning a candidate's angular size into φ.
    pub scale: f64,
}

impl Default for OffsetPrior {
    fn default() -> Self {
        Self {
            family: OffsetPriorFamily::Exp,
            theta_max: 6.0,
            scale: 0.5,
        }
    }
}

impl OffsetPrior {
    pub fn validate(&self) -> Result<()> {
        if !(self.theta_max.is_finite() && self.theta_max > 0.0) {
            return Err(HostPathError::invalid_config(
                "theta_max",
                format!("{} must be positive", self.theta_max),
            ));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(HostPathError::invalid_config(
                "scale",
                format!("{} must be positive", self.scale),
            ));
        }
        Ok(())
    }

    /// Effective offset scale φ for a candidate of the given size (arcsec).
    pub fn phi(&self, ang_size: f64) -> f64 {
        self.scale * ang_size
    }

    /// Truncation radius for a candidate of the given size (arcsec).
    pub fn support_radius(&self, ang_size: f64) -> f64 {
        self.theta_max * self.phi(ang_size)
    }

    /// Surface density (arcsec⁻²) at offset `theta` arcsec from a candidate
    /// of size `ang_size`.
    pub fn density(&self, theta: f64, ang_size: f64) -> f64 {
        let phi = self.phi(ang_size);
        let r_max = self.theta_max * phi;
        if theta > r_max {
            return 0.0;
        }
        match self.family {
            OffsetPriorFamily::Uniform => 1.0 / (PI * r_max * r_max),
            OffsetPriorFamily::Core => {
                let norm = 2.0 * PI * phi * (r_max - phi * ((r_max + phi) / phi).ln());
                phi / (theta + phi) / norm
            }
            OffsetPriorFamily::Exp => {
                let t = self.theta_max;
                let norm = 2.0 * PI * phi * phi * (1.0 - (-t).exp() * (1.0 + t));
                (-theta / phi).exp() / norm
            }
        }
    }
}
