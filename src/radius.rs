//! Bounding box for the posterior integration.
//!
//! The box must be at least ten radii of the largest candidate so its offset
//! prior is not truncated, and never smaller than 30 arcsec.

use crate::candidate::SurveyCandidate;
use crate::error::{HostPathError, Result};

/// Smallest box half-width, arcsec.
pub const MIN_BOX_HALFWIDTH: f64 = 30.0;

/// Box half-width in units of the largest candidate size.
pub const SIZE_MULTIPLIER: f64 = 10.0;

/// `max(30, 10 × max(ang_size))`, in the catalog's size unit (arcsec).
pub fn box_halfwidth(candidates: &[SurveyCandidate]) -> Result<f64> {
    let max_size = candidates
        .iter()
        .map(|c| c.ang_size)
        .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |m| m.max(s))))
        .ok_or(HostPathError::NoCandidates {
            stage: "radius estimation",
        })?;
    Ok(MIN_BOX_HALFWIDTH.max(SIZE_MULTIPLIER * max_size))
}
