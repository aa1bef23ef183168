//! Posterior integration over a square grid around the localization.
//!
//! For candidate `i`:
//!
//! ```text
//! p(x|O_i) = Σ_cells L(ω) · p(ω|O_i) · dA        (cells within max_radius of i)
//! p(x|U)   = Σ_cells L(ω) · dA / (2 · box_hwidth)²     (box-averaged localization mass)
//! P(O_i|x) = P(O_i) p(x|O_i) / D,   P(U|x) = P_U p(x|U) / D
//! D        = Σ_j P(O_j) p(x|O_j) + P_U p(x|U)
//! ```

use std::str::FromStr;

use tracing::debug;

use super::offset::OffsetPrior;
use crate::candidate::SurveyCandidate;
use crate::error::{HostPathError, Result};
use crate::localization::SkyLocalization;

/// How the localization is integrated against the offset priors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosteriorMethod {
    /// Bounded grid around the localization center.
    Local,
}

impl FromStr for PosteriorMethod {
    type Err = HostPathError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(PosteriorMethod::Local),
            other => Err(HostPathError::invalid_config(
                "posterior method",
                format!("unknown method '{other}'"),
            )),
        }
    }
}

/// Grid bounds and resolution for a `local` posterior computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalGrid {
    /// Half-width of the square integration box (arcsec).
    pub box_hwidth: f64,
    /// Cells farther than this from a candidate do not contribute to it (arcsec).
    pub max_radius: f64,
    /// Requested cell size (arcsec); rounded so the box holds whole cells.
    pub step_size: f64,
}

impl LocalGrid {
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("box_hwidth", self.box_hwidth),
            ("max_radius", self.max_radius),
            ("step_size", self.step_size),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(HostPathError::invalid_config(name, format!("{v} must be positive")));
            }
        }
        if self.step_size >= self.box_hwidth {
            return Err(HostPathError::invalid_config(
                "step_size",
                format!(
                    "{} must be smaller than the box half-width {}",
                    self.step_size, self.box_hwidth
                ),
            ));
        }
        Ok(())
    }

    fn cells_per_side(&self) -> Result<usize> {
        let n = (2.0 * self.box_hwidth / self.step_size).ceil();
        if n > MAX_CELLS_PER_SIDE as f64 {
            return Err(HostPathError::invalid_config(
                "step_size",
                format!(
                    "{}\" over a {}\" box gives {} cells per side, limit is {}",
                    self.step_size,
                    2.0 * self.box_hwidth,
                    n,
                    MAX_CELLS_PER_SIDE
                ),
            ));
        }
        Ok(n as usize)
    }
}

/// Largest number of cells along one side of the integration box.
const MAX_CELLS_PER_SIDE: usize = 1 << 24;

/// Largest number of cells evaluated in a single integration window.
const MAX_WINDOW_CELLS: usize = 1 << 26;

/// The localization density is evaluated out to this many (major-axis)
/// sigma from the center; beyond it the density is below e⁻⁵⁰ of its peak.
const LOCALIZATION_SIGMAS: f64 = 10.0;

/// Output of a posterior computation.
///
/// `p_ux` belongs to the run as a whole, not to any one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Posteriors {
    /// P(O_i|x), in candidate order.
    pub p_ox: Vec<f64>,
    /// P(U|x).
    pub p_ux: f64,
}

/// Half-open cell index ranges `[x0, x1) × [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    x0: usize,
    x1: usize,
    y0: usize,
    y1: usize,
}

impl Window {
    fn intersect(&self, other: &Window) -> Window {
        Window {
            x0: self.x0.max(other.x0),
            x1: self.x1.min(other.x1),
            y0: self.y0.max(other.y0),
            y1: self.y1.min(other.y1),
        }
    }

    fn cells(&self) -> Option<usize> {
        self.x1
            .saturating_sub(self.x0)
            .checked_mul(self.y1.saturating_sub(self.y0))
    }
}

pub(crate) fn local_posteriors(
    localization: &SkyLocalization,
    candidates: &[SurveyCandidate],
    p_o: &[f64],
    p_u: f64,
    offset: &OffsetPrior,
    grid: &LocalGrid,
) -> Result<Posteriors> {
    grid.validate()?;

    let n = grid.cells_per_side()?;
    let step = 2.0 * grid.box_hwidth / n as f64;
    let cell_area = step * step;
    let origin = -grid.box_hwidth + 0.5 * step;
    let coord = |i: usize| origin + i as f64 * step;

    let index_range = |center: f64, reach: f64| -> (usize, usize) {
        let lo = ((center - reach - origin) / step).floor().max(0.0) as usize;
        let hi = (((center + reach - origin) / step).floor() + 1.0).max(0.0) as usize;
        (lo.min(n), hi.min(n))
    };
    let window = |cx: f64, cy: f64, reach: f64| -> Window {
        let (x0, x1) = index_range(cx, reach);
        let (y0, y1) = index_range(cy, reach);
        Window { x0, x1, y0, y1 }
    };
    let loc_density = |ix: usize, iy: usize| localization.density(coord(ix), coord(iy), step);

    let loc_reach = LOCALIZATION_SIGMAS * localization.ellipse.a.max(step);
    let loc_window = window(0.0, 0.0, loc_reach);
    if !matches!(loc_window.cells(), Some(cells) if cells <= MAX_WINDOW_CELLS) {
        return Err(HostPathError::invalid_config(
            "step_size",
            format!(
                "{}\" cells over a {:.1}\" localization exceed {} cells; use a coarser step",
                step, loc_reach, MAX_WINDOW_CELLS
            ),
        ));
    }

    let mut loc_mass = 0.0;
    for iy in loc_window.y0..loc_window.y1 {
        for ix in loc_window.x0..loc_window.x1 {
            loc_mass += loc_density(ix, iy);
        }
    }
    loc_mass *= cell_area;
    // p(x|U) is the box average of the localization mass that falls inside
    // the box. It equals 1 / (2 · box_hwidth)² only when that mass is 1.
    let box_area = 4.0 * grid.box_hwidth * grid.box_hwidth;
    let p_xu = loc_mass / box_area;
    debug!(
        "Local grid: {}x{} cells of {:.3}\", localization mass inside box {:.4}",
        n, n, step, loc_mass
    );

    let mut p_xo = Vec::with_capacity(candidates.len());
    for (i, cand) in candidates.iter().enumerate() {
        let Some((cx, cy)) = localization.center.tangent_offset_arcsec(&cand.position()) else {
            p_xo.push(0.0);
            continue;
        };
        let reach = grid.max_radius.min(offset.support_radius(cand.ang_size));
        let w = window(cx, cy, reach).intersect(&loc_window);

        let mut sum = 0.0;
        for iy in w.y0..w.y1 {
            let dy = coord(iy) - cy;
            for ix in w.x0..w.x1 {
                let dx = coord(ix) - cx;
                let theta = dx.hypot(dy);
                if theta <= reach {
                    sum += loc_density(ix, iy) * offset.density(theta, cand.ang_size);
                }
            }
        }
        let value = sum * cell_area;
        debug!(
            "Candidate {} at offset ({:.2}\", {:.2}\"): p(x|O) = {:.4e}",
            i, cx, cy, value
        );
        p_xo.push(value);
    }

    let unseen = p_u * p_xu;
    let denom: f64 = p_o.iter().zip(&p_xo).map(|(p, l)| p * l).sum::<f64>() + unseen;
    if !(denom.is_finite() && denom > 0.0) {
        return Err(HostPathError::DegenerateLikelihood(format!(
            "evidence is {denom}: no candidate overlaps the localization and P_U = {p_u}"
        )));
    }

    Ok(Posteriors {
        p_ox: p_o.iter().zip(&p_xo).map(|(p, l)| p * l / denom).collect(),
        p_ux: unseen / denom,
    })
}
