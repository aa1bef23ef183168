//! Candidate priors P(O): how likely each galaxy is to be the host before
//! its offset from the localization is considered.

use std::str::FromStr;

use crate::candidate::SurveyCandidate;
use crate::error::{HostPathError, Result};

/// How raw prior weights are assigned to candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidatePriorPolicy {
    /// Every candidate gets the same weight.
    Identical,
    /// Weight ∝ 1 / Σ(m).
    Inverse,
    /// Weight ∝ 1 / (Σ(m) · size).
    Inverse1,
    /// Weight ∝ 1 / (Σ(m) · size²).
    Inverse2,
}

impl CandidatePriorPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            CandidatePriorPolicy::Identical => "identical",
            CandidatePriorPolicy::Inverse => "inverse",
            CandidatePriorPolicy::Inverse1 => "inverse1",
            CandidatePriorPolicy::Inverse2 => "inverse2",
        }
    }

    /// Whether the policy reads candidate magnitudes.
    pub fn needs_magnitudes(&self) -> bool {
        !matches!(self, CandidatePriorPolicy::Identical)
    }
}

impl FromStr for CandidatePriorPolicy {
    type Err = HostPathError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "identical" => Ok(CandidatePriorPolicy::Identical),
            "inverse" => Ok(CandidatePriorPolicy::Inverse),
            "inverse1" => Ok(CandidatePriorPolicy::Inverse1),
            "inverse2" => Ok(CandidatePriorPolicy::Inverse2),
            other => Err(HostPathError::invalid_config(
                "candidate prior",
                format!("unknown policy '{other}'"),
            )),
        }
    }
}

/// Candidate prior configuration: weighting policy and the prior mass
/// reserved for an unseen host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidatePrior {
    pub policy: CandidatePriorPolicy,
    /// Prior probability that the host is not among the candidates.
    pub p_u: f64,
}

impl Default for CandidatePrior {
    fn default() -> Self {
        Self {
            policy: CandidatePriorPolicy::Inverse,
            p_u: 0.0,
        }
    }
}

impl CandidatePrior {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.p_u) {
            return Err(HostPathError::invalid_config(
                "P_U",
                format!("{} is not a probability", self.p_u),
            ));
        }
        Ok(())
    }
}

/// Cumulative surface density of galaxies brighter than r-band magnitude
/// `mag`, in arcsec⁻² (Driver et al. 2016 number counts).
pub fn driver_sigma(mag: f64) -> f64 {
    let norm = 1.0 / (3600.0 * 3600.0 * 0.334 * std::f64::consts::LN_10);
    norm * 10f64.powf(0.334 * (mag - 22.963) + 4.320)
}

/// Normalized P(O) for each candidate. The values sum to `1 - p_u`.
pub fn candidate_priors(candidates: &[SurveyCandidate], prior: &CandidatePrior) -> Result<Vec<f64>> {
    prior.validate()?;
    let weights = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| -> Result<f64> {
            let sigma = || -> Result<f64> {
                c.mag.map(driver_sigma).ok_or_else(|| {
                    HostPathError::InvalidCandidates(format!(
                        "candidate {i} has no magnitude but prior '{}' needs one",
                        prior.policy.name()
                    ))
                })
            };
            Ok(match prior.policy {
                CandidatePriorPolicy::Identical => 1.0,
                CandidatePriorPolicy::Inverse => 1.0 / sigma()?,
                CandidatePriorPolicy::Inverse1 => 1.0 / (sigma()? * c.ang_size),
                CandidatePriorPolicy::Inverse2 => 1.0 / (sigma()? * c.ang_size * c.ang_size),
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    let total: f64 = weights.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(HostPathError::InvalidCandidates(format!(
            "prior weights sum to {total}"
        )));
    }
    let scale = (1.0 - prior.p_u) / total;
    Ok(weights.into_iter().map(|w| w * scale).collect())
}
