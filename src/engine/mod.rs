//! Probabilistic host association engine.
//!
//! The engine is configured through six calls that must happen in order:
//!
//! 1. [`PathEngine::init_localization`]
//! 2. [`PathEngine::init_candidates`]
//! 3. [`PathEngine::init_cand_prior`]
//! 4. [`PathEngine::init_offset_prior`]
//! 5. [`PathEngine::calc_priors`]
//! 6. [`PathEngine::calc_posteriors`]
//!
//! Every call checks the engine's [`EngineState`] and fails with
//! `OutOfOrderConfiguration` when invoked from any state other than its
//! required predecessor. A failed call leaves the state unchanged.

pub mod offset;
pub mod posterior;
pub mod priors;

pub use offset::{OffsetPrior, OffsetPriorFamily};
pub use posterior::{LocalGrid, PosteriorMethod, Posteriors};
pub use priors::{candidate_priors, driver_sigma, CandidatePrior, CandidatePriorPolicy};

use tracing::{debug, info};

use crate::candidate::SurveyCandidate;
use crate::error::{HostPathError, Result};
use crate::localization::SkyLocalization;

/// Configuration progress of a [`PathEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unconfigured,
    LocalizationSet,
    CandidatesSet,
    CandidatePriorSet,
    PriorsConfigured,
    PriorsComputed,
    PosteriorsComputed,
}

/// Sequenced posterior engine for a single localization.
#[derive(Debug, Clone)]
pub struct PathEngine {
    state: EngineState,
    localization: Option<SkyLocalization>,
    candidates: Vec<SurveyCandidate>,
    cand_prior: Option<CandidatePrior>,
    offset_prior: Option<OffsetPrior>,
    p_o: Vec<f64>,
    posteriors: Option<Posteriors>,
}

impl Default for PathEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PathEngine {
    pub fn new() -> Self {
        Self {
            state: EngineState::Unconfigured,
            localization: None,
            candidates: Vec::new(),
            cand_prior: None,
            offset_prior: None,
            p_o: Vec::new(),
            posteriors: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    fn require(&self, operation: &'static str, expected: EngineState) -> Result<()> {
        if self.state != expected {
            return Err(HostPathError::OutOfOrderConfiguration {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    /// Step 1: set the transient's localization.
    pub fn init_localization(&mut self, localization: SkyLocalization) -> Result<()> {
        self.require("init_localization", EngineState::Unconfigured)?;
        debug!(
            "Localization: center {} ellipse a={}\" b={}\" pa={}°",
            localization.center,
            localization.ellipse.a,
            localization.ellipse.b,
            localization.ellipse.pa
        );
        self.localization = Some(localization);
        self.state = EngineState::LocalizationSet;
        Ok(())
    }

    /// Step 2: set the candidate galaxies.
    ///
    /// Magnitudes must be present on every candidate or on none.
    pub fn init_candidates(&mut self, candidates: &[SurveyCandidate]) -> Result<()> {
        self.require("init_candidates", EngineState::LocalizationSet)?;
        if candidates.is_empty() {
            return Err(HostPathError::NoCandidates {
                stage: "engine setup",
            });
        }
        for (i, c) in candidates.iter().enumerate() {
            if !(c.ra_deg.is_finite() && c.dec_deg.is_finite()) {
                return Err(HostPathError::InvalidCandidates(format!(
                    "candidate {i} has a non-finite position"
                )));
            }
            if !(c.ang_size.is_finite() && c.ang_size > 0.0) {
                return Err(HostPathError::InvalidCandidates(format!(
                    "candidate {i} has angular size {}",
                    c.ang_size
                )));
            }
        }
        let with_mag = candidates.iter().filter(|c| c.mag.is_some()).count();
        if with_mag != 0 && with_mag != candidates.len() {
            return Err(HostPathError::InvalidCandidates(format!(
                "{} of {} candidates have magnitudes; supply all or none",
                with_mag,
                candidates.len()
            )));
        }
        self.candidates = candidates.to_vec();
        self.state = EngineState::CandidatesSet;
        Ok(())
    }

    /// Step 3: set the candidate prior and the unseen-host prior `P_U`.
    pub fn init_cand_prior(&mut self, prior: CandidatePrior) -> Result<()> {
        self.require("init_cand_prior", EngineState::CandidatesSet)?;
        prior.validate()?;
        if prior.policy.needs_magnitudes() && self.candidates.iter().any(|c| c.mag.is_none()) {
            return Err(HostPathError::invalid_config(
                "candidate prior",
                format!("policy '{}' needs candidate magnitudes", prior.policy.name()),
            ));
        }
        self.cand_prior = Some(prior);
        self.state = EngineState::CandidatePriorSet;
        Ok(())
    }

    /// Step 4: set the offset prior.
    pub fn init_offset_prior(&mut self, prior: OffsetPrior) -> Result<()> {
        self.require("init_offset_prior", EngineState::CandidatePriorSet)?;
        prior.validate()?;
        self.offset_prior = Some(prior);
        self.state = EngineState::PriorsConfigured;
        Ok(())
    }

    /// Step 5: compute P(O) for every candidate.
    pub fn calc_priors(&mut self) -> Result<&[f64]> {
        self.require("calc_priors", EngineState::PriorsConfigured)?;
        let prior = self.configured_cand_prior("calc_priors")?;
        self.p_o = candidate_priors(&self.candidates, &prior)?;
        self.state = EngineState::PriorsComputed;
        Ok(&self.p_o)
    }

    /// Step 6: compute P(O|x) for every candidate and P(U|x) for the run.
    pub fn calc_posteriors(&mut self, method: PosteriorMethod, grid: &LocalGrid) -> Result<&Posteriors> {
        self.require("calc_posteriors", EngineState::PriorsComputed)?;
        let prior = self.configured_cand_prior("calc_posteriors")?;
        let (localization, offset) = match (self.localization, self.offset_prior) {
            (Some(l), Some(o)) => (l, o),
            _ => {
                return Err(HostPathError::OutOfOrderConfiguration {
                    operation: "calc_posteriors",
                    state: self.state,
                })
            }
        };

        let posteriors = match method {
            PosteriorMethod::Local => posterior::local_posteriors(
                &localization,
                &self.candidates,
                &self.p_o,
                prior.p_u,
                &offset,
                grid,
            )?,
        };
        info!(
            "Posteriors for {} candidates: max P(O|x) = {:.4}, P(U|x) = {:.4}",
            self.candidates.len(),
            posteriors.p_ox.iter().copied().fold(0.0, f64::max),
            posteriors.p_ux
        );
        self.state = EngineState::PosteriorsComputed;
        Ok(self.posteriors.insert(posteriors))
    }

    fn configured_cand_prior(&self, operation: &'static str) -> Result<CandidatePrior> {
        self.cand_prior
            .ok_or(HostPathError::OutOfOrderConfiguration {
                operation,
                state: self.state,
            })
    }

    /// Candidates in the order they were supplied.
    pub fn candidates(&self) -> &[SurveyCandidate] {
        &self.candidates
    }

    /// P(O) values, once computed.
    pub fn priors(&self) -> Option<&[f64]> {
        match self.state {
            EngineState::PriorsComputed | EngineState::PosteriorsComputed => Some(&self.p_o),
            _ => None,
        }
    }

    /// Posteriors, once computed.
    pub fn posteriors(&self) -> Option<&Posteriors> {
        self.posteriors.as_ref()
    }
}
