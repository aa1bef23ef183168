//! Association pipeline orchestration.
//!
//! [`Association`] drives a [`PathEngine`] through its configuration
//! sequence. Each stage is a distinct type and each method consumes the
//! current stage to produce the next, so the pipeline cannot be assembled
//! out of order. Engine errors, including its own sequencing errors, are
//! propagated untouched.
//!
//! [`run_association`] is the end-to-end entry point: retrieve, filter,
//! size the integration box, associate and rank.

use std::marker::PhantomData;

use tracing::{debug, info};

use crate::candidate::{CandidateSet, SurveyCandidate};
use crate::catalogs::CatalogRetriever;
use crate::engine::{
    CandidatePrior, LocalGrid, OffsetPrior, PathEngine, PosteriorMethod, Posteriors,
};
use crate::error::{HostPathError, Result};
use crate::filter::FilterRegistry;
use crate::localization::SkyLocalization;
use crate::radius::box_halfwidth;
use crate::ranking::{rank, AssociationResult};

// ── Configuration ───────────────────────────────────────────────────────────

/// Priors and integration settings for one association run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssociationConfig {
    /// Candidate prior policy and unseen-host prior P_U.
    pub cand_prior: CandidatePrior,
    /// Offset prior family and shape.
    pub offset_prior: OffsetPrior,
    /// Posterior integration method.
    pub method: PosteriorMethod,
    /// Grid cell size for the posterior integral (arcsec).
    pub step_size: f64,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            cand_prior: CandidatePrior::default(),
            offset_prior: OffsetPrior::default(),
            method: PosteriorMethod::Local,
            step_size: 0.1,
        }
    }
}

impl AssociationConfig {
    /// Default configuration with the given unseen-host prior.
    pub fn with_unseen_prior(p_u: f64) -> Self {
        let mut config = Self::default();
        config.cand_prior.p_u = p_u;
        config
    }
}

/// Everything needed to run the pipeline for one transient.
#[derive(Debug, Clone)]
pub struct AssociationRequest {
    pub localization: SkyLocalization,
    /// Survey whose filter policy and columns apply.
    pub survey: String,
    /// Catalog search radius around the localization center (arcmin).
    pub search_radius_arcmin: f64,
    pub config: AssociationConfig,
    /// Log column statistics of the filtered catalog.
    pub debug: bool,
}

impl AssociationRequest {
    pub fn new(localization: SkyLocalization) -> Self {
        Self {
            localization,
            survey: "Pan-STARRS".to_string(),
            search_radius_arcmin: 5.0,
            config: AssociationConfig::default(),
            debug: false,
        }
    }
}

// ── Typed stages ────────────────────────────────────────────────────────────

/// Stage markers for [`Association`].
pub mod stage {
    pub struct Unconfigured;
    pub struct LocalizationSet;
    pub struct CandidatesSet;
    pub struct CandidatePriorSet;
    pub struct PriorsConfigured;
    pub struct PriorsComputed;
    pub struct PosteriorsComputed;
}

/// An association run at configuration stage `S`.
pub struct Association<S> {
    engine: PathEngine,
    _stage: PhantomData<S>,
}

impl<S> Association<S> {
    fn advance<T>(self) -> Association<T> {
        Association {
            engine: self.engine,
            _stage: PhantomData,
        }
    }

    /// Underlying engine, for inspection.
    pub fn engine(&self) -> &PathEngine {
        &self.engine
    }
}

impl Default for Association<stage::Unconfigured> {
    fn default() -> Self {
        Self::new()
    }
}

impl Association<stage::Unconfigured> {
    pub fn new() -> Self {
        Self {
            engine: PathEngine::new(),
            _stage: PhantomData,
        }
    }

    pub fn localization(
        mut self,
        localization: SkyLocalization,
    ) -> Result<Association<stage::LocalizationSet>> {
        self.engine.init_localization(localization)?;
        Ok(self.advance())
    }
}

impl Association<stage::LocalizationSet> {
    pub fn candidates(
        mut self,
        candidates: &[SurveyCandidate],
    ) -> Result<Association<stage::CandidatesSet>> {
        self.engine.init_candidates(candidates)?;
        Ok(self.advance())
    }
}

impl Association<stage::CandidatesSet> {
    pub fn candidate_prior(
        mut self,
        prior: CandidatePrior,
    ) -> Result<Association<stage::CandidatePriorSet>> {
        self.engine.init_cand_prior(prior)?;
        Ok(self.advance())
    }
}

impl Association<stage::CandidatePriorSet> {
    pub fn offset_prior(
        mut self,
        prior: OffsetPrior,
    ) -> Result<Association<stage::PriorsConfigured>> {
        self.engine.init_offset_prior(prior)?;
        Ok(self.advance())
    }
}

impl Association<stage::PriorsConfigured> {
    pub fn compute_priors(mut self) -> Result<Association<stage::PriorsComputed>> {
        self.engine.calc_priors()?;
        Ok(self.advance())
    }
}

impl Association<stage::PriorsComputed> {
    /// P(O) for each candidate, in input order.
    pub fn priors(&self) -> Result<&[f64]> {
        self.engine.priors().ok_or(HostPathError::OutOfOrderConfiguration {
            operation: "priors",
            state: self.engine.state(),
        })
    }

    pub fn compute_posteriors(
        mut self,
        method: PosteriorMethod,
        grid: &LocalGrid,
    ) -> Result<Association<stage::PosteriorsComputed>> {
        self.engine.calc_posteriors(method, grid)?;
        Ok(self.advance())
    }
}

impl Association<stage::PosteriorsComputed> {
    pub fn posteriors(&self) -> Result<&Posteriors> {
        self.engine
            .posteriors()
            .ok_or(HostPathError::OutOfOrderConfiguration {
                operation: "posteriors",
                state: self.engine.state(),
            })
    }

    /// Rank the candidates by posterior.
    pub fn into_result(self, box_hwidth: f64) -> Result<AssociationResult> {
        let posteriors = self.posteriors()?;
        let priors = self.engine.priors().ok_or(HostPathError::OutOfOrderConfiguration {
            operation: "into_result",
            state: self.engine.state(),
        })?;
        Ok(AssociationResult {
            candidates: rank(self.engine.candidates(), priors, &posteriors.p_ox),
            p_ux: posteriors.p_ux,
            box_hwidth,
        })
    }
}

// ── Orchestration ───────────────────────────────────────────────────────────

/// Run the six configuration steps for already-cleaned candidates and rank
/// the result. `box_hwidth` is used as both the box half-width and the
/// maximum integration radius.
pub fn associate(
    localization: &SkyLocalization,
    candidates: &[SurveyCandidate],
    config: &AssociationConfig,
    box_hwidth: f64,
) -> Result<AssociationResult> {
    let grid = LocalGrid {
        box_hwidth,
        max_radius: box_hwidth,
        step_size: config.step_size,
    };
    let priors = Association::new()
        .localization(*localization)?
        .candidates(candidates)?
        .candidate_prior(config.cand_prior)?
        .offset_prior(config.offset_prior)?
        .compute_priors()?;
    debug!("Priors: {:?}", priors.priors()?);
    priors
        .compute_posteriors(config.method, &grid)?
        .into_result(box_hwidth)
}

/// Retrieve, filter, size the box, associate and rank.
pub fn run_association(
    request: &AssociationRequest,
    retriever: &dyn CatalogRetriever,
    registry: &FilterRegistry,
) -> Result<AssociationResult> {
    if !(request.search_radius_arcmin.is_finite() && request.search_radius_arcmin > 0.0) {
        return Err(HostPathError::invalid_config(
            "search radius",
            format!("{} arcmin must be positive", request.search_radius_arcmin),
        ));
    }
    let policy = registry.policy(&request.survey)?;
    let columns = policy.columns();

    info!(
        "Querying {} for {} rows within {}' of {}",
        retriever.name(),
        request.survey,
        request.search_radius_arcmin,
        request.localization.center
    );
    let raw = retriever.retrieve(
        &request.localization.center,
        request.search_radius_arcmin,
        &columns,
    )?;
    if raw.is_empty() {
        return Err(HostPathError::NoCandidates { stage: "retrieval" });
    }

    let candidates = policy.apply(raw);
    if candidates.is_empty() {
        return Err(HostPathError::NoCandidates { stage: "filtering" });
    }
    if request.debug {
        log_column_summary(&candidates);
    }

    let box_hwidth = box_halfwidth(&candidates)?;
    info!("Integration box half-width: {:.1}\"", box_hwidth);

    associate(&request.localization, &candidates, &request.config, box_hwidth)
}

/// Count, min, median and max of the finite entries of one catalog column.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ColumnSummary {
    n: usize,
    min: f64,
    median: f64,
    max: f64,
}

fn summarize_column(mut values: Vec<f64>) -> Option<ColumnSummary> {
    values.retain(|v| v.is_finite());
    values.sort_by(f64::total_cmp);
    let (&min, &max) = (values.first()?, values.last()?);
    Some(ColumnSummary {
        n: values.len(),
        min,
        median: values[values.len() / 2],
        max,
    })
}

fn column_summaries(candidates: &CandidateSet) -> [(&'static str, Option<ColumnSummary>); 3] {
    [
        ("ang_size", summarize_column(candidates.iter().map(|c| c.ang_size).collect())),
        ("mag", summarize_column(candidates.iter().filter_map(|c| c.mag).collect())),
        ("quality", summarize_column(candidates.iter().map(|c| c.quality).collect())),
    ]
}

/// Log min / median / max of the filtered size, magnitude and quality columns.
fn log_column_summary(candidates: &CandidateSet) {
    for (name, summary) in column_summaries(candidates) {
        match summary {
            Some(s) => debug!(
                "{}: n={} min={:.4} median={:.4} max={:.4}",
                name, s.n, s.min, s.median, s.max
            ),
            None => debug!("{name}: no finite values"),
        }
    }
}
