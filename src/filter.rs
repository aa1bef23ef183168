//! Survey-specific cleaning of candidate photometry.
//!
//! Each survey gets its own [`CatalogFilterPolicy`], looked up by name in a
//! [`FilterRegistry`]. A survey without a registered policy is an error:
//! applying one survey's cuts to another survey's columns is never done.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::candidate::{CandidateSet, SurveyCandidate};
use crate::catalogs::SurveyColumns;
use crate::error::{HostPathError, Result};

/// Rejection rules for one survey's photometry.
pub trait CatalogFilterPolicy {
    /// Survey name this policy is registered under.
    fn survey(&self) -> &'static str;

    /// Where the policy's quantities live in the survey's tables.
    fn columns(&self) -> SurveyColumns;

    /// `true` if the row is reliable enough for association.
    fn keep(&self, candidate: &SurveyCandidate) -> bool;

    /// Drop every row that fails [`keep`](Self::keep), preserving order.
    fn apply(&self, candidates: CandidateSet) -> CandidateSet {
        let before = candidates.len();
        let kept: CandidateSet = candidates.into_iter().filter(|c| self.keep(c)).collect();
        info!(
            "{} filter kept {} of {} candidates",
            self.survey(),
            kept.len(),
            before
        );
        kept
    }
}

pub const PANSTARRS_COLUMNS: SurveyColumns = SurveyColumns {
    survey: "Pan-STARRS",
    ra: "ra",
    dec: "dec",
    size: "rKronRad",
    mag: "Pan-STARRS_r",
    quality: "rPSFLikelihood",
};

/// Pan-STARRS r-band cuts: measured Kron radius, unsaturated, and
/// extended according to the PSF likelihood.
#[derive(Debug, Clone, Copy)]
pub struct PanStarrsFilter {
    /// Rows brighter than (or equal to) this magnitude are treated as saturated.
    pub mag_floor: f64,
    /// Rows with `log10(|rPSFLikelihood|)` at or above this are treated as stars.
    pub max_log_psf_likelihood: f64,
}

impl Default for PanStarrsFilter {
    fn default() -> Self {
        Self {
            mag_floor: 14.0,
            max_log_psf_likelihood: -2.0,
        }
    }
}

impl CatalogFilterPolicy for PanStarrsFilter {
    fn survey(&self) -> &'static str {
        PANSTARRS_COLUMNS.survey
    }

    fn columns(&self) -> SurveyColumns {
        PANSTARRS_COLUMNS
    }

    fn keep(&self, c: &SurveyCandidate) -> bool {
        // Comparisons are written so that NaN fails each cut.
        let extended = c.ang_size > 0.0;
        let unsaturated = c.mag.is_some_and(|m| m > self.mag_floor);
        let non_stellar = c.quality.abs().log10() < self.max_log_psf_likelihood;
        extended && unsaturated && non_stellar
    }
}

/// Filter policies keyed by survey name.
pub struct FilterRegistry {
    policies: BTreeMap<String, Box<dyn CatalogFilterPolicy>>,
}

impl FilterRegistry {
    /// A registry with no policies.
    pub fn empty() -> Self {
        Self {
            policies: BTreeMap::new(),
        }
    }

    /// Register (or replace) the policy for its survey.
    pub fn register(&mut self, policy: Box<dyn CatalogFilterPolicy>) {
        debug!("Registering filter policy for {}", policy.survey());
        self.policies.insert(policy.survey().to_string(), policy);
    }

    /// Policy for `survey`, or `UnsupportedSurvey`.
    pub fn policy(&self, survey: &str) -> Result<&dyn CatalogFilterPolicy> {
        self.policies
            .get(survey)
            .map(|p| p.as_ref())
            .ok_or_else(|| HostPathError::UnsupportedSurvey(survey.to_string()))
    }

    /// Registered survey names, sorted.
    pub fn surveys(&self) -> Vec<&str> {
        self.policies.keys().map(String::as_str).collect()
    }

    /// Filter `candidates` with the policy registered for `survey`.
    pub fn filter(&self, survey: &str, candidates: CandidateSet) -> Result<CandidateSet> {
        Ok(self.policy(survey)?.apply(candidates))
    }
}

impl Default for FilterRegistry {
    /// Registry with the built-in Pan-STARRS policy.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(PanStarrsFilter::default()));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(ang_size: f64, mag: Option<f64>, quality: f64) -> SurveyCandidate {
        SurveyCandidate {
            ra_deg: 128.68,
            dec_deg: 66.01,
            ang_size,
            mag,
            quality,
        }
    }

    #[test]
    fn panstarrs_cuts() {
        let f = PanStarrsFilter::default();
        assert!(f.keep(&cand(2.0, Some(20.0), 1e-5)));
        // Unmeasured size.
        assert!(!f.keep(&cand(0.0, Some(20.0), 1e-5)));
        assert!(!f.keep(&cand(-1.0, Some(20.0), 1e-5)));
        // Saturated, and exactly at the floor.
        assert!(!f.keep(&cand(2.0, Some(13.0), 1e-5)));
        assert!(!f.keep(&cand(2.0, Some(14.0), 1e-5)));
        // Star-like PSF likelihood: log10(0.01) == -2 is rejected.
        assert!(!f.keep(&cand(2.0, Some(20.0), 0.01)));
        assert!(!f.keep(&cand(2.0, Some(20.0), -0.5)));
        // Negative statistics are judged by magnitude.
        assert!(f.keep(&cand(2.0, Some(20.0), -1e-4)));
        // A zero statistic is maximally extended.
        assert!(f.keep(&cand(2.0, Some(20.0), 0.0)));
    }

    #[test]
    fn missing_values_are_rejected() {
        let f = PanStarrsFilter::default();
        assert!(!f.keep(&cand(2.0, None, 1e-5)));
        assert!(!f.keep(&cand(f64::NAN, Some(20.0), 1e-5)));
        assert!(!f.keep(&cand(2.0, Some(f64::NAN), 1e-5)));
        assert!(!f.keep(&cand(2.0, Some(20.0), f64::NAN)));
    }

    #[test]
    fn filtering_is_idempotent_and_order_preserving() {
        let rows = vec![
            cand(5.0, Some(18.0), 1e-6),
            cand(0.0, Some(18.0), 1e-6),
            cand(40.0, Some(16.0), 1e-3),
            cand(3.0, Some(12.0), 1e-6),
            cand(2.0, Some(21.0), 0.5),
            cand(2.0, Some(22.0), 1e-8),
        ];
        let registry = FilterRegistry::default();
        let once = registry.filter("Pan-STARRS", rows).unwrap();
        let twice = registry.filter("Pan-STARRS", once.clone()).unwrap();
        assert_eq!(once, twice);
        let sizes: Vec<f64> = once.iter().map(|c| c.ang_size).collect();
        assert_eq!(sizes, vec![5.0, 40.0, 2.0]);
    }

    #[test]
    fn unknown_survey_never_falls_back() {
        let registry = FilterRegistry::default();
        let err = registry
            .filter("DECaLS", vec![cand(5.0, Some(18.0), 1e-6)])
            .unwrap_err();
        assert!(matches!(err, HostPathError::UnsupportedSurvey(s) if s == "DECaLS"));

        assert!(FilterRegistry::empty().policy("Pan-STARRS").is_err());
        assert_eq!(registry.surveys(), vec!["Pan-STARRS"]);
    }
}
