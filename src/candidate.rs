use crate::coord::SkyCoord;

/// One catalog row: a galaxy that might host the transient.
///
/// `ang_size` is the survey's angular-size measure in arcseconds (e.g. the
/// Kron radius). `quality` is the survey's point-source diagnostic; it is
/// NaN when the catalog did not provide one.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyCandidate {
    pub ra_deg: f64,
    pub dec_deg: f64,
    pub ang_size: f64,
    pub mag: Option<f64>,
    pub quality: f64,
}

impl SurveyCandidate {
    /// Candidate position as a [`SkyCoord`]-like pair. RA is not re-wrapped.
    pub fn position(&self) -> SkyCoord {
        SkyCoord {
            ra_deg: self.ra_deg,
            dec_deg: self.dec_deg,
        }
    }
}

/// Ordered candidate rows. Order is retrieval order until ranking.
pub type CandidateSet = Vec<SurveyCandidate>;
