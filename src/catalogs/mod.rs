//! Catalog retrieval.
//!
//! A [`CatalogRetriever`] returns raw survey photometry around a sky
//! position. Which columns hold the size, magnitude and point-source
//! statistic is survey-specific and comes from the survey's
//! [`CatalogFilterPolicy`](crate::filter::CatalogFilterPolicy).

mod csv_catalog;

pub use csv_catalog::{read_candidates_csv, CsvCatalog};

use crate::candidate::{CandidateSet, SurveyCandidate};
use crate::coord::SkyCoord;
use crate::error::Result;

/// Column names of one survey's photometry table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurveyColumns {
    pub survey: &'static str,
    pub ra: &'static str,
    pub dec: &'static str,
    pub size: &'static str,
    pub mag: &'static str,
    pub quality: &'static str,
}

/// Source of raw candidate photometry.
pub trait CatalogRetriever {
    /// Human readable name used in logs and errors.
    fn name(&self) -> String;

    /// Rows within `radius_arcmin` of `center`, in catalog order.
    fn retrieve(
        &self,
        center: &SkyCoord,
        radius_arcmin: f64,
        columns: &SurveyColumns,
    ) -> Result<CandidateSet>;
}

/// Retriever over rows already held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    pub rows: Vec<SurveyCandidate>,
}

impl StaticCatalog {
    pub fn new(rows: Vec<SurveyCandidate>) -> Self {
        Self { rows }
    }
}

impl CatalogRetriever for StaticCatalog {
    fn name(&self) -> String {
        format!("in-memory catalog ({} rows)", self.rows.len())
    }

    fn retrieve(
        &self,
        center: &SkyCoord,
        radius_arcmin: f64,
        _columns: &SurveyColumns,
    ) -> Result<CandidateSet> {
        Ok(cone_cut(self.rows.iter().cloned(), center, radius_arcmin))
    }
}

/// Keep rows within `radius_arcmin` of `center`, preserving order.
pub(crate) fn cone_cut(
    rows: impl IntoIterator<Item = SurveyCandidate>,
    center: &SkyCoord,
    radius_arcmin: f64,
) -> CandidateSet {
    let radius_arcsec = radius_arcmin * 60.0;
    rows.into_iter()
        .filter(|row| center.separation_arcsec(&row.position()) <= radius_arcsec)
        .collect()
}
