//! Local delimited exports of survey photometry.
//!
//! The file must have a header row naming at least the survey's RA, Dec,
//! size, magnitude and point-source columns. Empty magnitude cells become
//! `None` and empty size or point-source cells become NaN, so the filter
//! rejects them instead of guessing. A non-empty cell that is not a number
//! is an error.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use tracing::{debug, info};

use super::{cone_cut, CatalogRetriever, SurveyColumns};
use crate::candidate::{CandidateSet, SurveyCandidate};
use crate::coord::SkyCoord;
use crate::error::{HostPathError, Result};

/// Retriever backed by a CSV (or TSV) file on disk.
#[derive(Debug, Clone)]
pub struct CsvCatalog {
    path: PathBuf,
}

impl CsvCatalog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CatalogRetriever for CsvCatalog {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn retrieve(
        &self,
        center: &SkyCoord,
        radius_arcmin: f64,
        columns: &SurveyColumns,
    ) -> Result<CandidateSet> {
        let rows = read_candidates_csv(&self.path, columns).map_err(|e| {
            HostPathError::CatalogRetrieval {
                source_name: self.name(),
                reason: format!("{e:#}"),
            }
        })?;
        let total = rows.len();
        let hits = cone_cut(rows, center, radius_arcmin);
        info!(
            "Retrieved {} of {} {} rows within {:.2}' of {}",
            hits.len(),
            total,
            columns.survey,
            radius_arcmin,
            center
        );
        Ok(hits)
    }
}

/// Read every row of a survey export using the given column mapping.
pub fn read_candidates_csv<P: AsRef<Path>>(
    file: P,
    columns: &SurveyColumns,
) -> anyhow::Result<Vec<SurveyCandidate>> {
    let file = file.as_ref();
    let delimiter = if file.extension().is_some_and(|e| e.eq_ignore_ascii_case("tsv")) {
        b'\t'
    } else {
        b','
    };
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(file)
        .with_context(|| format!("opening {}", file.display()))?;

    let headers = rdr.headers()?.clone();
    let find = |name: &str| -> anyhow::Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("missing column '{}' in {}", name, file.display()))
    };
    let i_ra = find(columns.ra)?;
    let i_dec = find(columns.dec)?;
    let i_size = find(columns.size)?;
    let i_mag = find(columns.mag)?;
    let i_quality = find(columns.quality)?;
    debug!(
        "Column indices: ra={} dec={} size={} mag={} quality={}",
        i_ra, i_dec, i_size, i_mag, i_quality
    );

    rdr.records()
        .enumerate()
        .map(|(line, result)| -> anyhow::Result<SurveyCandidate> {
            let record = result?;
            let required = |idx: usize, name: &str| -> anyhow::Result<f64> {
                let cell = record.get(idx).unwrap_or("");
                cell.parse().with_context(|| {
                    format!("row {}: column '{}' value '{}' is not a number", line + 1, name, cell)
                })
            };
            let optional = |idx: usize, name: &str| -> anyhow::Result<Option<f64>> {
                match record.get(idx) {
                    Some(cell) if !cell.is_empty() => {
                        cell.parse::<f64>().map(Some).with_context(|| {
                            format!(
                                "row {}: column '{}' value '{}' is not a number",
                                line + 1,
                                name,
                                cell
                            )
                        })
                    }
                    _ => Ok(None),
                }
            };

            Ok(SurveyCandidate {
                ra_deg: required(i_ra, columns.ra)?,
                dec_deg: required(i_dec, columns.dec)?,
                ang_size: optional(i_size, columns.size)?.unwrap_or(f64::NAN),
                mag: optional(i_mag, columns.mag)?,
                quality: optional(i_quality, columns.quality)?.unwrap_or(f64::NAN),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::PANSTARRS_COLUMNS;
    use std::io::Write;

    fn write_catalog(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn reads_named_columns_in_any_order() {
        let file = write_catalog(
            "objID,Pan-STARRS_r,dec,ra,rPSFLikelihood,rKronRad\n\
             1,21.5,66.0,128.0,0.0001,3.2\n\
             2,,66.1,128.1,,0.0\n",
            ".csv",
        );
        let rows = read_candidates_csv(file.path(), &PANSTARRS_COLUMNS).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ra_deg, 128.0);
        assert_eq!(rows[0].dec_deg, 66.0);
        assert_eq!(rows[0].mag, Some(21.5));
        assert_eq!(rows[0].ang_size, 3.2);
        assert_eq!(rows[1].mag, None);
        assert!(rows[1].quality.is_nan());
    }

    #[test]
    fn reads_tab_separated_exports() {
        let file = write_catalog(
            "ra\tdec\trKronRad\tPan-STARRS_r\trPSFLikelihood\n128.0\t66.0\t2.0\t19.0\t0.001\n",
            ".tsv",
        );
        let rows = read_candidates_csv(file.path(), &PANSTARRS_COLUMNS).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mag, Some(19.0));
    }

    #[test]
    fn missing_column_is_a_retrieval_error() {
        let file = write_catalog("ra,dec,rKronRad\n1,2,3\n", ".csv");
        let center = SkyCoord::new(1.0, 2.0).unwrap();
        let err = CsvCatalog::new(file.path())
            .retrieve(&center, 5.0, &PANSTARRS_COLUMNS)
            .unwrap_err();
        match err {
            HostPathError::CatalogRetrieval { reason, .. } => {
                assert!(reason.contains("Pan-STARRS_r"), "{reason}")
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn garbled_cell_is_a_retrieval_error() {
        let file = write_catalog(
            "ra,dec,rKronRad,Pan-STARRS_r,rPSFLikelihood\n\
             1.0,2.0,3.0,20.0,0.001\n\
             1.0,2.0,3.0abc,20.0,0.001\n",
            ".csv",
        );
        let center = SkyCoord::new(1.0, 2.0).unwrap();
        let err = CsvCatalog::new(file.path())
            .retrieve(&center, 5.0, &PANSTARRS_COLUMNS)
            .unwrap_err();
        match err {
            HostPathError::CatalogRetrieval { reason, .. } => {
                assert!(reason.contains("row 2"), "{reason}");
                assert!(reason.contains("rKronRad"), "{reason}");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn garbled_magnitude_is_not_treated_as_missing() {
        let file = write_catalog(
            "ra,dec,rKronRad,Pan-STARRS_r,rPSFLikelihood\n1.0,2.0,3.0,n/a,0.001\n",
            ".csv",
        );
        assert!(read_candidates_csv(file.path(), &PANSTARRS_COLUMNS).is_err());
    }

    #[test]
    fn unreadable_file_is_a_retrieval_error() {
        let center = SkyCoord::new(1.0, 2.0).unwrap();
        let err = CsvCatalog::new("/nonexistent/catalog.csv")
            .retrieve(&center, 5.0, &PANSTARRS_COLUMNS)
            .unwrap_err();
        assert!(matches!(err, HostPathError::CatalogRetrieval { .. }));
    }
}
