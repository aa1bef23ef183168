//! Ranking, display and export of association results.

use std::fmt::Write as _;
use std::path::Path;

use tracing::info;

use crate::candidate::SurveyCandidate;
use crate::error::{HostPathError, Result};

/// A candidate annotated with its prior and posterior.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub candidate: SurveyCandidate,
    /// Position of the candidate in the retrieved catalog order.
    pub retrieval_index: usize,
    /// P(O).
    pub p_o: f64,
    /// P(O|x).
    pub p_ox: f64,
}

/// Ranked output of one association run.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationResult {
    /// Candidates sorted by descending P(O|x).
    pub candidates: Vec<RankedCandidate>,
    /// P(U|x), shared by the whole run.
    pub p_ux: f64,
    /// Integration box half-width used for the run (arcsec).
    pub box_hwidth: f64,
}

impl AssociationResult {
    /// Most probable host, if any candidate survived.
    pub fn best(&self) -> Option<&RankedCandidate> {
        self.candidates.first()
    }
}

/// Zip candidates with their priors and posteriors and sort by descending
/// posterior. The sort is stable, so ties keep retrieval order.
pub fn rank(candidates: &[SurveyCandidate], p_o: &[f64], p_ox: &[f64]) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .iter()
        .zip(p_o.iter().zip(p_ox))
        .enumerate()
        .map(|(retrieval_index, (candidate, (&p_o, &p_ox)))| RankedCandidate {
            candidate: candidate.clone(),
            retrieval_index,
            p_o,
            p_ox,
        })
        .collect();
    ranked.sort_by(|a, b| b.p_ox.total_cmp(&a.p_ox));
    ranked
}

/// Delimited table formats accepted for export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Tsv,
}

impl OutputFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("csv") => Ok(OutputFormat::Csv),
            Some("tsv") => Ok(OutputFormat::Tsv),
            _ => Err(HostPathError::UnsupportedOutputFormat(
                path.display().to_string(),
            )),
        }
    }

    fn delimiter(&self) -> u8 {
        match self {
            OutputFormat::Csv => b',',
            OutputFormat::Tsv => b'\t',
        }
    }
}

const COLUMNS: [&str; 7] = ["ra", "dec", "ang_size", "mag", "P_O", "P_Ox", "P_Ux"];

fn fmt_mag(mag: Option<f64>) -> String {
    mag.map(|m| m.to_string()).unwrap_or_default()
}

/// Render the ranked table for terminal output.
pub fn render_table(result: &AssociationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4} {:>12} {:>12} {:>9} {:>8} {:>10} {:>10}",
        "", "ra", "dec", "ang_size", "mag", "P_O", "P_Ox"
    );
    for (rank, r) in result.candidates.iter().enumerate() {
        let mag = r
            .candidate
            .mag
            .map(|m| format!("{m:.3}"))
            .unwrap_or_else(|| "--".to_string());
        let _ = writeln!(
            out,
            "{:>4} {:>12.6} {:>12.6} {:>9.3} {:>8} {:>10.4e} {:>10.4e}",
            rank,
            r.candidate.ra_deg,
            r.candidate.dec_deg,
            r.candidate.ang_size,
            mag,
            r.p_o,
            r.p_ox
        );
    }
    let _ = writeln!(out, "P_Ux = {}", result.p_ux);
    out
}

/// Encode the ranked table in the given delimited format.
pub fn encode_table(result: &AssociationResult, format: OutputFormat) -> Result<Vec<u8>> {
    let to_err = |e: csv::Error| HostPathError::Export {
        path: "<buffer>".to_string(),
        reason: e.to_string(),
    };
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(format.delimiter())
        .from_writer(Vec::new());
    wtr.write_record(COLUMNS).map_err(to_err)?;
    for r in &result.candidates {
        let c = &r.candidate;
        wtr.write_record([
            c.ra_deg.to_string(),
            c.dec_deg.to_string(),
            c.ang_size.to_string(),
            fmt_mag(c.mag),
            r.p_o.to_string(),
            r.p_ox.to_string(),
            result.p_ux.to_string(),
        ])
        .map_err(to_err)?;
    }
    wtr.into_inner().map_err(|e| HostPathError::Export {
        path: "<buffer>".to_string(),
        reason: e.to_string(),
    })
}

/// Write the ranked table to `path`. The format comes from the extension.
///
/// The table is encoded in memory first, so an encoding failure never
/// leaves a partial file behind.
pub fn export(result: &AssociationResult, path: &Path) -> Result<()> {
    let format = OutputFormat::from_path(path)?;
    let bytes = encode_table(result, format)?;
    std::fs::write(path, &bytes).map_err(|e| HostPathError::Export {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    info!(
        "Wrote {} ranked candidates to {}",
        result.candidates.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(ra_deg: f64) -> SurveyCandidate {
        SurveyCandidate {
            ra_deg,
            dec_deg: 10.0,
            ang_size: 2.5,
            mag: Some(20.25),
            quality: 1e-4,
        }
    }

    fn sample() -> AssociationResult {
        let cands = vec![cand(1.0), cand(2.0), cand(3.0), cand(4.0)];
        AssociationResult {
            candidates: rank(&cands, &[0.2; 4], &[0.1, 0.5, 0.1, 0.2]),
            p_ux: 0.1,
            box_hwidth: 30.0,
        }
    }

    #[test]
    fn ranks_descending_with_stable_ties() {
        let result = sample();
        let order: Vec<usize> = result.candidates.iter().map(|r| r.retrieval_index).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
        assert_eq!(result.best().unwrap().candidate.ra_deg, 2.0);
    }

    #[test]
    fn output_format_follows_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("a.csv")).unwrap(), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_path(Path::new("a.TSV")).unwrap(), OutputFormat::Tsv);
        for bad in ["a.txt", "a", "a.csv.gz"] {
            assert!(matches!(
                OutputFormat::from_path(Path::new(bad)),
                Err(HostPathError::UnsupportedOutputFormat(_))
            ));
        }
    }

    #[test]
    fn exported_table_has_header_and_sorted_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ranked.csv");
        export(&sample(), &path).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, COLUMNS);
        let ras: Vec<f64> = rdr
            .records()
            .map(|r| r.unwrap()[0].parse().unwrap())
            .collect();
        assert_eq!(ras, vec![2.0, 4.0, 1.0, 3.0]);
    }

    #[test]
    fn tab_separated_encoding() {
        let mut result = sample();
        result.candidates[1].candidate.mag = None;
        let bytes = encode_table(&result, OutputFormat::Tsv).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], COLUMNS.join("\t"));
        assert_eq!(lines[1], "2\t10\t2.5\t20.25\t0.2\t0.5\t0.1");
        // Missing magnitude is an empty cell.
        assert_eq!(lines[2].split('\t').nth(3), Some(""));
        assert!(!text.contains(','));
    }

    #[test]
    fn unwritable_path_surfaces_an_error() {
        let err = export(&sample(), Path::new("/nonexistent/dir/out.csv")).unwrap_err();
        assert!(matches!(err, HostPathError::Export { .. }));
    }

    #[test]
    fn table_lists_unseen_posterior() {
        let table = render_table(&sample());
        assert_eq!(table.lines().count(), 6);
        assert!(table.ends_with("P_Ux = 0.1\n"));
    }
}
