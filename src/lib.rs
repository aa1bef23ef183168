//! # hostpath
//!
//! Probabilistic **host-galaxy association** for localized transients such as
//! fast radio bursts.
//!
//! Given an elliptical sky localization and a catalog of nearby galaxies from
//! a public imaging survey, `hostpath` computes for each candidate galaxy the
//! posterior probability P(O|x) that it is the host, plus the probability
//! P(U|x) that the host is not in the catalog at all.
//!
//! ## Example
//!
//! ```no_run
//! use hostpath::{
//!     parse_localization, run_association, AssociationConfig, AssociationRequest,
//!     CsvCatalog, FilterRegistry,
//! };
//!
//! let localization = parse_localization("ellipse", "128.68005,66.01075", "11,11,0").unwrap();
//! let request = AssociationRequest {
//!     config: AssociationConfig::with_unseen_prior(0.2),
//!     ..AssociationRequest::new(localization)
//! };
//!
//! let catalog = CsvCatalog::new("data/panstarrs_field.csv");
//! let result = run_association(&request, &catalog, &FilterRegistry::default()).unwrap();
//!
//! let best = result.best().unwrap();
//! println!("Most probable host at ({}, {}) with P(O|x) = {:.3}",
//!     best.candidate.ra_deg, best.candidate.dec_deg, best.p_ox);
//! println!("P(U|x) = {:.3}", result.p_ux);
//! ```
//!
//! ## Pipeline
//!
//! 1. **Localization**: parse the coordinate string and `a,b,pa` ellipse
//!    parameters into a [`SkyLocalization`].
//! 2. **Retrieval**: fetch survey photometry within the search radius through a
//!    [`CatalogRetriever`].
//! 3. **Filtering**: drop saturated, unmeasured and star-like rows with the
//!    survey's [`CatalogFilterPolicy`]. Unregistered surveys are an error.
//! 4. **Box size**: `max(30", 10 × largest angular size)`.
//! 5. **Association**: configure the [`PathEngine`] in its required order
//!    (localization, candidates, candidate prior, offset prior, priors,
//!    posteriors).
//! 6. **Ranking**: stable sort by descending P(O|x), optional CSV/TSV export.
//!
//! The posterior model follows the PATH formalism (Aggarwal et al. 2021).

pub mod candidate;
pub mod catalogs;
pub mod coord;
pub mod engine;
pub mod error;
pub mod filter;
pub mod localization;
pub mod pipeline;
pub mod radius;
pub mod ranking;

pub use candidate::{CandidateSet, SurveyCandidate};
pub use catalogs::{CatalogRetriever, CsvCatalog, StaticCatalog, SurveyColumns};
pub use coord::{parse_coord, SkyCoord};
pub use engine::{
    CandidatePrior, CandidatePriorPolicy, EngineState, LocalGrid, OffsetPrior, OffsetPriorFamily,
    PathEngine, PosteriorMethod, Posteriors,
};
pub use error::{HostPathError, Result};
pub use filter::{CatalogFilterPolicy, FilterRegistry, PanStarrsFilter, PANSTARRS_COLUMNS};
pub use localization::{parse_localization, EllipseShape, SkyLocalization};
pub use pipeline::{associate, run_association, Association, AssociationConfig, AssociationRequest};
pub use radius::box_halfwidth;
pub use ranking::{export, rank, render_table, AssociationResult, OutputFormat, RankedCandidate};
