//! # cratersort
//!
//! Crater-identity reconciliation and dataset curation for training a crater
//! **degradation-state** classifier on top of a YOLO-style crater detector.
//!
//! The detector's training tiles are labeled with crater identifiers from
//! revision 1 of the Robbins Mars crater database. Degradation states only
//! exist in revision 2, which uses a different identifier scheme. `cratersort`
//! bridges the two revisions through crater coordinates, then turns the
//! detector dataset into a classifier dataset.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use cratersort::{build_dictionary, load_catalogs, curate, CurateConfig, IdentityResolver};
//!
//! // Reconcile catalog v1 identifiers found in the labels with catalog v2
//! let (v1, v2) = load_catalogs("data/Robbins_v1.csv", "data/Robbins_v2.csv").unwrap();
//! let resolver = IdentityResolver::new(&v1, &v2);
//! let (dictionary, report) = build_dictionary(Path::new("data/labels"), &resolver).unwrap();
//! dictionary.save_csv("crater_dictionary.csv").unwrap();
//! println!("{} craters, {} missed", dictionary.len(), report.missed_count());
//!
//! // Keep the lowest-loss half of the tiles, clean them, and rewrite labels
//! let config = CurateConfig {
//!     dictionary: "crater_dictionary.csv".into(),
//!     loss_table: "loss_rank.csv".into(),
//!     threshold: 0.5,
//!     source_dir: "data".into(),
//!     dest: "classifier".into(),
//!     clean: true,
//! };
//! let summary = curate(&config).unwrap();
//! println!("{} images curated", summary.materialized);
//! ```
//!
//! ## Pipeline
//!
//! 1. **Catalog store**: index catalog v1 by id and catalog v2 by id and by
//!    coordinate ([`cratercatalog`])
//! 2. **Identity resolution**: v1 id → coordinates → v2 id → degradation
//!    state ([`resolver`])
//! 3. **Dictionary**: resolve every identifier in a label corpus and persist
//!    the result ([`dictionary`])
//! 4. **Curation**: loss-quantile tile selection, optional clean filter, and
//!    label rewriting ([`curator`])
//!
//! Tiles are 1°×1° mosaic cells named after their north-west corner
//! ([`tile_name`]).

/// Raw crater catalogs; currently the Robbins database revisions
pub mod catalogs;
mod crater;
pub mod cratercatalog;
pub mod curator;
pub mod dictionary;
pub mod labels;
pub mod lists;
pub mod resolver;
mod tile;

pub use catalogs::robbins::{CatalogRecordV1, CatalogRecordV2};
pub use catalogs::CatalogLoadError;
pub use crater::*;
pub use cratercatalog::{load_catalogs, V1Index, V2Index};
pub use curator::{curate, curate_table, CurateConfig, CurateError, CurationSummary, TileFailure};
pub use dictionary::{build_dictionary, BuildReport, DictionaryTable, MissedCrater};
pub use labels::LabelLine;
pub use resolver::{CoordinateMatch, IdentityResolver, ResolveError, ResolveStatus};
pub use tile::*;
