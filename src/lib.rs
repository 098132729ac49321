//! # srep
//!
//! Rust implementation of the SALT s-rep skeletal shape representation
//! format used in medical shape analysis.
//!
//! An s-rep on disk is a `header.xml` referencing three point-set files
//! (up, down, crest spokes). Each spoke is a directed segment from a
//! medial point to a boundary point, stored as the medial point plus a
//! unit direction and a length. This crate loads the triplet, derives the
//! boundary points, lets a consumer edit the arrays in place, reconciles
//! the two spoke representations, and writes the triplet back.
//!
//! ## Modules
//!
//! - [`util`] - Error types
//! - [`xml`] - Minimal XML element tree (parser + pretty printer)
//! - [`vtk`] - VTK XML PolyData (`.vtp`) point-set reader/writer
//! - [`srep`] - The s-rep data model ([`SRep`], [`SpokeCollection`])
//!
//! ## Example
//!
//! ```ignore
//! use srep::SRep;
//!
//! let mut model = SRep::load("test_objects/201295/header.xml")?;
//!
//! // Push every up-side boundary point twice as far out.
//! for i in 0..model.up().len() {
//!     let p = model.up().medial_points()[i]
//!         + 2.0 * model.up().lengths()?[i] * model.up().directions()?[i];
//!     model.up_mut().boundary_points_mut()[i] = p;
//! }
//!
//! // save() reconstructs directions/lengths from the edited points.
//! model.save("test_objects/testoutput")?;
//! ```

pub mod srep;
pub mod util;
pub mod vtk;
pub mod xml;

// Re-export commonly used types
pub use srep::{Header, SRep, SpokeCollection, SpokeKind, SPOKE_DIRECTION, SPOKE_LENGTH};
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::srep::{Header, SRep, SpokeCollection, SpokeKind};
    pub use crate::util::{Error, Result};
    pub use crate::vtk::{DataArray, PolyData};
}
