//! The s-rep data model.
//!
//! A skeletal representation is stored on disk as a `header.xml` naming
//! three point-set files (up, down, crest). Each file carries the medial
//! points of its spokes plus two point attributes: `spokeDirection` (unit
//! 3-vector) and `spokeLength` (scalar radius). The boundary point of
//! spoke `i` is `medial[i] + length[i] * direction[i]`.
//!
//! [`SRep::load`] reads the triplet, [`SRep::save`] writes it back.
//! Between the two, a consumer may edit the medial/boundary point arrays
//! (or the direction/length arrays) in place; [`SRep::reconstruct`] is the
//! single point that re-derives direction/length from the point pairs.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use glam::DVec3;
use tracing::info;

use crate::util::{Error, Result};
use crate::vtk::{DataArray, PolyData};
use crate::xml::Element;

/// Name of the per-point direction attribute (3 components).
pub const SPOKE_DIRECTION: &str = "spokeDirection";
/// Name of the per-point length attribute (1 component).
pub const SPOKE_LENGTH: &str = "spokeLength";

/// The three disjoint spoke collections partitioning a skeletal
/// representation: up and down cover the two sides of the medial sheet,
/// crest covers its rim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpokeKind {
    Up,
    Down,
    Crest,
}

impl SpokeKind {
    /// All three kinds, in header order.
    pub const ALL: [SpokeKind; 3] = [SpokeKind::Up, SpokeKind::Down, SpokeKind::Crest];

    /// File name this collection is written under.
    pub fn file_name(self) -> &'static str {
        match self {
            SpokeKind::Up => "up.vtp",
            SpokeKind::Down => "down.vtp",
            SpokeKind::Crest => "crest.vtp",
        }
    }

    fn header_tag(self) -> &'static str {
        match self {
            SpokeKind::Up => "upSpoke",
            SpokeKind::Down => "downSpoke",
            SpokeKind::Crest => "crestSpoke",
        }
    }
}

impl fmt::Display for SpokeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpokeKind::Up => "up",
            SpokeKind::Down => "down",
            SpokeKind::Crest => "crest",
        };
        f.write_str(name)
    }
}

/// Parsed `header.xml` contents.
///
/// `n_rows`/`n_cols` describe how the up/down medial points tile a
/// rectangular grid. They are bookkeeping only and are never checked
/// against the actual point counts.
#[derive(Clone, Debug)]
pub struct Header {
    pub n_rows: u32,
    pub n_cols: u32,
    up_spoke: PathBuf,
    down_spoke: PathBuf,
    crest_spoke: PathBuf,
}

impl Header {
    /// Parse a header document, resolving spoke file references against
    /// the header's containing directory.
    fn parse(root: &Element, header_dir: &Path) -> Result<Self> {
        let spoke = |tag: &str| -> Result<PathBuf> {
            root.child(tag)
                .map(|el| header_dir.join(&el.text))
                .ok_or_else(|| Error::parse(format!("header missing <{tag}> element")))
        };
        Ok(Self {
            n_rows: parse_count(root, "nRows")?,
            n_cols: parse_count(root, "nCols")?,
            up_spoke: spoke("upSpoke")?,
            down_spoke: spoke("downSpoke")?,
            crest_spoke: spoke("crestSpoke")?,
        })
    }

    /// Resolved path of the given collection's source file.
    pub fn spoke_path(&self, kind: SpokeKind) -> &Path {
        match kind {
            SpokeKind::Up => &self.up_spoke,
            SpokeKind::Down => &self.down_spoke,
            SpokeKind::Crest => &self.crest_spoke,
        }
    }

    /// Build the header document for output rooted at `folder`, with the
    /// cosmetic fields the format expects.
    fn to_element(&self, folder: &Path) -> Element {
        let mut root = Element::new("s-rep");
        root.push(Element::with_text("nRows", self.n_rows.to_string()));
        root.push(Element::with_text("nCols", self.n_cols.to_string()));
        root.push(Element::with_text("meshType", "Quad"));
        let mut color = Element::new("color");
        color.push(Element::with_text("red", "0"));
        color.push(Element::with_text("green", "0.5"));
        color.push(Element::with_text("blue", "0"));
        root.push(color);
        root.push(Element::with_text("isMean", "False"));
        root.push(Element::with_text("meanStatPath", ""));
        for kind in SpokeKind::ALL {
            let path = folder.join(kind.file_name());
            root.push(Element::with_text(kind.header_tag(), path.to_string_lossy()));
        }
        root
    }
}

fn parse_count(root: &Element, tag: &str) -> Result<u32> {
    match root.child(tag) {
        Some(el) => el
            .text
            .parse()
            .map_err(|_| Error::parse(format!("invalid <{tag}> value: {}", el.text))),
        None => Ok(0),
    }
}

/// One spoke collection: medial points plus per-spoke direction/length.
///
/// `boundary_points` is derived state, computed eagerly at load. Editing
/// `medial_points` or `boundary_points` does not update the direction and
/// length arrays (and vice versa); call [`SpokeCollection::reconstruct`]
/// to re-derive direction/length from the current point pairs.
///
/// The direction/length arrays are absent when the source file carried no
/// point attributes; accessing them then fails with
/// [`Error::MissingAttribute`].
#[derive(Clone, Debug)]
pub struct SpokeCollection {
    kind: SpokeKind,
    medial_points: Vec<DVec3>,
    directions: Option<Vec<DVec3>>,
    lengths: Option<Vec<f64>>,
    boundary_points: Vec<DVec3>,
    /// Attribute arrays other than spokeDirection/spokeLength, carried
    /// through save unchanged.
    extra_arrays: Vec<DataArray>,
}

impl SpokeCollection {
    fn from_poly(kind: SpokeKind, poly: &PolyData) -> Result<Self> {
        let directions: Option<Vec<DVec3>> = match poly.array(SPOKE_DIRECTION) {
            Some(a) if a.components != 3 => {
                return Err(Error::parse(format!(
                    "{SPOKE_DIRECTION} has {} components, expected 3",
                    a.components
                )));
            }
            Some(a) => Some(a.data.chunks_exact(3).map(|c| DVec3::new(c[0], c[1], c[2])).collect()),
            None => None,
        };
        let lengths = match poly.array(SPOKE_LENGTH) {
            Some(a) if a.components != 1 => {
                return Err(Error::parse(format!(
                    "{SPOKE_LENGTH} has {} components, expected 1",
                    a.components
                )));
            }
            Some(a) => Some(a.data.clone()),
            None => None,
        };

        let medial_points = poly.points.clone();
        let boundary_points = match (&directions, &lengths) {
            (Some(dirs), Some(lens)) => medial_points
                .iter()
                .zip(dirs.iter().zip(lens.iter()))
                .map(|(&m, (&d, &l))| m + l * d)
                .collect(),
            _ => Vec::new(),
        };
        let extra_arrays = poly
            .point_data
            .iter()
            .filter(|a| a.name != SPOKE_DIRECTION && a.name != SPOKE_LENGTH)
            .cloned()
            .collect();

        Ok(Self { kind, medial_points, directions, lengths, boundary_points, extra_arrays })
    }

    /// Which collection this is.
    pub fn kind(&self) -> SpokeKind {
        self.kind
    }

    /// Number of spokes.
    pub fn len(&self) -> usize {
        self.medial_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.medial_points.is_empty()
    }

    /// Medial (tail) points, index-aligned with the other arrays.
    pub fn medial_points(&self) -> &[DVec3] {
        &self.medial_points
    }

    /// Mutable medial points. A slice, so the collection cannot be resized.
    pub fn medial_points_mut(&mut self) -> &mut [DVec3] {
        &mut self.medial_points
    }

    /// Cached boundary points, as derived at load or by the last
    /// [`reconstruct`](Self::reconstruct). May be stale after a direct
    /// direction/length edit; [`boundary_point`](Self::boundary_point)
    /// recomputes instead.
    pub fn boundary_points(&self) -> &[DVec3] {
        &self.boundary_points
    }

    /// Mutable boundary points.
    pub fn boundary_points_mut(&mut self) -> &mut [DVec3] {
        &mut self.boundary_points
    }

    /// Unit spoke directions.
    pub fn directions(&self) -> Result<&[DVec3]> {
        self.directions.as_deref().ok_or_else(|| Error::missing(SPOKE_DIRECTION))
    }

    /// Mutable spoke directions.
    pub fn directions_mut(&mut self) -> Result<&mut [DVec3]> {
        self.directions.as_deref_mut().ok_or_else(|| Error::missing(SPOKE_DIRECTION))
    }

    /// Spoke lengths (radii).
    pub fn lengths(&self) -> Result<&[f64]> {
        self.lengths.as_deref().ok_or_else(|| Error::missing(SPOKE_LENGTH))
    }

    /// Mutable spoke lengths.
    pub fn lengths_mut(&mut self) -> Result<&mut [f64]> {
        self.lengths.as_deref_mut().ok_or_else(|| Error::missing(SPOKE_LENGTH))
    }

    /// Boundary point of spoke `i`, always recomputed from the current
    /// medial point, length, and direction. Use this instead of
    /// [`boundary_points`](Self::boundary_points) when the cached array
    /// may have drifted after a partial edit.
    pub fn boundary_point(&self, i: usize) -> Result<DVec3> {
        let count = self.len();
        if i >= count {
            return Err(Error::IndexOutOfBounds { index: i, count });
        }
        let direction = self.directions()?[i];
        let length = self.lengths()?[i];
        Ok(self.medial_points[i] + length * direction)
    }

    /// Re-derive `direction[i]` and `length[i]` from the current
    /// `medial_points[i]` / `boundary_points[i]` pair for every spoke.
    ///
    /// A zero-length spoke (coincident medial and boundary point) has no
    /// direction: its length is set to 0, its direction entry is left as
    /// it was, and the first such index is reported as
    /// [`Error::DegenerateSpoke`]. All other indices are still updated.
    pub fn reconstruct(&mut self) -> Result<()> {
        let n = self.medial_points.len();
        if self.boundary_points.len() != n {
            // Boundary points were never derived (source file lacked the
            // spoke attributes) and the caller has not filled them in.
            return Err(Error::missing(SPOKE_DIRECTION));
        }

        let mut directions = self.directions.take().unwrap_or_else(|| vec![DVec3::ZERO; n]);
        let mut lengths = self.lengths.take().unwrap_or_else(|| vec![0.0; n]);
        let mut degenerate = None;
        for i in 0..n {
            let delta = self.boundary_points[i] - self.medial_points[i];
            let length = delta.length();
            if length == 0.0 {
                lengths[i] = 0.0;
                if degenerate.is_none() {
                    degenerate = Some(i);
                }
            } else {
                directions[i] = delta / length;
                lengths[i] = length;
            }
        }
        self.directions = Some(directions);
        self.lengths = Some(lengths);

        match degenerate {
            Some(index) => Err(Error::DegenerateSpoke { kind: self.kind, index }),
            None => Ok(()),
        }
    }

    /// Assemble the point set for output: medial points as positions,
    /// fresh spokeDirection/spokeLength arrays, extra arrays carried
    /// through.
    fn to_poly(&self) -> Result<PolyData> {
        let directions = self.directions()?;
        let lengths = self.lengths()?;
        let mut poly =
            PolyData { points: self.medial_points.clone(), point_data: self.extra_arrays.clone() };
        poly.set_array(DataArray {
            name: SPOKE_DIRECTION.into(),
            components: 3,
            data: directions.iter().flat_map(|d| [d.x, d.y, d.z]).collect(),
        });
        poly.set_array(DataArray {
            name: SPOKE_LENGTH.into(),
            components: 1,
            data: lengths.to_vec(),
        });
        Ok(poly)
    }
}

/// An in-memory skeletal representation: the parsed header plus the up,
/// down, and crest spoke collections.
///
/// The three collections are independently sized but internally
/// index-aligned. There is no API for adding or removing spokes; index
/// correspondence established at load is assumed to stay valid across
/// edits.
#[derive(Clone, Debug)]
pub struct SRep {
    header: Header,
    up: SpokeCollection,
    down: SpokeCollection,
    crest: SpokeCollection,
}

impl SRep {
    /// Load an s-rep from its header file.
    ///
    /// Spoke file references are resolved relative to the header's
    /// directory, so loading works regardless of the process working
    /// directory. A spoke file without point attributes loads with a
    /// warning; its collection fails on first direction/length access.
    pub fn load(header_path: impl AsRef<Path>) -> Result<Self> {
        let header_path = header_path.as_ref();
        let text = fs::read_to_string(header_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(header_path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let root = Element::parse(&text)?;
        let header_dir = header_path.parent().unwrap_or_else(|| Path::new(""));
        let header = Header::parse(&root, header_dir)?;
        for kind in SpokeKind::ALL {
            info!("{} file: {}", kind.header_tag(), header.spoke_path(kind).display());
        }

        let load = |kind: SpokeKind| -> Result<SpokeCollection> {
            let poly = PolyData::read(header.spoke_path(kind))?;
            SpokeCollection::from_poly(kind, &poly)
        };
        let up = load(SpokeKind::Up)?;
        let down = load(SpokeKind::Down)?;
        let crest = load(SpokeKind::Crest)?;

        Ok(Self { header, up, down, crest })
    }

    /// The parsed header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The collection of the given kind.
    pub fn collection(&self, kind: SpokeKind) -> &SpokeCollection {
        match kind {
            SpokeKind::Up => &self.up,
            SpokeKind::Down => &self.down,
            SpokeKind::Crest => &self.crest,
        }
    }

    /// Mutable collection of the given kind.
    pub fn collection_mut(&mut self, kind: SpokeKind) -> &mut SpokeCollection {
        match kind {
            SpokeKind::Up => &mut self.up,
            SpokeKind::Down => &mut self.down,
            SpokeKind::Crest => &mut self.crest,
        }
    }

    pub fn up(&self) -> &SpokeCollection {
        &self.up
    }

    pub fn up_mut(&mut self) -> &mut SpokeCollection {
        &mut self.up
    }

    pub fn down(&self) -> &SpokeCollection {
        &self.down
    }

    pub fn down_mut(&mut self) -> &mut SpokeCollection {
        &mut self.down
    }

    pub fn crest(&self) -> &SpokeCollection {
        &self.crest
    }

    pub fn crest_mut(&mut self) -> &mut SpokeCollection {
        &mut self.crest
    }

    /// Freshly computed boundary point of spoke `i` in the given
    /// collection. See [`SpokeCollection::boundary_point`].
    pub fn boundary_point(&self, kind: SpokeKind, i: usize) -> Result<DVec3> {
        self.collection(kind).boundary_point(i)
    }

    /// Re-derive direction/length arrays from the current medial/boundary
    /// point pairs in all three collections. See
    /// [`SpokeCollection::reconstruct`].
    pub fn reconstruct(&mut self) -> Result<()> {
        self.up.reconstruct()?;
        self.down.reconstruct()?;
        self.crest.reconstruct()?;
        Ok(())
    }

    /// Write the representation into `folder`: `up.vtp`, `down.vtp`,
    /// `crest.vtp`, then `header.xml` referencing them by absolute path.
    ///
    /// Always reconstructs first, so the written attributes are consistent
    /// with the current point arrays. The header is written last, after
    /// all three spoke files exist. No cleanup of partial output is
    /// attempted on failure.
    pub fn save(&mut self, folder: impl AsRef<Path>) -> Result<()> {
        self.reconstruct()?;

        let folder = folder.as_ref();
        for kind in SpokeKind::ALL {
            let poly = self.collection(kind).to_poly()?;
            poly.write(folder.join(kind.file_name()))?;
        }

        let abs_folder = std::path::absolute(folder)?;
        let header_doc = self.header.to_element(&abs_folder);
        fs::write(folder.join("header.xml"), header_doc.pretty())?;
        info!("wrote s-rep to {}", folder.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poly(points: &[DVec3], dirs: &[DVec3], lens: &[f64]) -> PolyData {
        let mut poly = PolyData { points: points.to_vec(), point_data: Vec::new() };
        poly.set_array(DataArray {
            name: SPOKE_DIRECTION.into(),
            components: 3,
            data: dirs.iter().flat_map(|d| [d.x, d.y, d.z]).collect(),
        });
        poly.set_array(DataArray {
            name: SPOKE_LENGTH.into(),
            components: 1,
            data: lens.to_vec(),
        });
        poly
    }

    fn collection(kind: SpokeKind) -> SpokeCollection {
        let points = [DVec3::ZERO, DVec3::new(1.0, 0.0, 0.0)];
        let dirs = [DVec3::Z, DVec3::Y];
        let lens = [2.0, 0.5];
        SpokeCollection::from_poly(kind, &poly(&points, &dirs, &lens)).unwrap()
    }

    #[test]
    fn test_header_parse_defaults() {
        let doc = "<s-rep><upSpoke>u.vtp</upSpoke><downSpoke>d.vtp</downSpoke>\
                   <crestSpoke>c.vtp</crestSpoke></s-rep>";
        let root = Element::parse(doc).unwrap();
        let header = Header::parse(&root, Path::new("/data/case")).unwrap();
        assert_eq!(header.n_rows, 0);
        assert_eq!(header.n_cols, 0);
        assert_eq!(header.spoke_path(SpokeKind::Up), Path::new("/data/case/u.vtp"));
        assert_eq!(header.spoke_path(SpokeKind::Crest), Path::new("/data/case/c.vtp"));
    }

    #[test]
    fn test_header_parse_missing_spoke() {
        let doc = "<s-rep><nRows>3</nRows><upSpoke>u.vtp</upSpoke>\
                   <downSpoke>d.vtp</downSpoke></s-rep>";
        let root = Element::parse(doc).unwrap();
        let err = Header::parse(&root, Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("crestSpoke"));
    }

    #[test]
    fn test_header_parse_bad_count() {
        let doc = "<s-rep><nRows>three</nRows><upSpoke>u</upSpoke>\
                   <downSpoke>d</downSpoke><crestSpoke>c</crestSpoke></s-rep>";
        let root = Element::parse(doc).unwrap();
        assert!(matches!(Header::parse(&root, Path::new(".")), Err(Error::Parse(_))));
    }

    #[test]
    fn test_boundary_derived_at_load() {
        let c = collection(SpokeKind::Up);
        assert_eq!(c.len(), 2);
        assert_eq!(c.boundary_points()[0], DVec3::new(0.0, 0.0, 2.0));
        assert_eq!(c.boundary_points()[1], DVec3::new(1.0, 0.5, 0.0));
    }

    #[test]
    fn test_boundary_point_recomputes() {
        let mut c = collection(SpokeKind::Down);
        c.lengths_mut().unwrap()[0] = 4.0;
        // Cached array is untouched, the accessor is not.
        assert_eq!(c.boundary_points()[0], DVec3::new(0.0, 0.0, 2.0));
        assert_eq!(c.boundary_point(0).unwrap(), DVec3::new(0.0, 0.0, 4.0));
    }

    #[test]
    fn test_boundary_point_out_of_range() {
        let c = collection(SpokeKind::Up);
        let err = c.boundary_point(2).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfBounds { index: 2, count: 2 }));
    }

    #[test]
    fn test_missing_attributes_fail_lazily() {
        let bare = PolyData { points: vec![DVec3::ZERO], point_data: Vec::new() };
        let c = SpokeCollection::from_poly(SpokeKind::Crest, &bare).unwrap();
        assert_eq!(c.len(), 1);
        assert!(c.boundary_points().is_empty());
        assert!(matches!(c.directions(), Err(Error::MissingAttribute(_))));
        assert!(matches!(c.lengths(), Err(Error::MissingAttribute(_))));
        assert!(matches!(c.boundary_point(0), Err(Error::MissingAttribute(_))));
    }

    #[test]
    fn test_reconstruct_from_edited_boundary() {
        let mut c = collection(SpokeKind::Up);
        c.boundary_points_mut()[0] = DVec3::new(0.0, 3.0, 4.0);
        c.reconstruct().unwrap();
        assert!((c.lengths().unwrap()[0] - 5.0).abs() < 1e-12);
        let dir = c.directions().unwrap()[0];
        assert!((dir - DVec3::new(0.0, 0.6, 0.8)).length() < 1e-12);
        assert!((dir.length() - 1.0).abs() < 1e-12);
        // Untouched spoke keeps its values.
        assert!((c.lengths().unwrap()[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_reconstruct_degenerate() {
        let mut c = collection(SpokeKind::Crest);
        c.boundary_points_mut()[0] = c.medial_points()[0];
        let err = c.reconstruct().unwrap_err();
        assert!(
            matches!(err, Error::DegenerateSpoke { kind: SpokeKind::Crest, index: 0 }),
            "unexpected error: {err}"
        );
        // The degenerate spoke got length 0, the healthy one was updated.
        assert_eq!(c.lengths().unwrap()[0], 0.0);
        assert!((c.lengths().unwrap()[1] - 0.5).abs() < 1e-12);
        assert!((c.directions().unwrap()[1] - DVec3::Y).length() < 1e-12);
    }

    #[test]
    fn test_reconstruct_idempotent() {
        let mut c = collection(SpokeKind::Down);
        c.boundary_points_mut()[1] = DVec3::new(2.0, 2.0, 2.0);
        c.reconstruct().unwrap();
        let dirs: Vec<DVec3> = c.directions().unwrap().to_vec();
        let lens: Vec<f64> = c.lengths().unwrap().to_vec();
        c.reconstruct().unwrap();
        assert_eq!(c.directions().unwrap(), dirs.as_slice());
        assert_eq!(c.lengths().unwrap(), lens.as_slice());
    }

    #[test]
    fn test_reconstruct_without_boundary_points() {
        let bare = PolyData { points: vec![DVec3::ZERO], point_data: Vec::new() };
        let mut c = SpokeCollection::from_poly(SpokeKind::Up, &bare).unwrap();
        assert!(matches!(c.reconstruct(), Err(Error::MissingAttribute(_))));
    }

    #[test]
    fn test_to_poly_replaces_spoke_arrays_keeps_extras() {
        let mut source = poly(&[DVec3::ZERO], &[DVec3::Z], &[1.0]);
        source.set_array(DataArray { name: "quality".into(), components: 1, data: vec![0.9] });
        let mut c = SpokeCollection::from_poly(SpokeKind::Up, &source).unwrap();
        c.boundary_points_mut()[0] = DVec3::new(0.0, 0.0, 3.0);
        c.reconstruct().unwrap();

        let out = c.to_poly().unwrap();
        assert_eq!(out.array(SPOKE_LENGTH).unwrap().data, vec![3.0]);
        assert_eq!(out.array("quality").unwrap().data, vec![0.9]);
        // One array per name, no accumulation.
        assert_eq!(out.point_data.len(), 3);
    }

    #[test]
    fn test_header_to_element_layout() {
        let header = Header {
            n_rows: 3,
            n_cols: 8,
            up_spoke: PathBuf::from("u"),
            down_spoke: PathBuf::from("d"),
            crest_spoke: PathBuf::from("c"),
        };
        let root = header.to_element(Path::new("/out"));
        assert_eq!(root.tag, "s-rep");
        assert_eq!(root.child("nRows").unwrap().text, "3");
        assert_eq!(root.child("meshType").unwrap().text, "Quad");
        assert_eq!(root.child("color").unwrap().child("green").unwrap().text, "0.5");
        assert_eq!(root.child("isMean").unwrap().text, "False");
        assert_eq!(root.child("upSpoke").unwrap().text, "/out/up.vtp");
        assert_eq!(root.child("crestSpoke").unwrap().text, "/out/crest.vtp");
    }
}
