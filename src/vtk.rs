//! VTK XML PolyData (`.vtp`) reader and writer.
//!
//! Implements the ASCII subset of the format the s-rep tooling exchanges:
//! one `Piece` holding 3-D point positions plus named per-point float
//! arrays. Connectivity sections (verts, lines, strips, polys) are written
//! empty and ignored on read.

use std::fs;
use std::path::Path;

use glam::DVec3;
use tracing::warn;

use crate::util::{Error, Result};
use crate::xml::Element;

/// A named per-point attribute array with a fixed number of components.
///
/// Data is stored flat: tuple `i` occupies
/// `data[i*components .. (i+1)*components]`.
#[derive(Clone, Debug, PartialEq)]
pub struct DataArray {
    pub name: String,
    pub components: usize,
    pub data: Vec<f64>,
}

impl DataArray {
    /// Create an empty array.
    pub fn new(name: impl Into<String>, components: usize) -> Self {
        Self { name: name.into(), components, data: Vec::new() }
    }

    /// Number of tuples held.
    pub fn num_tuples(&self) -> usize {
        if self.components == 0 {
            0
        } else {
            self.data.len() / self.components
        }
    }

    /// Components of tuple `i`. Panics if out of range.
    pub fn tuple(&self, i: usize) -> &[f64] {
        &self.data[i * self.components..(i + 1) * self.components]
    }
}

/// An in-memory point set: ordered positions plus named point attributes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolyData {
    pub points: Vec<DVec3>,
    pub point_data: Vec<DataArray>,
}

impl PolyData {
    /// Number of points.
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Look up a point attribute array by name.
    pub fn array(&self, name: &str) -> Option<&DataArray> {
        self.point_data.iter().find(|a| a.name == name)
    }

    /// Drop the attribute array with the given name, if present.
    pub fn remove_array(&mut self, name: &str) {
        self.point_data.retain(|a| a.name != name);
    }

    /// Add an attribute array, replacing any existing array of the same name.
    pub fn set_array(&mut self, array: DataArray) {
        self.remove_array(&array.name);
        self.point_data.push(array);
    }

    /// Read a `.vtp` document from disk.
    ///
    /// A file whose `PointData` holds no arrays loads successfully with a
    /// warning; consumers that need a specific attribute fail later when
    /// they look it up.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let root = Element::parse(&text)?;

        if root.tag != "VTKFile" {
            return Err(Error::parse(format!("expected <VTKFile> root, got <{}>", root.tag)));
        }
        if let Some(kind) = root.attr("type") {
            if kind != "PolyData" {
                return Err(Error::parse(format!("unsupported VTKFile type: {kind}")));
            }
        }
        let piece = root
            .child("PolyData")
            .and_then(|p| p.child("Piece"))
            .ok_or_else(|| Error::parse("missing <PolyData>/<Piece> element"))?;

        let num_points: usize = match piece.attr("NumberOfPoints") {
            Some(n) => n
                .parse()
                .map_err(|_| Error::parse(format!("invalid NumberOfPoints: {n}")))?,
            None => return Err(Error::parse("missing NumberOfPoints attribute")),
        };

        let coords_el = piece
            .child("Points")
            .and_then(|p| p.child("DataArray"))
            .ok_or_else(|| Error::parse("missing <Points> coordinate array"))?;
        let coords = parse_values(coords_el)?;
        if coords.len() != num_points * 3 {
            return Err(Error::parse(format!(
                "coordinate array holds {} values, expected {} for {} points",
                coords.len(),
                num_points * 3,
                num_points
            )));
        }
        let points = coords
            .chunks_exact(3)
            .map(|c| DVec3::new(c[0], c[1], c[2]))
            .collect();

        let mut point_data = Vec::new();
        if let Some(pd) = piece.child("PointData") {
            for array_el in pd.children_named("DataArray") {
                let name = array_el
                    .attr("Name")
                    .ok_or_else(|| Error::parse("point attribute array without a Name"))?
                    .to_string();
                let components: usize = match array_el.attr("NumberOfComponents") {
                    Some(c) => c.parse().map_err(|_| {
                        Error::parse(format!("invalid NumberOfComponents on '{name}': {c}"))
                    })?,
                    None => 1,
                };
                let data = parse_values(array_el)?;
                if data.len() != num_points * components {
                    return Err(Error::parse(format!(
                        "attribute '{name}' holds {} values, expected {} for {} points",
                        data.len(),
                        num_points * components,
                        num_points
                    )));
                }
                point_data.push(DataArray { name, components, data });
            }
        }
        if point_data.is_empty() {
            warn!("file {} does not contain point data", path.display());
        }

        Ok(Self { points, point_data })
    }

    /// Write as a pretty-printed ASCII `.vtp` document.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut root = Element::new("VTKFile");
        root.set_attr("type", "PolyData");
        root.set_attr("version", "0.1");
        root.set_attr("byte_order", "LittleEndian");

        let mut piece = Element::new("Piece");
        piece.set_attr("NumberOfPoints", self.num_points().to_string());
        for section in ["NumberOfVerts", "NumberOfLines", "NumberOfStrips", "NumberOfPolys"] {
            piece.set_attr(section, "0");
        }

        let mut point_data = Element::new("PointData");
        // Mark the first vector/scalar arrays active, as the original writer does.
        if let Some(a) = self.point_data.iter().find(|a| a.components == 3) {
            point_data.set_attr("Vectors", a.name.clone());
        }
        if let Some(a) = self.point_data.iter().find(|a| a.components == 1) {
            point_data.set_attr("Scalars", a.name.clone());
        }
        for array in &self.point_data {
            let mut el = Element::new("DataArray");
            el.set_attr("type", "Float64");
            el.set_attr("Name", array.name.clone());
            el.set_attr("NumberOfComponents", array.components.to_string());
            el.set_attr("format", "ascii");
            el.text = format_values(&array.data);
            point_data.push(el);
        }
        piece.push(point_data);

        let mut coords = Element::new("DataArray");
        coords.set_attr("type", "Float64");
        coords.set_attr("NumberOfComponents", "3");
        coords.set_attr("format", "ascii");
        let flat: Vec<f64> = self.points.iter().flat_map(|p| [p.x, p.y, p.z]).collect();
        coords.text = format_values(&flat);
        let mut points = Element::new("Points");
        points.push(coords);
        piece.push(points);

        let mut poly = Element::new("PolyData");
        poly.push(piece);
        root.push(poly);

        fs::write(path, root.pretty())?;
        Ok(())
    }
}

/// Parse the whitespace-separated float payload of a `DataArray` element.
fn parse_values(el: &Element) -> Result<Vec<f64>> {
    if let Some(format) = el.attr("format") {
        if format != "ascii" {
            return Err(Error::parse(format!("unsupported DataArray format: {format}")));
        }
    }
    if let Some(kind) = el.attr("type") {
        if kind != "Float32" && kind != "Float64" {
            return Err(Error::parse(format!("unsupported DataArray type: {kind}")));
        }
    }
    el.text
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f64>()
                .map_err(|_| Error::parse(format!("invalid float value: {tok}")))
        })
        .collect()
}

fn format_values(values: &[f64]) -> String {
    let mut out = String::new();
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&v.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn sample() -> PolyData {
        let mut poly = PolyData {
            points: vec![
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(1.0, 2.0, 3.0),
                DVec3::new(-1.5, 0.25, 4.0),
            ],
            point_data: Vec::new(),
        };
        poly.set_array(DataArray {
            name: "spokeDirection".into(),
            components: 3,
            data: vec![0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0],
        });
        poly.set_array(DataArray {
            name: "spokeLength".into(),
            components: 1,
            data: vec![1.0, 2.0, 0.5],
        });
        poly
    }

    #[test]
    fn test_write_and_read() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let poly = sample();
        poly.write(temp.path())?;

        let loaded = PolyData::read(temp.path())?;
        assert_eq!(loaded, poly);
        assert_eq!(loaded.array("spokeLength").unwrap().num_tuples(), 3);
        assert_eq!(loaded.array("spokeDirection").unwrap().tuple(1), &[0.0, 1.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_read_missing_file() {
        let err = PolyData::read("/no/such/file.vtp").unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_read_no_point_data() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let poly = PolyData { points: sample().points, point_data: Vec::new() };
        poly.write(temp.path())?;

        let loaded = PolyData::read(temp.path())?;
        assert_eq!(loaded.num_points(), 3);
        assert!(loaded.point_data.is_empty());
        assert!(loaded.array("spokeDirection").is_none());
        Ok(())
    }

    #[test]
    fn test_read_rejects_binary_format() {
        let doc = "<VTKFile type=\"PolyData\"><PolyData><Piece NumberOfPoints=\"1\">\
                   <Points><DataArray type=\"Float64\" NumberOfComponents=\"3\" format=\"binary\">AAAA</DataArray></Points>\
                   </Piece></PolyData></VTKFile>";
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), doc).unwrap();
        let err = PolyData::read(temp.path()).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_read_rejects_count_mismatch() {
        let doc = "<VTKFile type=\"PolyData\"><PolyData><Piece NumberOfPoints=\"2\">\
                   <Points><DataArray NumberOfComponents=\"3\">0 0 0</DataArray></Points>\
                   </Piece></PolyData></VTKFile>";
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), doc).unwrap();
        let err = PolyData::read(temp.path()).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_set_array_replaces() {
        let mut poly = sample();
        assert_eq!(poly.point_data.len(), 2);
        poly.set_array(DataArray { name: "spokeLength".into(), components: 1, data: vec![9.0, 9.0, 9.0] });
        assert_eq!(poly.point_data.len(), 2);
        assert_eq!(poly.array("spokeLength").unwrap().data, vec![9.0, 9.0, 9.0]);
    }
}
