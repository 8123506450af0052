use std::path::Path;

use geo::{Coord, coord};
use tracing::debug;

use crate::error::{Error, Result};
use crate::polygon::Polygon;

/// Parses the `<coordinates>` text of a KML polygon into a [`Polygon`].
///
/// The text is a whitespace separated list of `lon,lat[,elevation]` tuples,
/// as exported by Google Earth when tracing a region by hand. Vertices are
/// stored as `(x, y) = (lat, lon)`. KML repeats the first vertex at the end
/// of the ring, so the last parsed tuple is always dropped, whatever its
/// value.
pub fn load_boundary(coordinates: &str) -> Result<Polygon> {
    let mut vertices = coordinates
        .split_whitespace()
        .enumerate()
        .map(|(i, tuple)| parse_tuple(i, tuple))
        .collect::<Result<Vec<_>>>()?;

    vertices.pop();

    let polygon = Polygon::from_vertices(vertices)?;
    debug!(
        vertices = polygon.vertices().len(),
        bounding_box = ?polygon.bounding_box(),
        "loaded boundary"
    );
    Ok(polygon)
}

pub fn load_boundary_file(path: impl AsRef<Path>) -> Result<Polygon> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|err| {
        Error::InvalidBoundary(format!("cannot read {}: {err}", path.display()))
    })?;
    load_boundary(&text)
}

fn parse_tuple(index: usize, tuple: &str) -> Result<Coord<f64>> {
    let fields = tuple
        .split(',')
        .map(|field| {
            field.trim().parse::<f64>().map_err(|err| {
                Error::InvalidBoundary(format!("tuple #{index} ({tuple:?}): {err}"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    match fields[..] {
        [lon, lat] | [lon, lat, _] => Ok(coord! { x: lat, y: lon }),
        _ => Err(Error::InvalidBoundary(format!(
            "tuple #{index} ({tuple:?}) has {} fields, expected 2 or 3",
            fields.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = "0,0,0 0,1,0 1,1,0 1,0,0 0,0,0";

    #[test]
    fn round_trip_drops_closing_vertex() {
        // (x, y) = (lat, lon), so "lon,lat" tuples are written swapped.
        let polygon = load_boundary("0,0,0 0,1,0 1,1,0 1,0,0 0,0,0").unwrap();
        assert_eq!(
            polygon.vertices(),
            &[
                coord! { x: 0.0, y: 0.0 },
                coord! { x: 1.0, y: 0.0 },
                coord! { x: 1.0, y: 1.0 },
                coord! { x: 0.0, y: 1.0 },
            ]
        );
    }

    #[test]
    fn axes_are_swapped() {
        let polygon =
            load_boundary("-122.49,37.68,0 -122.38,37.70,0 -122.45,37.80,0 -122.49,37.68,0")
                .unwrap();
        let bb = polygon.bounding_box();
        assert_eq!((bb.min_x, bb.max_x), (37.68, 37.80));
        assert_eq!((bb.min_y, bb.max_y), (-122.49, -122.38));
    }

    #[test]
    fn load_is_idempotent() {
        let a = load_boundary(SQUARE).unwrap();
        let b = load_boundary(SQUARE).unwrap();
        assert_eq!(a.vertices(), b.vertices());
        assert_eq!(a.bounding_box(), b.bounding_box());
    }

    #[test]
    fn accepts_newlines_and_missing_elevation() {
        let polygon = load_boundary("\n  0,0\n 0,2,0\n\t2,2 2,0,0\n0,0").unwrap();
        assert_eq!(polygon.vertices().len(), 4);
    }

    #[test]
    fn last_tuple_is_always_dropped() {
        let polygon = load_boundary("0,0,0 0,1,0 1,1,0 1,0,0").unwrap();
        assert_eq!(
            polygon.vertices(),
            &[
                coord! { x: 0.0, y: 0.0 },
                coord! { x: 1.0, y: 0.0 },
                coord! { x: 1.0, y: 1.0 },
            ]
        );

        // Three tuples leave an open ring of two vertices.
        assert!(matches!(
            load_boundary("0,0,0 0,1,0 1,1,0"),
            Err(Error::InvalidBoundary(_))
        ));
    }

    #[test]
    fn rejects_bad_input() {
        for text in [
            "",
            "0,0,0 1,1,0 0,0,0",
            "0,0,0 0,1,0 a,1,0 0,0,0",
            "0,0,0 0,1,0 1,1,0,5 0,0,0",
            "0 0,1,0 1,1,0",
            "0,0,0 0,inf,0 1,1,0",
        ] {
            assert!(
                matches!(load_boundary(text), Err(Error::InvalidBoundary(_))),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn missing_file_is_invalid_boundary() {
        let err = load_boundary_file("/nonexistent/boundary.kml").unwrap_err();
        assert!(matches!(err, Error::InvalidBoundary(_)));
    }
}
