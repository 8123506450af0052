use geo::{Area, BoundingRect, Coord, LineString, Point};
use serde::Serialize;

use crate::error::{Error, Result};

/// Axis-aligned bounds of a polygon. Every bound is attained by a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

/// A single closed ring, loaded and ready for containment queries.
///
/// Coordinates follow the `x = latitude`, `y = longitude` convention used by
/// the whole crate. The ring is open in memory: the last vertex connects back
/// to the first without being repeated.
///
/// There is no "unloaded" polygon. The only ways to obtain one are
/// [`Polygon::from_vertices`] and [`crate::load_boundary`], which both
/// validate the ring and cache its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Coord<f64>>,
    // previous[i] is the vertex before vertices[i], wrapping around.
    previous: Vec<Coord<f64>>,
    bounding_box: BoundingBox,
}

impl Polygon {
    pub fn from_vertices(vertices: Vec<Coord<f64>>) -> Result<Self> {
        if let Some(v) = vertices.iter().find(|v| !v.x.is_finite() || !v.y.is_finite()) {
            return Err(Error::InvalidBoundary(format!(
                "vertex ({}, {}) is not finite",
                v.x, v.y
            )));
        }

        let distinct = vertices
            .iter()
            .enumerate()
            .filter(|(i, v)| !vertices[..*i].contains(v))
            .count();
        if distinct < 3 {
            return Err(Error::InvalidBoundary(format!(
                "a polygon needs at least 3 distinct vertices, got {distinct}"
            )));
        }

        let rect = LineString::from(vertices.clone())
            .bounding_rect()
            .ok_or_else(|| Error::InvalidBoundary("empty ring".to_string()))?;
        let bounding_box = BoundingBox {
            min_x: rect.min().x,
            max_x: rect.max().x,
            min_y: rect.min().y,
            max_y: rect.max().y,
        };
        if bounding_box.width() <= 0.0 || bounding_box.height() <= 0.0 {
            return Err(Error::InvalidBoundary(
                "bounding box has zero width or height".to_string(),
            ));
        }
        // Spans past f64::MAX overflow to infinity and cannot be sampled.
        if !bounding_box.width().is_finite() || !bounding_box.height().is_finite() {
            return Err(Error::InvalidBoundary(
                "bounding box is too large to sample".to_string(),
            ));
        }

        let mut previous = vertices.clone();
        previous.rotate_right(1);

        Ok(Self {
            vertices,
            previous,
            bounding_box,
        })
    }

    pub fn vertices(&self) -> &[Coord<f64>] {
        &self.vertices
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    /// Number of edges crossed by a horizontal ray leaving `point` towards -x.
    ///
    /// An edge is a candidate when exactly one endpoint lies strictly below
    /// the ray, so a vertex sitting on the ray is counted for one of its two
    /// edges only, and horizontal edges are never counted.
    pub fn crossings(&self, point: Point<f64>) -> usize {
        let (qx, qy) = point.x_y();
        self.vertices
            .iter()
            .zip(&self.previous)
            .filter(|(cur, prev)| {
                (cur.y < qy) != (prev.y < qy)
                    && (cur.x <= qx || prev.x <= qx)
                    && cur.x + (qy - cur.y) / (prev.y - cur.y) * (prev.x - cur.x) < qx
            })
            .count()
    }

    /// Crossing-number containment test.
    ///
    /// Points lying exactly on an edge may be reported either way.
    pub fn contains(&self, point: Point<f64>) -> bool {
        self.crossings(point) % 2 == 1
    }

    /// Probability that a uniform draw in the bounding box lands inside.
    pub fn acceptance_ratio(&self) -> f64 {
        self.to_geo().unsigned_area() / self.bounding_box.area()
    }

    pub fn to_geo(&self) -> geo::Polygon<f64> {
        geo::Polygon::new(LineString::from(self.vertices.clone()), Vec::new())
    }
}
