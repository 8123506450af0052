use std::num::NonZeroUsize;

use geo::Point;
use rand::Rng;

use crate::error::{Error, Result};
use crate::polygon::{BoundingBox, Polygon};

pub fn random_point_in_bounds<R: Rng>(rng: &mut R, bounds: BoundingBox) -> Point<f64> {
    let x = rng.random_range(bounds.min_x..bounds.max_x);
    let y = rng.random_range(bounds.min_y..bounds.max_y);
    Point::new(x, y)
}

/// Draws points uniformly in the bounding box until one lands inside.
///
/// Each draw succeeds with probability [`Polygon::acceptance_ratio`], so a
/// thin sliver of a polygon can keep this looping for a very long time. Use
/// [`try_random_point_in_polygon`] when that matters.
pub fn random_point_in_polygon<R: Rng>(rng: &mut R, polygon: &Polygon) -> Point<f64> {
    let bounds = polygon.bounding_box();
    loop {
        let random_point = random_point_in_bounds(rng, bounds);
        if polygon.contains(random_point) {
            return random_point;
        }
    }
}

pub fn try_random_point_in_polygon<R: Rng>(
    rng: &mut R,
    polygon: &Polygon,
    max_attempts: NonZeroUsize,
) -> Result<Point<f64>> {
    let bounds = polygon.bounding_box();
    for _ in 0..max_attempts.get() {
        let random_point = random_point_in_bounds(rng, bounds);
        if polygon.contains(random_point) {
            return Ok(random_point);
        }
    }
    Err(Error::SamplingTimeout {
        attempts: max_attempts.get(),
    })
}
