//! Points and the bounds they are normalized against.

use serde::Serialize;

/// A single addressable point.
///
/// `index` is the identity of the point in the model it was first created
/// in. Copies made for a view keep the same `index`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    /// Stable identity.
    pub index: usize,
    /// Raw x coordinate.
    pub x: f32,
    /// Raw y coordinate.
    pub y: f32,
    /// Raw z coordinate.
    pub z: f32,
    /// x normalized to `[0, 1]` against some bounds.
    pub xn: f32,
    /// y normalized to `[0, 1]` against some bounds.
    pub yn: f32,
    /// z normalized to `[0, 1]` against some bounds.
    pub zn: f32,
    /// Distance from the bounds center, normalized to `[0, 1]`.
    pub rcn: f32,
}

impl Point {
    /// Create a point whose normalized values sit at the center.
    #[must_use]
    pub const fn new(index: usize, x: f32, y: f32, z: f32) -> Self {
        Self {
            index,
            x,
            y,
            z,
            xn: 0.5,
            yn: 0.5,
            zn: 0.5,
            rcn: 0.0,
        }
    }

    /// Raw coordinates as an array.
    #[must_use]
    pub const fn coords(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Normalized coordinates as an array.
    #[must_use]
    pub const fn normalized(&self) -> [f32; 3] {
        [self.xn, self.yn, self.zn]
    }
}

/// Axis-aligned extent used as the reference for normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    /// Minimum corner.
    pub min: [f32; 3],
    /// Maximum corner.
    pub max: [f32; 3],
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: [0.0; 3],
            max: [0.0; 3],
        }
    }
}

impl Bounds {
    /// Smallest bounds holding every point. Zero-sized at the origin when
    /// there are no points.
    #[must_use]
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Point>,
    {
        let mut points = points.into_iter();
        let Some(first) = points.next() else {
            return Self::default();
        };
        let mut bounds = Self {
            min: first.coords(),
            max: first.coords(),
        };
        for point in points {
            for (axis, value) in point.coords().into_iter().enumerate() {
                bounds.min[axis] = bounds.min[axis].min(value);
                bounds.max[axis] = bounds.max[axis].max(value);
            }
        }
        bounds
    }

    /// Size along each axis.
    #[must_use]
    pub fn extent(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Midpoint along each axis.
    #[must_use]
    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }

    /// Rewrite the normalized values of `points` relative to these bounds.
    ///
    /// Each axis maps `min..=max` onto `0..=1`; an axis with no extent maps
    /// to 0.5. `rcn` is the distance from the center divided by the largest
    /// such distance among `points`.
    pub fn normalize<'a, I>(&self, points: I)
    where
        I: IntoIterator<Item = &'a mut Point>,
    {
        let extent = self.extent();
        let center = self.center();
        let mut points: Vec<&mut Point> = points.into_iter().collect();

        let mut rc_max = 0.0_f32;
        for point in &mut points {
            point.xn = normalize_axis(point.x, self.min[0], extent[0]);
            point.yn = normalize_axis(point.y, self.min[1], extent[1]);
            point.zn = normalize_axis(point.z, self.min[2], extent[2]);
            rc_max = rc_max.max(distance(point.coords(), center));
        }
        for point in &mut points {
            point.rcn = if rc_max > 0.0 {
                distance(point.coords(), center) / rc_max
            } else {
                0.0
            };
        }
    }
}

fn normalize_axis(value: f32, min: f32, extent: f32) -> f32 {
    if extent > 0.0 {
        (value - min) / extent
    } else {
        0.5
    }
}

fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx.mul_add(dx, dy.mul_add(dy, dz * dz)).sqrt()
}
