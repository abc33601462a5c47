//! Ray and box primitives used for wall, agent and player hit tests.

use glam::Vec3;

/// Axis-aligned box in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    min: Vec3,
    max: Vec3,
}

impl Aabb {
    /// Creates a box spanning the two corners in any order.
    #[must_use]
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a box from its centre and half extents.
    #[must_use]
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        let half_extents = half_extents.abs();
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest box enclosing every point, or `None` for an empty iterator.
    #[must_use]
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |bounds, point| Self {
            min: bounds.min.min(point),
            max: bounds.max.max(point),
        }))
    }

    /// Corner with the smallest coordinates.
    #[must_use]
    pub const fn min(&self) -> Vec3 {
        self.min
    }

    /// Corner with the largest coordinates.
    #[must_use]
    pub const fn max(&self) -> Vec3 {
        self.max
    }

    /// Centre of the box.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Smallest box enclosing both boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Whether the point lies inside or on the surface of the box.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Half-line with a unit direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
}

impl Ray {
    /// Ray starting at `origin` heading along `direction`.
    ///
    /// A zero-length or non-finite direction is replaced with negative Z so
    /// probes always have something to cast along.
    #[must_use]
    pub fn towards(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.try_normalize().unwrap_or(Vec3::NEG_Z),
        }
    }

    /// Starting point of the ray.
    #[must_use]
    pub const fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Unit direction of the ray.
    #[must_use]
    pub const fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Point reached after travelling `distance` along the ray.
    #[must_use]
    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Distance to the first face of the box struck by the ray.
    ///
    /// Rays starting inside the box see no face and report `None`.
    #[must_use]
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f32> {
        let mut near = f32::NEG_INFINITY;
        let mut far = f32::INFINITY;

        for axis in 0..3 {
            let origin = self.origin[axis];
            let direction = self.direction[axis];
            let (low, high) = (aabb.min[axis], aabb.max[axis]);

            if direction.abs() <= f32::EPSILON {
                if origin < low || origin > high {
                    return None;
                }
                continue;
            }

            let inverse = direction.recip();
            let mut entry = (low - origin) * inverse;
            let mut exit = (high - origin) * inverse;
            if entry > exit {
                std::mem::swap(&mut entry, &mut exit);
            }

            near = near.max(entry);
            far = far.min(exit);
            if near > far {
                return None;
            }
        }

        (near >= 0.0).then_some(near)
    }

    /// Distance to the nearest point where the ray meets the sphere.
    ///
    /// When the origin lies inside the sphere the exit point is reported.
    #[must_use]
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let to_center = center - self.origin;
        let along = to_center.dot(self.direction);
        let offset_squared = to_center.length_squared() - along * along;
        let radius_squared = radius * radius;
        if offset_squared > radius_squared {
            return None;
        }

        let half_chord = (radius_squared - offset_squared).sqrt();
        let entry = along - half_chord;
        let exit = along + half_chord;
        if exit < 0.0 {
            return None;
        }
        Some(if entry < 0.0 { exit } else { entry })
    }
}
