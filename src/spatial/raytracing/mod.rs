use crate::spatial::{math::vector::V3c, Cube};


#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: V3c<f32>,
    pub direction: V3c<f32>,
}

impl Ray {
    pub fn point_at(&self, d: f32) -> V3c<f32> {
        self.origin + self.direction * d
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct CubeRayIntersection {
    /// Ray parameter where the ray enters the cube, `None` if the origin is already inside
    pub impact_distance: Option<f32>,
    pub exit_distance: f32,
}

impl CubeRayIntersection {
    /// The ray parameter where traversal inside the cube should start
    pub fn entry_distance(&self) -> f32 {
        self.impact_distance.unwrap_or(0.)
    }
}

impl Cube {
    /// Tells the intersection with the cube of the given ray.
    /// returns the distance from the origin to the direction of the ray until the hit point,
    /// and the distance until it leaves the cube
    /// Axes the ray is parallel to never narrow the interval, the ray either runs inside
    /// that slab or misses the cube entirely.
    /// https://gamedev.stackexchange.com/questions/18436/most-efficient-aabb-vs-ray-collision-algorithms
    pub fn intersect_ray(&self, ray: &Ray) -> Option<CubeRayIntersection> {
        let max_position = self.max_position();
        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;
        for axis in 0..3 {
            if 0. == ray.direction[axis] {
                if ray.origin[axis] < self.min_position[axis]
                    || ray.origin[axis] > max_position[axis]
                {
                    return None;
                }
                continue;
            }
            let t1 = (self.min_position[axis] - ray.origin[axis]) / ray.direction[axis];
            let t2 = (max_position[axis] - ray.origin[axis]) / ray.direction[axis];
            tmin = tmin.max(t1.min(t2));
            tmax = tmax.min(t1.max(t2));
        }

        if tmax < 0. || tmin > tmax || !tmax.is_finite() {
            // ray is intersecting the cube, but it is behind it
            // OR ray doesn't intersect cube
            // OR the direction is zero, so it never leaves
            return None;
        }

        Some(CubeRayIntersection {
            impact_distance: if tmin < 0. { None } else { Some(tmin) },
            exit_distance: tmax,
        })
    }
}
