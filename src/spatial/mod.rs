pub mod math;
pub mod raytracing;

use crate::spatial::math::vector::V3c;

pub(crate) const FLOAT_ERROR_TOLERANCE: f32 = 0.00001;

#[derive(Default, Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Cube {
    pub min_position: V3c<f32>,
    pub size: f32,
}

impl Cube {
    pub(crate) fn root_bounds(size: f32) -> Self {
        Self {
            min_position: V3c::unit(0.),
            size,
        }
    }

    /// Creates the bounding box of the child cell at `index` inside a grid of
    /// `child_size` sized cells starting at the min_position of this cube
    pub(crate) fn child_bounds_for(&self, index: V3c<i32>, child_size: f32) -> Cube {
        Cube {
            min_position: self.min_position + V3c::<f32>::from(index) * child_size,
            size: child_size,
        }
    }

    pub(crate) fn max_position(&self) -> V3c<f32> {
        self.min_position + V3c::unit(self.size)
    }

    /// True if the given point is inside the cube, with coordinates in inclusive, exclusive range
    /// Edges included
    pub(crate) fn contains_point(&self, point: &V3c<f32>) -> bool {
        (point.x >= self.min_position.x - FLOAT_ERROR_TOLERANCE)
            && (point.x < self.min_position.x + self.size + FLOAT_ERROR_TOLERANCE)
            && (point.y >= self.min_position.y - FLOAT_ERROR_TOLERANCE)
            && (point.y < self.min_position.y + self.size + FLOAT_ERROR_TOLERANCE)
            && (point.z >= self.min_position.z - FLOAT_ERROR_TOLERANCE)
            && (point.z < self.min_position.z + self.size + FLOAT_ERROR_TOLERANCE)
    }
}
