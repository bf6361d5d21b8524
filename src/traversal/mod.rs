use crate::spatial::math::vector::V3c;


/// Per-ray traversal state of the hierarchical DDA.
///
/// The state walks the child cells of one grid level at a time. The owning loop
/// binds a ray once with [`HddaState::set_from_ray`], prepares the grid of the
/// node it is currently inside ([`HddaState::prepare`] for nodes,
/// [`HddaState::prepare_leaf`] for leaf bricks), then alternates
/// [`HddaState::next`] and [`HddaState::step`]. Every change of hierarchy level
/// requires preparing again, as `cell_span` and `side_param` only describe the
/// most recently prepared grid.
///
/// # Termination
/// Nothing in here checks bounds or progress. The caller must test
/// `child_index` against the node's child grid after every step (see
/// [`HddaState::is_inside`]) and must enforce a maximum step count: a degenerate
/// input (zero direction, NaN origin, zero cell size) produces `inf`/`NaN`
/// parameters and a loop without those checks never terminates.
///
/// The state is a plain value without heap ownership, one instance per ray.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct HddaState {
    position: V3c<f32>,
    direction: V3c<f32>,
    step_sign: V3c<i32>,
    cell_span: V3c<f32>,
    /// x: current ray parameter, y: next ray parameter, z: carried through untouched
    ray_param: V3c<f32>,
    child_index: V3c<i32>,
    side_param: V3c<f32>,
    advance_mask: V3c<i32>,
}

/// Decides whether `axis` crosses its next cell boundary first, based on the
/// boundary-crossing parameters of all 3 axes.
///
/// Ties are broken by a fixed axis precedence: X before Y before Z. Against
/// an axis it precedes, `axis` wins with `<=`; against an axis preceding it, only
/// with `<`. On an exact corner crossing exactly one axis advances, so the
/// corner is passed through consecutive single-axis steps.
/// * Two infinite parameters: the finite axis advances.
/// * All three infinite (zero direction): no axis advances.
/// * One infinite parameter: the remaining two are compared as above.
/// * NaN parameters never advance, and never hold back the other axes.
///
/// Returns 1 if `axis` advances, 0 otherwise.
pub fn choose_mask_value(axis: usize, side_param: &V3c<f32>) -> i32 {
    let infinite_sides = side_param.x.is_infinite() as u8
        + side_param.y.is_infinite() as u8
        + side_param.z.is_infinite() as u8;
    let side = side_param[axis];
    match infinite_sides {
        3 => 0,
        2 => side.is_finite() as i32,
        _ => {
            let first_other = (axis + 1) % 3;
            let second_other = (axis + 2) % 3;
            (crosses_first(axis, side, first_other, side_param[first_other])
                && crosses_first(axis, side, second_other, side_param[second_other]))
                as i32
        }
    }
}

/// True if `axis` wins against `other_axis` given their side parameters
fn crosses_first(axis: usize, side: f32, other_axis: usize, other_side: f32) -> bool {
    if side.is_nan() {
        false
    } else if other_side.is_nan() {
        true
    } else if axis < other_axis {
        side <= other_side
    } else {
        side < other_side
    }
}

impl HddaState {
    /// Binds the ray to the state. `ray_param.x` is the parameter where the ray
    /// enters the bounds of the node it is first prepared for.
    pub fn set_from_ray(&mut self, origin: V3c<f32>, direction: V3c<f32>, ray_param: V3c<f32>) {
        self.position = origin;
        self.direction = direction;
        self.step_sign = direction.sign_or_zero();
        self.ray_param = ray_param;
    }

    /// Prepares the traversal of a node's child grid, starting at the current ray parameter.
    /// * `node_min` - The minimum corner of the node in index space
    /// * `child_cell_size` - Size of one child cell of the node in index units
    pub fn prepare(&mut self, node_min: V3c<f32>, child_cell_size: V3c<f32>) {
        // Infinite where the direction is zero, which keeps that axis out of the tie-break
        self.cell_span = (child_cell_size / self.direction).abs();
        let cell_position = (self.current_position() - node_min) / child_cell_size;
        self.side_param = self.first_crossing(cell_position) + V3c::unit(self.ray_param.x);
        self.child_index = V3c::from(cell_position);
    }

    /// Prepares the traversal of a leaf brick, where every cell is one index unit.
    /// Contrary to [`HddaState::prepare`], the side parameters are not offset by the
    /// current ray parameter: leaf traversal is parametrized from the point where
    /// the ray was bound, so the caller binds a ray starting at the leaf entry point
    /// (with `ray_param.x` at 0) before calling this.
    pub fn prepare_leaf(&mut self, node_min: V3c<f32>) {
        self.cell_span = (V3c::unit(1.) / self.direction).abs();
        let cell_position = self.current_position() - node_min;
        self.side_param = self.first_crossing(cell_position);
        self.child_index = V3c::from(cell_position);
    }

    /// Ray parameter distances, relative to the current one, to the next cell boundary on each axis
    fn first_crossing(&self, cell_position: V3c<f32>) -> V3c<f32> {
        // For a positive step: cell_floor + 1 - position; negative: position - cell_floor;
        // no step: 0.5 * inf
        let step_sign = V3c::<f32>::from(self.step_sign);
        ((cell_position.floor() - cell_position + V3c::unit(0.5)) * step_sign + V3c::unit(0.5))
            * self.cell_span
    }

    /// Calculates which axes cross their cell boundary first, and the ray parameter
    /// where that happens. The current position is not modified, so it can be
    /// called repeatedly before committing with [`HddaState::step`].
    pub fn next(&mut self) {
        self.advance_mask = V3c::new(
            choose_mask_value(0, &self.side_param),
            choose_mask_value(1, &self.side_param),
            choose_mask_value(2, &self.side_param),
        );
        self.ray_param.y = if 0 != self.advance_mask.x {
            self.side_param.x
        } else if 0 != self.advance_mask.y {
            self.side_param.y
        } else if 0 != self.advance_mask.z {
            self.side_param.z
        } else {
            self.side_param.min_component()
        };
    }

    /// Moves into the child cell selected by the last [`HddaState::next`]
    pub fn step(&mut self) {
        self.ray_param.x = self.ray_param.y;
        for axis in 0..3 {
            // 0 * inf is NaN, so axes which are not advancing are left untouched
            if 0 != self.advance_mask[axis] {
                self.side_param[axis] += self.cell_span[axis];
            }
        }
        self.child_index += self.advance_mask * self.step_sign;
    }

    /// True if the current child index is inside a child grid of the given dimensions
    pub fn is_inside(&self, child_dim: V3c<i32>) -> bool {
        (0..3).all(|axis| 0 <= self.child_index[axis] && self.child_index[axis] < child_dim[axis])
    }

    /// Point on the ray at the current ray parameter
    pub fn current_position(&self) -> V3c<f32> {
        self.position + self.direction * self.ray_param.x
    }

    pub fn child_index(&self) -> V3c<i32> {
        self.child_index
    }

    pub fn current_param(&self) -> f32 {
        self.ray_param.x
    }

    pub fn next_param(&self) -> f32 {
        self.ray_param.y
    }

    pub fn ray_param(&self) -> V3c<f32> {
        self.ray_param
    }

    pub fn advance_mask(&self) -> V3c<i32> {
        self.advance_mask
    }

    pub fn step_sign(&self) -> V3c<i32> {
        self.step_sign
    }

    pub fn cell_span(&self) -> V3c<f32> {
        self.cell_span
    }

    pub fn side_param(&self) -> V3c<f32> {
        self.side_param
    }
}
