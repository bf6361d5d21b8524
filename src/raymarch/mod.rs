pub mod render;

pub use render::{render, Viewport};

use crate::{
    spatial::{math::vector::V3c, raytracing::Ray, Cube},
    transfer::{Albedo, TransferRange, TransferTable},
    traversal::HddaState,
    volume::VolumeHierarchy,
};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Fraction of a cell the ray parameter is pushed forward when entering a grid
/// lands outside of it because of float error on the boundary
const BOUNDARY_NUDGE: f32 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct MarchSettings {
    /// Maximum number of cells visited by one ray, on all levels combined
    pub max_steps: u32,
    /// Marching stops once the accumulated opacity reaches this value
    pub opacity_cutoff: f32,
    /// Scales the opacity of the transfer function per unit of distance travelled
    pub extinction: f32,
}

impl Default for MarchSettings {
    fn default() -> Self {
        Self {
            max_steps: 4096,
            opacity_cutoff: 0.99,
            extinction: 1.,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The ray does not intersect the volume
    Missed,
    ExitedVolume,
    /// Accumulated opacity reached the configured cutoff
    Opaque,
    StepBudgetExhausted,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayMarchResult {
    /// Accumulated color, with premultiplied alpha
    pub color: Albedo,
    /// Ray parameter of the first sample with non-zero opacity
    pub first_hit: Option<f32>,
    /// Number of cells visited
    pub steps: u32,
    pub termination: Termination,
}

impl RayMarchResult {
    fn new() -> Self {
        Self {
            color: Albedo::default(),
            first_hit: None,
            steps: 0,
            termination: Termination::ExitedVolume,
        }
    }
}

#[derive(Debug)]
struct NodeStackItem {
    node: u32,
    level: usize,
    bounds: Cube,
    dda: HddaState,
}

/// The ray parameter offset used to step over a boundary of `cell_size` sized cells
fn boundary_nudge(ray: &Ray, cell_size: f32) -> f32 {
    let max_direction = ray.direction.abs().max_component();
    if 0. < max_direction {
        BOUNDARY_NUDGE * cell_size / max_direction
    } else {
        0.
    }
}

/// Prepares the traversal of the child grid of a node, with the ray entering at `ray_param`.
/// Returns None if the ray only grazes the node
fn prepare_node(
    ray: &Ray,
    ray_param: f32,
    bounds: &Cube,
    child_cell_size: f32,
    child_dim: u32,
) -> Option<HddaState> {
    let mut dda = HddaState::default();
    let nudge = boundary_nudge(ray, child_cell_size);
    for start in [ray_param, ray_param + nudge] {
        dda.set_from_ray(ray.origin, ray.direction, V3c::new(start, start, 0.));
        dda.prepare(bounds.min_position, V3c::unit(child_cell_size));
        if dda.is_inside(V3c::unit(child_dim as i32)) {
            return Some(dda);
        }
    }
    None
}

/// Prepares the traversal of a leaf brick. The ray is rebound to start at the point
/// it enters the brick, so the traversal is parametrized from there.
/// Returns the prepared state and the ray parameter it starts from.
fn prepare_brick(
    ray: &Ray,
    ray_param: f32,
    bounds: &Cube,
    brick_dim: u32,
) -> Option<(HddaState, f32)> {
    let mut dda = HddaState::default();
    let nudge = boundary_nudge(ray, 1.);
    for start in [ray_param, ray_param + nudge] {
        dda.set_from_ray(ray.point_at(start), ray.direction, V3c::unit(0.));
        dda.prepare_leaf(bounds.min_position);
        if dda.is_inside(V3c::unit(brick_dim as i32)) {
            return Some((dda, start));
        }
    }
    None
}

/// Front to back compositing of one sample covering `distance` along the ray
fn accumulate(color: &mut Albedo, sample: &Albedo, distance: f32, extinction: f32) {
    let alpha = 1. - (-sample.a * distance * extinction).exp();
    let weight = (1. - color.a) * alpha;
    color.r += weight * sample.r;
    color.g += weight * sample.g;
    color.b += weight * sample.b;
    color.a += weight;
}

/// Iterates through the voxels of a leaf brick, accumulating their transfer function values.
/// Returns true if marching should stop.
#[allow(clippy::too_many_arguments)]
fn march_brick<V: VolumeHierarchy>(
    volume: &V,
    leaf: u32,
    bounds: &Cube,
    ray: &Ray,
    ray_param: f32,
    table: &TransferTable,
    range: &TransferRange,
    settings: &MarchSettings,
    result: &mut RayMarchResult,
) -> bool {
    let brick_dim = volume.child_dim(volume.level_count() - 1);
    let Some((mut dda, brick_start)) = prepare_brick(ray, ray_param, bounds, brick_dim) else {
        return false;
    };
    debug_assert!(bounds.contains_point(&ray.point_at(brick_start)));
    let ray_length_unit = ray.direction.length();
    while dda.is_inside(V3c::unit(brick_dim as i32)) {
        if result.steps >= settings.max_steps {
            result.termination = Termination::StepBudgetExhausted;
            return true;
        }
        dda.next();
        result.steps += 1;

        let sample = table.lookup(volume.sample(leaf, dda.child_index()), range);
        if !sample.is_transparent() {
            if result.first_hit.is_none() {
                result.first_hit = Some(brick_start + dda.current_param());
            }
            let distance = (dda.next_param() - dda.current_param()) * ray_length_unit;
            accumulate(&mut result.color, &sample, distance, settings.extinction);
            if result.color.a >= settings.opacity_cutoff {
                result.termination = Termination::Opaque;
                return true;
            }
        }
        dda.step();
    }
    false
}

/// Walks the node hierarchy from the root, descending into every occupied child
/// and marching the leaf bricks on the way
fn march_nodes<V: VolumeHierarchy>(
    volume: &V,
    ray: &Ray,
    entry_param: f32,
    table: &TransferTable,
    range: &TransferRange,
    settings: &MarchSettings,
    result: &mut RayMarchResult,
) {
    let root_bounds = volume.root_bounds();
    let leaf_level = volume.level_count() - 1;
    let mut node_stack: Vec<NodeStackItem> = Vec::with_capacity(volume.level_count());
    if let Some(dda) = prepare_node(
        ray,
        entry_param,
        &root_bounds,
        volume.cell_size(0),
        volume.child_dim(0),
    ) {
        node_stack.push(NodeStackItem {
            node: volume.root(),
            level: 0,
            bounds: root_bounds,
            dda,
        });
    }

    while !node_stack.is_empty() {
        let top = node_stack.len() - 1;
        let level = node_stack[top].level;
        let child_dim = volume.child_dim(level) as i32;

        if !node_stack[top].dda.is_inside(V3c::unit(child_dim)) {
            // POP
            node_stack.pop();
            if let Some(parent) = node_stack.last_mut() {
                parent.dda.step();
            }
            continue;
        }

        if result.steps >= settings.max_steps {
            result.termination = Termination::StepBudgetExhausted;
            break;
        }
        node_stack[top].dda.next();
        result.steps += 1;

        let child_index = node_stack[top].dda.child_index();
        let mut descend_to = None;
        if let Some(child) = volume.child(node_stack[top].node, level, child_index) {
            let child_bounds = node_stack[top]
                .bounds
                .child_bounds_for(child_index, volume.cell_size(level));
            let ray_param = node_stack[top].dda.current_param();
            if level + 1 == leaf_level {
                if march_brick(
                    volume,
                    child,
                    &child_bounds,
                    ray,
                    ray_param,
                    table,
                    range,
                    settings,
                    result,
                ) {
                    break;
                }
            } else {
                descend_to = prepare_node(
                    ray,
                    ray_param,
                    &child_bounds,
                    volume.cell_size(level + 1),
                    volume.child_dim(level + 1),
                )
                .map(|dda| NodeStackItem {
                    node: child,
                    level: level + 1,
                    bounds: child_bounds,
                    dda,
                });
            }
        }

        match descend_to {
            // PUSH
            Some(item) => node_stack.push(item),
            // ADVANCE
            None => node_stack[top].dda.step(),
        }
    }
}

/// Marches the given ray through the volume front to back, skipping empty space on
/// every level of the hierarchy and compositing the transfer function values of the
/// voxels inside the leaf bricks it passes through.
///
/// Every visited cell counts against `settings.max_steps`, so the march always terminates.
pub fn march_ray<V: VolumeHierarchy>(
    volume: &V,
    ray: &Ray,
    table: &TransferTable,
    range: &TransferRange,
    settings: &MarchSettings,
) -> RayMarchResult {
    let mut result = RayMarchResult::new();
    let root_bounds = volume.root_bounds();
    let Some(root_hit) = root_bounds.intersect_ray(ray) else {
        result.termination = Termination::Missed;
        return result;
    };
    let leaf_level = volume.level_count() - 1;
    if 0 == leaf_level {
        march_brick(
            volume,
            volume.root(),
            &root_bounds,
            ray,
            root_hit.entry_distance(),
            table,
            range,
            settings,
            &mut result,
        );
    } else {
        march_nodes(
            volume,
            ray,
            root_hit.entry_distance(),
            table,
            range,
            settings,
            &mut result,
        );
    }

    if Termination::StepBudgetExhausted == result.termination {
        log::debug!(
            "Ray {:?} exhausted its step budget of {} steps",
            ray,
            settings.max_steps
        );
    }
    log::trace!("Ray {:?} finished: {:?}", ray, result.termination);
    result
}
