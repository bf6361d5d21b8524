mod tests;

use crate::{
    object_pool::{key_none_value, ObjectPool},
    spatial::{
        math::{flat_projection, vector::V3c},
        Cube,
    },
};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// The interface the ray marching loop needs from a hierarchy of nested grids.
///
/// Level 0 is the root node; every node on a level subdivides its volume into
/// `child_dim(level)`^3 child cells. The last level holds leaf bricks, whose
/// cells are single voxels. All positions are in voxel index space.
pub trait VolumeHierarchy {
    /// Number of grid levels, the last one being the leaf bricks
    fn level_count(&self) -> usize;

    /// Number of child cells along each axis of a node on the given level
    fn child_dim(&self, level: usize) -> u32;

    /// Size of one child cell of a node on the given level, in voxels
    fn cell_size(&self, level: usize) -> f32;

    fn root(&self) -> u32;

    fn root_bounds(&self) -> Cube;

    /// Whether the child cell at `index` of the given node on `level` has any data,
    /// and the key to it if it does
    fn child(&self, node: u32, level: usize, index: V3c<i32>) -> Option<u32>;

    /// The scalar value of a voxel inside a leaf brick
    fn sample(&self, leaf: u32, voxel: V3c<i32>) -> f32;
}

/// error types during usage or creation of the volume
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum VolumeError {
    #[error("Volume needs at least one level")]
    NoLevels,
    #[error("Invalid level dimension {0}, each level should have at least 1 child per axis")]
    InvalidLevelDimension(u32),
    #[error("Volume with level dimensions {0:?} is too large")]
    InvalidSize(Vec<u32>),
    #[error("Position ({x}, {y}, {z}) is outside of the volume")]
    InvalidPosition { x: u32, y: u32, z: u32 },
}

#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub(crate) enum VolumeNode {
    #[default]
    Nothing,
    Internal(Vec<u32>), // Child keys of each cell, key_none_value() where empty
    Leaf(Vec<f32>),     // Voxel values of the brick
}

/// Sparse nested grids: every level stores only the children that contain data.
/// Leaf bricks are dense; voxels without data read as 0.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct SparseVolume {
    level_dims: Vec<u32>,
    cell_sizes: Vec<u32>,
    nodes: ObjectPool<VolumeNode>,
}

impl SparseVolume {
    pub(crate) const ROOT_NODE_KEY: u32 = 0;

    /// Creates an empty volume with the given number of children per axis on each level,
    /// from the root down to the leaf bricks
    pub fn new(level_dims: &[u32]) -> Result<Self, VolumeError> {
        if level_dims.is_empty() {
            return Err(VolumeError::NoLevels);
        }
        if let Some(invalid) = level_dims.iter().find(|dim| 0 == **dim) {
            return Err(VolumeError::InvalidLevelDimension(*invalid));
        }

        // cell_sizes[level] = product of the dimensions of the levels below it
        let mut cell_sizes = vec![1u32; level_dims.len()];
        for level in (0..level_dims.len() - 1).rev() {
            cell_sizes[level] = cell_sizes[level + 1]
                .checked_mul(level_dims[level + 1])
                .ok_or_else(|| VolumeError::InvalidSize(level_dims.to_vec()))?;
        }
        cell_sizes[0]
            .checked_mul(level_dims[0])
            .ok_or_else(|| VolumeError::InvalidSize(level_dims.to_vec()))?;

        // Every node stores dim^3 cells
        if level_dims.iter().any(|dim| dim.checked_pow(3).is_none()) {
            return Err(VolumeError::InvalidSize(level_dims.to_vec()));
        }

        let mut volume = Self {
            level_dims: level_dims.to_vec(),
            cell_sizes,
            nodes: ObjectPool::with_capacity(level_dims.len() * 8),
        };
        let root_node = volume.empty_node(0);
        let root = volume.nodes.push(root_node);
        debug_assert_eq!(root as u32, Self::ROOT_NODE_KEY);
        log::debug!(
            "Sparse volume created with level dimensions {:?}, {} voxels per axis",
            volume.level_dims,
            volume.size()
        );
        Ok(volume)
    }

    /// Number of voxels along each axis
    pub fn size(&self) -> u32 {
        self.cell_sizes[0] * self.level_dims[0]
    }

    /// Number of nodes currently stored, leaves included
    pub fn node_count(&self) -> usize {
        self.nodes.reserved_count()
    }

    fn empty_node(&self, level: usize) -> VolumeNode {
        let cell_count = self.level_dims[level].pow(3) as usize;
        if level + 1 == self.level_dims.len() {
            VolumeNode::Leaf(vec![0.; cell_count])
        } else {
            VolumeNode::Internal(vec![key_none_value(); cell_count])
        }
    }

    fn check_position(&self, position: &V3c<u32>) -> Result<(), VolumeError> {
        let size = self.size();
        if position.x >= size || position.y >= size || position.z >= size {
            return Err(VolumeError::InvalidPosition {
                x: position.x,
                y: position.y,
                z: position.z,
            });
        }
        Ok(())
    }

    /// Flat index of the cell containing `position` inside a node on the given level
    fn cell_index_for(&self, position: &V3c<u32>, level: usize) -> usize {
        let dim = self.level_dims[level];
        let cell_size = self.cell_sizes[level];
        flat_projection(
            ((position.x / cell_size) % dim) as usize,
            ((position.y / cell_size) % dim) as usize,
            ((position.z / cell_size) % dim) as usize,
            dim as usize,
        )
    }

    /// Sets the voxel at the given position, creating the nodes leading to it as needed
    pub fn insert(&mut self, position: &V3c<u32>, value: f32) -> Result<(), VolumeError> {
        self.check_position(position)?;
        let leaf_level = self.level_dims.len() - 1;
        let mut node_key = Self::ROOT_NODE_KEY as usize;
        for level in 0..leaf_level {
            let cell = self.cell_index_for(position, level);
            let child_key = match self.nodes.get(node_key) {
                VolumeNode::Internal(children) => children[cell],
                _ => key_none_value(),
            };
            node_key = if self.nodes.key_is_valid(child_key as usize) {
                child_key as usize
            } else {
                let new_child = self.empty_node(level + 1);
                let new_key = self.nodes.push(new_child);
                if let VolumeNode::Internal(children) = self.nodes.get_mut(node_key) {
                    children[cell] = new_key as u32;
                }
                new_key
            };
        }

        let voxel = self.cell_index_for(position, leaf_level);
        if let VolumeNode::Leaf(brick) = self.nodes.get_mut(node_key) {
            brick[voxel] = value;
        }
        Ok(())
    }

    /// Resets the voxel at the given position to 0, releasing every node left without data
    pub fn clear(&mut self, position: &V3c<u32>) -> Result<(), VolumeError> {
        self.check_position(position)?;
        let leaf_level = self.level_dims.len() - 1;
        let mut node_stack = vec![(Self::ROOT_NODE_KEY as usize, 0)];
        for level in 0..leaf_level {
            let (node_key, _) = node_stack[level];
            let cell = self.cell_index_for(position, level);
            let child_key = match self.nodes.get(node_key) {
                VolumeNode::Internal(children) => children[cell],
                _ => key_none_value(),
            };
            if !self.nodes.key_is_valid(child_key as usize) {
                // Nothing stored along the path
                return Ok(());
            }
            node_stack.push((child_key as usize, cell));
        }

        let (leaf_key, _) = node_stack[leaf_level];
        let voxel = self.cell_index_for(position, leaf_level);
        if let VolumeNode::Leaf(brick) = self.nodes.get_mut(leaf_key) {
            brick[voxel] = 0.;
        }

        // Release emptied nodes bottom up, the root is always kept
        while node_stack.len() > 1 {
            let (node_key, cell_in_parent) = node_stack[node_stack.len() - 1];
            let is_empty = match self.nodes.get(node_key) {
                VolumeNode::Leaf(brick) => brick.iter().all(|v| 0. == *v),
                VolumeNode::Internal(children) => {
                    children.iter().all(|key| !self.nodes.key_is_valid(*key as usize))
                }
                VolumeNode::Nothing => true,
            };
            if !is_empty {
                break;
            }
            self.nodes.free(node_key);
            node_stack.pop();
            let (parent_key, _) = node_stack[node_stack.len() - 1];
            if let VolumeNode::Internal(children) = self.nodes.get_mut(parent_key) {
                children[cell_in_parent] = key_none_value();
            }
        }
        Ok(())
    }

    /// The value of the voxel at the given position, if the leaf brick containing it exists
    pub fn get(&self, position: &V3c<u32>) -> Option<f32> {
        self.check_position(position).ok()?;
        let leaf_level = self.level_dims.len() - 1;
        let mut node_key = Self::ROOT_NODE_KEY as usize;
        for level in 0..leaf_level {
            let child_key = match self.nodes.get(node_key) {
                VolumeNode::Internal(children) => children[self.cell_index_for(position, level)],
                _ => key_none_value(),
            };
            if !self.nodes.key_is_valid(child_key as usize) {
                return None;
            }
            node_key = child_key as usize;
        }
        match self.nodes.get(node_key) {
            VolumeNode::Leaf(brick) => Some(brick[self.cell_index_for(position, leaf_level)]),
            _ => None,
        }
    }
}

impl VolumeHierarchy for SparseVolume {
    fn level_count(&self) -> usize {
        self.level_dims.len()
    }

    fn child_dim(&self, level: usize) -> u32 {
        self.level_dims[level]
    }

    fn cell_size(&self, level: usize) -> f32 {
        self.cell_sizes[level] as f32
    }

    fn root(&self) -> u32 {
        Self::ROOT_NODE_KEY
    }

    fn root_bounds(&self) -> Cube {
        Cube::root_bounds(self.size() as f32)
    }

    fn child(&self, node: u32, level: usize, index: V3c<i32>) -> Option<u32> {
        let dim = self.level_dims[level] as usize;
        debug_assert!((0..3).all(|axis| 0 <= index[axis] && (index[axis] as usize) < dim));
        match self.nodes.get(node as usize) {
            VolumeNode::Internal(children) => {
                let child_key =
                    children[flat_projection(index.x as usize, index.y as usize, index.z as usize, dim)];
                self.nodes
                    .key_is_valid(child_key as usize)
                    .then_some(child_key)
            }
            _ => None,
        }
    }

    fn sample(&self, leaf: u32, voxel: V3c<i32>) -> f32 {
        let dim = self.level_dims[self.level_dims.len() - 1] as usize;
        match self.nodes.get(leaf as usize) {
            VolumeNode::Leaf(brick) => {
                brick[flat_projection(voxel.x as usize, voxel.y as usize, voxel.z as usize, dim)]
            }
            _ => 0.,
        }
    }
}
