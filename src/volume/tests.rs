#[cfg(test)]
mod sparse_volume_tests {
    use crate::spatial::{math::vector::V3c, Cube};
    use crate::volume::{SparseVolume, VolumeError, VolumeHierarchy};

    #[test]
    fn test_invalid_level_dimensions() {
        assert_eq!(SparseVolume::new(&[]).err(), Some(VolumeError::NoLevels));
        assert_eq!(
            SparseVolume::new(&[4, 0, 2]).err(),
            Some(VolumeError::InvalidLevelDimension(0))
        );
        assert_eq!(
            SparseVolume::new(&[4096, 4096, 4096]).err(),
            Some(VolumeError::InvalidSize(vec![4096, 4096, 4096]))
        );
        // Voxels per axis fit, but the cells of one brick do not
        assert_eq!(
            SparseVolume::new(&[1700]).err(),
            Some(VolumeError::InvalidSize(vec![1700]))
        );
        assert_eq!(
            SparseVolume::new(&[1, 1626]).err(),
            Some(VolumeError::InvalidSize(vec![1, 1626]))
        );
    }

    #[test]
    fn test_level_geometry() {
        let volume = SparseVolume::new(&[4, 2, 8]).ok().unwrap();
        assert_eq!(volume.size(), 64);
        assert_eq!(volume.level_count(), 3);
        assert_eq!(volume.child_dim(0), 4);
        assert_eq!(volume.child_dim(1), 2);
        assert_eq!(volume.child_dim(2), 8);
        assert_eq!(volume.cell_size(0), 16.);
        assert_eq!(volume.cell_size(1), 8.);
        assert_eq!(volume.cell_size(2), 1.);
        assert_eq!(
            volume.root_bounds(),
            Cube {
                min_position: V3c::unit(0.),
                size: 64.
            }
        );
    }

    #[test]
    fn test_insert_and_get() {
        let mut volume = SparseVolume::new(&[4, 4]).ok().unwrap();
        assert!(volume.get(&V3c::new(5, 6, 7)).is_none());

        assert!(volume.insert(&V3c::new(5, 6, 7), 0.5).is_ok());
        assert_eq!(volume.get(&V3c::new(5, 6, 7)), Some(0.5));
        // Same brick, unset voxel
        assert_eq!(volume.get(&V3c::new(4, 4, 4)), Some(0.));
        // Different brick
        assert!(volume.get(&V3c::new(0, 0, 0)).is_none());

        assert!(volume.insert(&V3c::new(5, 6, 7), 0.75).is_ok());
        assert_eq!(volume.get(&V3c::new(5, 6, 7)), Some(0.75));
        assert_eq!(volume.node_count(), 2);
    }

    #[test]
    fn test_insert_out_of_bounds() {
        let mut volume = SparseVolume::new(&[2, 2]).ok().unwrap();
        assert_eq!(
            volume.insert(&V3c::new(0, 4, 1), 1.),
            Err(VolumeError::InvalidPosition { x: 0, y: 4, z: 1 })
        );
        assert!(volume.get(&V3c::new(4, 4, 4)).is_none());
        assert_eq!(volume.node_count(), 1);
    }

    #[test]
    fn test_child_lookup() {
        let mut volume = SparseVolume::new(&[2, 2, 2]).ok().unwrap();
        assert!(volume.insert(&V3c::new(7, 0, 3), 1.).is_ok());

        let root = volume.root();
        assert!(volume.child(root, 0, V3c::new(0, 0, 0)).is_none());
        let level_1 = volume.child(root, 0, V3c::new(1, 0, 0)).unwrap();
        assert!(volume.child(level_1, 1, V3c::new(0, 0, 1)).is_none());
        let leaf = volume.child(level_1, 1, V3c::new(1, 0, 1)).unwrap();
        assert_eq!(volume.sample(leaf, V3c::new(1, 0, 1)), 1.);
        assert_eq!(volume.sample(leaf, V3c::new(0, 0, 1)), 0.);
    }

    #[test]
    fn test_single_level_volume() {
        let mut volume = SparseVolume::new(&[8]).ok().unwrap();
        assert_eq!(volume.size(), 8);
        assert!(volume.insert(&V3c::new(1, 2, 3), 0.25).is_ok());
        assert_eq!(volume.get(&V3c::new(1, 2, 3)), Some(0.25));
        assert_eq!(volume.sample(volume.root(), V3c::new(1, 2, 3)), 0.25);
    }

    #[test]
    fn test_clear_releases_empty_nodes() {
        let mut volume = SparseVolume::new(&[2, 2, 2]).ok().unwrap();
        assert!(volume.insert(&V3c::new(0, 0, 0), 1.).is_ok());
        assert!(volume.insert(&V3c::new(1, 1, 1), 1.).is_ok());
        assert_eq!(volume.node_count(), 3);

        assert!(volume.clear(&V3c::new(0, 0, 0)).is_ok());
        assert_eq!(volume.get(&V3c::new(0, 0, 0)), Some(0.));
        assert_eq!(volume.node_count(), 3);

        assert!(volume.clear(&V3c::new(1, 1, 1)).is_ok());
        assert!(volume.get(&V3c::new(1, 1, 1)).is_none());
        assert_eq!(volume.node_count(), 1);
        assert!(volume.child(volume.root(), 0, V3c::new(0, 0, 0)).is_none());

        // Freed keys are reused
        assert!(volume.insert(&V3c::new(6, 6, 6), 0.5).is_ok());
        assert_eq!(volume.node_count(), 3);
        assert_eq!(volume.get(&V3c::new(6, 6, 6)), Some(0.5));
    }

    #[test]
    fn test_clear_then_insert_keeps_node_storage() {
        let mut volume = SparseVolume::new(&[2, 2, 2]).ok().unwrap();
        let positions = [V3c::new(0, 0, 0), V3c::new(7, 7, 7), V3c::new(0, 7, 0)];
        for position in positions.iter() {
            assert!(volume.insert(position, 1.).is_ok());
        }
        let storage_size = volume.nodes.len();
        assert_eq!(storage_size, 7);

        // Release the nodes of the first and last voxel, leaving a reserved block between them
        assert!(volume.clear(&positions[0]).is_ok());
        assert!(volume.clear(&positions[2]).is_ok());
        assert_eq!(volume.node_count(), 3);

        assert!(volume.insert(&positions[0], 0.5).is_ok());
        assert!(volume.insert(&positions[2], 0.25).is_ok());
        assert_eq!(volume.nodes.len(), storage_size);
        assert_eq!(volume.node_count(), 7);
        assert_eq!(volume.get(&positions[0]), Some(0.5));
        assert_eq!(volume.get(&positions[1]), Some(1.));
        assert_eq!(volume.get(&positions[2]), Some(0.25));
    }

    #[test]
    fn test_clear_empty_area() {
        let mut volume = SparseVolume::new(&[2, 2]).ok().unwrap();
        assert!(volume.clear(&V3c::new(3, 3, 3)).is_ok());
        assert_eq!(volume.node_count(), 1);
        assert_eq!(
            volume.clear(&V3c::new(3, 3, 4)),
            Err(VolumeError::InvalidPosition { x: 3, y: 3, z: 4 })
        );
    }
}
