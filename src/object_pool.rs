#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// The key value to signify "no item" in a slot referencing the pool
pub(crate) fn key_none_value() -> u32 {
    u32::MAX
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
struct PoolSlot<T> {
    reserved: bool,
    item: T,
}

/// Stores the nodes of a volume hierarchy addressed by stable keys.
/// Keys of freed slots are handed out again before the buffer grows.
#[derive(Default, Clone, Debug)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub(crate) struct ObjectPool<T> {
    slots: Vec<PoolSlot<T>>,
    free_keys: Vec<usize>, // every unreserved slot, the last one is reused first
}

impl<T: Default> ObjectPool<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_keys: Vec::new(),
        }
    }

    /// Number of slots, reserved or not
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Number of reserved slots
    pub(crate) fn reserved_count(&self) -> usize {
        self.slots.len() - self.free_keys.len()
    }

    /// Stores the item and returns its key
    pub(crate) fn push(&mut self, item: T) -> usize {
        match self.free_keys.pop() {
            Some(key) => {
                debug_assert!(!self.slots[key].reserved);
                self.slots[key] = PoolSlot {
                    reserved: true,
                    item,
                };
                key
            }
            None => {
                self.slots.push(PoolSlot {
                    reserved: true,
                    item,
                });
                self.slots.len() - 1
            }
        }
    }

    /// Releases the slot under `key`, dropping its contents.
    /// Returns false if there was nothing stored under it.
    pub(crate) fn free(&mut self, key: usize) -> bool {
        if !self.key_is_valid(key) {
            return false;
        }
        self.slots[key] = PoolSlot {
            reserved: false,
            item: T::default(),
        };
        self.free_keys.push(key);
        true
    }

    pub(crate) fn get(&self, key: usize) -> &T {
        debug_assert!(self.key_is_valid(key));
        &self.slots[key].item
    }

    pub(crate) fn get_mut(&mut self, key: usize) -> &mut T {
        debug_assert!(self.key_is_valid(key));
        &mut self.slots[key].item
    }

    pub(crate) fn key_is_valid(&self, key: usize) -> bool {
        key < self.slots.len() && self.slots[key].reserved
    }
}

#[cfg(test)]
mod object_pool_tests {
    use super::ObjectPool;

    #[test]
    fn test_push_modify() {
        let mut pool = ObjectPool::<f32>::with_capacity(3);
        let key = pool.push(5.);
        assert!(*pool.get(key) == 5.);

        *pool.get_mut(key) = 10.;
        assert!(*pool.get(key) == 10.);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.reserved_count(), 1);
    }

    #[test]
    fn test_free_twice() {
        let mut pool = ObjectPool::<f32>::with_capacity(3);
        let key = pool.push(5.);
        assert!(pool.free(key));
        assert!(!pool.key_is_valid(key));
        assert!(!pool.free(key));
        assert_eq!(pool.reserved_count(), 0);

        // A double free must not hand out the same key twice
        let first = pool.push(1.);
        let second = pool.push(2.);
        assert_ne!(first, second);
    }

    #[test]
    fn test_freed_item_is_reset() {
        let mut pool = ObjectPool::<Vec<u32>>::with_capacity(1);
        let key = pool.push(vec![1, 2, 3]);
        pool.free(key);
        let reused = pool.push(Vec::new());
        assert_eq!(reused, key);
        assert!(pool.get(reused).is_empty());
    }

    #[test]
    fn test_scattered_free_slots_are_all_reused() {
        let mut pool = ObjectPool::<u32>::with_capacity(6);
        for i in 0..6 {
            assert_eq!(pool.push(i), i as usize);
        }
        assert!(pool.free(2));
        assert!(pool.free(4));

        let mut reused = vec![pool.push(20), pool.push(40)];
        reused.sort();
        assert_eq!(reused, vec![2, 4]);
        assert_eq!(pool.len(), 6);
        assert!((0..6).all(|key| pool.key_is_valid(key)));

        // Only now does the pool grow
        assert_eq!(pool.push(60), 6);
    }
}
