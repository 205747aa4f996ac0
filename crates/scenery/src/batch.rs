//! Per-frame material batching.
//!
//! Every frame the tile manager clears each material's sort list, then
//! appends every visible fragment to the list of the material it uses. The
//! render pass walks materials in registry order and draws each list in
//! append order, so the backend switches material state once per material.
//!
//! Sort lists are preallocated to a fixed capacity and never grow. Appending
//! to a full list fails and the fragment is skipped for that frame only.

use crate::cache::TileCache;
use crate::material::{Material, MaterialId, MaterialRegistry};
use crate::render::RenderBackend;
use crate::tile::FragmentRef;

/// Fixed-capacity list of fragments visible this frame.
#[derive(Debug, Clone, Default)]
pub struct SortList {
    entries: Vec<FragmentRef>,
    capacity: usize,
}

impl SortList {
    /// Create an empty list holding at most `capacity` fragments.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Reset the length to zero, keeping the allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Append a fragment. Returns `false` and leaves the list unchanged if
    /// it is already full.
    pub fn push(&mut self, fragment: FragmentRef) -> bool {
        if self.entries.len() >= self.capacity {
            return false;
        }
        self.entries.push(fragment);
        true
    }

    /// Number of fragments in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of fragments.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fragments in append order.
    #[must_use]
    pub fn as_slice(&self) -> &[FragmentRef] {
        &self.entries
    }
}

impl MaterialRegistry {
    /// Empty every material's sort list. Called once at the start of each
    /// frame, before culling.
    pub fn init_transient_lists(&mut self) {
        for material in self.materials_mut() {
            material.sort_list.clear();
        }
    }

    /// Append a visible fragment to its material's sort list.
    ///
    /// Returns `false` if the list is already at capacity or the material
    /// is not in this registry; the fragment is then not drawn this frame.
    pub fn append_sort_list(&mut self, material: MaterialId, fragment: FragmentRef) -> bool {
        let Some(entry) = self.materials_mut().get_mut(material.index()) else {
            tracing::warn!(?material, ?fragment, "material not in this registry");
            return false;
        };
        entry.sort_list.push(fragment)
    }

    /// Materials with at least one fragment this frame, in registry order.
    pub fn batches(&self) -> impl Iterator<Item = (&Material, &[FragmentRef])> {
        self.iter()
            .map(|(_, material)| (material, material.sort_list.as_slice()))
            .filter(|(_, list)| !list.is_empty())
    }

    /// Hand every batched fragment to the backend, grouped by material.
    ///
    /// References that no longer resolve (their tile was evicted after
    /// culling) are skipped. Returns the number of fragments drawn.
    pub fn render_batches<L, R: RenderBackend + ?Sized>(
        &self,
        cache: &TileCache<L>,
        backend: &mut R,
    ) -> usize {
        let mut drawn = 0;
        for (material, list) in self.batches() {
            for &fragment_ref in list {
                let Some((tile, fragment)) = cache.fragment(fragment_ref) else {
                    tracing::debug!(?fragment_ref, "skipping fragment from evicted tile");
                    continue;
                };
                let Some(handle) = fragment.batch else {
                    continue;
                };
                backend.draw(material, handle, &tile.view_matrix);
                drawn += 1;
            }
        }
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileRef;

    fn fragment(index: usize) -> FragmentRef {
        FragmentRef {
            tile: TileRef {
                slot: 0,
                generation: 1,
            },
            fragment: index,
        }
    }

    #[test]
    fn test_push_until_full() {
        let mut list = SortList::with_capacity(2);
        assert!(list.push(fragment(0)));
        assert_eq!(list.len(), 1);
        assert!(list.push(fragment(1)));
        assert_eq!(list.len(), 2);

        assert!(!list.push(fragment(2)));
        assert_eq!(list.len(), 2);
        assert_eq!(list.as_slice(), &[fragment(0), fragment(1)]);
    }

    #[test]
    fn test_zero_capacity_rejects_everything() {
        let mut list = SortList::with_capacity(0);
        assert!(!list.push(fragment(0)));
        assert!(list.is_empty());
    }

    #[test]
    fn test_append_and_init_transient_lists() {
        let mut registry = MaterialRegistry::new(3);
        let grass = registry.insert(Material::new("grass")).unwrap();
        let water = registry.insert(Material::new("water")).unwrap();

        for i in 0..3 {
            assert!(registry.append_sort_list(grass, fragment(i)));
        }
        assert!(!registry.append_sort_list(grass, fragment(3)));
        assert_eq!(registry.get(grass).unwrap().sort_list().len(), 3);

        assert!(registry.append_sort_list(water, fragment(7)));
        let names: Vec<_> = registry.batches().map(|(m, l)| (m.name(), l.len())).collect();
        assert_eq!(names, vec![("grass", 3), ("water", 1)]);

        registry.init_transient_lists();
        assert!(registry.iter().all(|(_, m)| m.sort_list().is_empty()));
        assert_eq!(registry.batches().count(), 0);

        // Capacity is available again after the reset.
        assert!(registry.append_sort_list(grass, fragment(0)));
    }

    #[test]
    fn test_append_with_foreign_material_is_refused() {
        let mut other = MaterialRegistry::new(3);
        other.insert(Material::new("grass")).unwrap();
        let rock = other.insert(Material::new("rock")).unwrap();

        let mut registry = MaterialRegistry::new(3);
        registry.insert(Material::new("grass")).unwrap();
        assert!(registry.get(rock).is_none());
        assert!(!registry.append_sort_list(rock, fragment(0)));
        assert_eq!(registry.batches().count(), 0);
    }
}
