//! Spatial index: an R-tree over node bounding areas in scene space.
//!
//! The index never observes node mutations on its own. Callers remove an
//! entry before a geometry change and insert it again afterwards.

use crate::geometry::BoundingArea;
use crate::id::NodeId;
use kurbo::Point;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, RTree};
use std::collections::HashMap;

type Entry = GeomWithData<Rectangle<[f64; 2]>, NodeId>;

/// R-tree of `(node id, scene AABB)` entries with at most one entry per id.
pub struct SpatialIndex {
    tree: RTree<Entry>,
    /// Current box of every indexed id; needed to locate the entry on removal.
    boxes: HashMap<NodeId, BoundingArea>,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self {
            tree: RTree::new(),
            boxes: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("entries", &self.boxes.len())
            .finish()
    }
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `id`. Empty areas are not indexed.
    pub fn insert(&mut self, id: NodeId, area: BoundingArea) {
        self.remove(id);
        if area.is_empty() {
            return;
        }
        self.tree.insert(entry(id, &area));
        self.boxes.insert(id, area);
    }

    /// Remove the entry for `id`. Removing an absent id is a no-op.
    pub fn remove(&mut self, id: NodeId) -> bool {
        match self.boxes.remove(&id) {
            Some(area) => self.tree.remove(&entry(id, &area)).is_some(),
            None => false,
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.boxes.contains_key(&id)
    }

    pub fn bounding_area(&self, id: NodeId) -> Option<BoundingArea> {
        self.boxes.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
        self.boxes.clear();
    }

    /// Every id whose box contains `point` (edges inclusive), unordered.
    pub fn query_point(&self, point: Point) -> Vec<NodeId> {
        self.tree
            .locate_all_at_point(&[point.x, point.y])
            .map(|e| e.data)
            .collect()
    }

    /// Every id whose box intersects `area`, unordered.
    pub fn query_range(&self, area: &BoundingArea) -> Vec<NodeId> {
        if area.is_empty() {
            return Vec::new();
        }
        let envelope = AABB::from_corners([area.left, area.top], [area.right, area.bottom]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|e| e.data)
            .collect()
    }

    /// Snapshot of all entries, for consistency checks.
    pub fn entries(&self) -> impl Iterator<Item = (NodeId, BoundingArea)> + '_ {
        self.boxes.iter().map(|(id, area)| (*id, *area))
    }
}

fn entry(id: NodeId, area: &BoundingArea) -> Entry {
    GeomWithData::new(
        Rectangle::from_corners([area.left, area.top], [area.right, area.bottom]),
        id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_previous_entry() {
        let mut index = SpatialIndex::new();
        let id = NodeId::intern("spatial_a");
        index.insert(id, BoundingArea::new(0.0, 0.0, 10.0, 10.0));
        index.insert(id, BoundingArea::new(100.0, 100.0, 110.0, 110.0));
        assert_eq!(index.len(), 1);
        assert!(index.query_point(Point::new(5.0, 5.0)).is_empty());
        assert_eq!(index.query_point(Point::new(105.0, 105.0)), vec![id]);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut index = SpatialIndex::new();
        assert!(!index.remove(NodeId::intern("spatial_missing")));
        assert!(index.is_empty());
    }

    #[test]
    fn empty_areas_are_skipped() {
        let mut index = SpatialIndex::new();
        let id = NodeId::intern("spatial_flat");
        index.insert(id, BoundingArea::new(0.0, 0.0, 10.0, 0.0));
        assert!(!index.contains(id));
    }
}
