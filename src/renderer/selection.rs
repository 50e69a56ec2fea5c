//! Mapping picked buffer indices back to object identities

use super::buffers::RenderBufferManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Unselected,
    Selected(u32),
}

/// NORAD id drawn at `index` in the current layout
pub fn resolve(buffers: &RenderBufferManager, index: usize) -> Option<u32> {
    buffers.identity_at(index)
}

impl Selection {
    pub fn identity(&self) -> Option<u32> {
        match self {
            Selection::Unselected => None,
            Selection::Selected(id) => Some(*id),
        }
    }

    pub fn is_selected(&self) -> bool {
        matches!(self, Selection::Selected(_))
    }

    /// Select the object at a picked index.
    ///
    /// An index outside the current layout leaves the selection unchanged.
    pub fn pick(&mut self, buffers: &RenderBufferManager, index: usize) -> Option<u32> {
        let id = resolve(buffers, index)?;
        *self = Selection::Selected(id);
        Some(id)
    }

    pub fn clear(&mut self) {
        *self = Selection::Unselected;
    }

    /// Drop the selection if its object left the active set
    pub fn revalidate(&mut self, is_active: impl Fn(u32) -> bool) -> Option<u32> {
        if let Selection::Selected(id) = *self {
            if !is_active(id) {
                log::debug!("Selected object {} left the active set", id);
                *self = Selection::Unselected;
            }
        }
        self.identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{Interpolator, SnapshotMap};

    fn buffers_with(ids: Vec<u32>) -> RenderBufferManager {
        let mut buffers = RenderBufferManager::new(Interpolator::new(5000.0, 1.0));
        buffers.set_active(ids, &SnapshotMap::new());
        buffers
    }

    #[test]
    fn test_resolve_uses_side_table() {
        let buffers = buffers_with(vec![100, 200, 300]);
        assert_eq!(resolve(&buffers, 0), Some(100));
        assert_eq!(resolve(&buffers, 2), Some(300));
        assert_eq!(resolve(&buffers, 3), None);
    }

    #[test]
    fn test_pick_out_of_range_keeps_state() {
        let buffers = buffers_with(vec![100, 200]);
        let mut selection = Selection::default();
        assert_eq!(selection.pick(&buffers, 1), Some(200));
        assert_eq!(selection.pick(&buffers, 99), None);
        assert_eq!(selection, Selection::Selected(200));
    }

    #[test]
    fn test_resolve_follows_new_layout() {
        let mut buffers = buffers_with(vec![100, 200]);
        buffers.set_active(vec![200], &SnapshotMap::new());
        assert_eq!(resolve(&buffers, 0), Some(200));
        assert_eq!(resolve(&buffers, 1), None);
    }

    #[test]
    fn test_revalidate_clears_missing_object() {
        let mut selection = Selection::Selected(5);
        assert_eq!(selection.revalidate(|id| id == 5), Some(5));
        assert_eq!(selection.revalidate(|id| id == 6), None);
        assert_eq!(selection, Selection::Unselected);
        assert!(!selection.is_selected());
    }
}
