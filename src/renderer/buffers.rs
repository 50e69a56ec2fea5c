//! Flat per-frame position/color buffers for the active set
//!
//! The buffers hold three `f32` per marker. The index side table is replaced
//! in the same call as the buffer layout, so a pick index always refers to
//! the layout that was drawn.

use std::collections::HashMap;

use glam::Vec3;

use super::colors::risk_palette;
use super::interpolation::Interpolator;
use super::snapshot::SnapshotMap;

/// Floats per marker in each buffer
pub const COMPONENTS: usize = 3;

/// Owns the position and color buffers consumed by the rendering surface
#[derive(Debug, Clone)]
pub struct RenderBufferManager {
    interpolator: Interpolator,
    positions: Vec<f32>,
    colors: Vec<f32>,
    /// Buffer index -> NORAD id
    identities: Vec<u32>,
    /// NORAD id -> buffer index
    slots: HashMap<u32, usize>,
    reallocations: u64,
}

impl RenderBufferManager {
    pub fn new(interpolator: Interpolator) -> Self {
        Self {
            interpolator,
            positions: Vec::new(),
            colors: Vec::new(),
            identities: Vec::new(),
            slots: HashMap::new(),
            reallocations: 0,
        }
    }

    /// Install a new active-set layout.
    ///
    /// Buffers are reallocated when the member count changes. Colors are
    /// written here and not again until the next layout. Positions are
    /// seeded with the current snapshot; call `update` before drawing to
    /// get the interpolated pose.
    /// Returns true when the buffers were reallocated.
    pub fn set_active(&mut self, identities: Vec<u32>, current: &SnapshotMap) -> bool {
        let len = identities.len() * COMPONENTS;
        let resized = len != self.positions.len();
        if resized {
            self.positions = vec![0.0; len];
            self.colors = vec![0.0; len];
            self.reallocations += 1;
            log::debug!(
                "Reallocated render buffers for {} markers",
                identities.len()
            );
        }

        let unknown = risk_palette().unknown;
        self.slots.clear();
        self.slots.reserve(identities.len());

        for (slot, norad_id) in identities.iter().enumerate() {
            let offset = slot * COMPONENTS;
            let (position, color) = match current.get(norad_id) {
                Some(datum) => (datum.position(), datum.color),
                None => (Vec3::ZERO, unknown),
            };
            self.positions[offset..offset + COMPONENTS].copy_from_slice(&position.to_array());
            self.colors[offset..offset + COMPONENTS].copy_from_slice(&color);
            self.slots.insert(*norad_id, slot);
        }

        self.identities = identities;
        resized
    }

    /// Rewrite every marker position for this frame
    pub fn update(
        &mut self,
        previous: &SnapshotMap,
        current: &SnapshotMap,
        now_ms: f64,
        last_swap_ms: f64,
    ) {
        let elapsed_ms = now_ms - last_swap_ms;

        for (slot, norad_id) in self.identities.iter().enumerate() {
            let Some(datum) = current.get(norad_id) else {
                continue;
            };
            let position = self
                .interpolator
                .position(previous.get(norad_id), datum, elapsed_ms);

            let offset = slot * COMPONENTS;
            self.positions[offset..offset + COMPONENTS].copy_from_slice(&position.to_array());
        }
    }

    pub fn interpolator(&self) -> &Interpolator {
        &self.interpolator
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    /// Index side table: buffer index -> NORAD id
    pub fn identities(&self) -> &[u32] {
        &self.identities
    }

    /// Raw bytes of the position buffer for GPU upload
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Raw bytes of the color buffer for GPU upload
    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    pub fn identity_at(&self, index: usize) -> Option<u32> {
        self.identities.get(index).copied()
    }

    pub fn slot_of(&self, norad_id: u32) -> Option<usize> {
        self.slots.get(&norad_id).copied()
    }

    pub fn contains(&self, norad_id: u32) -> bool {
        self.slots.contains_key(&norad_id)
    }

    /// Position last written for a marker
    pub fn position_of(&self, norad_id: u32) -> Option<Vec3> {
        let offset = self.slot_of(norad_id)? * COMPONENTS;
        Some(Vec3::from_slice(&self.positions[offset..offset + COMPONENTS]))
    }

    /// Number of markers
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// How many times the buffers have been reallocated
    pub fn reallocations(&self) -> u64 {
        self.reallocations
    }
}
