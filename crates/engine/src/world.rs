//! Entity model: remote cells and pixels, keyed by id.
//!
//! Membership changes are immediately visible to the next tick of
//! every component; there is exactly one mutator thread, so no
//! synchronization exists here. Remote entities are mutated only
//! through the sync layer's merge functions, never directly by the
//! collision engine.

use crate::entity::{Pixel, RemoteCell};
use glam::Vec2;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Bounded square world region.
#[derive(Debug, Clone, Copy)]
pub struct WorldBounds {
    pub half_extent: f32,
}

impl WorldBounds {
    pub fn new(half_extent: f32) -> Self {
        Self { half_extent }
    }

    /// Clamp a position into the world.
    #[inline]
    pub fn clamp(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            p.x.clamp(-self.half_extent, self.half_extent),
            p.y.clamp(-self.half_extent, self.half_extent),
        )
    }

    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x.abs() <= self.half_extent && p.y.abs() <= self.half_extent
    }

    /// Random position within the bounds.
    pub fn random_position(&self) -> Vec2 {
        let mut rng = rand::rng();
        Vec2::new(
            rng.random_range(-self.half_extent..self.half_extent),
            rng.random_range(-self.half_extent..self.half_extent),
        )
    }
}

/// All known network-visible entities plus the local ownership index.
#[derive(Debug)]
pub struct World {
    /// Cells owned by other sessions, by cell id.
    pub remote_cells: HashMap<String, RemoteCell>,
    /// Food/virus/ejected pixels, by pixel id.
    pub pixels: HashMap<String, Pixel>,
    /// Ids of the local player's own cells, maintained incrementally
    /// so inbound filtering never scans the cell list.
    owned_ids: HashSet<String>,
    pub bounds: WorldBounds,
}

impl World {
    pub fn new(half_extent: f32) -> Self {
        Self {
            remote_cells: HashMap::with_capacity(64),
            pixels: HashMap::with_capacity(256),
            owned_ids: HashSet::with_capacity(16),
            bounds: WorldBounds::new(half_extent),
        }
    }

    /// Insert or replace a remote cell.
    pub fn insert_remote_cell(&mut self, cell: RemoteCell) {
        self.remote_cells.insert(cell.id.clone(), cell);
    }

    /// Remove a remote cell by id. Idempotent.
    pub fn remove_remote_cell(&mut self, id: &str) -> Option<RemoteCell> {
        self.remote_cells.remove(id)
    }

    /// Insert or replace a pixel.
    pub fn insert_pixel(&mut self, pixel: Pixel) {
        self.pixels.insert(pixel.id.clone(), pixel);
    }

    /// Remove a pixel by id. Idempotent.
    pub fn remove_pixel(&mut self, id: &str) -> Option<Pixel> {
        self.pixels.remove(id)
    }

    /// Track an id as belonging to the local player.
    pub fn mark_owned(&mut self, id: &str) {
        self.owned_ids.insert(id.to_string());
    }

    /// Stop tracking an id as owned.
    pub fn unmark_owned(&mut self, id: &str) {
        self.owned_ids.remove(id);
    }

    /// Whether a cell id belongs to the local player.
    #[inline]
    pub fn is_owned(&self, id: &str) -> bool {
        self.owned_ids.contains(id)
    }
}
