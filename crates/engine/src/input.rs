//! Per-tick input snapshot.
//!
//! The engine never touches input devices; the host samples pointer
//! position, viewport size and action edges each frame and hands them
//! in. Split/eject are edge flags: true only on the frame the key went
//! down, never while held.

use glam::Vec2;

/// Pointer movement dead zone around the viewport center, pixels.
const POINTER_DEAD_ZONE: f32 = 10.0;

#[derive(Debug, Clone, Copy)]
pub struct InputSnapshot {
    /// Pointer position in viewport coordinates.
    pub pointer: Vec2,
    /// Viewport size (width, height).
    pub viewport: Vec2,
    /// Normalized keyboard direction, overrides pointer steering when
    /// present.
    pub move_dir: Option<Vec2>,
    /// Split action edge.
    pub split: bool,
    /// Eject action edge.
    pub eject: bool,
}

impl InputSnapshot {
    pub fn idle(viewport: Vec2) -> Self {
        Self {
            pointer: viewport / 2.0,
            viewport,
            move_dir: None,
            split: false,
            eject: false,
        }
    }

    /// Unit steering direction for this frame, or `None` inside the
    /// pointer dead zone with no keys held.
    pub fn steer_direction(&self) -> Option<Vec2> {
        if let Some(dir) = self.move_dir {
            return (dir.length_squared() > 0.0).then(|| dir.normalize());
        }
        let offset = self.pointer - self.viewport / 2.0;
        let dist = offset.length();
        (dist > POINTER_DEAD_ZONE).then(|| offset / dist)
    }

    /// Direction used for split/eject aiming. Falls back to straight
    /// up when the pointer sits in the dead zone.
    pub fn aim_direction(&self) -> Vec2 {
        self.steer_direction().unwrap_or(Vec2::new(0.0, -1.0))
    }
}
