//! Scripted straight-line viewer flight.

use glam::DVec3;

/// Linear flight from `start` to `end` over a fixed number of frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlightPath {
    pub start: DVec3,
    pub end: DVec3,
    pub frames: u32,
}

impl FlightPath {
    pub fn new(start: DVec3, end: DVec3, frames: u32) -> Self {
        Self { start, end, frames }
    }

    /// Viewer position at `frame`, starting at 0. Frames past the end hold
    /// the final position.
    pub fn position(&self, frame: u32) -> DVec3 {
        if self.frames <= 1 {
            return self.end;
        }
        let t = f64::from(frame.min(self.frames - 1)) / f64::from(self.frames - 1);
        self.start.lerp(self.end, t)
    }

    /// Up vector for a camera at `eye` looking at `target`, avoiding a
    /// degenerate basis when the view direction is close to +Y.
    pub fn camera_up(eye: DVec3, target: DVec3) -> DVec3 {
        let dir = (target - eye).normalize_or_zero();
        if dir.dot(DVec3::Y).abs() > 0.99 {
            DVec3::Z
        } else {
            DVec3::Y
        }
    }
}
