//! [`LineConfig`] – immutable line geometry and timing.
//!
//! The defaults reproduce the reference line: a 3 m belt with the inspection
//! point at its centre, six items spaced 0.25 m apart, a 240 Hz tick and a
//! pusher mounted on the +y side of the belt that sweeps rejects towards -y.

use serde::{Deserialize, Serialize};

use crate::{LineError, Vec3};

/// A run of consecutive items sharing one batch tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSpec {
    pub tag: String,
    pub count: usize,
}

impl BatchSpec {
    pub fn new(tag: impl Into<String>, count: usize) -> Self {
        Self {
            tag: tag.into(),
            count,
        }
    }
}

/// Line geometry, speeds and timing. Fixed once the line is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Travel-axis coordinate where items stop for inspection.
    pub inspection_x: f64,
    /// Travel-axis coordinate where accepted items come to rest.
    pub end_x: f64,
    /// Belt speed in m/s.
    pub speed: f64,
    /// Simulated seconds per tick.
    pub tick_secs: f64,

    /// Half of an item's edge length (items are cubes).
    pub item_half_extent: f64,
    /// Lateral coordinate of the belt centre line.
    pub line_lateral: f64,
    /// Height of an item's centre above ground.
    pub item_height: f64,
    /// Travel-axis start coordinate of the rearmost item.
    pub rearmost_start_x: f64,
    /// Travel-axis gap between consecutive items at start.
    pub item_spacing: f64,
    /// Batch layout from rearmost to frontmost item. The sum of the counts is
    /// the number of items on the line.
    pub batches: Vec<BatchSpec>,

    /// Lateral coordinate of the pusher plate centre when idle.
    pub pusher_retracted_lateral: f64,
    /// Half of the pusher plate's depth along the lateral axis.
    pub pusher_half_depth: f64,
    /// Height of the pusher plate centre above ground.
    pub pusher_height: f64,
    /// Lateral coordinate rejected items are pushed towards. The pusher's
    /// stroke equals the distance from the belt centre to this target.
    pub reject_target_lateral: f64,
    /// Pusher travel speed in m/s, both directions.
    pub pusher_speed: f64,
    /// Distance from the pusher plate centre to the arm centre, measured away
    /// from the belt.
    pub arm_offset: f64,
    /// Seconds the pusher holds fully extended before retracting.
    pub dwell_secs: f64,

    /// Stop the belt while the frontmost in-flow item is an accepted item
    /// resting exactly on the end-of-line coordinate.
    pub hold_at_line_end: bool,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            inspection_x: 0.0,
            end_x: 1.4,
            speed: 0.2,
            tick_secs: 1.0 / 240.0,
            item_half_extent: 0.05,
            line_lateral: 0.0,
            item_height: 0.651,
            rearmost_start_x: -1.4,
            item_spacing: 0.25,
            batches: vec![
                BatchSpec::new("B3", 1),
                BatchSpec::new("B2", 1),
                BatchSpec::new("B1", 2),
                BatchSpec::new("B0", 2),
            ],
            pusher_retracted_lateral: 0.235,
            pusher_half_depth: 0.025,
            pusher_height: 0.65,
            reject_target_lateral: -0.55,
            pusher_speed: 0.3,
            arm_offset: 0.1,
            dwell_secs: 0.5,
            hold_at_line_end: true,
        }
    }
}

impl LineConfig {
    /// Distance an item travels along the belt in one tick.
    pub fn travel_per_tick(&self) -> f64 {
        self.speed * self.tick_secs
    }

    /// Distance the pusher travels in one tick.
    pub fn pusher_step(&self) -> f64 {
        self.pusher_speed * self.tick_secs
    }

    /// Whole ticks the pusher dwells at full extension.
    pub fn dwell_ticks(&self) -> u32 {
        (self.dwell_secs / self.tick_secs).round() as u32
    }

    /// `+1.0` or `-1.0`: the lateral direction the pusher moves when extending.
    pub fn push_direction(&self) -> f64 {
        (self.line_lateral - self.pusher_retracted_lateral).signum()
    }

    /// Lateral coordinate of the pusher plate centre at full extension.
    pub fn pusher_extended_lateral(&self) -> f64 {
        let stroke = (self.reject_target_lateral - self.line_lateral).abs();
        self.pusher_retracted_lateral + self.push_direction() * stroke
    }

    /// Total number of items on the line.
    pub fn item_count(&self) -> usize {
        self.batches.iter().map(|b| b.count).sum()
    }

    /// Start position and batch tag of every item, rearmost first.
    pub fn item_layout(&self) -> Vec<(Vec3, String)> {
        self.batches
            .iter()
            .flat_map(|b| std::iter::repeat_n(b.tag.as_str(), b.count))
            .enumerate()
            .map(|(i, tag)| {
                let x = self.rearmost_start_x + i as f64 * self.item_spacing;
                (
                    Vec3::new(x, self.line_lateral, self.item_height),
                    tag.to_string(),
                )
            })
            .collect()
    }

    /// Reject geometry and timing that would make the line misbehave.
    ///
    /// # Errors
    ///
    /// Returns [`LineError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> Result<(), LineError> {
        let positive = [
            ("speed", self.speed),
            ("tick_secs", self.tick_secs),
            ("pusher_speed", self.pusher_speed),
            ("item_spacing", self.item_spacing),
            ("item_half_extent", self.item_half_extent),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(LineError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        if !(self.dwell_secs.is_finite() && self.dwell_secs >= 0.0) {
            return Err(LineError::InvalidConfig(format!(
                "dwell_secs must be non-negative, got {}",
                self.dwell_secs
            )));
        }
        if self.end_x <= self.inspection_x {
            return Err(LineError::InvalidConfig(format!(
                "end_x ({}) must lie beyond inspection_x ({})",
                self.end_x, self.inspection_x
            )));
        }
        if self.item_count() == 0 {
            return Err(LineError::InvalidConfig(
                "batches must describe at least one item".to_string(),
            ));
        }
        let frontmost = self.rearmost_start_x + (self.item_count() - 1) as f64 * self.item_spacing;
        if frontmost >= self.inspection_x {
            return Err(LineError::InvalidConfig(format!(
                "frontmost item starts at {frontmost}, not before inspection_x ({})",
                self.inspection_x
            )));
        }
        if self.pusher_retracted_lateral == self.line_lateral {
            return Err(LineError::InvalidConfig(
                "pusher must be mounted beside the belt, not on its centre line".to_string(),
            ));
        }
        Ok(())
    }
}
