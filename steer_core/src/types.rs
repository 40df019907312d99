//! Plain experiment vocabulary shared by the online engine and the persisted records.

use std::fmt;

/// Screen point in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance_to(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Task variant of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Steer as fast and as accurately as possible.
    SpeedAccuracy,
    /// Same, while holding the stylus force inside a target band.
    ForceSpeedAccuracy,
}

impl Task {
    /// Short code used in block labels.
    pub const fn code(self) -> &'static str {
        match self {
            Task::SpeedAccuracy => "VP",
            Task::ForceSpeedAccuracy => "FVP",
        }
    }

    #[inline]
    pub const fn is_force(self) -> bool {
        matches!(self, Task::ForceSpeedAccuracy)
    }
}

/// One task × feedback combination; every block runs exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Condition {
    pub task: Task,
    pub feedback: bool,
}

impl Condition {
    /// The four combinations in canonical order.
    pub const ALL: [Condition; 4] = [
        Condition {
            task: Task::SpeedAccuracy,
            feedback: true,
        },
        Condition {
            task: Task::SpeedAccuracy,
            feedback: false,
        },
        Condition {
            task: Task::ForceSpeedAccuracy,
            feedback: true,
        },
        Condition {
            task: Task::ForceSpeedAccuracy,
            feedback: false,
        },
    ];

    /// Block label such as `VP_FB` or `FVP_NoFB`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fb = if self.feedback { "FB" } else { "NoFB" };
        write!(f, "{}_{}", self.task.code(), fb)
    }
}

/// Ring tunnel: centerline radius and full width, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TunnelGeometry {
    pub radius: f64,
    pub width: f64,
}

impl TunnelGeometry {
    pub const fn new(radius: f64, width: f64) -> Self {
        Self { radius, width }
    }

    #[inline]
    pub fn half_width(&self) -> f64 {
        self.width / 2.0
    }
}

/// Immutable description of one trial in the plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialSpec {
    pub condition: Condition,
    pub geometry: TunnelGeometry,
    /// 1-based index into the difficulty table.
    pub level: u32,
    /// 1-based repetition of this level within the block.
    pub repetition: u32,
    /// 1-based position within the block, assigned after shuffling.
    pub order_in_block: u32,
}

impl TrialSpec {
    #[inline]
    pub fn task(&self) -> Task {
        self.condition.task
    }

    /// Start marker sits on the centerline straight below the center
    /// (screen y grows downward).
    #[inline]
    pub fn start_marker(&self, center: Point) -> Point {
        Point::new(center.x, center.y + self.geometry.radius)
    }
}
