//! Scripted participant for dry runs and end-to-end tests.
//!
//! The participant holds the start marker of the current trial with a fixed
//! pressure. When the paired cue plays it waits a reaction time, then traces
//! the ring at constant angular speed until it has swept one full turn plus
//! an overshoot, and moves on to the next trial's marker. Both halves read
//! the same clock, so on a `VirtualClock` a whole session runs instantly.

use std::cell::Cell;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::rc::Rc;
use std::time::Instant;

use steer_traits::clock::Clock;
use steer_traits::{Cue, Digitizer, StylusReading};

use crate::error::HwError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone)]
pub struct SimProfile {
    /// Tunnel center in screen pixels.
    pub center: (f64, f64),
    /// Centerline radius of each trial, in plan order.
    pub radii: Vec<f64>,
    /// Normalized stylus pressure held throughout.
    pub pressure: f64,
    /// Tracing speed, rad/s.
    pub angular_speed: f64,
    /// Delay between the cue and the first movement, seconds.
    pub reaction_s: f64,
    /// Extra angle traced past a full turn before stopping.
    pub overshoot_rad: f64,
    /// Amplitude of a smooth radial wobble around the centerline, pixels.
    pub wobble_px: f64,
    /// Fail every read after this many with `HwError::Disconnected`.
    pub disconnect_after: Option<u64>,
}

impl Default for SimProfile {
    fn default() -> Self {
        Self {
            center: (960.0, 540.0),
            radii: Vec::new(),
            pressure: 3200.0 / 8192.0,
            angular_speed: TAU / 3.0,
            reaction_s: 0.25,
            overshoot_rad: 0.5,
            wobble_px: 0.0,
            disconnect_after: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Motion {
    Holding,
    Circling { go: Instant },
    Done,
}

pub struct SimulatedParticipant<K: Clock> {
    profile: SimProfile,
    clock: K,
    go: Rc<Cell<Option<Instant>>>,
    trial: usize,
    motion: Motion,
    reads: u64,
}

pub struct SimulatedCue<K: Clock> {
    clock: K,
    go: Rc<Cell<Option<Instant>>>,
    plays: Rc<Cell<u32>>,
}

/// Participant and cue wired to each other and to `clock`.
pub fn simulated_pair<K: Clock + Clone>(
    profile: SimProfile,
    clock: K,
) -> (SimulatedParticipant<K>, SimulatedCue<K>) {
    let go = Rc::new(Cell::new(None));
    let motion = if profile.radii.is_empty() {
        Motion::Done
    } else {
        Motion::Holding
    };
    let participant = SimulatedParticipant {
        profile,
        clock: clock.clone(),
        go: Rc::clone(&go),
        trial: 0,
        motion,
        reads: 0,
    };
    let cue = SimulatedCue {
        clock,
        go,
        plays: Rc::new(Cell::new(0)),
    };
    (participant, cue)
}

impl<K: Clock> SimulatedParticipant<K> {
    /// Zero-based trial the participant is currently working on.
    pub fn trial(&self) -> usize {
        self.trial
    }

    pub fn is_done(&self) -> bool {
        self.motion == Motion::Done
    }

    fn on_ring(&self, radius: f64, theta: f64) -> StylusReading {
        let (cx, cy) = self.profile.center;
        StylusReading::new(
            cx + radius * theta.cos(),
            cy + radius * theta.sin(),
            self.profile.pressure,
        )
    }

    fn at_marker(&self) -> StylusReading {
        match self.profile.radii.get(self.trial) {
            Some(r) => self.on_ring(*r, FRAC_PI_2),
            None => {
                let (cx, cy) = self.profile.center;
                StylusReading::new(cx, cy, 0.0)
            }
        }
    }

    fn next_trial(&mut self) {
        self.trial += 1;
        self.motion = if self.trial < self.profile.radii.len() {
            Motion::Holding
        } else {
            Motion::Done
        };
        tracing::debug!(trial = self.trial + 1, "simulated participant repositions");
    }
}

impl<K: Clock> Digitizer for SimulatedParticipant<K> {
    fn read(&mut self) -> Result<StylusReading, BoxError> {
        self.reads += 1;
        if self
            .profile
            .disconnect_after
            .is_some_and(|limit| self.reads > limit)
        {
            return Err(Box::new(HwError::Disconnected("simulated tablet".into())));
        }

        if let Some(go) = self.go.take()
            && self.motion == Motion::Holding
        {
            self.motion = Motion::Circling { go };
        }

        let Motion::Circling { go } = self.motion else {
            return Ok(self.at_marker());
        };
        let p = &self.profile;
        let t = (self.clock.now().saturating_duration_since(go).as_secs_f64() - p.reaction_s)
            .max(0.0);
        let swept = p.angular_speed * t;
        if swept >= TAU + p.overshoot_rad {
            self.next_trial();
            return Ok(self.at_marker());
        }
        let radius = self.profile.radii.get(self.trial).copied().unwrap_or(0.0)
            + p.wobble_px * (5.0 * swept).sin();
        Ok(self.on_ring(radius, FRAC_PI_2 + swept))
    }
}

impl<K: Clock> SimulatedCue<K> {
    /// Number of times the cue has played.
    pub fn plays(&self) -> u32 {
        self.plays.get()
    }
}

impl<K: Clock> Cue for SimulatedCue<K> {
    fn play(&mut self) -> Result<(), BoxError> {
        self.go.set(Some(self.clock.now()));
        self.plays.set(self.plays.get() + 1);
        tracing::debug!(plays = self.plays.get(), "go cue");
        Ok(())
    }
}
