pub mod clock;

pub use clock::{Clock, MonotonicClock, VirtualClock};

/// One digitizer report: pointer position in screen pixels and normalized
/// stylus pressure in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StylusReading {
    pub x: f64,
    pub y: f64,
    pub pressure: f64,
}

impl StylusReading {
    pub const fn new(x: f64, y: f64, pressure: f64) -> Self {
        Self { x, y, pressure }
    }
}

/// Pen tablet or any other pointing device that reports position and pressure.
pub trait Digitizer {
    fn read(&mut self) -> Result<StylusReading, Box<dyn std::error::Error + Send + Sync>>;
}

/// Audible go signal played when the countdown reaches zero.
pub trait Cue {
    fn play(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Digitizer + ?Sized> Digitizer for Box<T> {
    fn read(&mut self) -> Result<StylusReading, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read()
    }
}

impl<T: Cue + ?Sized> Cue for Box<T> {
    fn play(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).play()
    }
}
