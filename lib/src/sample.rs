use serde::{Deserialize, Serialize};

/// A single observation of a time series.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Sample { timestamp, value }
    }
}

impl From<(i64, f64)> for Sample {
    fn from((timestamp, value): (i64, f64)) -> Self {
        Sample::new(timestamp, value)
    }
}

/// Anything that can be placed on a chart.
///
/// Both coordinates are widened to `f64` before the downsampler does any
/// arithmetic with them, whatever their native representation.
pub trait Point {
    fn x(&self) -> f64;
    fn y(&self) -> f64;
}

impl Point for Sample {
    fn x(&self) -> f64 {
        self.timestamp as f64
    }

    fn y(&self) -> f64 {
        self.value
    }
}

impl Point for (f64, f64) {
    fn x(&self) -> f64 {
        self.0
    }

    fn y(&self) -> f64 {
        self.1
    }
}

impl Point for (i64, f64) {
    fn x(&self) -> f64 {
        self.0 as f64
    }

    fn y(&self) -> f64 {
        self.1
    }
}

impl Point for (i64, i64) {
    fn x(&self) -> f64 {
        self.0 as f64
    }

    fn y(&self) -> f64 {
        self.1 as f64
    }
}

impl<P: Point> Point for &P {
    fn x(&self) -> f64 {
        (**self).x()
    }

    fn y(&self) -> f64 {
        (**self).y()
    }
}
