use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The enumerated price range, walked on an integer grid of `step` sized ticks.
///
/// Tick `t` is the price `min + t * step`, rounded to the decimals the bounds and the
/// step are written with. When `max` is not a whole number of steps above `min` it
/// gets a tick of its own after the last grid point. All the partitioning arithmetic
/// happens on ticks so that no window bound ever lands between two representable prices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    min: f64,
    max: f64,
    step: f64,
    /// Last tick strictly on the `min + t * step` grid.
    grid_points: u64,
    last: u64,
    decimals: usize,
}

impl Domain {
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self> {
        if !(min.is_finite() && max.is_finite() && step.is_finite()) {
            return Err(Error::InvalidDomain(format!(
                "bounds and step must be finite (min {min}, max {max}, step {step})"
            )));
        }
        if step <= 0.0 {
            return Err(Error::InvalidDomain(format!("step must be positive, got {step}")));
        }
        if min > max {
            return Err(Error::InvalidDomain(format!("min {min} is above max {max}")));
        }
        let steps = (max - min) / step;
        if steps >= (u64::MAX - 1) as f64 {
            return Err(Error::InvalidDomain(format!(
                "{min}..={max} holds too many steps of {step}"
            )));
        }

        let nearest = steps.round();
        let aligned = (steps - nearest).abs() <= 1e-9 * steps.max(1.0);
        let grid_points = if aligned { nearest } else { steps.floor() } as u64;
        let last = if aligned { grid_points } else { grid_points + 1 };
        let decimals = decimals_of(step).max(decimals_of(min)).max(decimals_of(max));

        Ok(Self {
            min,
            max,
            step,
            grid_points,
            last,
            decimals,
        })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Tick of the global maximum. The global minimum is always tick `0`.
    pub fn last_tick(&self) -> u64 {
        self.last
    }

    pub fn price_at(&self, tick: u64) -> f64 {
        if tick >= self.last {
            return self.max;
        }
        let raw = self.min + tick as f64 * self.step;
        let scale = 10f64.powi(self.decimals as i32);
        (raw * scale).round() / scale
    }

    /// Nearest tick for `price`, clamped into the domain.
    pub fn tick_of(&self, price: f64) -> u64 {
        let steps = ((price - self.min) / self.step).round();
        let grid = if steps <= 0.0 {
            0
        } else {
            (steps as u64).min(self.grid_points)
        };
        if self.last > self.grid_points
            && (price - self.max).abs() < (price - self.price_at(grid)).abs()
        {
            return self.last;
        }
        grid
    }

    pub fn format_price(&self, tick: u64) -> String {
        format!("{:.*}", self.decimals, self.price_at(tick))
    }
}

fn decimals_of(value: f64) -> usize {
    let mut decimals = 0;
    let mut scaled = value.abs();
    while decimals < 12 && (scaled - scaled.round()).abs() > 1e-9 * scaled.max(1.0) {
        scaled *= 10.0;
        decimals += 1;
    }
    decimals
}

/// One probe over the inclusive tick window `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeQuery {
    min: u64,
    max: u64,
}

impl RangeQuery {
    pub fn new(min: u64, max: u64) -> Self {
        debug_assert!(min <= max, "window [{min}, {max}] is inverted");
        Self { min, max }
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn is_point(&self) -> bool {
        self.min == self.max
    }
}
