use std::thread;
use std::time::{Duration, Instant};

/// How the clock spaces consecutive ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    /// Next tick starts as soon as the previous one finishes (simulation time).
    #[default]
    Immediate,
    /// Ticks start one period apart (wall-clock time).
    Fixed(Duration),
}

impl Pacing {
    /// Fixed pacing from a period in milliseconds; zero means [`Pacing::Immediate`].
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Self::Immediate
        } else {
            Self::Fixed(Duration::from_millis(ms))
        }
    }

    /// Tick period in hours, if wall-clock paced.
    pub fn period_hours(&self) -> Option<f64> {
        match self {
            Self::Immediate => None,
            Self::Fixed(period) => Some(period.as_secs_f64() / 3600.0),
        }
    }
}

/// A control-loop clock that hands out tick indices.
///
/// The `Clock` provides methods to advance tick-by-tick or run a function at
/// each tick until completion. A bounded clock stops after `total` ticks; an
/// unbounded one runs until the process stops scheduling it.
///
/// # Examples
///
/// ```
/// use bess_vreg::sim::clock::Clock;
///
/// let mut clock = Clock::new(3);
/// let mut ticks = Vec::new();
///
/// clock.run(|tick| ticks.push(tick));
/// assert_eq!(ticks, vec![0, 1, 2]);
/// ```
pub struct Clock {
    /// Next tick index
    current: usize,
    /// Total ticks to run, `None` for no limit
    total: Option<usize>,
    pacing: Pacing,
    /// Start of the previous tick
    last_start: Option<Instant>,
}

impl Clock {
    /// Creates a clock that runs `total` ticks without waiting between them.
    pub fn new(total: usize) -> Self {
        Self {
            current: 0,
            total: Some(total),
            pacing: Pacing::Immediate,
            last_start: None,
        }
    }

    /// Creates a clock with no tick limit.
    pub fn unbounded() -> Self {
        Self {
            total: None,
            ..Self::new(0)
        }
    }

    /// Sets how consecutive ticks are spaced.
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Returns `true` if the clock has a tick limit.
    pub fn is_bounded(&self) -> bool {
        self.total.is_some()
    }

    /// Advances the clock by one tick, sleeping first if paced.
    ///
    /// # Returns
    ///
    /// * `Some(tick)` - The tick index (starting from 0) that may now run
    /// * `None` - If the clock has reached its total ticks
    pub fn tick(&mut self) -> Option<usize> {
        if self.total.is_some_and(|total| self.current >= total) {
            return None;
        }
        if let (Pacing::Fixed(period), Some(last)) = (self.pacing, self.last_start) {
            let remaining = period.saturating_sub(last.elapsed());
            if !remaining.is_zero() {
                thread::sleep(remaining);
            }
        }
        self.last_start = Some(Instant::now());

        let tick = self.current;
        self.current += 1;
        Some(tick)
    }

    /// Runs a function for each remaining tick.
    ///
    /// # Arguments
    ///
    /// * `f` - A function that takes the current tick index as an argument
    pub fn run(&mut self, mut f: impl FnMut(usize)) {
        while let Some(tick) = self.tick() {
            f(tick);
        }
    }
}
