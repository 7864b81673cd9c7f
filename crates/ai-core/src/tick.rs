/// Frame timing handed to every scheduled update.
///
/// `time_seconds` is the accumulated game time at the start of this tick and
/// is what absolute-time schedules (e.g. random interruptions) compare against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    pub tick: u64,
    pub dt_seconds: f32,
    pub time_seconds: f64,
    pub seed: u64,
}

impl TickContext {
    pub fn new(tick: u64, dt_seconds: f32, seed: u64) -> Self {
        Self {
            tick,
            dt_seconds,
            time_seconds: tick as f64 * f64::from(dt_seconds),
            seed,
        }
    }

    /// Context for the tick following this one, with the same step length.
    pub fn next(&self) -> Self {
        Self {
            tick: self.tick + 1,
            dt_seconds: self.dt_seconds,
            time_seconds: self.time_seconds + f64::from(self.dt_seconds),
            seed: self.seed,
        }
    }
}
