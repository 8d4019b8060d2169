//! Compute metering.
//!
//! The scheduler never measures work itself. Programs report what each step
//! cost and a [`ComputeMeter`] decides when the budget is gone.

/// State of the meter after recording a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterReading {
    /// Instructions charged this turn so far.
    pub consumed: u32,
    /// Whether the turn's budget is used up.
    pub exhausted: bool,
}

/// Counts instructions for one unit turn at a time.
pub trait ComputeMeter: Send {
    /// Start a fresh turn with `limit` instructions.
    fn begin_turn(&mut self, limit: u32);

    /// Charge a step that reported `instructions`.
    fn record(&mut self, instructions: u32) -> MeterReading;

    /// Charge the final step of a yielding turn.
    ///
    /// A yield costs exactly what it reports so the unused budget is credited
    /// in full.
    fn record_yield(&mut self, instructions: u32) -> MeterReading;

    /// Instructions charged this turn.
    fn consumed(&self) -> u32;
}

/// Trusts each step's report, charging at least one instruction per
/// continuing step so that a program can never spin forever.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepMeter {
    limit: u32,
    consumed: u32,
}

impl StepMeter {
    /// Create an idle meter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            limit: 0,
            consumed: 0,
        }
    }
}

impl ComputeMeter for StepMeter {
    fn begin_turn(&mut self, limit: u32) {
        self.limit = limit;
        self.consumed = 0;
    }

    fn record(&mut self, instructions: u32) -> MeterReading {
        self.record_yield(instructions.max(1))
    }

    fn record_yield(&mut self, instructions: u32) -> MeterReading {
        self.consumed = self.consumed.saturating_add(instructions);
        MeterReading {
            consumed: self.consumed,
            exhausted: self.consumed > self.limit,
        }
    }

    fn consumed(&self) -> u32 {
        self.consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_meter_charges_at_least_one() {
        let mut meter = StepMeter::new();
        meter.begin_turn(3);
        assert_eq!(meter.record(0).consumed, 1);
        assert!(!meter.record(1).exhausted);
        assert!(!meter.record(0).exhausted);
        assert!(meter.record(0).exhausted);
    }

    #[test]
    fn test_yield_is_charged_as_reported() {
        let mut meter = StepMeter::new();
        meter.begin_turn(100);
        meter.record(40);
        let reading = meter.record_yield(0);
        assert_eq!(reading.consumed, 40);
        assert!(!reading.exhausted);
    }

    #[test]
    fn test_using_exactly_the_budget_is_not_exhaustion() {
        let mut meter = StepMeter::new();
        meter.begin_turn(100);
        assert!(!meter.record(100).exhausted);
        assert!(meter.record(1).exhausted);
    }

    #[test]
    fn test_begin_turn_resets() {
        let mut meter = StepMeter::new();
        meter.begin_turn(100);
        meter.record(90);
        meter.begin_turn(100);
        assert_eq!(meter.consumed(), 0);
        assert!(!meter.record(40).exhausted);
    }

    #[test]
    fn test_overrun_saturates() {
        let mut meter = StepMeter::new();
        meter.begin_turn(10);
        meter.record(u32::MAX);
        let reading = meter.record(u32::MAX);
        assert_eq!(reading.consumed, u32::MAX);
        assert!(reading.exhausted);
    }
}
