//! Economy system: power pools, action costs and per-round income.
//!
//! Power is the only team resource. It is earned three ways:
//!
//! - HQ income every round while the HQ lives
//! - generator income per owned generator
//! - unused compute credited when a unit yields early
//!
//! and spent on spawning, capturing, research, scanning and broadcasting.
//! Every non-HQ unit costs upkeep each round, and the stockpile decays
//! geometrically, so hoarding is never free.
//!
//! # Round model
//!
//! ```text
//! pool += hq_income + generators × generator_income
//! pool -= units × upkeep        (drained to 0 and units damaged if short)
//! pool *= decay                 (fusion_power_decay with Fusion)
//! ```

use crate::error::{ActionResult, ErrorKind, GameActionError};
use crate::game::Balance;

/// One team's power stockpile.
///
/// The value is never negative: the only way to spend is [`ResourcePool::try_debit`],
/// which checks and debits in one step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourcePool {
    power: f64,
}

impl ResourcePool {
    /// Create a pool holding `power`. Negative or non-finite input becomes zero.
    #[must_use]
    pub fn new(power: f64) -> Self {
        Self {
            power: sanitize(power),
        }
    }

    /// Current power.
    #[must_use]
    pub const fn power(&self) -> f64 {
        self.power
    }

    /// Whether the pool can cover `amount`.
    #[must_use]
    pub fn can_afford(&self, amount: f64) -> bool {
        amount <= self.power
    }

    /// Debit `amount` if the pool covers it.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InsufficientResource`] and leaves the pool
    /// unchanged when it holds less than `amount`.
    pub fn try_debit(&mut self, amount: f64) -> ActionResult<()> {
        let amount = sanitize(amount);
        if !self.can_afford(amount) {
            return Err(GameActionError::new(
                ErrorKind::InsufficientResource,
                format!("needs {amount:.2} power, team has {:.2}", self.power),
            ));
        }
        self.power -= amount;
        Ok(())
    }

    /// Add power. Negative amounts are ignored.
    pub fn credit(&mut self, amount: f64) {
        self.power += sanitize(amount);
    }

    /// Take whatever is available up to `amount`. Returns `true` if it was all paid.
    pub fn drain(&mut self, amount: f64) -> bool {
        let amount = sanitize(amount);
        if self.can_afford(amount) {
            self.power -= amount;
            true
        } else {
            self.power = 0.0;
            false
        }
    }

    /// Multiply the stockpile by `factor` (clamped to `[0, 1]`).
    pub fn decay(&mut self, factor: f64) {
        self.power *= factor.clamp(0.0, 1.0);
    }
}

fn sanitize(amount: f64) -> f64 {
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

/// Cost of starting a capture.
///
/// Each capture already under way (including ones queued this round) and each
/// encampment already owned makes the next one more expensive.
#[must_use]
pub fn capture_cost(balance: &Balance, captures_in_progress: usize, owned_encampments: usize) -> f64 {
    let multiplier = captures_in_progress + owned_encampments + 1;
    #[allow(clippy::cast_precision_loss)]
    let multiplier = multiplier as f64;
    balance.capture_cost * multiplier
}

/// Power credited for compute left unused at yield.
///
/// An overrun (`consumed >= limit`) credits exactly zero.
#[must_use]
pub fn unused_compute_reward(balance: &Balance, limit: u32, consumed: u32) -> f64 {
    let unused = limit.saturating_sub(consumed);
    balance.power_per_unused_bytecode * f64::from(unused)
}

/// Spawn cooldown given the number of suppliers a team owns. Never below 1.
#[must_use]
pub fn spawn_delay(balance: &Balance, suppliers: usize) -> u32 {
    #[allow(clippy::cast_precision_loss)]
    let rate = 1.0 + balance.supplier_bonus * suppliers as f64;
    let delay = (f64::from(balance.base_spawn_delay) / rate).round();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let delay = if delay.is_finite() && delay >= 1.0 {
        delay as u32
    } else {
        1
    };
    delay.max(1)
}

/// Inputs to one team's round-end economy step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamHoldings {
    /// Whether the team's HQ is alive.
    pub hq_alive: bool,
    /// Owned generators.
    pub generators: usize,
    /// Units that pay upkeep (everything but the HQ).
    pub upkeep_units: usize,
    /// Whether Fusion is unlocked.
    pub fusion: bool,
}

/// Outcome of one team's round-end economy step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundEconomy {
    /// Income credited this round.
    pub income: f64,
    /// Upkeep owed this round.
    pub upkeep: f64,
    /// Whether the pool covered the upkeep.
    pub upkeep_paid: bool,
}

/// Apply income, upkeep and decay to a pool.
///
/// When `upkeep_paid` is false the caller damages every upkeep unit by
/// `unpowered_energon_loss`.
pub fn apply_round_economy(
    balance: &Balance,
    pool: &mut ResourcePool,
    holdings: TeamHoldings,
) -> RoundEconomy {
    let income = if holdings.hq_alive {
        #[allow(clippy::cast_precision_loss)]
        let generators = holdings.generators as f64;
        balance.hq_income + balance.generator_income * generators
    } else {
        0.0
    };
    pool.credit(income);

    #[allow(clippy::cast_precision_loss)]
    let upkeep = balance.unit_upkeep * holdings.upkeep_units as f64;
    let upkeep_paid = pool.drain(upkeep);

    let decay = if holdings.fusion {
        balance.fusion_power_decay
    } else {
        balance.power_decay
    };
    pool.decay(decay);

    RoundEconomy {
        income,
        upkeep,
        upkeep_paid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_failed_debit_leaves_pool_unchanged() {
        let mut pool = ResourcePool::new(5.0);
        let err = pool.try_debit(10.0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InsufficientResource);
        assert!(approx(pool.power(), 5.0));

        pool.try_debit(5.0).unwrap();
        assert!(approx(pool.power(), 0.0));
    }

    #[test]
    fn test_pool_never_negative() {
        let mut pool = ResourcePool::new(-3.0);
        assert!(approx(pool.power(), 0.0));
        pool.credit(-10.0);
        pool.credit(f64::NAN);
        assert!(approx(pool.power(), 0.0));
        assert!(!pool.drain(4.0));
        assert!(approx(pool.power(), 0.0));
    }

    #[test]
    fn test_capture_cost_scales_with_concurrent_captures() {
        let balance = Balance::default();
        assert!(approx(capture_cost(&balance, 0, 0), balance.capture_cost));
        assert!(approx(capture_cost(&balance, 1, 0), balance.capture_cost * 2.0));
        assert!(approx(capture_cost(&balance, 1, 2), balance.capture_cost * 4.0));
    }

    #[test]
    fn test_unused_compute_reward() {
        let balance = Balance {
            power_per_unused_bytecode: 0.5,
            ..Balance::default()
        };
        assert!(approx(unused_compute_reward(&balance, 100, 40), 30.0));
        assert!(approx(unused_compute_reward(&balance, 100, 100), 0.0));
        assert!(approx(unused_compute_reward(&balance, 100, 250), 0.0));
    }

    #[test]
    fn test_spawn_delay_shrinks_with_suppliers() {
        let balance = Balance::default();
        assert_eq!(spawn_delay(&balance, 0), 10);
        assert_eq!(spawn_delay(&balance, 1), 8);
        assert!(spawn_delay(&balance, 4) < spawn_delay(&balance, 1));
        assert_eq!(spawn_delay(&balance, 10_000), 1);
    }

    #[test]
    fn test_round_economy_income_and_decay() {
        let balance = Balance::default();
        let mut pool = ResourcePool::new(0.0);
        let result = apply_round_economy(
            &balance,
            &mut pool,
            TeamHoldings {
                hq_alive: true,
                generators: 1,
                upkeep_units: 10,
                fusion: false,
            },
        );
        assert!(result.upkeep_paid);
        // (40 + 10 - 10) * 0.8
        assert!(approx(pool.power(), 32.0));
    }

    #[test]
    fn test_round_economy_unpaid_upkeep_drains() {
        let balance = Balance::default();
        let mut pool = ResourcePool::new(0.0);
        let result = apply_round_economy(
            &balance,
            &mut pool,
            TeamHoldings {
                hq_alive: false,
                generators: 0,
                upkeep_units: 3,
                fusion: true,
            },
        );
        assert!(!result.upkeep_paid);
        assert!(approx(pool.power(), 0.0));
    }
}
