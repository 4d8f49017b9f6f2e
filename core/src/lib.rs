#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the emission simulation workspace.
//!
//! This crate defines the data surface that connects adapters and the pure
//! stepping engine. Adapters assemble a [`Scenario`] (a configuration patch,
//! a list of [`FlowEvent`] values, and a utilization curve), the engine folds
//! the scenario into an ordered sequence of [`Tick`] snapshots, and consumers
//! read the snapshots without ever mutating shared state. All types here are
//! plain data with no behaviour beyond derivation of dependent quantities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of seconds in one simulated day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Numeric parameters governing the acquisition control loop.
///
/// Every field resolves to a concrete number before a run starts; partial
/// input is expressed through [`ConfigPatch`]. The defaults are the canonical
/// preset contract and must not drift, since externally stored scenarios rely
/// on them.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Baseline acquisition rate in amount per second.
    pub base_acquisition_rate: f64,
    /// Maximum amount the reward pool may accrue.
    pub max_pool_size: f64,
    /// Utilization fraction at or above which the pool accrues.
    pub target_utilization: f64,
    /// Bump-rate increase applied per elapsed bump interval.
    pub bump_increment: f64,
    /// Length of one bump-up interval in seconds.
    pub bump_interval_seconds: f64,
    /// Speed multiplier applied when deriving the bump decay interval.
    pub reduction_speed_multiplier: f64,
    /// Largest fractional rate change allowed per efficiency mutation.
    pub max_rate_change: f64,
    /// Length of the deposit window in days.
    pub deposit_period_days: f64,
    /// Length of the withdrawal window in days.
    pub withdrawal_period_days: f64,
    /// Length of the cliff period in days.
    pub cliff_period_days: f64,
    /// Bump rate carried over from a previous emission round.
    pub initial_bump_rate: f64,
    /// Display-only loan-to-value factor used for the CDP rate impact.
    pub max_ltv: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            base_acquisition_rate: 826.719,
            max_pool_size: 1_000_000_000.0,
            target_utilization: 0.50,
            bump_increment: 0.001,
            bump_interval_seconds: 17_280.0,
            reduction_speed_multiplier: 2.0,
            max_rate_change: 0.20,
            deposit_period_days: 14.0,
            withdrawal_period_days: 7.0,
            cliff_period_days: 90.0,
            initial_bump_rate: 0.0,
            max_ltv: 0.80,
        }
    }
}

impl SimulationConfig {
    /// Length of the deposit window in seconds.
    #[must_use]
    pub fn deposit_period_seconds(&self) -> f64 {
        self.deposit_period_days * SECONDS_PER_DAY
    }

    /// Length of the withdrawal window in seconds.
    #[must_use]
    pub fn withdrawal_period_seconds(&self) -> f64 {
        self.withdrawal_period_days * SECONDS_PER_DAY
    }

    /// Length of the cliff period in seconds.
    #[must_use]
    pub fn cliff_period_seconds(&self) -> f64 {
        self.cliff_period_days * SECONDS_PER_DAY
    }

    /// Combined deposit, withdrawal and cliff window length in days.
    #[must_use]
    pub fn window_days(&self) -> f64 {
        self.deposit_period_days + self.withdrawal_period_days + self.cliff_period_days
    }

    /// Ceiling applied to the acquisition rate by efficiency mutations.
    ///
    /// Derived as the rate that would fill the pool exactly over the deposit
    /// window. A non-positive deposit window disables the ceiling.
    #[must_use]
    pub fn max_acquisition_rate(&self) -> f64 {
        let period = self.deposit_period_seconds();
        if period > 0.0 {
            self.max_pool_size / period
        } else {
            f64::INFINITY
        }
    }

    /// Interval between bump-rate reductions in seconds.
    ///
    /// Derived from the bump interval and the reduction speed multiplier. A
    /// non-positive multiplier falls back to the undivided bump interval.
    #[must_use]
    pub fn bump_reduction_interval_seconds(&self) -> f64 {
        if self.reduction_speed_multiplier > 0.0 {
            self.bump_interval_seconds / self.reduction_speed_multiplier
        } else {
            self.bump_interval_seconds
        }
    }

    /// Returns a copy of the configuration with the patch applied on top.
    #[must_use]
    pub fn merged(mut self, patch: &ConfigPatch) -> Self {
        if let Some(value) = patch.base_acquisition_rate {
            self.base_acquisition_rate = value;
        }
        if let Some(value) = patch.max_pool_size {
            self.max_pool_size = value;
        }
        if let Some(value) = patch.target_utilization {
            self.target_utilization = value;
        }
        if let Some(value) = patch.bump_increment {
            self.bump_increment = value;
        }
        if let Some(value) = patch.bump_interval_seconds {
            self.bump_interval_seconds = value;
        }
        if let Some(value) = patch.reduction_speed_multiplier {
            self.reduction_speed_multiplier = value;
        }
        if let Some(value) = patch.max_rate_change {
            self.max_rate_change = value;
        }
        if let Some(value) = patch.deposit_period_days {
            self.deposit_period_days = value;
        }
        if let Some(value) = patch.withdrawal_period_days {
            self.withdrawal_period_days = value;
        }
        if let Some(value) = patch.cliff_period_days {
            self.cliff_period_days = value;
        }
        if let Some(value) = patch.initial_bump_rate {
            self.initial_bump_rate = value;
        }
        if let Some(value) = patch.max_ltv {
            self.max_ltv = value;
        }
        self
    }
}

/// Partial configuration supplied by adapters.
///
/// Unset fields resolve to the [`SimulationConfig`] defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    /// Overrides [`SimulationConfig::base_acquisition_rate`].
    pub base_acquisition_rate: Option<f64>,
    /// Overrides [`SimulationConfig::max_pool_size`].
    pub max_pool_size: Option<f64>,
    /// Overrides [`SimulationConfig::target_utilization`].
    pub target_utilization: Option<f64>,
    /// Overrides [`SimulationConfig::bump_increment`].
    pub bump_increment: Option<f64>,
    /// Overrides [`SimulationConfig::bump_interval_seconds`].
    pub bump_interval_seconds: Option<f64>,
    /// Overrides [`SimulationConfig::reduction_speed_multiplier`].
    pub reduction_speed_multiplier: Option<f64>,
    /// Overrides [`SimulationConfig::max_rate_change`].
    pub max_rate_change: Option<f64>,
    /// Overrides [`SimulationConfig::deposit_period_days`].
    pub deposit_period_days: Option<f64>,
    /// Overrides [`SimulationConfig::withdrawal_period_days`].
    pub withdrawal_period_days: Option<f64>,
    /// Overrides [`SimulationConfig::cliff_period_days`].
    pub cliff_period_days: Option<f64>,
    /// Overrides [`SimulationConfig::initial_bump_rate`].
    pub initial_bump_rate: Option<f64>,
    /// Overrides [`SimulationConfig::max_ltv`].
    pub max_ltv: Option<f64>,
}

impl ConfigPatch {
    /// Resolves the patch into a complete configuration over the defaults.
    #[must_use]
    pub fn resolve(&self) -> SimulationConfig {
        SimulationConfig::default().merged(self)
    }
}

/// Direction of an exogenous liquidity event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowKind {
    /// Adds the event amount to the deposit ledger.
    Deposit,
    /// Removes the event amount from net deposits.
    Withdrawal,
}

/// Timestamped deposit or withdrawal consumed by the engine in time order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowEvent {
    /// Fractional day offset at which the event occurs.
    pub day: f64,
    /// Whether the event deposits into or withdraws from the pool.
    pub kind: FlowKind,
    /// Amount moved by the event.
    pub amount: f64,
}

impl FlowEvent {
    /// Absolute second offset at which the event occurs.
    #[must_use]
    pub fn seconds(&self) -> f64 {
        self.day * SECONDS_PER_DAY
    }
}

/// Sample of the piecewise-linear utilization control curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UtilizationPoint {
    /// Fractional day offset of the sample.
    pub day: f64,
    /// Utilization fraction observed at the sample day.
    pub utilization: f64,
}

/// Lifecycle phase of an emission round.
///
/// Phases advance strictly forward through the declared order once the first
/// deposit starts the window timers; a run never transitions backwards.
/// [`Phase::PostWithdrawal`] is visible for exactly one tick, the instant the
/// withdrawal window closes and the acquisition budget is evaluated.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// No deposit has started the window timers yet.
    Awaiting,
    /// The deposit window is open.
    Deposit,
    /// The deposit window has closed; withdrawals are still accepted.
    Withdrawal,
    /// The withdrawal window has just closed; the budget evaluation runs now.
    PostWithdrawal,
    /// The emission round has entered its cliff period.
    Cliff,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Awaiting => "awaiting",
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::PostWithdrawal => "post-withdrawal",
            Self::Cliff => "cliff",
        };
        f.write_str(text)
    }
}

/// Snapshot of the full simulation state at one simulated hour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Elapsed day offset, rounded to two decimals for display stability.
    pub day: f64,
    /// Exact elapsed seconds since the start of the run.
    pub seconds: f64,
    /// Lifecycle phase the run occupies at this tick.
    pub phase: Phase,
    /// Amount accrued into the reward pool so far.
    pub pool_accrued: f64,
    /// Whether the pool has saturated at the configured cap.
    pub pool_maxed: bool,
    /// Acquisition rate in effect at this tick, in amount per second.
    pub acquisition_rate: f64,
    /// Utilization interpolated from the control curve.
    pub utilization: f64,
    /// Whether utilization is at or above the configured target.
    pub above_target: bool,
    /// Current bump rate.
    pub bump_rate: f64,
    /// Bump rate scaled by the configured maximum loan-to-value factor.
    pub cdp_rate_impact: f64,
    /// Cumulative accepted deposits; never reduced by withdrawals.
    pub total_gross_deposits: f64,
    /// Cumulative deposits net of withdrawals, floored at zero.
    pub total_net_deposits: f64,
    /// Gross deposits over accrued pool, zero while either is non-positive.
    pub efficiency: f64,
    /// Efficiency recorded by the most recent rate mutation, if any.
    pub last_mutation_efficiency: Option<f64>,
    /// Whether the one-time post-window budget evaluation has run.
    pub efficiency_clamped: bool,
    /// Acquisition budget fixed by the evaluation; unset until it runs.
    pub acquisition_budget: Option<f64>,
    /// Human-readable description of events or clamp actions in this tick.
    pub label: Option<String>,
}

/// Complete runnable input bundle: configuration, events and control curve.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Configuration overrides applied on top of the defaults.
    pub config: ConfigPatch,
    /// Exogenous deposit and withdrawal events.
    pub events: Vec<FlowEvent>,
    /// Samples of the utilization control curve.
    pub curve: Vec<UtilizationPoint>,
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigPatch, FlowEvent, FlowKind, Phase, Scenario, SimulationConfig, Tick,
        UtilizationPoint,
    };
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn defaults_match_preset_contract() {
        let config = SimulationConfig::default();
        assert_eq!(config.base_acquisition_rate, 826.719);
        assert_eq!(config.max_pool_size, 1_000_000_000.0);
        assert_eq!(config.target_utilization, 0.50);
        assert_eq!(config.bump_increment, 0.001);
        assert_eq!(config.bump_interval_seconds, 17_280.0);
        assert_eq!(config.reduction_speed_multiplier, 2.0);
        assert_eq!(config.max_rate_change, 0.20);
        assert_eq!(config.deposit_period_days, 14.0);
        assert_eq!(config.withdrawal_period_days, 7.0);
        assert_eq!(config.cliff_period_days, 90.0);
        assert_eq!(config.initial_bump_rate, 0.0);
        assert_eq!(config.max_ltv, 0.80);
    }

    #[test]
    fn derived_windows_and_rates_follow_configuration() {
        let config = SimulationConfig::default();
        assert_eq!(config.deposit_period_seconds(), 1_209_600.0);
        assert_eq!(config.withdrawal_period_seconds(), 604_800.0);
        assert_eq!(config.cliff_period_seconds(), 7_776_000.0);
        assert_eq!(config.window_days(), 111.0);
        assert_eq!(config.bump_reduction_interval_seconds(), 8_640.0);
        assert!((config.max_acquisition_rate() - 826.719_576_719_576_7).abs() < 1e-9);
    }

    #[test]
    fn zero_length_deposit_window_disables_rate_ceiling() {
        let config = SimulationConfig {
            deposit_period_days: 0.0,
            ..SimulationConfig::default()
        };
        assert_eq!(config.max_acquisition_rate(), f64::INFINITY);
    }

    #[test]
    fn empty_patch_resolves_to_defaults() {
        assert_eq!(ConfigPatch::default().resolve(), SimulationConfig::default());
    }

    #[test]
    fn patch_overrides_only_named_fields() {
        let patch = ConfigPatch {
            base_acquisition_rate: Some(100.0),
            cliff_period_days: Some(30.0),
            ..ConfigPatch::default()
        };
        let resolved = patch.resolve();
        assert_eq!(resolved.base_acquisition_rate, 100.0);
        assert_eq!(resolved.cliff_period_days, 30.0);
        assert_eq!(resolved.deposit_period_days, 14.0);
        assert_eq!(resolved.max_pool_size, 1_000_000_000.0);
    }

    #[test]
    fn phases_order_forward() {
        assert!(Phase::Awaiting < Phase::Deposit);
        assert!(Phase::Deposit < Phase::Withdrawal);
        assert!(Phase::Withdrawal < Phase::PostWithdrawal);
        assert!(Phase::PostWithdrawal < Phase::Cliff);
    }

    #[test]
    fn phase_display_uses_consumer_spelling() {
        assert_eq!(Phase::PostWithdrawal.to_string(), "post-withdrawal");
        assert_eq!(Phase::Awaiting.to_string(), "awaiting");
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn flow_event_round_trips_through_bincode() {
        let event = FlowEvent {
            day: 0.5,
            kind: FlowKind::Deposit,
            amount: 500_000_000.0,
        };
        assert_round_trip(&event);
    }

    #[test]
    fn utilization_point_round_trips_through_bincode() {
        let point = UtilizationPoint {
            day: 10.0,
            utilization: 0.7,
        };
        assert_round_trip(&point);
    }

    #[test]
    fn phase_round_trips_through_bincode() {
        assert_round_trip(&Phase::PostWithdrawal);
    }

    #[test]
    fn tick_round_trips_through_bincode() {
        let tick = Tick {
            day: 1.5,
            seconds: 129_600.0,
            phase: Phase::Deposit,
            pool_accrued: 1_000.0,
            pool_maxed: false,
            acquisition_rate: 826.719,
            utilization: 0.65,
            above_target: true,
            bump_rate: 0.002,
            cdp_rate_impact: 0.0016,
            total_gross_deposits: 500_000_000.0,
            total_net_deposits: 400_000_000.0,
            efficiency: 500_000.0,
            last_mutation_efficiency: Some(450_000.0),
            efficiency_clamped: false,
            acquisition_budget: None,
            label: Some("Deposit 500M".to_owned()),
        };
        assert_round_trip(&tick);
    }

    #[test]
    fn scenario_round_trips_through_bincode() {
        let scenario = Scenario {
            config: ConfigPatch {
                target_utilization: Some(0.6),
                ..ConfigPatch::default()
            },
            events: vec![FlowEvent {
                day: 0.0,
                kind: FlowKind::Withdrawal,
                amount: 1_000.0,
            }],
            curve: vec![UtilizationPoint {
                day: 0.0,
                utilization: 0.3,
            }],
        };
        assert_round_trip(&scenario);
    }
}
