#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic acquisition-rate stepping engine.
//!
//! The engine folds a [`Scenario`]-shaped input (configuration patch, flow
//! events, utilization curve) into one [`Tick`] snapshot per simulated hour.
//! Each run allocates fresh local state, consumes its inputs strictly in time
//! order, and terminates within the hard horizon ceiling, so identical inputs
//! always reproduce identical tick sequences. The engine performs no I/O,
//! raises no errors, and never panics: every ratio and interval divisor is
//! guarded before use.
//!
//! [`Scenario`]: emission_sim_core::Scenario

use std::cmp::Ordering;

use emission_sim_core::{
    ConfigPatch, FlowEvent, FlowKind, Phase, SimulationConfig, Tick, UtilizationPoint,
    SECONDS_PER_DAY,
};

/// Length of one simulation step in seconds.
pub const TICK_SECONDS: f64 = 3_600.0;

/// Hard ceiling applied to the simulated horizon, in days.
pub const HORIZON_CAP_DAYS: f64 = 150.0;

/// Days simulated past the latest event or curve sample.
const INPUT_TAIL_DAYS: f64 = 5.0;

/// Utilization assumed while the control curve has no samples.
const EMPTY_CURVE_UTILIZATION: f64 = 0.5;

/// Separator joining multiple labels emitted within a single tick.
const LABEL_SEPARATOR: &str = " | ";

/// Runs a scenario after resolving the configuration patch over the defaults.
#[must_use]
pub fn simulate(
    config: &ConfigPatch,
    events: &[FlowEvent],
    curve: &[UtilizationPoint],
) -> Vec<Tick> {
    simulate_resolved(&config.resolve(), events, curve)
}

/// Runs a scenario against an already resolved configuration.
#[must_use]
pub fn simulate_resolved(
    config: &SimulationConfig,
    events: &[FlowEvent],
    curve: &[UtilizationPoint],
) -> Vec<Tick> {
    let mut events: Vec<FlowEvent> = events.to_vec();
    events.sort_by(|a, b| a.day.partial_cmp(&b.day).unwrap_or(Ordering::Equal));

    let mut curve: Vec<UtilizationPoint> = curve.to_vec();
    curve.sort_by(|a, b| a.day.partial_cmp(&b.day).unwrap_or(Ordering::Equal));

    let horizon_seconds = (horizon_days(config, &events, &curve) * SECONDS_PER_DAY).max(0.0);
    let tick_count = (horizon_seconds / TICK_SECONDS).ceil() as usize + 1;

    let mut state = RunState::new(config);
    let mut ticks = Vec::with_capacity(tick_count);

    for index in 0..tick_count {
        let seconds = index as f64 * TICK_SECONDS;
        let day = seconds / SECONDS_PER_DAY;
        let tick_end = seconds + TICK_SECONDS;

        let utilization = utilization_at(&curve, day);
        let above_target = utilization >= config.target_utilization;

        let mut phase = state.phase_at(seconds);
        let mut labels: Vec<String> = Vec::new();

        // Events whose timestamp falls in [tick start, tick end).
        while state.next_event < events.len() && events[state.next_event].seconds() < tick_end {
            let event = events[state.next_event];
            state.next_event += 1;
            match event.kind {
                FlowKind::Deposit => {
                    if state.window.is_none() {
                        // The first deposit starts the window timers.
                        state.window = Some(Window::starting_at(seconds, config));
                        phase = Phase::Deposit;
                    }
                    if let Some(window) = &state.window {
                        if event.seconds() < window.deposit_end {
                            state.gross += event.amount;
                            state.net += event.amount;
                            labels.push(format!("Deposit {}", format_amount(event.amount)));
                        }
                    }
                }
                FlowKind::Withdrawal => {
                    if let Some(window) = &state.window {
                        if event.seconds() < window.withdrawal_end {
                            state.net = (state.net - event.amount).max(0.0);
                            labels.push(format!("Withdraw {}", format_amount(event.amount)));
                        }
                    }
                }
            }
        }

        // Pool accrual, skipped on the very first tick.
        if index > 0 && above_target && !state.pool_maxed {
            state.pool += state.rate * TICK_SECONDS;
            if state.pool >= config.max_pool_size {
                state.pool = config.max_pool_size;
                state.pool_maxed = true;
            }
        }

        // Efficiency-driven rate mutation while the deposit window is open.
        if day >= 1.0 && phase == Phase::Deposit && state.gross > 0.0 && state.pool > 0.0 {
            let efficiency = state.gross / state.pool;
            match state.last_mutation_efficiency {
                None => state.last_mutation_efficiency = Some(efficiency),
                Some(previous) if previous > 0.0 => {
                    let delta = ((efficiency - previous) / previous)
                        .max(-config.max_rate_change)
                        .min(config.max_rate_change);
                    let rate_change = delta.abs() * state.rate;
                    if delta < 0.0 {
                        // Efficiency worsened: emit faster to attract deposits.
                        state.rate = (state.rate + rate_change).min(config.max_acquisition_rate());
                    } else if delta > 0.0 {
                        // Efficiency improved: emit less.
                        state.rate = (state.rate - rate_change).max(0.0);
                    }
                    state.last_mutation_efficiency = Some(efficiency);
                }
                Some(_) => {}
            }
        }

        // Bump up while the pool is saturated and utilization holds the target.
        if state.pool_maxed && above_target {
            if config.bump_interval_seconds > 0.0 {
                let elapsed = seconds - state.last_bump_up;
                if elapsed >= config.bump_interval_seconds {
                    let intervals = (elapsed / config.bump_interval_seconds).floor();
                    state.bump_rate += config.bump_increment * intervals;
                    // Consume whole intervals only; the remainder carries forward.
                    state.last_bump_up += intervals * config.bump_interval_seconds;
                }
            }
        } else {
            state.last_bump_up = seconds;
        }

        // Bump down while utilization sits below the target.
        if !above_target && state.bump_rate > 0.0 {
            let reduction_interval = config.bump_reduction_interval_seconds();
            if reduction_interval > 0.0 {
                let elapsed = seconds - state.last_bump_down;
                if elapsed >= reduction_interval {
                    let intervals = (elapsed / reduction_interval).floor();
                    state.bump_rate =
                        (state.bump_rate - config.bump_increment * intervals).max(0.0);
                    state.last_bump_down += intervals * reduction_interval;
                }
            }
        } else {
            state.last_bump_down = seconds;
        }

        // One-time acquisition budget evaluation once the window closes.
        if let Some(window) = &state.window {
            if state.budget.is_none() && seconds >= window.withdrawal_end {
                let budget = if state.gross > 0.0 {
                    let baseline_pool =
                        config.base_acquisition_rate * config.deposit_period_seconds();
                    let baseline_ratio = baseline_pool / state.gross;
                    let realized_ratio = state.pool / state.gross;
                    let max_acceptable = baseline_ratio * (1.0 + config.max_rate_change);
                    if realized_ratio > max_acceptable {
                        let clamped = (state.gross * max_acceptable).min(config.max_pool_size);
                        labels.push(format!(
                            "Acquisition clamped to {}",
                            format_amount(clamped)
                        ));
                        clamped
                    } else {
                        let passed = state.pool.min(config.max_pool_size);
                        labels.push(format!(
                            "Acquisition budget set {}",
                            format_amount(passed)
                        ));
                        passed
                    }
                } else {
                    labels.push("Acquisition budget set 0".to_owned());
                    0.0
                };
                state.budget = Some(budget);
            }
        }

        let efficiency = if state.gross > 0.0 && state.pool > 0.0 {
            state.gross / state.pool
        } else {
            0.0
        };
        let label = if labels.is_empty() {
            None
        } else {
            Some(labels.join(LABEL_SEPARATOR))
        };

        ticks.push(Tick {
            day: round_display_day(day),
            seconds,
            phase,
            pool_accrued: state.pool,
            pool_maxed: state.pool_maxed,
            acquisition_rate: state.rate,
            utilization,
            above_target,
            bump_rate: state.bump_rate,
            cdp_rate_impact: state.bump_rate * config.max_ltv,
            total_gross_deposits: state.gross,
            total_net_deposits: state.net,
            efficiency,
            last_mutation_efficiency: state.last_mutation_efficiency,
            efficiency_clamped: state.budget.is_some(),
            acquisition_budget: state.budget,
            label,
        });
    }

    ticks
}

/// Linearly interpolates the utilization curve at the provided day offset.
///
/// An empty curve reads as a constant 0.5, a single sample as a constant, and
/// day offsets outside the sampled domain clamp to the first or last value.
#[must_use]
pub fn utilization_at(curve: &[UtilizationPoint], day: f64) -> f64 {
    let (Some(first), Some(last)) = (curve.first(), curve.last()) else {
        return EMPTY_CURVE_UTILIZATION;
    };
    if curve.len() == 1 || day <= first.day {
        return first.utilization;
    }
    if day >= last.day {
        return last.utilization;
    }
    for pair in curve.windows(2) {
        let lower = &pair[0];
        let upper = &pair[1];
        if day < lower.day || day > upper.day {
            continue;
        }
        let span = upper.day - lower.day;
        if span <= 0.0 {
            return upper.utilization;
        }
        let blend = (day - lower.day) / span;
        return lower.utilization + (upper.utilization - lower.utilization) * blend;
    }
    last.utilization
}

/// Formats an amount in the compact notation used by tick labels.
#[must_use]
pub fn format_amount(amount: f64) -> String {
    let magnitude = amount.abs();
    if magnitude >= 1e9 {
        format!("{}B", trim_decimals(amount / 1e9))
    } else if magnitude >= 1e6 {
        format!("{}M", trim_decimals(amount / 1e6))
    } else if magnitude >= 1e3 {
        format!("{}K", trim_decimals(amount / 1e3))
    } else {
        trim_decimals(amount)
    }
}

fn trim_decimals(value: f64) -> String {
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_owned()
}

fn round_display_day(day: f64) -> f64 {
    (day * 100.0).round() / 100.0
}

/// Derives the simulated horizon in days from the configuration and inputs.
fn horizon_days(
    config: &SimulationConfig,
    events: &[FlowEvent],
    curve: &[UtilizationPoint],
) -> f64 {
    let mut horizon = config.window_days();
    let latest_input = events
        .iter()
        .map(|event| event.day)
        .chain(curve.iter().map(|point| point.day))
        .fold(f64::NEG_INFINITY, f64::max);
    if latest_input.is_finite() {
        horizon = horizon.max(latest_input + INPUT_TAIL_DAYS);
    }
    horizon.min(HORIZON_CAP_DAYS)
}

/// Window end times fixed by the first accepted deposit.
struct Window {
    deposit_end: f64,
    withdrawal_end: f64,
}

impl Window {
    fn starting_at(seconds: f64, config: &SimulationConfig) -> Self {
        let deposit_end = seconds + config.deposit_period_seconds();
        Self {
            deposit_end,
            withdrawal_end: deposit_end + config.withdrawal_period_seconds(),
        }
    }
}

/// Mutable accumulator threaded through the stepping loop of a single run.
struct RunState {
    window: Option<Window>,
    pool: f64,
    pool_maxed: bool,
    rate: f64,
    gross: f64,
    net: f64,
    bump_rate: f64,
    last_bump_up: f64,
    last_bump_down: f64,
    last_mutation_efficiency: Option<f64>,
    budget: Option<f64>,
    next_event: usize,
}

impl RunState {
    fn new(config: &SimulationConfig) -> Self {
        Self {
            window: None,
            pool: 0.0,
            pool_maxed: false,
            rate: config.base_acquisition_rate,
            gross: 0.0,
            net: 0.0,
            bump_rate: config.initial_bump_rate,
            last_bump_up: 0.0,
            last_bump_down: 0.0,
            last_mutation_efficiency: None,
            budget: None,
            next_event: 0,
        }
    }

    fn phase_at(&self, seconds: f64) -> Phase {
        match &self.window {
            None => Phase::Awaiting,
            Some(window) if seconds < window.deposit_end => Phase::Deposit,
            Some(window) if seconds < window.withdrawal_end => Phase::Withdrawal,
            Some(_) if self.budget.is_none() => Phase::PostWithdrawal,
            Some(_) => Phase::Cliff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{format_amount, horizon_days, simulate_resolved, utilization_at, HORIZON_CAP_DAYS};
    use emission_sim_core::{FlowEvent, FlowKind, SimulationConfig, UtilizationPoint};

    fn point(day: f64, utilization: f64) -> UtilizationPoint {
        UtilizationPoint { day, utilization }
    }

    #[test]
    fn empty_curve_reads_as_half_utilization() {
        assert_eq!(utilization_at(&[], 3.0), 0.5);
    }

    #[test]
    fn single_sample_curve_is_constant() {
        let curve = vec![point(4.0, 0.8)];
        assert_eq!(utilization_at(&curve, 0.0), 0.8);
        assert_eq!(utilization_at(&curve, 100.0), 0.8);
    }

    #[test]
    fn interpolation_clamps_outside_domain_and_blends_inside() {
        let curve = vec![point(0.0, 0.3), point(10.0, 0.7)];
        assert_eq!(utilization_at(&curve, -1.0), 0.3);
        assert_eq!(utilization_at(&curve, 0.0), 0.3);
        assert_eq!(utilization_at(&curve, 5.0), 0.5);
        assert_eq!(utilization_at(&curve, 10.0), 0.7);
        assert_eq!(utilization_at(&curve, 25.0), 0.7);
    }

    #[test]
    fn interpolation_tolerates_duplicate_sample_days() {
        let curve = vec![point(0.0, 0.2), point(5.0, 0.4), point(5.0, 0.9)];
        let value = utilization_at(&curve, 5.0);
        assert!((0.2..=0.9).contains(&value));
    }

    #[test]
    fn amounts_format_compactly() {
        assert_eq!(format_amount(500_000_000.0), "500M");
        assert_eq!(format_amount(1_500_000_000.0), "1.5B");
        assert_eq!(format_amount(12_500.0), "12.5K");
        assert_eq!(format_amount(826.719), "826.72");
        assert_eq!(format_amount(0.0), "0");
    }

    #[test]
    fn horizon_defaults_to_combined_window() {
        let config = SimulationConfig::default();
        assert_eq!(horizon_days(&config, &[], &[]), 111.0);
    }

    #[test]
    fn horizon_extends_past_latest_input() {
        let config = SimulationConfig::default();
        let events = vec![FlowEvent {
            day: 120.0,
            kind: FlowKind::Deposit,
            amount: 1.0,
        }];
        assert_eq!(horizon_days(&config, &events, &[]), 125.0);

        let curve = vec![point(130.0, 0.5)];
        assert_eq!(horizon_days(&config, &events, &curve), 135.0);
    }

    #[test]
    fn horizon_is_capped() {
        let config = SimulationConfig::default();
        let events = vec![FlowEvent {
            day: 400.0,
            kind: FlowKind::Deposit,
            amount: 1.0,
        }];
        assert_eq!(horizon_days(&config, &events, &[]), HORIZON_CAP_DAYS);
    }

    #[test]
    fn collapsed_horizon_still_yields_one_tick() {
        let config = SimulationConfig {
            deposit_period_days: 0.0,
            withdrawal_period_days: 0.0,
            cliff_period_days: 0.0,
            ..SimulationConfig::default()
        };
        let ticks = simulate_resolved(&config, &[], &[]);
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].seconds, 0.0);
        assert_eq!(ticks[0].pool_accrued, 0.0);
    }
}
