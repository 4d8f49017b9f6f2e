//! Built-in scenario fixtures mirroring the original dashboard preset table.

use emission_sim_core::{ConfigPatch, FlowEvent, FlowKind, Scenario, UtilizationPoint};

/// Preset selected when the command line names no scenario source.
pub(crate) const DEFAULT_PRESET: &str = "healthy-window";

/// Named scenario fixture with a one-line description.
pub(crate) struct Preset {
    /// Stable preset identifier accepted by `--preset`.
    pub(crate) name: &'static str,
    /// One-line description shown by the preset listing.
    pub(crate) summary: &'static str,
    /// The runnable scenario bundle.
    pub(crate) scenario: Scenario,
}

/// Returns every built-in preset in listing order.
pub(crate) fn all() -> Vec<Preset> {
    vec![
        healthy_window(),
        idle_market(),
        overshoot_clamp(),
        cooling_market(),
    ]
}

/// Looks up a preset scenario by name.
pub(crate) fn find(name: &str) -> Option<Scenario> {
    all()
        .into_iter()
        .find(|preset| preset.name == name)
        .map(|preset| preset.scenario)
}

fn deposit(day: f64, amount: f64) -> FlowEvent {
    FlowEvent {
        day,
        kind: FlowKind::Deposit,
        amount,
    }
}

fn withdrawal(day: f64, amount: f64) -> FlowEvent {
    FlowEvent {
        day,
        kind: FlowKind::Withdrawal,
        amount,
    }
}

fn sample(day: f64, utilization: f64) -> UtilizationPoint {
    UtilizationPoint { day, utilization }
}

fn healthy_window() -> Preset {
    Preset {
        name: DEFAULT_PRESET,
        summary: "Utilization pinned above target with one large early deposit.",
        scenario: Scenario {
            config: ConfigPatch::default(),
            events: vec![deposit(0.5, 500_000_000.0)],
            curve: vec![sample(0.0, 0.65), sample(30.0, 0.65)],
        },
    }
}

fn idle_market() -> Preset {
    Preset {
        name: "idle-market",
        summary: "No events and no curve; the emission window never opens.",
        scenario: Scenario::default(),
    }
}

fn overshoot_clamp() -> Preset {
    Preset {
        name: "overshoot-clamp",
        summary: "Slow baseline the controller overshoots until the budget clamp fires.",
        scenario: Scenario {
            config: ConfigPatch {
                base_acquisition_rate: Some(100.0),
                ..ConfigPatch::default()
            },
            events: vec![deposit(0.0, 1_000_000.0)],
            curve: vec![sample(0.0, 0.9)],
        },
    }
}

fn cooling_market() -> Preset {
    Preset {
        name: "cooling-market",
        summary: "Early deposits and a falling curve that drains the bump rate.",
        scenario: Scenario {
            config: ConfigPatch::default(),
            events: vec![
                deposit(1.0, 300_000_000.0),
                deposit(2.0, 200_000_000.0),
                withdrawal(10.0, 150_000_000.0),
            ],
            curve: vec![
                sample(0.0, 0.72),
                sample(10.0, 0.55),
                sample(20.0, 0.35),
                sample(40.0, 0.2),
            ],
        },
    }
}
