//! Hysteresis threshold notifier.
//!
//! A [`ThresholdNotifier`] watches a scalar stream (typically the close of
//! each new bar) and only reports a state change once its condition has held
//! for `threshold` consecutive observations. Transition table, given the
//! previous and new state:
//!
//! | was     | now     | event                  |
//! |---------|---------|------------------------|
//! | Outside | Inside  | [`NotifierEvent::Entry`]  |
//! | Inside  | Inside  | [`NotifierEvent::Inside`] |
//! | Inside  | Outside | [`NotifierEvent::Exit`]   |
//! | Outside | Outside | none                   |

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{config::MonitorConfig, window::Comparison};

/// Comparison applied as `observed <op> value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Above,
    Below,
    AtOrAbove,
    AtOrBelow,
}

impl Operator {
    pub const fn comparison(self) -> Comparison {
        match self {
            Operator::Above => Comparison::Greater,
            Operator::Below => Comparison::Less,
            Operator::AtOrAbove => Comparison::GreaterEq,
            Operator::AtOrBelow => Comparison::LessEq,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::Above => ">",
            Operator::Below => "<",
            Operator::AtOrAbove => ">=",
            Operator::AtOrBelow => "<=",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    pub operator: Operator,
    pub value: f64,
}

impl Condition {
    pub const fn new(operator: Operator, value: f64) -> Self {
        Self { operator, value }
    }

    /// `NaN` never satisfies a condition.
    pub fn holds(&self, observed: f64) -> bool {
        self.operator.comparison().holds(observed, self.value)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operator, self.value)
    }
}

/// A condition plus the number of consecutive hits it needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorData {
    pub condition: Condition,
    pub threshold: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifierState {
    #[default]
    Outside,
    Inside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierEvent {
    /// The condition has now held `threshold` times in a row.
    Entry,
    /// Still inside.
    Inside,
    /// The run broke after having been inside.
    Exit,
}

#[derive(Debug, Clone)]
pub struct ThresholdNotifier {
    monitor: MonitorData,
    count: u32,
    state: NotifierState,
}

impl ThresholdNotifier {
    /// A zero threshold is treated as one.
    pub fn new(condition: Condition, threshold: u32) -> Self {
        Self {
            monitor: MonitorData {
                condition,
                threshold: threshold.max(1),
            },
            count: 0,
            state: NotifierState::Outside,
        }
    }

    pub fn monitor(&self) -> &MonitorData {
        &self.monitor
    }

    pub fn state(&self) -> NotifierState {
        self.state
    }

    /// Current run of consecutive hits.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn observe(&mut self, value: f64) -> Option<NotifierEvent> {
        self.count = if self.monitor.condition.holds(value) {
            self.count.saturating_add(1)
        } else {
            0
        };
        let next = if self.count >= self.monitor.threshold {
            NotifierState::Inside
        } else {
            NotifierState::Outside
        };
        let event = match (self.state, next) {
            (NotifierState::Outside, NotifierState::Inside) => Some(NotifierEvent::Entry),
            (NotifierState::Inside, NotifierState::Inside) => Some(NotifierEvent::Inside),
            (NotifierState::Inside, NotifierState::Outside) => Some(NotifierEvent::Exit),
            (NotifierState::Outside, NotifierState::Outside) => None,
        };
        if self.state != next {
            debug!(
                condition = %self.monitor.condition,
                value,
                count = self.count,
                from = ?self.state,
                to = ?next,
                "notifier transition"
            );
        }
        self.state = next;
        event
    }

    /// Back to `Outside` with an empty run.
    pub fn reset(&mut self) {
        self.count = 0;
        self.state = NotifierState::Outside;
    }
}

/// Named notifiers fed from the same stream.
#[derive(Debug, Clone, Default)]
pub struct MonitorSet {
    notifiers: IndexMap<String, ThresholdNotifier>,
}

impl MonitorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(monitors: &[MonitorConfig]) -> Self {
        let mut set = Self::new();
        for m in monitors {
            set.insert(
                m.name.clone(),
                ThresholdNotifier::new(Condition::new(m.operator, m.value), m.threshold),
            );
        }
        set
    }

    /// Adds or replaces the notifier under `name`.
    pub fn insert(&mut self, name: impl Into<String>, notifier: ThresholdNotifier) {
        self.notifiers.insert(name.into(), notifier);
    }

    pub fn get(&self, name: &str) -> Option<&ThresholdNotifier> {
        self.notifiers.get(name)
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Feeds `value` to every notifier; returns the events in insertion order.
    pub fn observe(&mut self, value: f64) -> Vec<(&str, NotifierEvent)> {
        self.notifiers
            .iter_mut()
            .filter_map(|(name, n)| n.observe(value).map(|e| (name.as_str(), e)))
            .collect()
    }
}
