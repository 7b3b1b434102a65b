//! Threshold decision rule
//!
//! Given a resolved threshold, the candidate's metric value and (for change
//! thresholds) the baseline's value, decide pass or fail. Every failed
//! check is reported, not just the first.

use std::fmt;

use eval_schema::schema::{
    Direction, GenericChangeThreshold, GenericValueThreshold, MetricThreshold,
};
use serde::Serialize;

/// One failed check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThresholdFailure {
    NotANumber { value: f64 },
    BelowLowerBound { value: f64, bound: f64 },
    AboveUpperBound { value: f64, bound: f64 },
    MissingBaselineValue,
    UnknownDirection,
    AbsoluteChange {
        delta: f64,
        limit: f64,
        direction: Direction,
    },
    /// `ratio` is `None` when the baseline value is zero.
    RelativeChange {
        ratio: Option<f64>,
        limit: f64,
        direction: Direction,
    },
}

impl fmt::Display for ThresholdFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdFailure::NotANumber { value } => write!(f, "value {value} is not a number"),
            ThresholdFailure::BelowLowerBound { value, bound } => {
                write!(f, "value {value} is below lower bound {bound}")
            }
            ThresholdFailure::AboveUpperBound { value, bound } => {
                write!(f, "value {value} is above upper bound {bound}")
            }
            ThresholdFailure::MissingBaselineValue => {
                f.write_str("change threshold has no baseline value to compare against")
            }
            ThresholdFailure::UnknownDirection => {
                f.write_str("change threshold has no direction")
            }
            ThresholdFailure::AbsoluteChange {
                delta,
                limit,
                direction,
            } => write!(
                f,
                "absolute change {delta} violates {} {limit}",
                comparison(*direction)
            ),
            ThresholdFailure::RelativeChange {
                ratio: Some(ratio),
                limit,
                direction,
            } => write!(
                f,
                "relative change {ratio} violates {} {limit}",
                comparison(*direction)
            ),
            ThresholdFailure::RelativeChange { ratio: None, .. } => {
                f.write_str("relative change is undefined for a zero baseline value")
            }
        }
    }
}

fn comparison(direction: Direction) -> &'static str {
    match direction {
        Direction::LowerIsBetter => "<=",
        _ => ">=",
    }
}

/// Result of checking one metric against one threshold.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ThresholdOutcome {
    pub failures: Vec<ThresholdFailure>,
}

impl ThresholdOutcome {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Check `value` against `threshold`.
///
/// `baseline` is the baseline model's value for the same metric key and is
/// only consulted by the change part.
///
/// # Example
///
/// ```
/// use eval_resolve::evaluate_threshold;
/// use eval_schema::schema::{Direction, MetricThreshold};
///
/// let threshold = MetricThreshold::absolute_change(Direction::HigherIsBetter, -0.01);
/// assert!(evaluate_threshold(&threshold, 0.795, Some(0.80)).passed());
/// assert!(!evaluate_threshold(&threshold, 0.78, Some(0.80)).passed());
/// ```
pub fn evaluate_threshold(
    threshold: &MetricThreshold,
    value: f64,
    baseline: Option<f64>,
) -> ThresholdOutcome {
    let mut failures = Vec::new();
    if value.is_nan() {
        failures.push(ThresholdFailure::NotANumber { value });
    }
    if let Some(bounds) = &threshold.value_threshold {
        check_value(bounds, value, &mut failures);
    }
    if let Some(change) = &threshold.change_threshold {
        check_change(change, value, baseline, &mut failures);
    }
    ThresholdOutcome { failures }
}

fn check_value(bounds: &GenericValueThreshold, value: f64, failures: &mut Vec<ThresholdFailure>) {
    if let Some(bound) = bounds.lower_bound.filter(|bound| value < *bound) {
        failures.push(ThresholdFailure::BelowLowerBound { value, bound });
    }
    if let Some(bound) = bounds.upper_bound.filter(|bound| value > *bound) {
        failures.push(ThresholdFailure::AboveUpperBound { value, bound });
    }
}

fn check_change(
    change: &GenericChangeThreshold,
    value: f64,
    baseline: Option<f64>,
    failures: &mut Vec<ThresholdFailure>,
) {
    let Some(baseline) = baseline else {
        failures.push(ThresholdFailure::MissingBaselineValue);
        return;
    };
    let direction = change.direction;
    if direction == Direction::Unknown {
        failures.push(ThresholdFailure::UnknownDirection);
        return;
    }

    let delta = value - baseline;
    if let Some(limit) = change.absolute.filter(|limit| !within(direction, delta, *limit)) {
        failures.push(ThresholdFailure::AbsoluteChange {
            delta,
            limit,
            direction,
        });
    }
    if let Some(limit) = change.relative {
        if baseline == 0.0 {
            failures.push(ThresholdFailure::RelativeChange {
                ratio: None,
                limit,
                direction,
            });
        } else {
            let ratio = delta / baseline;
            if !within(direction, ratio, limit) {
                failures.push(ThresholdFailure::RelativeChange {
                    ratio: Some(ratio),
                    limit,
                    direction,
                });
            }
        }
    }
}

/// NaN never satisfies either comparison.
fn within(direction: Direction, change: f64, limit: f64) -> bool {
    match direction {
        Direction::HigherIsBetter => change >= limit,
        Direction::LowerIsBetter => change <= limit,
        Direction::Unknown => false,
    }
}
