use crate::grammar::Value;
use std::cmp::Ordering;

/// Define a condition to match pattern node attributes against
#[derive(Debug, PartialEq, Clone)]
pub enum Condition {
    Equals(Value),
    NotEquals(Value),
    LessThan(Value),
    GreaterThan(Value),
    LessThanOrEquals(Value),
    GreaterThanOrEquals(Value),
    /// Greater than Range.0, less than Range.1. Inclusive lower, exclusive upper.
    Range(Value, Value),
}

impl Condition {
    /// Check whether the provided value fulfils the condition.
    /// Values of incomparable kinds never fulfil anything except `ne`.
    pub fn check(&self, value: &Value) -> bool {
        match self {
            Self::Equals(condition) => value.compare(condition) == Some(Ordering::Equal),
            Self::NotEquals(condition) => value.compare(condition) != Some(Ordering::Equal),
            Self::LessThan(condition) => value.compare(condition) == Some(Ordering::Less),
            Self::GreaterThan(condition) => value.compare(condition) == Some(Ordering::Greater),
            Self::LessThanOrEquals(condition) => matches!(
                value.compare(condition),
                Some(Ordering::Less) | Some(Ordering::Equal)
            ),
            Self::GreaterThanOrEquals(condition) => matches!(
                value.compare(condition),
                Some(Ordering::Greater) | Some(Ordering::Equal)
            ),
            Self::Range(l, r) => {
                matches!(
                    value.compare(l),
                    Some(Ordering::Greater) | Some(Ordering::Equal)
                ) && value.compare(r) == Some(Ordering::Less)
            }
        }
    }

    /// The short designator used in documents.
    pub fn designator(&self) -> &'static str {
        match self {
            Self::Equals(_) => "eq",
            Self::NotEquals(_) => "ne",
            Self::LessThan(_) => "lt",
            Self::GreaterThan(_) => "gt",
            Self::LessThanOrEquals(_) => "lte",
            Self::GreaterThanOrEquals(_) => "gte",
            Self::Range(_, _) => "range",
        }
    }
}
