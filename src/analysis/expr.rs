//! Arithmetic on parameter values as they appear in source files
//!
//! Values such as `600.`, `20*200` or `9*60*60` are evaluated here. Only
//! numeric literals and `*` products are accepted.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExprError {
    #[error("Empty expression")]
    Empty,

    #[error("Invalid literal '{0}'")]
    InvalidLiteral(String),

    #[error("Integer overflow in '{0}'")]
    Overflow(String),

    #[error("Division by zero")]
    DivisionByZero,
}

/// An evaluated parameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// Integer value, truncating floats
    pub fn as_i64(self) -> i64 {
        match self {
            Number::Int(i) => i,
            Number::Float(f) => f as i64,
        }
    }

    pub fn checked_mul(self, rhs: Number) -> Option<Number> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a.checked_mul(b).map(Number::Int),
            (a, b) => Some(Number::Float(a.as_f64() * b.as_f64())),
        }
    }

    /// Floor division; integer when both sides are integers
    pub fn floor_div(self, rhs: Number) -> Result<Number, ExprError> {
        match (self, rhs) {
            (Number::Int(_), Number::Int(0)) => Err(ExprError::DivisionByZero),
            (Number::Int(a), Number::Int(b)) => {
                let q = a / b;
                if a % b != 0 && (a < 0) != (b < 0) {
                    Ok(Number::Int(q - 1))
                } else {
                    Ok(Number::Int(q))
                }
            }
            (a, b) => {
                let divisor = b.as_f64();
                if divisor == 0.0 {
                    return Err(ExprError::DivisionByZero);
                }
                Ok(Number::Float((a.as_f64() / divisor).floor()))
            }
        }
    }

    pub fn min(self, rhs: Number) -> Number {
        if rhs.as_f64() < self.as_f64() {
            rhs
        } else {
            self
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Parse one literal: integers, `600.`, `1.5e-3` and Fortran `1.d0`
fn literal(text: &str) -> Result<Number, ExprError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ExprError::Empty);
    }
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Number::Int(i));
    }
    let normalized = text.replace(['d', 'D'], "e");
    let normalized = normalized.strip_suffix('.').unwrap_or(&normalized);
    match normalized.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(Number::Float(f)),
        _ => Err(ExprError::InvalidLiteral(text.to_string())),
    }
}

/// Evaluate a literal or a `*` product of literals
pub fn evaluate(text: &str) -> Result<Number, ExprError> {
    if text.trim().is_empty() {
        return Err(ExprError::Empty);
    }
    let mut factors = text.split('*').map(literal);
    let first = factors.next().ok_or(ExprError::Empty)??;
    factors.try_fold(first, |acc, factor| {
        acc.checked_mul(factor?)
            .ok_or_else(|| ExprError::Overflow(text.trim().to_string()))
    })
}
