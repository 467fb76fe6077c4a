//! Post-run analysis of recorded parameters
//!
//! Snapshot values are text as written in the source file. They are
//! evaluated with a small arithmetic grammar, never executed.

pub mod expr;
mod run_parameters;

pub use expr::{evaluate, ExprError, Number};
pub use run_parameters::{DomainSizes, RunParameters, RunParametersError};
