//! Engine-native plan artifacts.
//!
//! The operator graph produced by translation and the execution plan the
//! environment builder wraps around it.

mod env;
mod operators;

pub use env::{EnvironmentBuilder, ExecTarget, ExecutionPlan};
pub use operators::{OpId, OperatorGraph, OperatorKind, OperatorNode};
