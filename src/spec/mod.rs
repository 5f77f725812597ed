//! Spec layer: JSON schemas for contracts and generated candidates.
//!
//! This module is intentionally separate from context loading and validation.
//! It owns:
//! - Task contract types (scenarios, steps, field expectations, relations)
//! - Candidate artifact types (packets, table rules, operation timelines)

pub mod candidate;
pub mod task;

pub use candidate::{
    CandidateBundle, ControlPlaneOperation, ExecutionOperation, OperationType, PacketSpec,
    TableRule,
};
pub use task::{
    Expectation, ExpectationChecks, FieldRelationSpec, Needle, PacketStepSpec, RelationOp,
    ScenarioKind, SequenceScenarioSpec, TaskSpec,
};
