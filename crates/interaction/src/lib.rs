//! Scripted interaction against an element tree.
//!
//! # Modules
//! - `step` — the closed set of step kinds and strict descriptor parsing
//! - `executor` — runs one step and records its lifecycle
//! - `sequence` — ordered steps with stop-on-failure policy
//! - `form_flow` — fill / validate / submit / reset flow for one form

pub mod executor;
pub mod form_flow;
pub mod sequence;
pub mod step;

pub use executor::{CustomAction, StepExecutor, StepResult};
pub use form_flow::{
    generate_test_data, FieldInput, FlowPerformance, FlowStep, FlowStepStatus, FormInteraction,
    FormInteractionResult, FormTestData,
};
pub use sequence::{Sequence, SequenceResult, SequenceRunner};
pub use step::{ElementAssertion, InteractionStep, ScrollTarget, StepAction, StepType};
