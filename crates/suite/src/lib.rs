//! Named test suites and their runner.
//!
//! Each case is an opaque async callback returning a raw JSON result; a
//! failing case is recorded and the suite carries on.

pub mod builtin;
pub mod case;
pub mod registry;
pub mod runner;

pub use case::{CaseContext, Priority, TestCase};
pub use registry::{SuiteRegistry, TestSuite};
pub use runner::{CaseResult, SuiteResult, TestSuiteRunner};
