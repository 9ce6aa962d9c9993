//! Outbound network-call recording.
//!
//! Executors are instrumented by composition: [`instrument`] and
//! [`instrument_callback`] wrap an executor and log every call it settles
//! into a shared [`NetworkCallRecorder`].

pub mod executor;
pub mod recorder;

pub use executor::{
    instrument, instrument_callback, CallbackExecutor, HttpRequest, HttpResponse, Instrumented,
    InstrumentedCallback, ReqwestExecutor, RequestExecutor, Settled, CANCELLED,
};
pub use recorder::{CallKind, CallOutcome, InFlightCall, NetworkCallRecord, NetworkCallRecorder, NetworkStats};
