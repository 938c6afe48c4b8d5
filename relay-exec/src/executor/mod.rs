pub mod events;
pub mod http;
mod orchestrator;
mod poller;
mod result;
mod runner;
mod types;

pub use events::{
    CompositeEventSink, Event, EventSink, NoOpEventSink, StdoutEventSink, TracingEventSink,
};
pub use http::{HttpClient, HttpError, HttpRequestParts, HttpResponseParts, ReqwestHttpClient};
pub use orchestrator::Orchestrator;
pub use poller::{PollError, PollReport, RetryPoller};
pub use result::ExecutionError;
pub use runner::Executor;
pub use types::{ConnectionOutcome, ExecutorConfig};
