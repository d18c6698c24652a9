pub mod attempt;
pub mod channel;
pub mod config;
pub mod errors;
pub mod flow;
pub mod journal;
pub mod service;
pub mod surface;
pub mod ui;

pub use attempt::{AttemptManager, Outcome};
pub use channel::{CompletionMessage, MessageBus};
pub use errors::{AttemptError, FlowError};
pub use flow::{FlowHandle, FlowObserver, FlowReport, FlowRunner};
pub use service::{ServiceEntry, ServiceId};
