//! Sequencing of authorization attempts across an ordered service list.
//!
//! - [`controller`]: pure state machine (cursor, guard, retry, skip)
//! - [`runner`]: tokio event loop that executes the controller's attempts
//! - [`projection`]: read-only status and progress view
//! - [`observer`]: host callbacks

pub mod controller;
pub mod observer;
pub mod projection;
pub mod runner;
pub mod state;

pub use controller::{AttemptId, AttemptTicket, FlowController, Rejection};
pub use observer::{ChannelObserver, CompositeObserver, FlowEvent, FlowObserver, NoopObserver};
pub use projection::{FlowProjection, ServiceView};
pub use runner::{DEFAULT_AUTO_ADVANCE_DELAY, FlowCommand, FlowHandle, FlowReport, FlowRunner};
pub use state::{AttemptState, AttemptStatus, FlowCursor};
