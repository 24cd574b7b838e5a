//! Background runtime: one session channel per page request, one orchestrated
//! answer stream per channel.

pub mod channel;
pub mod orchestrator;
pub mod view;

pub use channel::{BackgroundPort, ChannelState, PagePort, SessionChannel};
pub use orchestrator::{ExchangeOutcome, Orchestrator};
pub use view::AnswerView;
