//! Real-time channel client.

pub mod client;
pub mod dispatch;
pub mod messages;

pub use client::{ConnectionState, RealtimeClient};
pub use dispatch::{Dispatch, Handler, HandlerTable};
pub use messages::{Frame, Inbound, RealtimeError};
