//! Progress fan-out for import jobs.
//!
//! - [`ProgressHub`]: registry of subscriber sinks; every published
//!   [`ProgressSnapshot`](callboard_core::import::ProgressSnapshot) is written
//!   to all of them.
//! - [`ProgressSink`]: transport adapter implemented per subscriber kind.
//! - [`ProgressSubscription`]: channel-backed subscriber that unregisters
//!   itself when dropped.

pub mod hub;

pub use hub::{
    ChannelSink, ProgressHub, ProgressSink, ProgressSubscription, SinkError, SubscriberId,
    SUBSCRIBER_BUFFER,
};
