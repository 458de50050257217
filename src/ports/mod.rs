//! Port traits. API boundaries for the hexagon.
//!
//! - Inbound: Called by UI/adapter into the application
//! - Outbound: Called by application into infrastructure
//! - Progress: Where long-running operations report liveness

pub mod inbound;
pub mod outbound;
pub mod progress;

pub use inbound::InputPort;
pub use outbound::{HostSampler, MessageSource, PeerResolver, SummaryProvider};
pub use progress::{ChannelProgressSink, NoopProgressSink, ProgressSink, TracingProgressSink};
