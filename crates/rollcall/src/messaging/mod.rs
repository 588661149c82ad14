//! Messaging coordination: paced, failure-isolated outbound delivery and the
//! inbound event routing that resolves pending photo requests.

pub mod dispatcher;
pub mod gateway;
pub mod inbound;


pub use dispatcher::{BroadcastReport, OutboundDispatcher};
pub use gateway::{DeliveryError, MessageContent, MessagingGateway};
pub use inbound::{
    InboundDisposition, InboundMessageEvent, InboundMessageRouter, InboundPayload,
    DECLINE_KEYWORD,
};
