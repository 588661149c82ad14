use async_trait::async_trait;

/// One outbound message: plain text or an image with a caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    Image { bytes: Vec<u8>, caption: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("messaging platform session is not established")]
    NotReady,
    #[error("delivery failed: {0}")]
    Upstream(String),
}

/// Opaque messaging platform capability. Lifecycle (connect, pairing,
/// disconnect) belongs to the implementation; the core only observes the
/// binary readiness flag and attempts sends.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    fn is_ready(&self) -> bool;
    async fn send(&self, address: &str, content: &MessageContent) -> Result<(), DeliveryError>;
}
