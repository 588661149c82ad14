use crate::attendance::domain::Person;

/// Rendered identity-token artifact, ready to deliver over the messaging
/// platform. The payload encodes the person's durable identifier; the scan
/// endpoint resolves that identifier straight back to the person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenImage {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token composition failed: {0}")]
    Composition(String),
}

/// Collaborator that composes the scannable token image for a person,
/// embedding their photo when one is stored. Re-invoked after a photo
/// resolution so the refreshed artifact can be delivered.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, person: &Person) -> Result<TokenImage, TokenError>;
}
