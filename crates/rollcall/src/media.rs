use crate::attendance::domain::{PersonId, PhotoRef};

#[derive(Debug, thiserror::Error)]
pub enum MediaStoreError {
    #[error("media storage unavailable: {0}")]
    Unavailable(String),
}

/// Collaborator that persists inbound photo bytes and hands back the
/// reference stored on the person's record.
pub trait MediaStore: Send + Sync {
    fn store_photo(&self, person: &PersonId, bytes: &[u8]) -> Result<PhotoRef, MediaStoreError>;
}
