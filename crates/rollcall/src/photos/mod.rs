//! Photo provisioning: the per-person IDLE → PENDING → COMPLETED state
//! machine and the conversational exchange that drives it.

pub mod messages;
pub mod router;
pub mod service;


pub use router::photo_router;
pub use service::{
    BulkRequestReceipt, PhotoRequestError, PhotoRequestKind, PhotoRequestReceipt,
    PhotoProvisioningService,
};
