pub mod config;
pub mod delivery_status;
pub mod registration_status;
pub mod retry;
#[cfg(feature = "object-storage")]
pub mod storage;

pub use delivery_status::DeliveryStatus;
pub use registration_status::{ParseStatusError, RegistrationStatus};
