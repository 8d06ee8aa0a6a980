pub mod event;
pub mod notification_delivery;
pub mod registration;
pub mod registration_claim;
