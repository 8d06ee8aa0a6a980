pub mod dispatcher;
pub mod template;
pub mod transport;

pub use dispatcher::{DeliveryFilter, DispatchError, NotificationDispatcher, run_retry_sweeper};
pub use transport::{LogNotifier, NotificationError, Notifier, OutgoingMessage, SmtpNotifier};
