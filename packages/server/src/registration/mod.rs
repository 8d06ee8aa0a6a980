pub mod approval;
pub mod claims;
pub mod export;
pub mod ledger;
pub mod registrant;

pub use approval::{ApprovalError, ApprovalOutcome, ApprovalWorkflow, parse_reviewable};
pub use ledger::{LedgerError, RegistrationFilter, RegistrationLedger};
pub use registrant::{AccountIdentity, Registrant};
