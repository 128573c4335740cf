//! Persisted document types.
//!
//! These structs are the durable contract between the sweep, the payment
//! ledger, and the reconciliation/rollup consumers. Storage backends map
//! them to and from their native representation.

mod athlete;
mod campaign;
mod contact;
mod donation;
mod message;
mod org;
mod rollup;

pub use athlete::{Athlete, OutreachState};
pub use campaign::Campaign;
pub use contact::{email_key, Contact, ContactStatus};
pub use donation::{Donation, DonationStatus, DonorComment, FeedItem, ReceiptJob};
pub use message::{DeliveryEvent, DeliveryEventKind, OutreachMessage, SendOutcome};
pub use org::Organization;
pub use rollup::DailyRollup;
