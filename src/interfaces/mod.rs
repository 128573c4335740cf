//! Seams between the schedulers/ledger and their collaborators.
//!
//! Each trait has a production implementation and an in-memory
//! implementation used by the test suites:
//! - [`OutreachStore`] / [`LedgerStore`]: `MongoStore`, `MemoryStore`
//! - [`Mailer`]: `HttpMailer`, `MockMailer`
//! - [`PaymentGateway`]: `HttpPaymentGateway`, `MockPaymentGateway`

mod gateway;
mod mailer;
mod store;

pub use gateway::{GatewayError, GatewaySession, PaymentGateway};
pub use mailer::{DeliveryReceipt, Mailer, MailerError, OutboundEmail};
pub use store::{
    ApplyOutcome, CursorAdvance, LedgerStore, OutreachStore, PaymentConfirmation, Result,
    SendBatch, SentRecipient, StorageError,
};
