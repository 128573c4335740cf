//! Payment gateway clients.
//!
//! Read-only: reconciliation lists the processor's paid sessions and
//! nothing here ever writes back to it.

mod http;
mod mock;

pub use http::{HttpPaymentGateway, HttpPaymentGatewayConfig};
pub use mock::MockPaymentGateway;
