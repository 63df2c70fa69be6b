//! Lyra Checkout
//!
//! Turns a host checkout request into the signed `vads_*` form posted to the
//! gateway payment page.
//!
//! - Amount conversion to minor units (round to currency precision, then scale)
//! - Gateway order id sanitizing and per-process transaction ids
//! - Installment plan (`MULTI:first=..;count=..;period=..`) and 3DS exemption flag
//! - Optional buyer and shipping fields with gateway length limits
//!
//! Building and signing are separate steps: [`RequestBuilder::build`] returns
//! an unsigned [`PaymentRequest`], [`sign_payment_request`] turns it into a
//! [`PaymentForm`].

pub mod builder;
pub mod customer;
pub mod error;
pub mod trans_id;

pub use builder::{
    installment_plan, sanitize_order_id, sign_payment_request, to_minor_units, CheckoutOrder,
    PaymentForm, PaymentRequest, RequestBuilder,
};
pub use customer::{Customer, ShippingAddress};
pub use error::{CheckoutError, CheckoutResult};
pub use trans_id::TransIdGenerator;
