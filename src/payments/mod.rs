pub mod client;
pub mod webhook;

pub use client::{CheckoutLinkRequest, PaymentClient, ProviderCustomer, ProviderItem};
pub use webhook::{PaymentEvent, Settlement};
