//! Hand-written state machines for every wizard flow, plus the generic
//! runner they share.

pub mod base_info;
pub mod client;
pub mod fields;
pub mod fixed_rate;
pub mod harvest;
pub mod invoice;
pub mod machine;
pub mod provider;

pub use base_info::{BaseInfoEvent, BaseInfoMachine, BaseInfoOutput, BaseInfoState};
pub use client::{ClientEvent, ClientMachine, ClientOutput, ClientState};
pub use invoice::{
    InvoiceContext, InvoiceEvent, InvoiceMachine, InvoiceOutput, InvoiceRequest, InvoiceState,
};
pub use machine::Workflow;
pub use provider::{ProviderEvent, ProviderFlow, ProviderOutput, ProviderRequest, ProviderStatus};
