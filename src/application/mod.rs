//! Application layer: turns orders into signed requests, drives the
//! transport and interprets what comes back.
//!
//! [`service::PayService`] is the entry point. The builder, dispatcher and
//! verifier are usable on their own when the caller handles transport itself.

pub mod builder;
pub mod client_payload;
pub mod dispatcher;
pub mod service;
pub mod verifier;
