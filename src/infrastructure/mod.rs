//! Concrete implementations of the domain ports and the signature engine.

pub mod in_memory;
pub mod signer;
