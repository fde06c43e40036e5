//! Wire and file formats exchanged with the gateway.

pub mod csv;
pub mod xml;
