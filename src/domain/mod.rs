//! Domain layer: value objects, the transaction catalog and the ports the
//! application layer talks to.

pub mod amount;
pub mod fields;
pub mod order;
pub mod params;
pub mod ports;
pub mod transaction;
pub mod verification;
