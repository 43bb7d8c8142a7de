//! Protocol core shared by the authority and replica sides: data model,
//! wire codec, field ownership policy, and the transport/clock seams.

pub mod clock;
pub mod codec;
pub mod command;
pub mod model;
pub mod policy;
pub mod transport;
pub mod tuning;
