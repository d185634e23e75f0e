// Domain layer: records, task states and the traits the rest of the crate plugs into.

pub mod model;
pub mod ports;
