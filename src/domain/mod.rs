// Domain layer: records, field aliases and ports. No I/O here.

pub mod fields;
pub mod model;
pub mod ports;
