// Domain layer: request-scoped data types and the predictor ports.

pub mod model;
pub mod ports;
