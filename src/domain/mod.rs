// Domain layer: wire models and the handler port. No dependency on the Lambda runtime.

pub mod model;
pub mod ports;
