// Consensus: proof of work, validation, fork choice

mod pow;
mod validation;

pub use pow::*;
pub use validation::*;
