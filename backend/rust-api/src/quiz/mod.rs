pub mod attempt;
pub mod monitor;
pub mod sampler;
pub mod scorer;
