// Trading strategy module
pub mod crossover;

pub use crossover::{
    Crossover, CrossoverStrategy, Evaluation, MovingAverages, Trend, Trigger,
};
