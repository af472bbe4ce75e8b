// Technical indicators module
// Decimal moving averages used by the crossover strategy

pub mod moving_average;

pub use moving_average::calculate_sma;
