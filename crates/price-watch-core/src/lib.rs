pub mod chart;
pub mod error;
pub mod moving_average;
pub mod sample;
pub mod schema;
pub mod signal;
pub mod store;
