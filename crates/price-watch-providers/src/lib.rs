pub mod error;
pub mod fixed;
pub mod kraken;
pub mod provider;
