pub mod registry;
pub mod traits;

// Provider implementations
pub mod stooq;
pub mod yahoo;
