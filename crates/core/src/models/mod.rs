pub mod account;
pub mod catalog;
pub mod chart;
pub mod instrument;
pub mod position;
pub mod price;
pub mod settings;
pub mod summary;
