pub mod store;
pub mod supervisor;
pub mod unit;
