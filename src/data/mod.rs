pub mod cache;
pub mod gateway;
pub mod types;
pub mod yahoo;
