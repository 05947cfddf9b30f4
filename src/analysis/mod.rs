pub mod dashboard;
pub mod options;
pub mod reaction;
pub mod stats;
pub mod types;
