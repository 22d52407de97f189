pub mod dashboard;
pub mod monitor;
