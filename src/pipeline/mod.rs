pub mod extraction;
pub mod units;
