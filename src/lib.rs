pub mod analysis;
pub mod config;
pub mod intelligence;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod urine;
