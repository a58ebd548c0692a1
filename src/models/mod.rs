pub mod enums;
pub mod lab;
pub mod urine;

pub use enums::*;
pub use lab::*;
pub use urine::*;
