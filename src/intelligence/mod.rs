//! Blood-test scoring: reference ranges, unit-aware classification and advice text.

pub mod helpers;
pub mod recommend;
pub mod reference;

pub use recommend::{evaluate, recommend, recommend_with, HEALTHY_MESSAGE};
pub use reference::{Advice, ReferenceError, ReferenceRange, ReferenceTable};
