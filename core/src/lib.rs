pub mod analysis;
pub mod packages;
pub mod parse;
pub mod symbols;
pub mod token;
pub mod util;

pub use analysis::{analyze, analyze_bytes};
