mod fast_map;

pub use fast_map::{FastHashMap, FastHashSet};
