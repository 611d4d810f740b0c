//! Hash containers keyed by small strings and ids; FxHash beats SipHash
//! for these workloads and DoS resistance is irrelevant here.

pub type FastHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

pub type FastHashSet<K> = rustc_hash::FxHashSet<K>;
