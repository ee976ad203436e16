//! Converts workload names to actual map and reduce code.
//!
//! User callables are not shipped over the wire; every node resolves the
//! name a job carries against this registry, so worker hosts only need
//! the binary itself.

pub mod pi_grid;
pub mod wc;

use client::formats::{RecordRead, RecordWrite};
use utilities::result::{DfsError, Result};

/// A map function reads records (no reader in generator mode) and emits
/// key-value records.
pub type MapFn = fn(Option<&mut dyn RecordRead>, &mut dyn RecordWrite) -> Result<()>;

/// A reduce function folds the concatenated map outputs into the final
/// records.
pub type ReduceFn = fn(&mut dyn RecordRead, &mut dyn RecordWrite) -> Result<()>;

#[derive(Copy, Clone)]
pub struct Workload {
    pub map_fn: MapFn,
    pub reduce_fn: ReduceFn,
}

/// Gets the [`Workload`] named `name`, or `None` when no such
/// application exists.
pub fn try_named(name: &str) -> Option<Workload> {
    match name {
        "wc" => Some(Workload {
            map_fn: wc::map,
            reduce_fn: wc::reduce,
        }),
        "pi-grid" => Some(Workload {
            map_fn: pi_grid::map,
            reduce_fn: pi_grid::reduce,
        }),
        _ => None,
    }
}

pub fn named(name: &str) -> Result<Workload> {
    try_named(name).ok_or_else(|| DfsError::protocol(format!("no workload named {name:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup() {
        assert!(try_named("wc").is_some());
        assert!(try_named("pi-grid").is_some());
        assert!(named("no-such-app").is_err());
    }
}
