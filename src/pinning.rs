//! Thread affinity helpers.

/// Pin the current thread to the given core. Returns false when the core
/// does not exist or the platform refuses.
pub fn pin_to_core(core: usize) -> bool {
    match core_affinity::get_core_ids() {
        Some(cores) => cores
            .into_iter()
            .find(|c| c.id == core)
            .map(core_affinity::set_for_current)
            .unwrap_or(false),
        None => false,
    }
}

/// Number of cores visible for pinning.
pub fn num_cores() -> usize {
    core_affinity::get_core_ids().map_or(0, |cores| cores.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_to_missing_core_fails() {
        assert!(!pin_to_core(usize::MAX));
    }
}
