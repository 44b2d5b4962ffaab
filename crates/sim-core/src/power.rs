use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

/// Process-wide rail behind `PowerFlag::default()`. Starts powered.
static SHARED_SUPPLY: LazyLock<PowerSupply> = LazyLock::new(|| PowerSupply::new(true));

/// Owner of a simulated supply rail. Only the owner can switch it.
#[derive(Debug, Clone)]
pub struct PowerSupply {
    rail: Arc<AtomicBool>,
}

impl PowerSupply {
    pub fn new(powered: bool) -> Self {
        Self {
            rail: Arc::new(AtomicBool::new(powered)),
        }
    }

    pub fn set(&self, powered: bool) {
        self.rail.store(powered, Ordering::Release);
    }

    pub fn is_on(&self) -> bool {
        self.rail.load(Ordering::Acquire)
    }

    /// The process-wide supply that default flags observe.
    pub fn shared() -> &'static PowerSupply {
        &SHARED_SUPPLY
    }

    /// Read-only handle for peripherals.
    pub fn flag(&self) -> PowerFlag {
        PowerFlag {
            rail: Some(Arc::clone(&self.rail)),
        }
    }
}

impl Default for PowerSupply {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Non-owning view of a supply rail.
///
/// `PowerFlag::default()` observes `PowerSupply::shared()`, so peripherals
/// built with it switch together. `always_on()` builds a flag with no rail behind it, for peripherals that
/// do not take part in power simulation.
#[derive(Debug, Clone)]
pub struct PowerFlag {
    rail: Option<Arc<AtomicBool>>,
}

impl PowerFlag {
    pub fn always_on() -> Self {
        Self { rail: None }
    }

    pub fn is_on(&self) -> bool {
        match &self.rail {
            Some(rail) => rail.load(Ordering::Acquire),
            None => true,
        }
    }

    pub fn is_gated(&self) -> bool {
        self.rail.is_some()
    }

    /// True when both handles observe the same rail.
    pub fn same_source(&self, other: &PowerFlag) -> bool {
        match (&self.rail, &other.rail) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Default for PowerFlag {
    fn default() -> Self {
        SHARED_SUPPLY.flag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn flags_follow_their_supply() {
        let supply = PowerSupply::new(true);
        let a = supply.flag();
        let b = supply.flag();
        assert!(a.is_on() && b.is_on());

        supply.set(false);
        assert!(!a.is_on());
        assert!(!b.is_on());
        assert!(a.same_source(&b));
    }

    #[test]
    fn always_on_ignores_every_supply() {
        let flag = PowerFlag::always_on();
        assert!(flag.is_on());
        assert!(!flag.is_gated());
        assert!(!flag.same_source(&PowerSupply::default().flag()));
    }

    #[test]
    fn default_flags_share_the_process_supply() {
        let a = PowerFlag::default();
        let b = PowerFlag::default();
        assert!(a.is_gated());
        assert!(a.same_source(&b));
        assert!(a.same_source(&PowerSupply::shared().flag()));
        assert!(!a.same_source(&PowerSupply::new(true).flag()));
    }

    #[test]
    fn toggle_is_visible_across_threads() {
        let supply = PowerSupply::new(true);
        let flag = supply.flag();
        let controller = supply.clone();
        thread::spawn(move || controller.set(false)).join().unwrap();
        assert!(!flag.is_on());
    }
}
