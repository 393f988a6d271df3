use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single-occupancy gate with an `Idle -> Busy -> Idle` transition table.
///
/// Entering only succeeds from `Idle`; every other attempt is refused
/// immediately. The returned pass moves the gate back to `Idle` when dropped,
/// so an early return, an error or a panic can never leave it `Busy`.
#[derive(Debug, Default)]
pub struct Gate {
    busy: AtomicBool,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Enter the gate for the lifetime of the returned pass
    pub fn try_enter(&self) -> Option<GatePass<'_>> {
        self.acquire().then_some(GatePass { gate: self })
    }

    /// Enter the gate with a pass that can outlive the borrow (e.g. move into a task)
    pub fn try_enter_owned(self: &Arc<Self>) -> Option<OwnedGatePass> {
        self.acquire().then(|| OwnedGatePass {
            gate: Arc::clone(self),
        })
    }

    fn acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct GatePass<'a> {
    gate: &'a Gate,
}

impl Drop for GatePass<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[derive(Debug)]
pub struct OwnedGatePass {
    gate: Arc<Gate>,
}

impl Drop for OwnedGatePass {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_entry_is_refused() {
        let gate = Gate::new();
        let pass = gate.try_enter();
        assert!(pass.is_some());
        assert!(gate.is_busy());
        assert!(gate.try_enter().is_none());

        drop(pass);
        assert!(!gate.is_busy());
        assert!(gate.try_enter().is_some());
    }

    #[test]
    fn test_owned_pass_released_on_panic() {
        let gate = Arc::new(Gate::new());
        let pass = gate.try_enter_owned().unwrap();

        let result = std::thread::spawn(move || {
            let _pass = pass;
            panic!("cycle blew up");
        })
        .join();

        assert!(result.is_err());
        assert!(!gate.is_busy());
    }
}
