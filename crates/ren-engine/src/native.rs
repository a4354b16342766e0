//! Out-of-band failure channel for native calls.
//!
//! A shim cannot return anything richer than a `RenResult`, so the binding
//! parks the failure detail here on the calling thread before answering
//! `RenResult::Failure`. The call site takes it right after the shim returns.

use std::cell::RefCell;

use crate::NativeFailure;

thread_local! {
    static FAILURE: RefCell<Option<NativeFailure>> = const { RefCell::new(None) };
}

/// Record the failure of the native running on this thread.
pub fn raise(failure: NativeFailure) {
    FAILURE.with(|slot| *slot.borrow_mut() = Some(failure));
}

/// Take the pending failure, leaving the channel empty.
pub fn take_failure() -> Option<NativeFailure> {
    FAILURE.with(|slot| slot.borrow_mut().take())
}

pub(crate) fn clear() {
    FAILURE.with(|slot| slot.borrow_mut().take());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_are_per_thread() {
        raise(NativeFailure::UnboundShim);
        let other = std::thread::spawn(take_failure).join().unwrap();
        assert_eq!(other, None);
        assert_eq!(take_failure(), Some(NativeFailure::UnboundShim));
        assert_eq!(take_failure(), None);
    }
}
