//! Mutex wrapper - uses parking_lot if available, std otherwise.
//!
//! The registry takes exactly one of these; there is no finer-grained
//! locking anywhere in the crate.

#[cfg(feature = "parking_lot")]
pub(crate) use parking_lot::{Mutex, MutexGuard};

#[cfg(not(feature = "parking_lot"))]
mod fallback {
    use std::sync::{Mutex as StdMutex, MutexGuard as StdMutexGuard};

    /// Thin wrapper over `std::sync::Mutex` with parking_lot's non-Result
    /// locking signature.
    pub struct Mutex<T>(StdMutex<T>);

    impl<T> Mutex<T> {
        pub const fn new(value: T) -> Self {
            Self(StdMutex::new(value))
        }

        pub fn lock(&self) -> MutexGuard<'_, T> {
            // A panic while the registry lock is held means a violation was
            // mid-report; nothing to salvage
            MutexGuard(self.0.lock().expect("registry mutex poisoned"))
        }
    }

    pub struct MutexGuard<'a, T>(StdMutexGuard<'a, T>);

    impl<T> std::ops::Deref for MutexGuard<'_, T> {
        type Target = T;

        fn deref(&self) -> &Self::Target {
            &self.0
        }
    }

    impl<T> std::ops::DerefMut for MutexGuard<'_, T> {
        fn deref_mut(&mut self) -> &mut Self::Target {
            &mut self.0
        }
    }
}

#[cfg(not(feature = "parking_lot"))]
pub(crate) use fallback::Mutex;
