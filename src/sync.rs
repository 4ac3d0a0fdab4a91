pub use shim::*;

#[cfg(feature = "shuttle")]
pub mod shim {
    pub use shuttle::sync::*;
    pub use shuttle::thread;
    pub use std::sync::Arc;

    /// A wrapper around shuttle's `Mutex` to mirror parking-lot's API.
    #[derive(Default, Debug)]
    pub struct Mutex<T>(shuttle::sync::Mutex<T>);

    impl<T> Mutex<T> {
        pub const fn new(value: T) -> Mutex<T> {
            Mutex(shuttle::sync::Mutex::new(value))
        }

        pub fn lock(&self) -> MutexGuard<'_, T> {
            self.0.lock().unwrap()
        }
    }
}

#[cfg(not(feature = "shuttle"))]
pub mod shim {
    pub use parking_lot::{Mutex, MutexGuard};
    pub use std::sync::*;
    pub use std::thread;

    pub mod atomic {
        pub use portable_atomic::AtomicU64;
        pub use std::sync::atomic::*;
    }
}
