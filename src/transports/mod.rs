//! Transport implementations.

#[cfg(feature = "dbus")]
pub mod dbus;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
