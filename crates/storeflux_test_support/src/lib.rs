pub mod fake_monitor;
pub mod fake_storage;
pub mod fixtures;

pub use fake_monitor::{FakeMonitor, MonitorCall};
pub use fake_storage::{FakeFailure, FakeGate, FakeStorage, StorageCall, StorageOp};
