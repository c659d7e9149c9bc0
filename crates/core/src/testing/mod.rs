//! Mock implementations for testing.

mod mock_notifier;

pub use mock_notifier::MockNotifier;
