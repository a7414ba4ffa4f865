//! Prelude module - commonly used test utilities.
//!
//! Use `use keyloom_test::prelude::*;` to import all essential types.

// Mocks
pub use crate::{FailingStore, GatedStore, RecordingListener};

// Fixtures
pub use crate::{
    TEST_NAMESPACE, memory_facade, memory_facade_with, test_allow_list, test_namespace,
};

// Logging
pub use crate::init_test_tracing;
