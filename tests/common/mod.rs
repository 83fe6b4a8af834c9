#![allow(dead_code, unused_imports)]

pub use stagedag_test_utils::builders;
pub use stagedag_test_utils::{init_tracing, with_timeout};
