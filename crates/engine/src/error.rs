pub use callcoach_core::{EngineError, Result};
