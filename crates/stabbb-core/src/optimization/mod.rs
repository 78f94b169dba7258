//! Optimization components: step size selection, state, termination and callbacks.

pub mod callback;
pub mod optimizer;
pub mod optimizer_state;
pub mod step_size;

// Re-export optimization components
pub use callback::*;
pub use optimizer::*;
pub use optimizer_state::*;
pub use step_size::*;
