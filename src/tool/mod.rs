// ABOUTME: Tool module - defines capabilities, registry, and scoped views.
// ABOUTME: Core abstraction for what a subagent profile is allowed to call.

mod registry;
mod result;
mod scoped;
mod traits;

pub use registry::*;
pub use result::*;
pub use scoped::*;
pub use traits::*;
