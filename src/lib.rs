// ABOUTME: Root module for offload - background subagent orchestration.
// ABOUTME: Re-exports all public types from submodules.

pub mod backend;
pub mod error;
pub mod orchestrator;
pub mod prelude;
pub mod profile;
pub mod sink;
pub mod tool;
pub mod tools;

pub use error::OffloadError;
