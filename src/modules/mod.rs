// src/modules/mod.rs — Reconnaissance modules
//
// The contract lives in `types`; concrete modules are grouped by category
// directory (`recon/`, `scanning/`), which the registry mirrors.

pub mod process;
pub mod profiles;
pub mod recon;
pub mod scanning;
pub mod target;
pub mod types;

pub use types::{ExecuteOptions, ExecutionResult, ModuleInfo, ModuleOutput, Profile, ReconModule};
