// src/lib.rs — recon-progressive library root

pub mod cache;
pub mod cli;
pub mod infra;
pub mod modules;
pub mod registry;
pub mod scheduler;
