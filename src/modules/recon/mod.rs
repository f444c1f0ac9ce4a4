// src/modules/recon/mod.rs — Passive intelligence modules

pub mod crtsh;
pub mod dig;
pub mod whois;

pub use crtsh::CrtshModule;
pub use dig::DigModule;
pub use whois::WhoisModule;
