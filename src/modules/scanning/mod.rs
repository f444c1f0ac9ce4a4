// src/modules/scanning/mod.rs — Active scanning modules

pub mod nmap;

pub use nmap::NmapModule;
