// src/registry/catalog.rs — Compiled-in catalogue of module units
//
// There is no runtime reflection to scan a directory tree for module types,
// so each unit is listed here with the path it lives at under
// `src/modules/`. The loader derives categories from these paths exactly as
// it would from a directory scan.

use crate::modules::recon::{CrtshModule, DigModule, WhoisModule};
use crate::modules::scanning::NmapModule;
use crate::modules::ReconModule;

/// Builds one module instance.
pub type Constructor = Box<dyn Fn() -> anyhow::Result<Box<dyn ReconModule>>>;

/// Loads a unit, yielding a constructor for every module type it defines.
pub type UnitLoader = Box<dyn Fn() -> anyhow::Result<Vec<Constructor>>>;

/// Category for units sitting directly at the root.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Unit names that mark a package rather than implement a module.
const PACKAGE_MARKERS: &[&str] = &["mod", "__init__"];

/// A discovery candidate: a path relative to the module root plus its loader.
pub struct CandidateUnit {
    pub path: String,
    loader: UnitLoader,
}

impl CandidateUnit {
    pub fn new(
        path: impl Into<String>,
        loader: impl Fn() -> anyhow::Result<Vec<Constructor>> + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            loader: Box::new(loader),
        }
    }

    /// A unit defining exactly one module type.
    pub fn single(
        path: impl Into<String>,
        constructor: impl Fn() -> anyhow::Result<Box<dyn ReconModule>> + 'static,
    ) -> Self {
        let constructor = std::rc::Rc::new(constructor);
        Self::new(path, move || {
            let constructor = constructor.clone();
            Ok(vec![Box::new(move || (*constructor)()) as Constructor])
        })
    }

    fn segments(&self) -> Vec<&str> {
        self.path
            .split(['/', '\\'])
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// First path segment, or `uncategorized` for units at the root.
    pub fn category(&self) -> String {
        match self.segments().as_slice() {
            [category, _, ..] => category.to_string(),
            _ => UNCATEGORIZED.to_string(),
        }
    }

    pub fn is_package_marker(&self) -> bool {
        self.segments()
            .last()
            .map(|stem| stem.trim_end_matches(".rs"))
            .map_or(true, |stem| PACKAGE_MARKERS.contains(&stem))
    }

    pub fn load(&self) -> anyhow::Result<Vec<Constructor>> {
        (self.loader)()
    }
}

impl std::fmt::Debug for CandidateUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateUnit")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Every module shipped with the binary.
pub fn builtin_units() -> Vec<CandidateUnit> {
    vec![
        CandidateUnit::single("recon/whois", || Ok(Box::new(WhoisModule::new()?))),
        CandidateUnit::single("recon/dig", || Ok(Box::new(DigModule::new()?))),
        CandidateUnit::single("recon/crtsh", || Ok(Box::new(CrtshModule::new()?))),
        CandidateUnit::single("scanning/nmap", || Ok(Box::new(NmapModule::new()?))),
    ]
}
