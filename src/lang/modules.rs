use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use lazy_static::lazy_static;

/// Extension appended to module specifiers that don't already carry it
pub const DEFAULT_EXTENSION: &str = ".s";

lazy_static! {
    /// Modules whose functionality is supplied natively. Importing them does nothing
    pub static ref BUILTIN_MODULES: HashSet<&'static str> = vec!["gui", "math"].into_iter().collect();
}

pub fn is_builtin(module: &str) -> bool {
    BUILTIN_MODULES.contains(module)
}

/// Supplies source text for `import` statements
pub trait ModuleLoader {
    fn load(&self, module: &str) -> Result<String>;
}

/// `module` with `DEFAULT_EXTENSION` appended if missing
pub fn with_extension(module: &str) -> String {
    if module.ends_with(DEFAULT_EXTENSION) {
        module.to_string()
    } else {
        format!("{}{}", module, DEFAULT_EXTENSION)
    }
}

/// Loads modules from disk, relative to `base`
///
/// No path validation is done: `../` and absolute paths are followed as given.
pub struct FsLoader {
    base: PathBuf,
}

impl FsLoader {
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        FsLoader {
            base: base.as_ref().to_path_buf(),
        }
    }
}

impl Default for FsLoader {
    fn default() -> Self {
        FsLoader::new(".")
    }
}

impl ModuleLoader for FsLoader {
    fn load(&self, module: &str) -> Result<String> {
        let path = self.base.join(with_extension(module));
        fs::read_to_string(&path).map_err(|e| anyhow!("{}: {}", path.display(), e))
    }
}

/// Serves modules from memory. Keys are specifiers as written after the extension is added
#[derive(Default)]
pub struct MemoryLoader {
    modules: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        MemoryLoader::default()
    }

    pub fn with_module(mut self, module: &str, source: &str) -> Self {
        self.modules
            .insert(with_extension(module), source.to_string());
        self
    }
}

impl ModuleLoader for MemoryLoader {
    fn load(&self, module: &str) -> Result<String> {
        self.modules
            .get(&with_extension(module))
            .cloned()
            .ok_or_else(|| anyhow!("no such module"))
    }
}

#[test]
fn test_with_extension() {
    assert_eq!(with_extension("util"), "util.s");
    assert_eq!(with_extension("util.s"), "util.s");
    assert_eq!(with_extension("lib/ui.sd"), "lib/ui.sd.s");
}

#[test]
fn test_builtin() {
    assert!(is_builtin("gui"));
    assert!(is_builtin("math"));
    assert!(!is_builtin("util"));
}

#[test]
fn test_memory_loader() {
    let loader = MemoryLoader::new().with_module("util", "var x = 1;");
    assert_eq!(loader.load("util").ok(), Some("var x = 1;".to_string()));
    assert_eq!(loader.load("util.s").ok(), Some("var x = 1;".to_string()));
    assert!(loader.load("missing").is_err());
}

#[test]
fn test_fs_loader_missing() {
    let loader = FsLoader::new("/nonexistent-sunda-dir");
    let err = loader.load("nope").err().map(|e| e.to_string());
    assert!(err.map_or(false, |e| e.contains("nope.s")));
}
