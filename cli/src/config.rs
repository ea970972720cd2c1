use std::path::Path;

use serde::Deserialize;

use grammar::GrammarError;
use matcher::TemplateRegistry;

/// One `[[template]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateEntry {
    pub name: String,
    pub syntax: String,
}

/// A template set as written in TOML. Array order is match priority.
#[derive(Debug, Default, Deserialize)]
pub struct TemplateFile {
    #[serde(default, rename = "template")]
    pub templates: Vec<TemplateEntry>,
}

impl TemplateFile {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("TOML parse error in '{}': {}", path.display(), e))
    }

    /// Compile every entry in order. On failure, returns every grammar error
    /// together with the index of the entry it came from.
    pub fn build_registry(&self) -> Result<TemplateRegistry, Vec<(usize, GrammarError)>> {
        build_registry(&self.templates)
    }
}

pub fn build_registry(
    entries: &[TemplateEntry],
) -> Result<TemplateRegistry, Vec<(usize, GrammarError)>> {
    let mut registry = TemplateRegistry::new();
    let mut errors = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        if let Err(err) = registry.register(&entry.name, &entry.syntax) {
            errors.push((index, err));
        }
    }
    if errors.is_empty() {
        Ok(registry)
    } else {
        Err(errors)
    }
}
