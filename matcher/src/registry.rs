use grammar::{GrammarError, Template, compile, tokenize};

use crate::error::LineError;
use crate::line::LineMatch;
use crate::matcher::{fold_sign_markers, match_template};

/// Ordered collection of compiled templates. Registration order is match
/// priority: the first template that accounts for the whole line wins.
///
/// Build it completely before sharing; `parse_line` only reads, so a finished
/// registry can be used from several threads at once.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: Vec<Template>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        TemplateRegistry::default()
    }

    /// Compile `syntax` and append it. A template that fails to compile is not added.
    pub fn register(&mut self, name: &str, syntax: &str) -> Result<(), GrammarError> {
        let template = compile(name, syntax)?;
        self.push(template);
        Ok(())
    }

    /// Append an already compiled template.
    pub fn push(&mut self, template: Template) {
        if self.get(template.name()).is_some() {
            tracing::warn!(
                template = template.name(),
                "duplicate template name, the earlier registration takes priority"
            );
        }
        tracing::debug!(
            template = template.name(),
            syntax = template.syntax(),
            priority = self.templates.len(),
            "registered template"
        );
        self.templates.push(template);
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name() == name)
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Template names in priority order.
    pub fn names(&self) -> Vec<&str> {
        self.templates.iter().map(Template::name).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Tokenize `line` and try every template in registration order.
    ///
    /// Empty and malformed lines fail before any template is tried. A line no
    /// template matches is `Ok(None)`.
    pub fn parse_line(&self, line: &str) -> Result<Option<LineMatch>, LineError> {
        if line.is_empty() {
            return Err(LineError::Empty);
        }
        let segments = tokenize(line)?;

        for template in &self.templates {
            tracing::trace!(template = template.name(), "trying template");
            if let Some(mut arguments) = match_template(template, &segments) {
                fold_sign_markers(&mut arguments);
                return Ok(Some(LineMatch::new(template.name(), arguments)));
            }
        }

        tracing::trace!(line, "no template matched");
        Ok(None)
    }
}
