//! Variable-substitution renderer standing in at the templating boundary.
//! The pipeline contract is the flat context map; anything more expressive
//! belongs to an external templating collaborator.

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::context::Context;
use crate::error::{MailerError, Result};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder pattern is valid"));

pub struct TemplateEngine {
    template_dir: PathBuf,
}

impl TemplateEngine {
    pub fn new(template_dir: Option<&str>) -> Self {
        TemplateEngine {
            template_dir: PathBuf::from(template_dir.unwrap_or("templates")),
        }
    }

    /// Render a template file from the templates directory.
    pub fn render_file(&self, name: &str, context: &Context) -> Result<String> {
        let path = self.template_dir.join(name);
        let source = std::fs::read_to_string(&path).map_err(|e| {
            MailerError::Template(format!("Failed to read template '{}': {e}", path.display()))
        })?;
        Ok(self.render_str(&source, context))
    }

    /// Render `{{ key }}` placeholders from the context. Unknown keys and
    /// null values render empty.
    pub fn render_str(&self, source: &str, context: &Context) -> String {
        PLACEHOLDER_RE
            .replace_all(source, |caps: &Captures| {
                context.get(&caps[1]).map(render_value).unwrap_or_default()
            })
            .into_owned()
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(pairs: &[(&str, Value)]) -> Context {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn substitutes_placeholders() {
        let engine = TemplateEngine::new(None);
        let ctx = context(&[
            ("first_name_titlecase", json!("John")),
            ("current_year", json!(2025)),
        ]);
        let rendered = engine.render_str(
            "Hello {{ first_name_titlecase }}, welcome to {{current_year}}.",
            &ctx,
        );
        assert_eq!(rendered, "Hello John, welcome to 2025.");
    }

    #[test]
    fn unknown_and_null_placeholders_render_empty() {
        let engine = TemplateEngine::new(None);
        let ctx = context(&[("uniform_inspection", Value::Null)]);
        assert_eq!(
            engine.render_str("[{{ missing }}][{{ uniform_inspection }}]", &ctx),
            "[][]"
        );
    }

    #[test]
    fn missing_template_file_is_a_template_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TemplateEngine::new(Some(dir.path().to_str().unwrap()));
        let err = engine.render_file("nope.html", &Context::new()).unwrap_err();
        assert!(matches!(err, MailerError::Template(_)));
    }
}
