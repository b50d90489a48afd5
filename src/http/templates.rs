//! Page templates loaded from the static directory.
//!
//! Templates are optional: a missing or broken file is logged and the
//! routes that need it fall back or fail individually. Output is escaped
//! because the address can come straight from a request header.

use std::path::Path;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tera::{Context, Tera};
use thiserror::Error;

use crate::identity::IdentityRecord;

pub const HTML_TEMPLATE: &str = "html.template";
pub const CLEAN_TEMPLATE: &str = "clean.template";
pub const XML_TEMPLATE: &str = "xml.template";

const ALL_TEMPLATES: [&str; 3] = [HTML_TEMPLATE, CLEAN_TEMPLATE, XML_TEMPLATE];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("YAML encoding failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Template execution error");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

pub struct Templates {
    tera: Tera,
}

impl Templates {
    fn empty() -> Tera {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".template"]);
        tera
    }

    /// Load every known template found in `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let mut tera = Self::empty();

        for name in ALL_TEMPLATES {
            let path = dir.join(name);
            if let Err(e) = tera.add_template_file(&path, Some(name)) {
                tracing::warn!(path = %path.display(), error = %e, "Could not parse template");
            }
        }

        Self { tera }
    }

    /// Build from in-memory sources, keyed by template name.
    pub fn from_sources<'a>(
        sources: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, RenderError> {
        let mut tera = Self::empty();
        for (name, content) in sources {
            tera.add_raw_template(name, content)?;
        }
        Ok(Self { tera })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|loaded| loaded == name)
    }

    pub fn render(&self, name: &str, record: &IdentityRecord) -> Result<String, RenderError> {
        let context = Context::from_serialize(record)?;
        Ok(self.tera.render(name, &context)?)
    }
}

impl Default for Templates {
    fn default() -> Self {
        Self { tera: Self::empty() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(address: &str) -> IdentityRecord {
        IdentityRecord {
            is_ipv6: false,
            address: address.into(),
            hostname: address.into(),
            geo: "Unknown".into(),
            isp: String::new(),
            country_code: "XX".into(),
            city: String::new(),
            country: String::new(),
        }
    }

    #[test]
    fn test_interpolated_values_are_escaped() {
        let templates =
            Templates::from_sources([(HTML_TEMPLATE, "<p>{{ address }}</p>")]).unwrap();
        let html = templates
            .render(HTML_TEMPLATE, &record("<script>alert(1)</script>"))
            .unwrap();

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)"));
        assert!(html.starts_with("<p>"));
    }

    #[test]
    fn test_missing_template_is_an_error() {
        let templates = Templates::default();
        assert!(!templates.contains(XML_TEMPLATE));
        assert!(matches!(
            templates.render(XML_TEMPLATE, &record("192.0.2.1")),
            Err(RenderError::Template(_))
        ));
    }

    #[test]
    fn test_load_skips_missing_files() {
        let templates = Templates::load("/nonexistent/static");
        for name in ALL_TEMPLATES {
            assert!(!templates.contains(name));
        }
    }

    #[test]
    fn test_bundled_templates_parse() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/static");
        let templates = Templates::load(dir);
        for name in ALL_TEMPLATES {
            assert!(templates.contains(name), "{name} should load");
            let out = templates.render(name, &record("198.51.100.1")).unwrap();
            assert!(out.contains("198.51.100.1"));
        }
    }
}
