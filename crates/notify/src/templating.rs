//! Minijinja template rendering for alert messages.
//!
//! Templates are arbitrary strings (not pre-registered files), so a fresh
//! [`minijinja::Environment`] is created per render call.

use crate::traits::{ChangeAlert, NotifyError};

/// Default body template used when a channel has none configured.
pub const DEFAULT_BODY_TEMPLATE: &str = "\
{{ title }}

{{ message }}

Target: {{ target_label }}
URL: {{ target_url }}
Change: {{ category }}
{% if diff_artifact_url %}Diff: {{ diff_artifact_url }}{% endif %}";

/// Renders alert templates using minijinja.
#[derive(Debug, Default)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("round", round_filter);
        env
    }

    /// Render a template string with the alert as context.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template is invalid or
    /// rendering fails.
    pub fn render(&self, template_str: &str, alert: &ChangeAlert) -> Result<String, NotifyError> {
        let env = Self::build_env();
        env.render_str(template_str, alert)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Validate that a template string parses. Syntax only, no evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] on syntax errors.
    pub fn validate(&self, template_str: &str) -> Result<(), NotifyError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }
}

/// Custom filter: round a float to N decimal places.
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}
