//! Theme engine
//!
//! Server-side page rendering with Tera. Templates live under
//! `themes/<name>/` and are loaded recursively at startup; `base.html`
//! files are registered first so inheritance chains resolve.

use anyhow::{Context, Result};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};

mod error;

pub use error::ThemeError;

/// Theme engine for rendering public and admin pages
pub struct ThemeEngine {
    tera: Tera,
    themes_path: PathBuf,
    active_theme: String,
}

impl ThemeEngine {
    /// Load the active theme from the themes directory
    pub fn new(themes_path: &Path, active_theme: &str) -> Result<Self> {
        let mut engine = Self {
            tera: Tera::default(),
            themes_path: themes_path.to_path_buf(),
            active_theme: active_theme.to_string(),
        };
        engine.load_templates()?;
        Ok(engine)
    }

    fn load_templates(&mut self) -> Result<()> {
        let theme_path = self.themes_path.join(&self.active_theme);
        if !theme_path.exists() {
            return Err(ThemeError::NotFound(self.active_theme.clone()).into());
        }

        let mut templates: Vec<(String, String)> = Vec::new();
        collect_templates(&theme_path, &theme_path, &mut templates)?;

        // Base templates first so inheritance resolves
        templates.sort_by(|a, b| {
            let a_is_base = a.0 == "base.html" || a.0.ends_with("/base.html");
            let b_is_base = b.0 == "base.html" || b.0.ends_with("/base.html");
            b_is_base.cmp(&a_is_base)
        });

        let mut tera = Tera::default();
        for (name, content) in templates {
            tera.add_raw_template(&name, &content).map_err(|e| {
                ThemeError::TemplateError(format!("Failed to add template {}: {}", name, e))
            })?;
        }
        tera.build_inheritance_chains().map_err(|e| {
            ThemeError::TemplateError(format!("Failed to build template inheritance: {}", e))
        })?;

        self.tera = tera;
        Ok(())
    }

    /// Render a template with the given context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            let mut message = format!("Failed to render '{}': {}", template, e);
            let mut source = e.source();
            while let Some(s) = source {
                message.push_str(&format!("\n  Caused by: {}", s));
                source = s.source();
            }
            ThemeError::TemplateError(message).into()
        })
    }

    /// Render with the standard site variables merged into the context
    pub fn render_page(
        &self,
        template: &str,
        context: &TeraContext,
        vars: &StandardTemplateVars,
    ) -> Result<String> {
        let mut full_context = context.clone();
        full_context.insert("site_title", &vars.site_title);
        full_context.insert("site_description", &vars.site_description);
        full_context.insert("base_url", &vars.base_url);
        full_context.insert("request_path", &vars.request_path);
        full_context.insert("year", &vars.year);
        self.render(template, &full_context)
    }

    /// Reload templates from disk, for development
    pub fn reload_templates(&mut self) -> Result<()> {
        self.load_templates()
    }

    pub fn active_theme(&self) -> &str {
        &self.active_theme
    }

    /// Path to the active theme's static assets directory
    pub fn static_path(&self) -> PathBuf {
        self.themes_path.join(&self.active_theme).join("static")
    }
}

fn collect_templates(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<()> {
    if !current_path.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(current_path)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_templates(base_path, &path, templates)?;
        } else if path.extension().map_or(false, |ext| ext == "html") {
            let relative_path = path.strip_prefix(base_path).map_err(|_| {
                ThemeError::TemplateError("Failed to get relative path".to_string())
            })?;
            let template_name = relative_path.to_string_lossy().replace('\\', "/");
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;
            templates.push((template_name, content));
        }
    }

    Ok(())
}

/// Standard variables available to every template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardTemplateVars {
    pub site_title: String,
    pub site_description: String,
    pub base_url: String,
    pub request_path: String,
    /// Current year, for the footer copyright
    pub year: i32,
}

impl StandardTemplateVars {
    pub fn new(site: &crate::config::SiteConfig, request_path: impl Into<String>) -> Self {
        Self {
            site_title: site.title.clone(),
            site_description: site.description.clone(),
            base_url: site.base_url.trim_end_matches('/').to_string(),
            request_path: request_path.into(),
            year: chrono::Utc::now().year(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use std::fs;

    fn write_theme(dir: &Path, files: &[(&str, &str)]) {
        for (name, content) in files {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create dirs");
            }
            fs::write(path, content).expect("write template");
        }
    }

    #[test]
    fn test_render_with_inheritance() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let theme_dir = tmp.path().join("default");
        write_theme(
            &theme_dir,
            &[
                (
                    "base.html",
                    "<html><body>{% block content %}{% endblock %}</body></html>",
                ),
                (
                    "index.html",
                    "{% extends \"base.html\" %}{% block content %}Hello {{ name }}{% endblock %}",
                ),
            ],
        );

        let engine = ThemeEngine::new(tmp.path(), "default").expect("load theme");
        let mut context = TeraContext::new();
        context.insert("name", "Lisbon");
        let html = engine.render("index.html", &context).expect("render");
        assert_eq!(html, "<html><body>Hello Lisbon</body></html>");
    }

    #[test]
    fn test_render_page_injects_standard_vars() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let theme_dir = tmp.path().join("default");
        write_theme(
            &theme_dir,
            &[("page.html", "{{ site_title }} | {{ request_path }} | {{ year }}")],
        );

        let engine = ThemeEngine::new(tmp.path(), "default").expect("load theme");
        let vars = StandardTemplateVars::new(&SiteConfig::default(), "/blog");
        let html = engine
            .render_page("page.html", &TeraContext::new(), &vars)
            .expect("render");
        assert!(html.starts_with("Wayfarer | /blog | "));
    }

    #[test]
    fn test_missing_theme_errors() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let result = ThemeEngine::new(tmp.path(), "nope");
        assert!(result.is_err());
    }

    #[test]
    fn test_nested_template_names() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let theme_dir = tmp.path().join("default");
        write_theme(&theme_dir, &[("admin/login.html", "login page")]);

        let engine = ThemeEngine::new(tmp.path(), "default").expect("load theme");
        let html = engine
            .render("admin/login.html", &TeraContext::new())
            .expect("render");
        assert_eq!(html, "login page");
    }

    #[test]
    fn test_reload_picks_up_changes() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let theme_dir = tmp.path().join("default");
        write_theme(&theme_dir, &[("index.html", "v1")]);

        let mut engine = ThemeEngine::new(tmp.path(), "default").expect("load theme");
        write_theme(&theme_dir, &[("index.html", "v2")]);
        engine.reload_templates().expect("reload");
        let html = engine.render("index.html", &TeraContext::new()).expect("render");
        assert_eq!(html, "v2");
    }
}
