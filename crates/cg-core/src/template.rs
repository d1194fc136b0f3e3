//! Prompt templates.
//!
//! The prompt file is YAML with four templates:
//!
//! ```yaml
//! class: |
//!   Write a Swift class combining {{.Algorithm1Name}} ({{.Algorithm1Desc}})
//!   with {{.Algorithm2Name}} ({{.Algorithm2Desc}}) ...
//! classFilename: "{{.Algorithm1Name}}Module.swift"
//! module: |
//!   Write the Objective-C module exporting this class ...
//! moduleFilename: "{{.Algorithm1Name}}Module.m"
//! ```
//!
//! Placeholders are `{{.Name}}` (spaces inside the braces are allowed) and
//! resolve against the four values of an [`AlgorithmPair`]. The two
//! filename templates are rendered but not used downstream.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::AlgorithmPair;
use crate::config::{read_yaml, ConfigError};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// The four configured templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateName {
    /// Prompt for the primary (Swift class) stage
    Class,
    /// Filename hint for the primary stage
    ClassFilename,
    /// Prompt for the secondary (bridge module) stage
    Module,
    /// Filename hint for the secondary stage
    ModuleFilename,
}

impl TemplateName {
    pub const ALL: [TemplateName; 4] = [
        TemplateName::Class,
        TemplateName::ClassFilename,
        TemplateName::Module,
        TemplateName::ModuleFilename,
    ];

    /// Key of this template in the prompt file.
    pub fn key(self) -> &'static str {
        match self {
            TemplateName::Class => "class",
            TemplateName::ClassFilename => "classFilename",
            TemplateName::Module => "module",
            TemplateName::ModuleFilename => "moduleFilename",
        }
    }
}

/// Values available to templates.
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pair: &'a AlgorithmPair,
}

impl<'a> PromptContext<'a> {
    pub fn new(pair: &'a AlgorithmPair) -> Self {
        Self { pair }
    }

    /// Look up a placeholder name.
    pub fn value(&self, variable: &str) -> Option<&'a str> {
        match variable {
            "Algorithm1Name" => Some(&self.pair.first.name),
            "Algorithm1Desc" => Some(&self.pair.first.description),
            "Algorithm2Name" => Some(&self.pair.second.name),
            "Algorithm2Desc" => Some(&self.pair.second.description),
            _ => None,
        }
    }
}

/// Templates as loaded from the prompt file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplates {
    pub class: String,
    pub class_filename: String,
    pub module: String,
    pub module_filename: String,
}

impl PromptTemplates {
    /// Load templates from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        read_yaml(path)
    }

    /// Template text for `name`.
    pub fn template(&self, name: TemplateName) -> &str {
        match name {
            TemplateName::Class => &self.class,
            TemplateName::ClassFilename => &self.class_filename,
            TemplateName::Module => &self.module,
            TemplateName::ModuleFilename => &self.module_filename,
        }
    }

    /// Render one template.
    pub fn render_one(
        &self,
        name: TemplateName,
        context: &PromptContext<'_>,
    ) -> Result<String, ConfigError> {
        render(name.key(), self.template(name), context)
    }

    /// Render all four templates for one algorithm pair.
    pub fn render(&self, pair: &AlgorithmPair) -> Result<PromptSet, ConfigError> {
        let context = PromptContext::new(pair);
        Ok(PromptSet {
            class: self.render_one(TemplateName::Class, &context)?,
            class_filename: self.render_one(TemplateName::ClassFilename, &context)?,
            module: self.render_one(TemplateName::Module, &context)?,
            module_filename: self.render_one(TemplateName::ModuleFilename, &context)?,
        })
    }

    /// Check every template against a sample context.
    ///
    /// Catches unknown placeholders at startup rather than in the loop.
    pub fn validate(&self, pair: &AlgorithmPair) -> Result<(), ConfigError> {
        self.render(pair).map(|_| ())
    }
}

/// Rendered prompts for one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    pub class: String,
    pub class_filename: String,
    pub module: String,
    pub module_filename: String,
}

impl PromptSet {
    /// Rendered text for `name`.
    pub fn get(&self, name: TemplateName) -> &str {
        match name {
            TemplateName::Class => &self.class,
            TemplateName::ClassFilename => &self.class_filename,
            TemplateName::Module => &self.module,
            TemplateName::ModuleFilename => &self.module_filename,
        }
    }
}

/// Substitute every `{{.Name}}` placeholder in `template`.
fn render(
    template_key: &'static str,
    template: &str,
    context: &PromptContext<'_>,
) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];
        let end = after_open
            .find(CLOSE)
            .ok_or(ConfigError::UnterminatedPlaceholder {
                template: template_key,
            })?;

        let inner = after_open[..end].trim();
        let variable = inner.strip_prefix('.').unwrap_or(inner).trim();
        let value = context
            .value(variable)
            .ok_or_else(|| ConfigError::UnknownVariable {
                template: template_key,
                variable: variable.to_string(),
            })?;
        output.push_str(value);

        rest = &after_open[end + CLOSE.len()..];
    }

    output.push_str(rest);
    Ok(output)
}
