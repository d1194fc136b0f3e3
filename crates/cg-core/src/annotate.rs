//! Interop annotations for generated Swift sources.
//!
//! React Native reaches Swift through the Objective-C runtime, so exported
//! classes need `@objc(Name)` and exported methods need `@objc` plus the
//! bridge marker. The model rarely writes them consistently; they are added
//! here instead.
//!
//! Only the first line of a declaration is inspected. Running the injector
//! twice duplicates every annotation.

use regex::Regex;

use crate::config::ConfigError;

/// Placeholder replaced by the declared type name.
const NAME_PLACEHOLDER: &str = "{name}";

/// Keywords and annotation texts.
#[derive(Debug, Clone)]
pub struct AnnotationRules {
    /// Keyword that starts a type declaration
    pub type_keyword: String,
    /// Keyword that starts a function declaration
    pub function_keyword: String,
    /// Line inserted above a type declaration; `{name}` is the type name
    pub type_annotation: String,
    /// Lines inserted above a function declaration, in order
    pub function_annotations: Vec<String>,
}

impl Default for AnnotationRules {
    fn default() -> Self {
        Self {
            type_keyword: "class".to_string(),
            function_keyword: "func".to_string(),
            type_annotation: "@objc({name})".to_string(),
            function_annotations: vec!["@objc".to_string(), "@ReactMethod".to_string()],
        }
    }
}

/// Line-oriented annotation pass.
#[derive(Debug, Clone)]
pub struct AnnotationInjector {
    rules: AnnotationRules,
    type_pattern: Regex,
}

impl AnnotationInjector {
    /// Create an injector for the given rules.
    pub fn new(rules: AnnotationRules) -> Result<Self, ConfigError> {
        debug_assert!(!rules.type_keyword.is_empty(), "Type keyword must not be empty");
        debug_assert!(
            !rules.function_keyword.is_empty(),
            "Function keyword must not be empty"
        );

        let pattern = format!(r"{} ([a-zA-Z0-9_]+)", regex::escape(&rules.type_keyword));
        let type_pattern = Regex::new(&pattern)?;
        Ok(Self {
            rules,
            type_pattern,
        })
    }

    /// Insert annotations above recognized declarations.
    ///
    /// Inserted lines copy the declaration's leading whitespace. A line that
    /// starts with the type keyword but has no identifier after it is left
    /// alone.
    pub fn annotate(&self, source: &str) -> String {
        let mut output: Vec<String> = Vec::new();

        for line in source.split('\n') {
            let trimmed = line.trim();
            let indent = &line[..line.len() - line.trim_start().len()];

            if trimmed.starts_with(self.rules.type_keyword.as_str()) {
                if let Some(name) = self
                    .type_pattern
                    .captures(trimmed)
                    .and_then(|captures| captures.get(1))
                {
                    let annotation = self
                        .rules
                        .type_annotation
                        .replace(NAME_PLACEHOLDER, name.as_str());
                    output.push(format!("{indent}{annotation}"));
                }
            } else if trimmed.starts_with(self.rules.function_keyword.as_str()) {
                for annotation in &self.rules.function_annotations {
                    output.push(format!("{indent}{annotation}"));
                }
            }

            output.push(line.to_string());
        }

        output.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn injector() -> AnnotationInjector {
        AnnotationInjector::new(AnnotationRules::default()).unwrap()
    }

    #[test]
    fn test_plain_text_unchanged() {
        let source = "import Foundation\n\nlet limit = 10\n// comment\n";
        assert_eq!(injector().annotate(source), source);
    }

    #[test]
    fn test_type_declaration() {
        let annotated = injector().annotate("class CleanerModule: NSObject {");
        let lines: Vec<&str> = annotated.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "@objc(CleanerModule)");
        assert_eq!(lines[1], "class CleanerModule: NSObject {");
    }

    #[test]
    fn test_function_declaration_keeps_indent() {
        let source = "class Foo {\n\tfunc clean(_ path: String) {\n\t}\n}";
        let annotated = injector().annotate(source);

        assert_eq!(
            annotated,
            "@objc(Foo)\nclass Foo {\n\t@objc\n\t@ReactMethod\n\tfunc clean(_ path: String) {\n\t}\n}"
        );
    }

    #[test]
    fn test_keyword_without_identifier() {
        let source = "    classify()";
        assert_eq!(injector().annotate(source), source);
    }

    #[test]
    fn test_multi_line_signature_only_first_line() {
        let source = "  func run(\n    first: Int,\n    second: Int\n  ) {}";
        let annotated = injector().annotate(source);
        assert_eq!(annotated.matches("@ReactMethod").count(), 1);
        assert!(annotated.starts_with("  @objc\n  @ReactMethod\n  func run("));
    }

    #[test]
    fn test_not_idempotent() {
        let once = injector().annotate("class Foo {}");
        let twice = injector().annotate(&once);
        assert_eq!(twice.matches("@objc(Foo)").count(), 2);
    }

    #[test]
    fn test_custom_rules() {
        let rules = AnnotationRules {
            type_keyword: "object".to_string(),
            function_keyword: "fun".to_string(),
            type_annotation: "@ReactModule(name = \"{name}\")".to_string(),
            function_annotations: vec!["@ReactMethod".to_string()],
        };
        let injector = AnnotationInjector::new(rules).unwrap();
        let annotated = injector.annotate("object Cleaner {\n  fun clean() {}\n}");

        assert_eq!(
            annotated,
            "@ReactModule(name = \"Cleaner\")\nobject Cleaner {\n  @ReactMethod\n  fun clean() {}\n}"
        );
    }
}
