use tree_sitter::Language;

/// Per-language grammar configuration: extension mapping plus the
/// Tree-sitter queries used for logical-unit, call, and import matching.
///
/// Languages form a closed set; adding one means adding a config function
/// here, not branching logic at call sites.
///
/// Call queries use two capture classes: `@call` for plain identifier calls
/// (statically recognizable callee) and `@dyncall` for member/attribute
/// access on a receiver, where the callee cannot be resolved lexically.
pub struct LanguageConfig {
    pub name: &'static str,
    pub language: Language,
    pub extensions: &'static [&'static str],
    pub unit_query: &'static str,
    pub call_query: &'static str,
    pub import_query: &'static str,
}

impl LanguageConfig {
    pub fn get_all() -> Vec<LanguageConfig> {
        vec![
            go_config(),
            python_config(),
            typescript_config(),
            javascript_config(),
            rust_config(),
            java_config(),
        ]
    }

    pub fn get_by_extension(ext: &str) -> Option<LanguageConfig> {
        Self::get_all()
            .into_iter()
            .find(|c| c.extensions.contains(&ext))
    }

    pub fn get_by_name(name: &str) -> Option<LanguageConfig> {
        Self::get_all().into_iter().find(|c| c.name == name)
    }
}

fn go_config() -> LanguageConfig {
    LanguageConfig {
        name: "go",
        language: tree_sitter_go::LANGUAGE.into(),
        extensions: &["go"],
        unit_query: r#"
(function_declaration
  name: (identifier) @name) @function

(method_declaration
  name: (field_identifier) @name) @method

(type_declaration
  (type_spec
    name: (type_identifier) @name
    type: (struct_type))) @struct

(type_declaration
  (type_spec
    name: (type_identifier) @name
    type: (interface_type))) @interface
"#,
        call_query: r#"
(call_expression
  function: (identifier) @call)
(call_expression
  function: (selector_expression
    field: (field_identifier) @dyncall))
"#,
        import_query: r#"
(import_spec
  path: (interpreted_string_literal) @import)
"#,
    }
}

fn python_config() -> LanguageConfig {
    LanguageConfig {
        name: "python",
        language: tree_sitter_python::LANGUAGE.into(),
        extensions: &["py"],
        unit_query: r#"
(function_definition
  name: (identifier) @name) @function

(class_definition
  name: (identifier) @name) @class
"#,
        call_query: r#"
(call
  function: (identifier) @call)
(call
  function: (attribute
    attribute: (identifier) @dyncall))
"#,
        import_query: r#"
(import_statement
  name: (dotted_name) @import)
(import_from_statement
  module_name: (dotted_name) @import)
"#,
    }
}

fn typescript_config() -> LanguageConfig {
    LanguageConfig {
        name: "typescript",
        language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        extensions: &["ts", "tsx"],
        unit_query: r#"
(function_declaration
  name: (identifier) @name) @function

(lexical_declaration
  (variable_declarator
    name: (identifier) @name
    value: (arrow_function))) @function

(class_declaration
  name: (type_identifier) @name) @class

(interface_declaration
  name: (type_identifier) @name) @interface

(method_definition
  name: (property_identifier) @name) @method
"#,
        call_query: r#"
(call_expression
  function: (identifier) @call)
(call_expression
  function: (member_expression
    property: (property_identifier) @dyncall))
"#,
        import_query: r#"
(import_statement
  source: (string) @import)
"#,
    }
}

fn javascript_config() -> LanguageConfig {
    LanguageConfig {
        name: "javascript",
        language: tree_sitter_javascript::LANGUAGE.into(),
        extensions: &["js", "jsx", "mjs"],
        unit_query: r#"
(function_declaration
  name: (identifier) @name) @function

(lexical_declaration
  (variable_declarator
    name: (identifier) @name
    value: (arrow_function))) @function

(class_declaration
  name: (identifier) @name) @class

(method_definition
  name: (property_identifier) @name) @method
"#,
        call_query: r#"
(call_expression
  function: (identifier) @call)
(call_expression
  function: (member_expression
    property: (property_identifier) @dyncall))
"#,
        import_query: r#"
(import_statement
  source: (string) @import)
"#,
    }
}

fn rust_config() -> LanguageConfig {
    LanguageConfig {
        name: "rust",
        language: tree_sitter_rust::LANGUAGE.into(),
        extensions: &["rs"],
        unit_query: r#"
(function_item
  name: (identifier) @name) @function

(struct_item
  name: (type_identifier) @name) @struct

(enum_item
  name: (type_identifier) @name) @struct

(trait_item
  name: (type_identifier) @name) @trait
"#,
        call_query: r#"
(call_expression
  function: (identifier) @call)
(call_expression
  function: (field_expression
    field: (field_identifier) @dyncall))
(call_expression
  function: (scoped_identifier
    name: (identifier) @call))
"#,
        import_query: r#"
(use_declaration
  argument: (scoped_identifier) @import)
(use_declaration
  argument: (identifier) @import)
(use_declaration
  argument: (use_wildcard) @import)
"#,
    }
}

fn java_config() -> LanguageConfig {
    LanguageConfig {
        name: "java",
        language: tree_sitter_java::LANGUAGE.into(),
        extensions: &["java"],
        unit_query: r#"
(class_declaration
  name: (identifier) @name) @class

(interface_declaration
  name: (identifier) @name) @interface

(enum_declaration
  name: (identifier) @name) @class

(method_declaration
  name: (identifier) @name) @method
"#,
        call_query: r#"
(method_invocation
  !object
  name: (identifier) @call)
(method_invocation
  object: (_)
  name: (identifier) @dyncall)
"#,
        import_query: r#"
(import_declaration
  (scoped_identifier) @import)
"#,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Query;

    #[test]
    fn test_all_queries_compile() {
        for config in LanguageConfig::get_all() {
            Query::new(&config.language, config.unit_query)
                .unwrap_or_else(|e| panic!("unit query for {} failed: {e}", config.name));
            Query::new(&config.language, config.call_query)
                .unwrap_or_else(|e| panic!("call query for {} failed: {e}", config.name));
            Query::new(&config.language, config.import_query)
                .unwrap_or_else(|e| panic!("import query for {} failed: {e}", config.name));
        }
    }

    #[test]
    fn test_extension_lookup() {
        assert_eq!(LanguageConfig::get_by_extension("py").unwrap().name, "python");
        assert_eq!(LanguageConfig::get_by_extension("rs").unwrap().name, "rust");
        assert_eq!(LanguageConfig::get_by_extension("tsx").unwrap().name, "typescript");
        assert_eq!(LanguageConfig::get_by_extension("java").unwrap().name, "java");
        assert!(LanguageConfig::get_by_extension("xyz").is_none());
    }

    #[test]
    fn test_six_grammars() {
        assert_eq!(LanguageConfig::get_all().len(), 6);
    }
}
