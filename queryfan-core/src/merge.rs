//! RequestMerger rewrites a set of structured queries into one composite document. Each added
//! request's top-level response keys and variable names are rewritten under a caller-supplied
//! prefix so that independently-authored requests cannot collide in the composite, and the
//! rewrite is recorded per request as an [AliasMap] so results can be split back out.

use tracing::debug;

use crate::query::{ArgumentValue, FieldSelection, QueryDocument, VariableDefinition};
use crate::request::{AliasMap, VariableMap};

#[derive(Default)]
pub struct RequestMerger {
    variable_definitions: Vec<VariableDefinition>,
    selections: Vec<FieldSelection>,
    operation_name: Option<String>,
}

impl RequestMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the operation name for the merged document. Callers set this only when every
    /// input request shares exactly one operation name.
    pub fn set_operation_name(&mut self, name: impl Into<String>) {
        self.operation_name = Some(name.into());
    }

    pub fn operation_name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }

    /// Rewrites `document` under `prefix` and appends it to the composite. Every top-level
    /// selection is re-aliased to `{prefix}{original key}` and every variable definition and
    /// variable reference in the selection tree is renamed with the same prefix. Returns the
    /// namespaced-to-original key mapping, in selection order.
    ///
    /// Deterministic for identical inputs: the rewrite depends only on `prefix`, not on any
    /// merger-internal counter. For `auto_generated` documents the original key is the field
    /// name, since generated aliases carry no caller-visible meaning.
    pub fn add_request(
        &mut self,
        document: &QueryDocument,
        prefix: &str,
        auto_generated: bool,
    ) -> AliasMap {
        let mut aliases = AliasMap::new();
        for selection in &document.selections {
            let original = if auto_generated {
                selection.name.clone()
            } else {
                selection.response_key().to_string()
            };
            let namespaced = format!("{prefix}{original}");

            let mut rewritten = selection.clone();
            rewritten.alias = Some(namespaced.clone());
            rename_variable_refs(&mut rewritten, prefix);
            self.selections.push(rewritten);

            aliases.push((namespaced, original));
        }
        for definition in &document.variable_definitions {
            let mut renamed = definition.clone();
            renamed.name = format!("{prefix}{}", renamed.name);
            self.variable_definitions.push(renamed);
        }
        debug!(
            prefix,
            selections = document.selections.len(),
            "added request to composite"
        );
        aliases
    }

    /// Produces the single composite document combining every added request under one
    /// operation.
    pub fn merge(self) -> QueryDocument {
        QueryDocument {
            variable_definitions: self.variable_definitions,
            selections: self.selections,
        }
    }
}

/// Renames every variable binding of one request with the request's prefix and adds it to the
/// flat composite binding map. Collisions across requests are impossible since prefixes are
/// derived from a unique index.
pub fn merge_variables(original: &VariableMap, merged: &mut VariableMap, prefix: &str) {
    for (name, value) in original {
        merged.insert(format!("{prefix}{name}"), value.clone());
    }
}

fn rename_variable_refs(selection: &mut FieldSelection, prefix: &str) {
    for argument in &mut selection.arguments {
        rename_value(&mut argument.value, prefix);
    }
    for child in &mut selection.selections {
        rename_variable_refs(child, prefix);
    }
}

fn rename_value(value: &mut ArgumentValue, prefix: &str) {
    match value {
        ArgumentValue::Variable(name) => *name = format!("{prefix}{name}"),
        ArgumentValue::List(items) => {
            for item in items {
                rename_value(item, prefix);
            }
        }
        ArgumentValue::Object(fields) => {
            for (_, field_value) in fields {
                rename_value(field_value, prefix);
            }
        }
        ArgumentValue::Scalar(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn user_query() -> QueryDocument {
        QueryDocument {
            variable_definitions: vec![VariableDefinition::new("id", "ID!")],
            selections: vec![
                FieldSelection::new("user")
                    .with_argument("id", ArgumentValue::Variable("id".to_string()))
                    .with_selection(FieldSelection::new("name")),
            ],
        }
    }

    #[test]
    fn test_identical_requests_do_not_collide() {
        let mut merger = RequestMerger::new();
        let a = merger.add_request(&user_query(), "__0_", false);
        let b = merger.add_request(&user_query(), "__1_", false);

        assert_eq!(a, vec![("__0_user".to_string(), "user".to_string())]);
        assert_eq!(b, vec![("__1_user".to_string(), "user".to_string())]);

        let merged = merger.merge();
        assert_eq!(merged.selections.len(), 2);
        assert_eq!(merged.selections[0].alias.as_deref(), Some("__0_user"));
        assert_eq!(merged.selections[1].alias.as_deref(), Some("__1_user"));
        assert_eq!(merged.variable_definitions[0].name, "__0_id");
        assert_eq!(merged.variable_definitions[1].name, "__1_id");

        // round-trip: original key -> namespaced key -> original key is identity
        for aliases in [&a, &b] {
            for (namespaced, original) in aliases {
                assert!(namespaced.ends_with(original.as_str()));
            }
        }
    }

    #[test]
    fn test_variable_refs_renamed_in_nested_selections() {
        let document = QueryDocument {
            variable_definitions: vec![VariableDefinition::new("first", "Int")],
            selections: vec![FieldSelection::new("user").with_selection(
                FieldSelection::new("friends").with_argument(
                    "page",
                    ArgumentValue::Object(vec![(
                        "first".to_string(),
                        ArgumentValue::Variable("first".to_string()),
                    )]),
                ),
            )],
        };

        let mut merger = RequestMerger::new();
        merger.add_request(&document, "__3_", false);
        let merged = merger.merge();

        let friends = &merged.selections[0].selections[0];
        let ArgumentValue::Object(fields) = &friends.arguments[0].value else {
            panic!("expected object argument");
        };
        let ArgumentValue::Variable(name) = &fields[0].1 else {
            panic!("expected variable reference");
        };
        assert_eq!(name, "__3_first");
    }

    #[test]
    fn test_user_alias_is_the_original_key() {
        let document = QueryDocument {
            variable_definitions: vec![],
            selections: vec![FieldSelection::new("user").with_alias("me")],
        };

        let mut merger = RequestMerger::new();
        let aliases = merger.add_request(&document, "__0_", false);
        assert_eq!(aliases, vec![("__0_me".to_string(), "me".to_string())]);

        // generated documents map back to the field name instead
        let mut merger = RequestMerger::new();
        let aliases = merger.add_request(&document, "__0_", true);
        assert_eq!(aliases, vec![("__0_user".to_string(), "user".to_string())]);
    }

    #[test]
    fn test_merge_variables_is_prefixed_and_flat() {
        let mut original = VariableMap::new();
        original.insert("id".to_string(), Value::from(7));

        let mut merged = VariableMap::new();
        merge_variables(&original, &mut merged, "__0_");
        merge_variables(&original, &mut merged, "__1_");

        assert_eq!(merged.get("__0_id"), Some(&Value::from(7)));
        assert_eq!(merged.get("__1_id"), Some(&Value::from(7)));
        assert_eq!(merged.len(), 2);
    }
}
