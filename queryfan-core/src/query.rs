//! Minimal structured-query representation: just enough AST for the merger to namespace
//! response keys and variable references and recombine documents. Parsing query text into this
//! form and executing it against a data source both live outside this crate.

use serde_json::Value;

/// One structured query document: the ordered top-level selections of a single operation plus
/// its variable definitions.
#[derive(Debug, Clone, Default)]
pub struct QueryDocument {
    pub variable_definitions: Vec<VariableDefinition>,
    pub selections: Vec<FieldSelection>,
}

#[derive(Debug, Clone)]
pub struct VariableDefinition {
    pub name: String,
    pub type_name: String,
    pub default_value: Option<Value>,
}

impl VariableDefinition {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            default_value: None,
        }
    }
}

/// A field selection. The response key is the alias when one is set, otherwise the field name;
/// it is the key under which the field's value appears in the response data.
#[derive(Debug, Clone)]
pub struct FieldSelection {
    pub alias: Option<String>,
    pub name: String,
    pub arguments: Vec<Argument>,
    pub selections: Vec<FieldSelection>,
}

impl FieldSelection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            alias: None,
            name: name.into(),
            arguments: Vec::new(),
            selections: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: ArgumentValue) -> Self {
        self.arguments.push(Argument {
            name: name.into(),
            value,
        });
        self
    }

    pub fn with_selection(mut self, selection: FieldSelection) -> Self {
        self.selections.push(selection);
        self
    }

    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct Argument {
    pub name: String,
    pub value: ArgumentValue,
}

/// An argument value. Variable references are modelled explicitly so the merger can rename
/// them anywhere in the selection tree; everything else is an opaque literal.
#[derive(Debug, Clone)]
pub enum ArgumentValue {
    Variable(String),
    Scalar(Value),
    List(Vec<ArgumentValue>),
    Object(Vec<(String, ArgumentValue)>),
}
