//! Field collection: turns a parsed selection set into the canonical tree
//!
//! The tree is keyed by response key, has `@skip`/`@include` already applied,
//! fragments inlined and variables substituted. Collection is a pure function
//! of the document, the variables and the fragment table.

use crate::graphql::introspection::introspection_field_type;
use crate::graphql::response::Location;
use crate::graphql::schema::Schema;
use crate::graphql::value::{Variables, to_json};
use graphql_parser::query::{
    Directive, Field, FragmentDefinition, Selection, SelectionSet as AstSelectionSet,
    TypeCondition,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Fragment definitions of one document, keyed by fragment name
pub type Fragments<'d, 'q> = HashMap<String, &'d FragmentDefinition<'q, String>>;

/// A directive other than `@skip`/`@include` carried by a selected field
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveInstance {
    pub name: String,
    pub arguments: Map<String, Value>,
}

/// One entry of a collected selection set
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedField {
    pub name: String,
    pub alias: Option<String>,
    /// Argument values with variables substituted
    pub arguments: Map<String, Value>,
    pub selections: Option<Arc<SelectionSet>>,
    pub directives: Vec<DirectiveInstance>,
    /// Concrete type a fragment restricted this field to, under an abstract parent
    pub type_condition: Option<String>,
    pub location: Location,
}

impl SelectedField {
    /// Alias if present, otherwise the field name
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    /// Nested fields, empty for leaf fields
    pub fn children(&self) -> impl Iterator<Item = &SelectedField> {
        self.selections.iter().flat_map(|s| s.iter())
    }

    pub fn has_selections(&self) -> bool {
        self.selections.as_ref().is_some_and(|s| !s.is_empty())
    }
}

/// Fields requested at one level of the tree, unique by response key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSet {
    fields: IndexMap<String, SelectedField>,
    /// Whether `__typename` was requested at this level
    pub typename: bool,
}

impl SelectionSet {
    /// Build a selection set from already collected fields
    ///
    /// A later field with a response key already present is dropped.
    pub fn from_fields(fields: impl IntoIterator<Item = SelectedField>) -> Self {
        let mut set = SelectionSet::default();
        for field in fields {
            let key = field.response_key().to_string();
            set.fields.entry(key).or_insert(field);
        }
        set
    }

    /// Fields in first-encounter order
    pub fn iter(&self) -> impl Iterator<Item = &SelectedField> {
        self.fields.values()
    }

    pub fn get(&self, response_key: &str) -> Option<&SelectedField> {
        self.fields.get(response_key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && !self.typename
    }

    /// Response keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Collects selection sets against a schema
pub struct FieldCollector<'a, 'd, 'q> {
    schema: &'a Schema,
    variables: &'a Variables,
    fragments: &'a Fragments<'d, 'q>,
    visiting: Vec<String>,
}

impl<'a, 'd, 'q> FieldCollector<'a, 'd, 'q> {
    pub fn new(schema: &'a Schema, variables: &'a Variables, fragments: &'a Fragments<'d, 'q>) -> Self {
        Self {
            schema,
            variables,
            fragments,
            visiting: Vec::new(),
        }
    }

    /// Collect `selection_set` as selected on values of `parent_type`
    pub fn collect(&mut self, selection_set: &AstSelectionSet<'q, String>, parent_type: &str) -> SelectionSet {
        let mut out = SelectionSet::default();
        self.collect_into(&mut out, selection_set, parent_type, None);
        out
    }

    fn collect_into(
        &mut self,
        target: &mut SelectionSet,
        selection_set: &AstSelectionSet<'q, String>,
        parent_type: &str,
        condition: Option<&str>,
    ) {
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => {
                    if self.is_excluded(&field.directives) {
                        continue;
                    }
                    if field.name == "__typename" {
                        target.typename = true;
                        continue;
                    }
                    self.collect_field(target, field, parent_type, condition);
                }
                Selection::FragmentSpread(spread) => {
                    if self.is_excluded(&spread.directives) {
                        continue;
                    }
                    let name = &spread.fragment_name;
                    if self.visiting.iter().any(|v| v == name) {
                        continue;
                    }
                    let Some(fragment) = self.fragments.get(name).copied() else {
                        continue;
                    };
                    let TypeCondition::On(on) = &fragment.type_condition;
                    let Some(condition) = self.applicable(parent_type, on, condition) else {
                        continue;
                    };
                    self.visiting.push(name.clone());
                    self.collect_into(target, &fragment.selection_set, parent_type, condition.as_deref());
                    self.visiting.pop();
                }
                Selection::InlineFragment(inline) => {
                    if self.is_excluded(&inline.directives) {
                        continue;
                    }
                    let condition = match &inline.type_condition {
                        Some(TypeCondition::On(on)) => match self.applicable(parent_type, on, condition) {
                            Some(c) => c,
                            None => continue,
                        },
                        None => condition.map(str::to_string),
                    };
                    self.collect_into(target, &inline.selection_set, parent_type, condition.as_deref());
                }
            }
        }
    }

    fn collect_field(
        &mut self,
        target: &mut SelectionSet,
        field: &Field<'q, String>,
        parent_type: &str,
        condition: Option<&str>,
    ) {
        let key = field.alias.clone().unwrap_or_else(|| field.name.clone());
        // Under a fragment on a union or interface member the field belongs to the member type.
        let nested_type = condition
            .and_then(|on| self.schema.field(on, &field.name))
            .map(|def| def.field_type.named_type().to_string())
            .unwrap_or_else(|| self.nested_type(parent_type, &field.name));

        if let Some(existing) = target.fields.get_mut(&key) {
            // Same response key seen before: union the nested selections.
            if existing.type_condition.as_deref() != condition {
                existing.type_condition = None;
            }
            if !field.selection_set.items.is_empty() {
                let nested = Arc::make_mut(existing.selections.get_or_insert_with(Default::default));
                self.collect_into(nested, &field.selection_set, &nested_type, None);
            }
            return;
        }

        let selections = (!field.selection_set.items.is_empty())
            .then(|| Arc::new(self.collect(&field.selection_set, &nested_type)));

        let arguments = field
            .arguments
            .iter()
            .map(|(name, value)| (name.clone(), to_json(value, self.variables)))
            .collect();

        let directives = field
            .directives
            .iter()
            .filter(|d| d.name != "skip" && d.name != "include")
            .map(|d| DirectiveInstance {
                name: d.name.clone(),
                arguments: d
                    .arguments
                    .iter()
                    .map(|(name, value)| (name.clone(), to_json(value, self.variables)))
                    .collect(),
            })
            .collect();

        target.fields.insert(
            key,
            SelectedField {
                name: field.name.clone(),
                alias: field.alias.clone(),
                arguments,
                selections,
                directives,
                type_condition: condition.map(str::to_string),
                location: Location {
                    line: field.position.line,
                    column: field.position.column,
                },
            },
        );
    }

    /// Whether a fragment on `on` applies under `parent_type`
    ///
    /// Returns the type condition nested fields inherit: `None` when the
    /// fragment applies to every value of the parent type.
    fn applicable(
        &self,
        parent_type: &str,
        on: &str,
        inherited: Option<&str>,
    ) -> Option<Option<String>> {
        if self.schema.type_satisfies(parent_type, on) {
            return Some(inherited.map(str::to_string));
        }
        // Under an interface or union the runtime type decides later.
        let possible = self.schema.possible_types(parent_type);
        if possible.contains(&on) {
            return Some(Some(on.to_string()));
        }
        if possible.iter().any(|t| self.schema.type_satisfies(t, on)) {
            return Some(Some(on.to_string()));
        }
        None
    }

    fn nested_type(&self, parent_type: &str, field_name: &str) -> String {
        if let Some(def) = self.schema.field(parent_type, field_name) {
            return def.field_type.named_type().to_string();
        }
        introspection_field_type(parent_type, field_name)
            .unwrap_or_default()
            .to_string()
    }

    fn is_excluded(&self, directives: &[Directive<'q, String>]) -> bool {
        directives.iter().any(|d| match d.name.as_str() {
            "skip" => self.condition(d) == Some(true),
            "include" => self.condition(d) == Some(false),
            _ => false,
        })
    }

    fn condition(&self, directive: &Directive<'q, String>) -> Option<bool> {
        directive
            .arguments
            .iter()
            .find(|(name, _)| name == "if")
            .and_then(|(_, value)| to_json(value, self.variables).as_bool())
    }
}

/// Collect a selection set in one call
pub fn collect_fields<'d, 'q>(
    schema: &Schema,
    selection_set: &AstSelectionSet<'q, String>,
    parent_type: &str,
    variables: &Variables,
    fragments: &Fragments<'d, 'q>,
) -> SelectionSet {
    FieldCollector::new(schema, variables, fragments).collect(selection_set, parent_type)
}
