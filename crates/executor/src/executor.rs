use std::{
    collections::{HashMap, HashSet},
    convert::Infallible,
};

use indexmap::IndexMap;
use parser::{
    types::{
        BaseType,
        Directive,
        DocumentOperations,
        ExecutableDocument,
        Field,
        FragmentDefinition,
        OperationDefinition,
        OperationType,
        Selection,
        SelectionSet,
        Type,
    },
    Pos,
    Positioned,
};
use rolegate_schema::{
    operation_keyword,
    ExecutionContext,
    FieldError,
    FieldResult,
    MetaField,
    MetaType,
    PathSegment,
    Schema,
    TraversalNode,
    TypeRef,
};
use rolegate_validation::{check_rules, ValidationLimits};
use tracing::instrument;
use value::{ConstValue, Name, Value, Variables};

use crate::{ExecutionError, ExecutionResult};

/// The callback the engine invokes once per field, in document order.
pub trait FieldResolver {
    fn resolve_field(
        &mut self,
        parent: &ConstValue,
        args: &IndexMap<Name, ConstValue>,
        ctx: &dyn ExecutionContext,
        node: &TraversalNode<'_>,
    ) -> FieldResult<ConstValue>;
}

impl<F> FieldResolver for F
where
    F: FnMut(&ConstValue, &IndexMap<Name, ConstValue>, &dyn ExecutionContext, &TraversalNode<'_>) -> FieldResult<ConstValue>,
{
    fn resolve_field(
        &mut self,
        parent: &ConstValue,
        args: &IndexMap<Name, ConstValue>,
        ctx: &dyn ExecutionContext,
        node: &TraversalNode<'_>,
    ) -> FieldResult<ConstValue> {
        self(parent, args, ctx, node)
    }
}

/// Resolves every field with [`default_field_resolver`].
pub struct DefaultFieldResolver;

impl FieldResolver for DefaultFieldResolver {
    fn resolve_field(
        &mut self,
        parent: &ConstValue,
        _args: &IndexMap<Name, ConstValue>,
        _ctx: &dyn ExecutionContext,
        node: &TraversalNode<'_>,
    ) -> FieldResult<ConstValue> {
        Ok(default_field_resolver(parent, node))
    }
}

/// The generic extraction rule: the entry of an object parent named after the
/// field, null for anything else.
pub fn default_field_resolver(parent: &ConstValue, node: &TraversalNode<'_>) -> ConstValue {
    match parent {
        ConstValue::Object(object) => object.get(node.field_name).cloned().unwrap_or(ConstValue::Null),
        _ => ConstValue::Null,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExecutionRequest<'a> {
    pub source: &'a str,
    pub operation_name: Option<&'a str>,
    pub variables: &'a Variables,
    pub root_value: &'a ConstValue,
}

/// A parsed and validated operation with coerced variables, ready to run.
pub struct PreparedOperation<'a> {
    schema: &'a Schema,
    document: ExecutableDocument,
    operation_name: Option<String>,
    operation_type: OperationType,
    variables: Variables,
    root_value: &'a ConstValue,
}

/// Parse, validate and pick the operation to run. Every failure here aborts
/// the whole request before any field is resolved.
#[instrument(skip_all, level = "debug")]
pub fn prepare<'a>(
    schema: &'a Schema,
    request: ExecutionRequest<'a>,
    limits: ValidationLimits,
) -> Result<PreparedOperation<'a>, Vec<ExecutionError>> {
    let document = parser::parse_query(request.source)
        .map_err(|err| vec![ExecutionError::new(err.to_string()).with_locations(err.positions())])?;

    let rule_errors = check_rules(&document, limits);
    if !rule_errors.is_empty() {
        return Err(rule_errors
            .into_iter()
            .map(|err| ExecutionError::new(err.message).with_locations(err.locations))
            .collect());
    }

    let unknown = unknown_fragments(&document);
    if !unknown.is_empty() {
        return Err(unknown);
    }

    let operation = select_operation(&document, request.operation_name).map_err(|err| vec![err])?;
    let operation_type = operation.node.ty;
    let variables = coerce_variables(schema, &operation.node, request.variables)?;

    Ok(PreparedOperation {
        schema,
        operation_name: request.operation_name.map(ToString::to_string),
        operation_type,
        variables,
        root_value: request.root_value,
        document,
    })
}

/// Prepare and run in one go.
pub fn execute(
    schema: &Schema,
    request: ExecutionRequest<'_>,
    context: &dyn ExecutionContext,
    limits: ValidationLimits,
    resolver: &mut dyn FieldResolver,
) -> ExecutionResult<'static> {
    match prepare(schema, request, limits) {
        Ok(prepared) => prepared.execute(context, resolver),
        Err(errors) => ExecutionResult::from_errors(errors),
    }
}

impl<'a> PreparedOperation<'a> {
    #[inline]
    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    /// Walk the selection strictly sequentially: the resolver returns before
    /// the next field is visited.
    pub fn execute(&self, context: &dyn ExecutionContext, resolver: &mut dyn FieldResolver) -> ExecutionResult<'static> {
        let operation = match select_operation(&self.document, self.operation_name.as_deref()) {
            Ok(operation) => operation,
            Err(err) => return ExecutionResult::from_errors(vec![err]),
        };
        let Some(root_type) = self.schema.root_type(operation.node.ty) else {
            return ExecutionResult::from_errors(vec![ExecutionError::new(format!(
                "Schema is not configured for {}s.",
                operation_keyword(operation.node.ty)
            ))
            .with_locations([operation.pos])]);
        };

        let mut state = ExecutorState {
            schema: self.schema,
            fragments: &self.document.fragments,
            variables: &self.variables,
            operation: operation.node.ty,
            context,
            resolver,
            errors: Vec::new(),
            reported: HashSet::new(),
            path: Vec::new(),
        };
        let data = state.execute_selection_set(root_type, self.root_value, &[&operation.node.selection_set.node]);
        ExecutionResult::new(Some(data.unwrap_or(ConstValue::Null)), state.errors)
    }
}

/// Every spread of a fragment the document does not define, reported once.
fn unknown_fragments(document: &ExecutableDocument) -> Vec<ExecutionError> {
    fn walk(document: &ExecutableDocument, selection_set: &SelectionSet, errors: &mut Vec<ExecutionError>) {
        for selection in &selection_set.items {
            match &selection.node {
                Selection::Field(field) => walk(document, &field.node.selection_set.node, errors),
                Selection::InlineFragment(inline_fragment) => {
                    walk(document, &inline_fragment.node.selection_set.node, errors)
                },
                Selection::FragmentSpread(fragment_spread) => {
                    let name = &fragment_spread.node.fragment_name.node;
                    if !document.fragments.contains_key(name) {
                        errors.push(
                            ExecutionError::new(format!("Unknown fragment \"{name}\".")).with_locations([fragment_spread.pos]),
                        );
                    }
                },
            }
        }
    }

    let mut errors = Vec::new();
    for (_, operation) in document.operations.iter() {
        walk(document, &operation.node.selection_set.node, &mut errors);
    }
    for fragment in document.fragments.values() {
        walk(document, &fragment.node.selection_set.node, &mut errors);
    }
    errors
}

fn select_operation<'d>(
    document: &'d ExecutableDocument,
    operation_name: Option<&str>,
) -> Result<&'d Positioned<OperationDefinition>, ExecutionError> {
    let unknown = |name: &str| ExecutionError::new(format!("Unknown operation named \"{name}\"."));
    match (&document.operations, operation_name) {
        (DocumentOperations::Single(operation), None) => Ok(operation),
        (DocumentOperations::Single(_), Some(name)) => Err(unknown(name)),
        (DocumentOperations::Multiple(operations), Some(name)) => operations.get(name).ok_or_else(|| unknown(name)),
        (DocumentOperations::Multiple(operations), None) if operations.len() == 1 => operations
            .values()
            .next()
            .ok_or_else(|| ExecutionError::new("Must provide an operation.")),
        (DocumentOperations::Multiple(_), None) => Err(ExecutionError::new(
            "Must provide operation name if query contains multiple operations.",
        )),
    }
}

fn coerce_variables(
    schema: &Schema,
    operation: &OperationDefinition,
    provided: &Variables,
) -> Result<Variables, Vec<ExecutionError>> {
    let mut coerced = IndexMap::new();
    let mut errors = Vec::new();

    for definition in &operation.variable_definitions {
        let name = &definition.node.name.node;
        let var_type = &definition.node.var_type.node;
        let value = provided
            .get(name)
            .cloned()
            .or_else(|| definition.node.default_value.as_ref().map(|value| value.node.clone()));

        match value {
            None | Some(ConstValue::Null) if !var_type.nullable => errors.push(
                ExecutionError::new(format!(
                    "Variable \"${name}\" of required type \"{var_type}\" was not provided."
                ))
                .with_locations([definition.pos]),
            ),
            None => {},
            Some(value) => match parse_variable(schema, var_type, value) {
                Ok(value) => {
                    coerced.insert(name.clone(), value);
                },
                Err(err) => errors.push(
                    ExecutionError::new(format!("Variable \"${name}\" got invalid value; {err}"))
                        .with_locations([definition.pos]),
                ),
            },
        }
    }

    if errors.is_empty() {
        Ok(Variables::from_value(ConstValue::Object(coerced)))
    } else {
        Err(errors)
    }
}

fn parse_variable(schema: &Schema, ty: &Type, value: ConstValue) -> FieldResult<ConstValue> {
    if matches!(value, ConstValue::Null) {
        return if ty.nullable {
            Ok(ConstValue::Null)
        } else {
            Err(FieldError::new(format!("Expected non-nullable type \"{ty}\" not to be null.")))
        };
    }
    match (&ty.base, value) {
        (BaseType::List(inner), ConstValue::List(items)) => items
            .into_iter()
            .map(|item| parse_variable(schema, inner, item))
            .collect::<FieldResult<Vec<_>>>()
            .map(ConstValue::List),
        (BaseType::List(inner), value) => parse_variable(schema, inner, value).map(|value| ConstValue::List(vec![value])),
        (BaseType::Named(name), value) => match schema.scalar(name) {
            Some(codec) => Ok(codec.parse_value(value)?),
            None => Ok(value),
        },
    }
}

#[inline]
fn is_null(value: &ConstValue) -> bool {
    matches!(value, ConstValue::Null)
}

/// What completing a field's value needs to know about the field.
struct FieldFrame<'e> {
    parent_type: &'e str,
    meta_field: &'e MetaField,
    selection_sets: Vec<&'e SelectionSet>,
    pos: Pos,
}

struct ExecutorState<'e, 'r> {
    schema: &'e Schema,
    fragments: &'e HashMap<Name, Positioned<FragmentDefinition>>,
    variables: &'e Variables,
    operation: OperationType,
    context: &'e dyn ExecutionContext,
    resolver: &'r mut dyn FieldResolver,
    errors: Vec<ExecutionError>,
    /// Directives already reported as invalid; a selection set under a list
    /// is collected once per item.
    reported: HashSet<Pos>,
    path: Vec<PathSegment>,
}

impl<'e, 'r> ExecutorState<'e, 'r> {
    /// `None` when a null landed in a non-null field and must bubble up to the
    /// nearest nullable parent.
    fn execute_selection_set(
        &mut self,
        object_type: &'e MetaType,
        parent: &ConstValue,
        selection_sets: &[&'e SelectionSet],
    ) -> Option<ConstValue> {
        let mut grouped: IndexMap<&'e str, Vec<&'e Positioned<Field>>> = IndexMap::new();
        let mut visited = HashSet::new();
        for selection_set in selection_sets {
            self.collect_fields(object_type, selection_set, &mut grouped, &mut visited);
        }

        let mut object = IndexMap::with_capacity(grouped.len());
        for (response_key, fields) in grouped {
            let field = fields[0];
            let field_name = field.node.name.node.as_str();
            self.path.push(PathSegment::Field(response_key.to_string()));

            let completed = if field_name == "__typename" {
                Some(ConstValue::String(object_type.name.to_string()))
            } else if let Some(meta_field) = object_type.field_by_name(field_name) {
                let value = self.execute_field(object_type, meta_field, parent, &fields);
                (!is_null(&value) || !meta_field.ty.is_non_null()).then_some(value)
            } else {
                self.errors.push(
                    ExecutionError::new(format!(
                        "Cannot query field \"{field_name}\" on type \"{}\".",
                        object_type.name
                    ))
                    .with_locations([field.pos])
                    .with_path(self.path.clone()),
                );
                Some(ConstValue::Null)
            };

            self.path.pop();
            object.insert(Name::new(response_key), completed?);
        }
        Some(ConstValue::Object(object))
    }

    fn collect_fields(
        &mut self,
        object_type: &'e MetaType,
        selection_set: &'e SelectionSet,
        grouped: &mut IndexMap<&'e str, Vec<&'e Positioned<Field>>>,
        visited: &mut HashSet<&'e str>,
    ) {
        for selection in &selection_set.items {
            match &selection.node {
                Selection::Field(field) => {
                    if self.should_include(&field.node.directives) {
                        grouped
                            .entry(field.node.response_key().node.as_str())
                            .or_default()
                            .push(field);
                    }
                },
                Selection::InlineFragment(inline_fragment) => {
                    let applies = inline_fragment
                        .node
                        .type_condition
                        .as_ref()
                        .map_or(true, |condition| condition.node.on.node == object_type.name);
                    if applies && self.should_include(&inline_fragment.node.directives) {
                        self.collect_fields(object_type, &inline_fragment.node.selection_set.node, grouped, visited);
                    }
                },
                Selection::FragmentSpread(fragment_spread) => {
                    let name = fragment_spread.node.fragment_name.node.as_str();
                    if visited.contains(name) || !self.should_include(&fragment_spread.node.directives) {
                        continue;
                    }
                    let Some(fragment) = self.fragments.get(name) else {
                        continue;
                    };
                    if fragment.node.type_condition.node.on.node != object_type.name {
                        continue;
                    }
                    visited.insert(name);
                    self.collect_fields(object_type, &fragment.node.selection_set.node, grouped, visited);
                },
            }
        }
    }

    /// Evaluates `@skip(if:)` and `@include(if:)`.
    fn should_include(&mut self, directives: &[Positioned<Directive>]) -> bool {
        for directive in directives {
            let name = directive.node.name.node.as_str();
            let include = match name {
                "skip" => false,
                "include" => true,
                _ => continue,
            };
            let condition = directive
                .node
                .arguments
                .iter()
                .find(|(arg, _)| arg.node.as_str() == "if")
                .map(|(_, value)| self.const_value(&value.node));
            match condition {
                Some(ConstValue::Boolean(condition)) if condition != include => return false,
                Some(ConstValue::Boolean(_)) => {},
                _ => {
                    if self.reported.insert(directive.pos) {
                        self.errors.push(
                            ExecutionError::new(format!("Directive \"@{name}\" argument \"if\" must be a Boolean."))
                                .with_locations([directive.pos]),
                        );
                    }
                    return false;
                },
            }
        }
        true
    }

    fn const_value(&self, value: &Value) -> ConstValue {
        value
            .clone()
            .into_const_with(|name| Ok::<_, Infallible>(self.variables.get(&name).cloned().unwrap_or(ConstValue::Null)))
            .unwrap_or_else(|never| match never {})
    }

    fn execute_field(
        &mut self,
        object_type: &'e MetaType,
        meta_field: &'e MetaField,
        parent: &ConstValue,
        fields: &[&'e Positioned<Field>],
    ) -> ConstValue {
        let field = fields[0];
        let args = match self.coerce_arguments(object_type, meta_field, &field.node) {
            Ok(args) => args,
            Err(err) => {
                self.errors
                    .push(ExecutionError::from_field_error(err, field.pos, self.path.clone()));
                return ConstValue::Null;
            },
        };

        let node = TraversalNode {
            field_name: meta_field.name.as_str(),
            response_key: field.node.response_key().node.as_str(),
            parent_type: object_type.name.as_str(),
            operation: self.operation,
            path: &self.path,
            has_selection_set: fields.iter().any(|f| !f.node.selection_set.node.items.is_empty()),
            return_type: &meta_field.ty,
        };
        tracing::trace!(path = %node.dotted_path(), "Resolving field.");

        match self.resolver.resolve_field(parent, &args, self.context, &node) {
            Ok(value) => {
                let frame = FieldFrame {
                    parent_type: object_type.name.as_str(),
                    meta_field,
                    selection_sets: fields.iter().map(|f| &f.node.selection_set.node).collect(),
                    pos: field.pos,
                };
                self.complete_value(&frame, &meta_field.ty, value)
            },
            Err(err) => {
                self.errors
                    .push(ExecutionError::from_field_error(err, field.pos, self.path.clone()));
                ConstValue::Null
            },
        }
    }

    fn complete_value(&mut self, frame: &FieldFrame<'e>, ty: &'e TypeRef, value: ConstValue) -> ConstValue {
        match ty {
            TypeRef::NonNull(inner) => {
                let errors = self.errors.len();
                let completed = self.complete_value(frame, inner, value);
                if is_null(&completed) && self.errors.len() == errors {
                    self.errors.push(
                        ExecutionError::new(format!(
                            "Cannot return null for non-nullable field {}.{}.",
                            frame.parent_type, frame.meta_field.name
                        ))
                        .with_locations([frame.pos])
                        .with_path(self.path.clone()),
                    );
                }
                completed
            },
            TypeRef::List(inner) => match value {
                ConstValue::Null => ConstValue::Null,
                ConstValue::List(items) => {
                    let mut completed = Vec::with_capacity(items.len());
                    for (idx, item) in items.into_iter().enumerate() {
                        self.path.push(PathSegment::Index(idx));
                        let item = self.complete_value(frame, inner, item);
                        self.path.pop();
                        if is_null(&item) && inner.is_non_null() {
                            return ConstValue::Null;
                        }
                        completed.push(item);
                    }
                    ConstValue::List(completed)
                },
                _ => {
                    self.errors.push(
                        ExecutionError::new(format!(
                            "Expected a list for field {}.{}.",
                            frame.parent_type, frame.meta_field.name
                        ))
                        .with_locations([frame.pos])
                        .with_path(self.path.clone()),
                    );
                    ConstValue::Null
                },
            },
            TypeRef::Named(name) => {
                if is_null(&value) {
                    return ConstValue::Null;
                }
                let schema = self.schema;
                if let Some(object_type) = schema.object(name) {
                    if frame.selection_sets.iter().all(|set| set.items.is_empty()) {
                        self.errors.push(
                            ExecutionError::new(format!(
                                "Field \"{}\" of type \"{}\" must have a selection of subfields.",
                                frame.meta_field.name, ty
                            ))
                            .with_locations([frame.pos])
                            .with_path(self.path.clone()),
                        );
                        return ConstValue::Null;
                    }
                    return self
                        .execute_selection_set(object_type, &value, &frame.selection_sets)
                        .unwrap_or(ConstValue::Null);
                }
                match schema.scalar(name) {
                    Some(codec) => codec.serialize(value).unwrap_or_else(|err| {
                        self.errors.push(ExecutionError::from_field_error(
                            err.into(),
                            frame.pos,
                            self.path.clone(),
                        ));
                        ConstValue::Null
                    }),
                    None => value,
                }
            },
        }
    }

    fn coerce_arguments(
        &self,
        object_type: &MetaType,
        meta_field: &MetaField,
        field: &Field,
    ) -> FieldResult<IndexMap<Name, ConstValue>> {
        let mut args = IndexMap::new();
        for (name, value) in &field.arguments {
            let Some(definition) = meta_field.arguments.get(name.node.as_str()) else {
                return Err(FieldError::new(format!(
                    "Unknown argument \"{}\" on field \"{}.{}\".",
                    name.node, object_type.name, meta_field.name
                )));
            };
            let is_variable = matches!(value.node, Value::Variable(_));
            let mut coerced = self.const_value(&value.node);
            // variables were coerced once, up front
            if !is_variable {
                coerced = self.parse_literal(&definition.ty, coerced)?;
            }
            args.insert(name.node.clone(), coerced);
        }

        for (name, definition) in &meta_field.arguments {
            if args.contains_key(name) {
                continue;
            }
            match &definition.default_value {
                Some(default_value) => {
                    args.insert(name.clone(), default_value.clone());
                },
                None if definition.ty.is_non_null() => {
                    return Err(FieldError::new(format!(
                        "Field \"{}\" argument \"{}\" of type \"{}\" is required but not provided.",
                        meta_field.name, name, definition.ty
                    )));
                },
                None => {},
            }
        }
        Ok(args)
    }

    fn parse_literal(&self, ty: &TypeRef, value: ConstValue) -> FieldResult<ConstValue> {
        match (ty, value) {
            (TypeRef::NonNull(_), ConstValue::Null) => Err(FieldError::new(format!(
                "Expected non-nullable type \"{ty}\" not to be null."
            ))),
            (_, ConstValue::Null) => Ok(ConstValue::Null),
            (TypeRef::NonNull(inner), value) => self.parse_literal(inner, value),
            (TypeRef::List(inner), ConstValue::List(items)) => items
                .into_iter()
                .map(|item| self.parse_literal(inner, item))
                .collect::<FieldResult<Vec<_>>>()
                .map(ConstValue::List),
            (TypeRef::List(inner), value) => self.parse_literal(inner, value).map(|value| ConstValue::List(vec![value])),
            (TypeRef::Named(name), value) => match self.schema.scalar(name) {
                Some(codec) => Ok(codec.parse_literal(&value)?),
                None => Ok(value),
            },
        }
    }
}
