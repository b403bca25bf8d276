use std::{
    collections::HashMap,
    fmt::{self, Debug, Display, Formatter},
    sync::Arc,
};

use indexmap::IndexMap;
use parser::types::OperationType;
use tracing::instrument;
use value::{ConstValue, Name};

use crate::{
    scalars::{self, ScalarCodec},
    ExecutionContext,
    FieldResult,
    SchemaError,
    TraversalNode,
};

const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Reference to a type from a field or an argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(Name),
    NonNull(Box<TypeRef>),
    List(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl AsRef<str>) -> Self {
        TypeRef::Named(Name::new(name))
    }

    pub fn named_nn(name: impl AsRef<str>) -> Self {
        TypeRef::NonNull(Box::new(Self::named(name)))
    }

    pub fn named_list(name: impl AsRef<str>) -> Self {
        TypeRef::List(Box::new(Self::named(name)))
    }

    pub fn named_nn_list_nn(name: impl AsRef<str>) -> Self {
        TypeRef::NonNull(Box::new(TypeRef::List(Box::new(Self::named_nn(name)))))
    }

    /// The innermost named type, with list and non-null wrappers removed.
    pub fn type_name(&self) -> &str {
        match self {
            TypeRef::Named(name) => name.as_str(),
            TypeRef::NonNull(inner) | TypeRef::List(inner) => inner.type_name(),
        }
    }

    #[inline]
    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    /// The type with one non-null wrapper removed.
    pub fn nullable(&self) -> &TypeRef {
        match self {
            TypeRef::NonNull(inner) => inner,
            other => other,
        }
    }
}

impl Display for TypeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
            TypeRef::List(inner) => write!(f, "[{inner}]"),
        }
    }
}

pub type ResolverFn = dyn Fn(&ConstValue, &IndexMap<Name, ConstValue>, &dyn ExecutionContext, &TraversalNode<'_>) -> FieldResult<ConstValue>
    + Send
    + Sync;

/// A field-specific resolver, registered at schema assembly time.
#[derive(Clone)]
pub struct Resolver {
    name: String,
    func: Arc<ResolverFn>,
}

impl Resolver {
    /// `resolve` followed by the field name with its first letter capitalized.
    pub fn method_name(field_name: &str) -> String {
        let mut chars = field_name.chars();
        match chars.next() {
            Some(first) => format!("resolve{}{}", first.to_uppercase(), chars.as_str()),
            None => "resolve".to_string(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(
        &self,
        parent: &ConstValue,
        args: &IndexMap<Name, ConstValue>,
        ctx: &dyn ExecutionContext,
        node: &TraversalNode<'_>,
    ) -> FieldResult<ConstValue> {
        (self.func)(parent, args, ctx, node)
    }
}

impl Debug for Resolver {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone)]
pub struct MetaInputValue {
    pub description: Option<String>,
    pub name: Name,
    pub ty: TypeRef,
    pub default_value: Option<ConstValue>,
}

impl MetaInputValue {
    pub fn new(name: impl AsRef<str>, ty: TypeRef) -> Self {
        Self {
            description: None,
            name: Name::new(name),
            ty,
            default_value: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: ConstValue) -> Self {
        self.default_value = Some(value);
        self
    }
}

#[derive(Debug, Clone)]
pub struct MetaField {
    pub description: Option<String>,
    pub name: Name,
    pub arguments: IndexMap<Name, MetaInputValue>,
    pub ty: TypeRef,
    resolver: Option<Resolver>,
}

impl MetaField {
    pub fn new(name: impl AsRef<str>, ty: TypeRef) -> Self {
        Self {
            description: None,
            name: Name::new(name),
            arguments: IndexMap::new(),
            ty,
            resolver: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn argument(mut self, argument: MetaInputValue) -> Self {
        self.arguments.insert(argument.name.clone(), argument);
        self
    }

    /// Attach a field-specific resolver. Fields without one are extracted from
    /// the parent value by name.
    #[must_use]
    pub fn resolve<F>(mut self, f: F) -> Self
    where
        F: Fn(&ConstValue, &IndexMap<Name, ConstValue>, &dyn ExecutionContext, &TraversalNode<'_>) -> FieldResult<ConstValue>
            + Send
            + Sync
            + 'static,
    {
        self.resolver = Some(Resolver {
            name: Resolver::method_name(&self.name),
            func: Arc::new(f),
        });
        self
    }
}

/// An object type: the only composite kind this engine knows.
#[derive(Debug, Clone)]
pub struct MetaType {
    pub description: Option<String>,
    pub name: Name,
    pub fields: IndexMap<Name, MetaField>,
}

impl MetaType {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            description: None,
            name: Name::new(name),
            fields: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: MetaField) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    #[inline]
    pub fn field_by_name(&self, name: &str) -> Option<&MetaField> {
        self.fields.get(name)
    }
}

/// `(parentType, field) -> resolver`, looked up by the dispatcher.
#[derive(Debug, Default, Clone)]
pub struct ResolverRegistry(HashMap<String, HashMap<String, Resolver>>);

impl ResolverRegistry {
    pub fn insert(&mut self, parent_type: &str, field_name: &str, resolver: Resolver) {
        self.0
            .entry(parent_type.to_string())
            .or_default()
            .insert(field_name.to_string(), resolver);
    }

    #[inline]
    pub fn get(&self, parent_type: &str, field_name: &str) -> Option<&Resolver> {
        self.0.get(parent_type)?.get(field_name)
    }

    pub fn len(&self) -> usize {
        self.0.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Schema {
    pub query_type: Option<Name>,
    pub mutation_type: Option<Name>,
    pub subscription_type: Option<Name>,
    pub types: IndexMap<Name, MetaType>,
    scalars: HashMap<String, Arc<dyn ScalarCodec>>,
    resolvers: ResolverRegistry,
}

impl Debug for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("query_type", &self.query_type)
            .field("mutation_type", &self.mutation_type)
            .field("subscription_type", &self.subscription_type)
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("scalars", &self.scalars.keys().collect::<Vec<_>>())
            .field("resolvers", &self.resolvers.len())
            .finish()
    }
}

impl Schema {
    pub fn build() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn root_type(&self, operation: OperationType) -> Option<&MetaType> {
        let name = match operation {
            OperationType::Query => self.query_type.as_ref(),
            OperationType::Mutation => self.mutation_type.as_ref(),
            OperationType::Subscription => self.subscription_type.as_ref(),
        }?;
        self.types.get(name)
    }

    #[inline]
    pub fn object(&self, name: &str) -> Option<&MetaType> {
        self.types.get(name)
    }

    #[inline]
    pub fn is_object(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    #[inline]
    pub fn scalar(&self, name: &str) -> Option<&dyn ScalarCodec> {
        self.scalars.get(name).map(|codec| codec.as_ref())
    }

    #[inline]
    pub fn resolver(&self, parent_type: &str, field_name: &str) -> Option<&Resolver> {
        self.resolvers.get(parent_type, field_name)
    }

    #[inline]
    pub fn resolvers(&self) -> &ResolverRegistry {
        &self.resolvers
    }

    fn is_known(&self, name: &str) -> bool {
        BUILTIN_SCALARS.contains(&name) || self.is_object(name) || self.scalars.contains_key(name)
    }
}

/// Assembles root and auxiliary object types plus scalar codecs into a
/// [`Schema`]. The standard scalars are registered up front.
pub struct SchemaBuilder {
    query: Option<MetaType>,
    mutation: Option<MetaType>,
    subscription: Option<MetaType>,
    types: Vec<MetaType>,
    scalars: Vec<Arc<dyn ScalarCodec>>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self {
            query: None,
            mutation: None,
            subscription: None,
            types: Vec::new(),
            scalars: scalars::standard(),
        }
    }
}

impl SchemaBuilder {
    #[must_use]
    pub fn query(mut self, ty: MetaType) -> Self {
        self.query = Some(ty);
        self
    }

    #[must_use]
    pub fn mutation(mut self, ty: MetaType) -> Self {
        self.mutation = Some(ty);
        self
    }

    #[must_use]
    pub fn subscription(mut self, ty: MetaType) -> Self {
        self.subscription = Some(ty);
        self
    }

    #[must_use]
    pub fn register(mut self, ty: MetaType) -> Self {
        self.types.push(ty);
        self
    }

    #[must_use]
    pub fn scalar(mut self, codec: impl ScalarCodec + 'static) -> Self {
        self.scalars.push(Arc::new(codec));
        self
    }

    /// Whether any root operation type has been set.
    pub fn has_root(&self) -> bool {
        self.query.is_some() || self.mutation.is_some() || self.subscription.is_some()
    }

    #[instrument(skip(self), err, level = "debug")]
    pub fn finish(self) -> Result<Schema, SchemaError> {
        let mut schema = Schema {
            query_type: self.query.as_ref().map(|ty| ty.name.clone()),
            mutation_type: self.mutation.as_ref().map(|ty| ty.name.clone()),
            subscription_type: self.subscription.as_ref().map(|ty| ty.name.clone()),
            types: IndexMap::new(),
            scalars: HashMap::new(),
            resolvers: ResolverRegistry::default(),
        };

        let all_types = [self.query, self.mutation, self.subscription]
            .into_iter()
            .flatten()
            .chain(self.types);
        for mut ty in all_types {
            if ty.fields.is_empty() {
                return Err(SchemaError::EmptyObject {
                    type_name: ty.name.to_string(),
                });
            }
            for field in ty.fields.values_mut() {
                if let Some(resolver) = field.resolver.take() {
                    schema.resolvers.insert(&ty.name, &field.name, resolver);
                }
            }
            if schema.types.contains_key(&ty.name) {
                return Err(SchemaError::DuplicateType {
                    type_name: ty.name.to_string(),
                });
            }
            schema.types.insert(ty.name.clone(), ty);
        }

        for codec in self.scalars {
            let name = codec.name().to_string();
            if BUILTIN_SCALARS.contains(&name.as_str()) || schema.is_object(&name) {
                return Err(SchemaError::ScalarConflict { name });
            }
            schema.scalars.insert(name, codec);
        }

        for ty in schema.types.values() {
            for field in ty.fields.values() {
                let referenced = field.ty.type_name();
                if !schema.is_known(referenced) {
                    return Err(SchemaError::UnknownType {
                        type_name: ty.name.to_string(),
                        field_name: field.name.to_string(),
                        referenced: referenced.to_string(),
                    });
                }
                for argument in field.arguments.values() {
                    let referenced = argument.ty.type_name();
                    if schema.is_object(referenced) {
                        return Err(SchemaError::ArgumentNotInput {
                            type_name: ty.name.to_string(),
                            field_name: field.name.to_string(),
                            argument: argument.name.to_string(),
                            referenced: referenced.to_string(),
                        });
                    }
                    if !schema.is_known(referenced) {
                        return Err(SchemaError::UnknownType {
                            type_name: ty.name.to_string(),
                            field_name: field.name.to_string(),
                            referenced: referenced.to_string(),
                        });
                    }
                }
            }
        }

        tracing::debug!(
            types = schema.types.len(),
            resolvers = schema.resolvers.len(),
            "Schema assembled."
        );
        Ok(schema)
    }
}
