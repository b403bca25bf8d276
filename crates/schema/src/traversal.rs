use std::fmt::{self, Display, Formatter};

use parser::types::OperationType;
use serde::{Serialize, Serializer};

use crate::TypeRef;

/// One step of a response path: a response key, or a position inside a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl PathSegment {
    #[inline]
    pub fn is_field(&self) -> bool {
        matches!(self, PathSegment::Field(_))
    }
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => f.write_str(name),
            PathSegment::Index(idx) => write!(f, "{idx}"),
        }
    }
}

impl Serialize for PathSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PathSegment::Field(name) => serializer.serialize_str(name),
            PathSegment::Index(idx) => serializer.serialize_u64(*idx as u64),
        }
    }
}

/// Lower-case keyword of an operation kind, as written in a query document.
pub fn operation_keyword(ty: OperationType) -> &'static str {
    match ty {
        OperationType::Query => "query",
        OperationType::Mutation => "mutation",
        OperationType::Subscription => "subscription",
    }
}

/// Per-field metadata handed to the resolver callback by the execution engine.
#[derive(Debug, Clone, Copy)]
pub struct TraversalNode<'a> {
    /// Name of the field in the schema.
    pub field_name: &'a str,

    /// Alias if one was given, the field name otherwise.
    pub response_key: &'a str,

    /// Name of the object type the field belongs to.
    pub parent_type: &'a str,

    pub operation: OperationType,

    /// Response path of this field, its own response key included.
    pub path: &'a [PathSegment],

    /// Whether the selection of this field has nested child fields.
    pub has_selection_set: bool,

    pub return_type: &'a TypeRef,
}

impl<'a> TraversalNode<'a> {
    /// Number of named segments in the path, ignoring list positions.
    pub fn named_depth(&self) -> usize {
        self.path.iter().filter(|segment| segment.is_field()).count()
    }

    /// The response path joined with dots, e.g. `users.0.email`.
    pub fn dotted_path(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }

    #[inline]
    pub fn operation_keyword(&self) -> &'static str {
        operation_keyword(self.operation)
    }

    /// Root-level selections sit directly under `Query`, `Mutation` or `Subscription`.
    pub fn is_root_selection(&self) -> bool {
        self.parent_type.to_lowercase() == self.operation_keyword()
    }
}

/// Caller identity, supplied once per request and read-only for the gateway.
pub trait ExecutionContext: Send + Sync {
    /// The caller's granted roles. `None` means this context cannot report
    /// roles at all, which is different from an empty role set.
    fn user_roles(&self) -> Option<&[String]> {
        None
    }

    fn user(&self) -> Option<&str> {
        None
    }
}

impl ExecutionContext for () {}
