#![forbid(unsafe_code)]

mod error;
pub mod scalars;
mod schema;
mod traversal;

pub use error::{FieldError, FieldErrorKind, FieldResult, SchemaError};
pub use scalars::{ScalarCodec, ScalarError};
pub use schema::{
    MetaField,
    MetaInputValue,
    MetaType,
    Resolver,
    ResolverFn,
    ResolverRegistry,
    Schema,
    SchemaBuilder,
    TypeRef,
};
pub use traversal::{operation_keyword, ExecutionContext, PathSegment, TraversalNode};
