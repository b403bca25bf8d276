#![forbid(unsafe_code)]

mod error;
mod executor;
mod request;
mod response;

pub use error::ExecutionError;
pub use executor::{
    default_field_resolver,
    execute,
    prepare,
    DefaultFieldResolver,
    ExecutionRequest,
    FieldResolver,
    PreparedOperation,
};
pub use request::Request;
pub use response::{ErrorExtensions, ExecutionResult, FormattedError, Location, Response};
pub use rolegate_validation::ValidationLimits;
