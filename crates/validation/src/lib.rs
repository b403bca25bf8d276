#![forbid(unsafe_code)]

#[cfg(test)]
#[macro_use]
mod test_harness;

mod error;
mod rules;
mod visitor;

pub use error::RuleError;
use parser::types::ExecutableDocument;
pub use rules::{MaxComplexity, MaxDepth, SingleFieldSubscriptions};
pub use visitor::{visit, Visitor, VisitorCons, VisitorContext, VisitorNil};

/// Limits installed as validation rules before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationLimits {
    pub max_complexity: Option<usize>,
    pub max_depth: Option<usize>,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_complexity: Some(100),
            max_depth: Some(10),
        }
    }
}

pub fn check_rules(document: &ExecutableDocument, limits: ValidationLimits) -> Vec<RuleError> {
    let mut ctx = VisitorContext::new(document);
    // the last rule added runs first
    let mut visitor = VisitorNil
        .with(MaxDepth::new(limits.max_depth))
        .with(MaxComplexity::new(limits.max_complexity))
        .with(SingleFieldSubscriptions);
    visit(&mut visitor, &mut ctx, document);
    ctx.errors
}
