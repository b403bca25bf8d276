mod max_complexity;
mod max_depth;
mod single_field_subscriptions;

pub use max_complexity::MaxComplexity;
pub use max_depth::MaxDepth;
pub use single_field_subscriptions::SingleFieldSubscriptions;
