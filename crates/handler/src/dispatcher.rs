use std::time::Instant;

use indexmap::IndexMap;
use rolegate_executor::{default_field_resolver, FieldResolver};
use rolegate_schema::{ExecutionContext, FieldResult, Schema, TraversalNode};
use value::{ConstValue, Name};

use crate::{Authorization, LogAction, Metrics, RequestScope};

/// The engine's per-field callback: authorize, then run the registered
/// resolver or fall back to extracting the field from the parent value.
pub struct Dispatcher<'a> {
    schema: &'a Schema,
    scope: &'a RequestScope,
    authorization: Authorization,
    log_all: bool,
    metrics: Option<&'a Metrics>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(schema: &'a Schema, scope: &'a RequestScope, authorization: Authorization) -> Self {
        Self {
            schema,
            scope,
            authorization,
            log_all: false,
            metrics: None,
        }
    }

    /// Emit one `resolve` record per registered resolver call.
    #[must_use]
    pub fn log_all(mut self, log_all: bool) -> Self {
        self.log_all = log_all;
        self
    }

    #[must_use]
    pub fn metrics(mut self, metrics: &'a Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl FieldResolver for Dispatcher<'_> {
    fn resolve_field(
        &mut self,
        parent: &ConstValue,
        args: &IndexMap<Name, ConstValue>,
        ctx: &dyn ExecutionContext,
        node: &TraversalNode<'_>,
    ) -> FieldResult<ConstValue> {
        self.authorization.authorize(node)?;

        let Some(resolver) = self.schema.resolver(node.parent_type, node.field_name) else {
            return Ok(default_field_resolver(parent, node));
        };

        let start = Instant::now();
        let res = resolver.call(parent, args, ctx, node);
        let elapsed = start.elapsed();
        if let Some(metrics) = self.metrics {
            metrics.observe_resolver(node.parent_type, node.field_name, elapsed);
        }
        let value = res?;

        if self.log_all {
            let mut record = self.scope.record(LogAction::Resolve);
            record.query = Some(format!("{}->{}", node.dotted_path(), resolver.name()));
            record.execute_time = Some(elapsed.as_secs_f64());
            record.result = serde_json::to_string(&value).ok();
            self.scope.emit(record);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parser::types::OperationType;
    use rolegate_schema::{FieldError, MetaField, MetaType, PathSegment, TypeRef};
    use serde_json::json;

    use super::*;
    use crate::{MemorySink, TransportMeta, UserContext};

    fn schema() -> Schema {
        Schema::build()
            .query(
                MetaType::new("Query")
                    .field(
                        MetaField::new("programLoyalty", TypeRef::named("Int"))
                            .resolve(|_, _, _, _| Ok(ConstValue::Number(7.into()))),
                    )
                    .field(MetaField::new("plain", TypeRef::named("String")))
                    .field(
                        MetaField::new("broken", TypeRef::named("String"))
                            .resolve(|_, _, _, _| Err(FieldError::new("boom"))),
                    ),
            )
            .finish()
            .unwrap()
    }

    fn call(dispatcher: &mut Dispatcher<'_>, field: &str, parent: &ConstValue) -> FieldResult<ConstValue> {
        let path = [PathSegment::Field(field.to_string())];
        let ty = TypeRef::named("String");
        let node = TraversalNode {
            field_name: field,
            response_key: field,
            parent_type: "Query",
            operation: OperationType::Query,
            path: &path,
            has_selection_set: false,
            return_type: &ty,
        };
        dispatcher.resolve_field(parent, &IndexMap::new(), &(), &node)
    }

    #[test]
    fn registered_resolver_is_timed_and_logged() {
        let schema = schema();
        let sink = Arc::new(MemorySink::default());
        let scope = RequestScope::new(TransportMeta::default(), sink.clone());
        let mut dispatcher = Dispatcher::new(&schema, &scope, Authorization::Disabled).log_all(true);

        let value = call(&mut dispatcher, "programLoyalty", &ConstValue::Null).unwrap();
        assert_eq!(value, ConstValue::Number(7.into()));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, LogAction::Resolve);
        assert_eq!(records[0].id, scope.id());
        assert_eq!(records[0].query.as_deref(), Some("programLoyalty->resolveProgramLoyalty"));
        assert_eq!(records[0].result.as_deref(), Some("7"));
        assert!(records[0].execute_time.is_some());
    }

    #[test]
    fn unregistered_field_falls_back_to_parent_value() {
        let schema = schema();
        let sink = Arc::new(MemorySink::default());
        let scope = RequestScope::new(TransportMeta::default(), sink.clone());
        let mut dispatcher = Dispatcher::new(&schema, &scope, Authorization::Disabled).log_all(true);

        let parent = ConstValue::from_json(json!({ "plain": "text" })).unwrap();
        assert_eq!(
            call(&mut dispatcher, "plain", &parent).unwrap(),
            ConstValue::String("text".to_string())
        );
        assert_eq!(call(&mut dispatcher, "plain", &ConstValue::Null).unwrap(), ConstValue::Null);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn quiet_mode_and_failures_emit_nothing() {
        let schema = schema();
        let sink = Arc::new(MemorySink::default());
        let scope = RequestScope::new(TransportMeta::default(), sink.clone());
        let mut dispatcher = Dispatcher::new(&schema, &scope, Authorization::Disabled);

        call(&mut dispatcher, "programLoyalty", &ConstValue::Null).unwrap();
        assert_eq!(call(&mut dispatcher, "broken", &ConstValue::Null).unwrap_err().message, "boom");
        assert!(sink.records().is_empty());
    }

    #[test]
    fn denied_field_never_reaches_the_resolver() {
        let schema = Schema::build()
            .query(MetaType::new("Query").field(
                MetaField::new("plain", TypeRef::named("String"))
                    .resolve(|_, _, _, _| panic!("resolver must not run")),
            ))
            .finish()
            .unwrap();
        let scope = RequestScope::new(TransportMeta::default(), Arc::new(MemorySink::default()));
        let ctx = UserContext::new(None, vec!["mutation".to_string()]);
        let authorization = Authorization::for_context(true, &ctx).unwrap();
        let mut dispatcher = Dispatcher::new(&schema, &scope, authorization);

        let err = call(&mut dispatcher, "plain", &ConstValue::Null).unwrap_err();
        assert_eq!(err.code(), Some(401));
    }
}
