use std::{
    collections::HashSet,
    sync::{Arc, Barrier},
    thread,
};

use pretty_assertions::assert_eq;
use rolegate_handler::{
    Gateway,
    GatewayError,
    LogAction,
    MemorySink,
    Request,
    TransportMeta,
    UserContext,
};
use rolegate_schema::{FieldError, MetaField, MetaInputValue, MetaType, TypeRef};
use serde_json::json;
use value::{ConstValue, Variables};

fn user() -> ConstValue {
    ConstValue::from_json(json!({
        "id": "6f1c3a6e-7f0b-4d3e-9a51-0c2f3d7a9b10",
        "email": "jane@example.com",
    }))
    .unwrap()
}

fn gateway(sink: Arc<MemorySink>) -> Gateway {
    Gateway::builder()
        .query(
            MetaType::new("Query")
                .field(MetaField::new("user", TypeRef::named("User")).resolve(|_, _, _, _| Ok(user())))
                .field(MetaField::new("order", TypeRef::named("Order")).resolve(|_, _, _, _| {
                    Ok(ConstValue::from_json(json!({ "number": 42 })).unwrap_or_default())
                })),
        )
        .mutation(
            MetaType::new("Mutation")
                .field(
                    MetaField::new("user", TypeRef::named("UserMutation"))
                        .resolve(|_, _, _, _| Ok(ConstValue::Object(Default::default()))),
                )
                .field(
                    MetaField::new("createUser", TypeRef::named("User"))
                        .argument(MetaInputValue::new("email", TypeRef::named_nn("String")))
                        .resolve(|_, _, _, _| Err(FieldError::extended("Email is taken", "email").with_code(422))),
                ),
        )
        .register(
            MetaType::new("User")
                .field(MetaField::new("id", TypeRef::named_nn("Uuid")))
                .field(MetaField::new("email", TypeRef::named("Email"))),
        )
        .register(MetaType::new("Order").field(MetaField::new("number", TypeRef::named("Int"))))
        .register(
            MetaType::new("UserMutation")
                .field(MetaField::new("create", TypeRef::named("User")).resolve(|_, _, _, _| Ok(user())))
                .field(MetaField::new("delete", TypeRef::named("User")).resolve(|_, _, _, _| Ok(user()))),
        )
        .role_checker(true)
        .sink(sink)
        .finish()
        .unwrap()
}

fn request(query: &str) -> Request {
    Request {
        query: Some(query.to_string()),
        operation_name: None,
        variables: Variables::default(),
    }
}

fn roles(roles: &[&str]) -> UserContext {
    UserContext::new(Some("jane".to_string()), roles.iter().map(ToString::to_string).collect())
}

#[test]
fn authorized_query_reaches_the_resolver() {
    let sink = Arc::new(MemorySink::default());
    let response = gateway(sink.clone())
        .execute(request("{ user { email } }"), &roles(&["query.user"]), TransportMeta::default())
        .unwrap();

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data.unwrap().into_json().unwrap(),
        json!({ "user": { "email": "jane@example.com" } })
    );

    let actions = sink.records().into_iter().map(|record| record.action).collect::<Vec<_>>();
    assert_eq!(actions, vec![LogAction::Start, LogAction::Resolve, LogAction::End]);
}

#[test]
fn sibling_action_is_denied_with_401() {
    let sink = Arc::new(MemorySink::default());
    let response = gateway(sink.clone())
        .execute(
            request("mutation { user { delete { id } } }"),
            &roles(&["mutation.user.create"]),
            TransportMeta::default(),
        )
        .unwrap();

    assert_eq!(
        response.data.unwrap().into_json().unwrap(),
        json!({ "user": { "delete": null } })
    );
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "Permission denied");
    assert_eq!(response.errors[0].extensions.code, Some(401));

    let errors = sink
        .records()
        .into_iter()
        .filter(|record| record.action == LogAction::Error)
        .count();
    assert_eq!(errors, 1);
}

#[test]
fn narrow_role_authorizes_its_own_action() {
    let response = gateway(Arc::new(MemorySink::default()))
        .execute(
            request("mutation { user { create { email } } }"),
            &roles(&["mutation.user.create"]),
            TransportMeta::default(),
        )
        .unwrap();
    assert!(response.errors.is_empty(), "{:?}", response.errors);
}

#[test]
fn root_siblings_start_from_a_fresh_path() {
    let response = gateway(Arc::new(MemorySink::default()))
        .execute(
            request("{ user { email } order { number } }"),
            &roles(&["query.order"]),
            TransportMeta::default(),
        )
        .unwrap();

    assert_eq!(
        response.data.unwrap().into_json().unwrap(),
        json!({ "user": null, "order": { "number": 42 } })
    );
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        serde_json::to_value(&response.errors[0].path).unwrap(),
        json!(["user"])
    );
}

#[test]
fn extended_fault_reports_code_and_field() {
    let response = gateway(Arc::new(MemorySink::default()))
        .execute(
            request(r#"mutation { createUser(email: "jane@example.com") { id } }"#),
            &roles(&["mutation"]),
            TransportMeta::default(),
        )
        .unwrap();

    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        serde_json::to_value(&response.errors[0]).unwrap(),
        json!({
            "message": "Email is taken",
            "locations": [{ "line": 1, "column": 12 }],
            "path": ["createUser"],
            "extensions": { "code": 422, "field": "email" },
        })
    );
}

#[test]
fn missing_query_fails_before_execution() {
    let sink = Arc::new(MemorySink::default());
    let err = gateway(sink.clone())
        .execute(Request::default(), &roles(&["query"]), TransportMeta::default())
        .unwrap_err();
    assert!(matches!(err, GatewayError::MissingQuery));

    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].action, LogAction::Start);
    assert_eq!(records[0].query, None);
    assert_eq!(records[1].action, LogAction::Error);
    assert_eq!(records[0].id, records[1].id);

    let text = records[1].error.as_deref().unwrap_or_default();
    assert!(text.starts_with("Message: Query is missing.; File: "), "{text}");
    assert!(text.contains("gateway.rs; Line: "), "{text}");
    assert!(text.ends_with("; Code: 0"), "{text}");
}

#[test]
fn context_without_roles_is_a_configuration_fault() {
    let err = gateway(Arc::new(MemorySink::default()))
        .execute(request("{ user { email } }"), &(), TransportMeta::default())
        .unwrap_err();
    assert!(matches!(err, GatewayError::RolesUnavailable));
}

#[test]
fn gateway_without_roots_has_no_schema() {
    let gateway = Gateway::builder().sink(Arc::new(MemorySink::default())).finish().unwrap();
    let err = gateway
        .execute(request("{ user { email } }"), &(), TransportMeta::default())
        .unwrap_err();
    assert!(matches!(err, GatewayError::SchemaNotSet));
}

#[test]
fn disabled_role_checker_ignores_roles() {
    let gateway = Gateway::builder()
        .query(MetaType::new("Query").field(MetaField::new("user", TypeRef::named("User")).resolve(|_, _, _, _| Ok(user()))))
        .register(MetaType::new("User").field(MetaField::new("email", TypeRef::named("Email"))))
        .sink(Arc::new(MemorySink::default()))
        .finish()
        .unwrap();
    let response = gateway
        .execute(request("{ user { email } }"), &(), TransportMeta::default())
        .unwrap();
    assert!(response.errors.is_empty(), "{:?}", response.errors);
}

#[test]
fn depth_limit_rejects_before_any_resolver_runs() {
    let sink = Arc::new(MemorySink::default());
    let gateway = Gateway::builder()
        .query(MetaType::new("Query").field(
            MetaField::new("user", TypeRef::named("User")).resolve(|_, _, _, _| panic!("resolver must not run")),
        ))
        .register(MetaType::new("User").field(MetaField::new("email", TypeRef::named("Email"))))
        .max_query_depth(0)
        .sink(sink.clone())
        .finish()
        .unwrap();
    let response = gateway
        .execute(request("{ user { email } }"), &(), TransportMeta::default())
        .unwrap();

    assert!(response.data.is_none());
    assert_eq!(response.errors[0].message, "Max query depth should be 0 but got 1.");
    assert!(sink.records().iter().all(|record| record.action != LogAction::Resolve));
}

#[test]
fn records_share_the_request_id_and_transport_meta() {
    let sink = Arc::new(MemorySink::default());
    let meta = TransportMeta {
        remote_addr: Some("127.0.0.1:40000".to_string()),
        auth_user: Some("jane".to_string()),
        correlation_id: Some("req-1".to_string()),
        foreign_service_user: None,
    };
    let gateway = gateway(sink.clone());
    gateway
        .execute(request("{ user { email } }"), &roles(&["query"]), meta.clone())
        .unwrap();
    gateway
        .execute(request("{ user { email } }"), &roles(&["query"]), meta)
        .unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 6);
    assert!(records[..3].iter().all(|record| record.id == records[0].id));
    assert_ne!(records[0].id, records[3].id);
    assert!(records
        .iter()
        .all(|record| record.correlation_id.as_deref() == Some("req-1") && record.auth_user.as_deref() == Some("jane")));

    let end = &records[2];
    assert_eq!(end.action, LogAction::End);
    assert_eq!(end.query.as_deref(), Some("{ user { email } }"));
    assert_eq!(
        end.result.as_deref(),
        Some(r#"{"data":{"user":{"email":"jane@example.com"}}}"#)
    );
}

#[test]
fn concurrent_requests_keep_their_own_path_and_id() {
    const THREADS: usize = 4;
    let barrier = Arc::new(Barrier::new(THREADS));
    let sink = Arc::new(MemorySink::default());
    let gateway = Arc::new(
        Gateway::builder()
            .query(
                MetaType::new("Query")
                    .field(MetaField::new("user", TypeRef::named("User")).resolve({
                        let barrier = barrier.clone();
                        move |_, _, _, _| {
                            barrier.wait();
                            Ok(user())
                        }
                    }))
                    .field(MetaField::new("order", TypeRef::named("Order")).resolve({
                        let barrier = barrier.clone();
                        move |_, _, _, _| {
                            barrier.wait();
                            Ok(ConstValue::from_json(json!({ "number": 42 })).unwrap_or_default())
                        }
                    })),
            )
            .register(MetaType::new("User").field(MetaField::new("email", TypeRef::named("Email"))))
            .register(MetaType::new("Order").field(MetaField::new("number", TypeRef::named("Int"))))
            .role_checker(true)
            .sink(sink.clone())
            .finish()
            .unwrap(),
    );

    let handles = (0..THREADS)
        .map(|n| {
            let gateway = gateway.clone();
            thread::spawn(move || {
                let role = if n % 2 == 0 { "query.user" } else { "query.order" };
                let meta = TransportMeta {
                    correlation_id: Some(format!("thread-{n}")),
                    ..TransportMeta::default()
                };
                let response = gateway
                    .execute(request("{ user { email } order { number } }"), &roles(&[role]), meta)
                    .unwrap();
                (n, response)
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        let (n, response) = handle.join().unwrap();
        let (data, denied) = if n % 2 == 0 {
            (json!({ "user": { "email": "jane@example.com" }, "order": null }), json!(["order"]))
        } else {
            (json!({ "user": null, "order": { "number": 42 } }), json!(["user"]))
        };
        assert_eq!(response.data.unwrap().into_json().unwrap(), data);
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].extensions.code, Some(401));
        assert_eq!(serde_json::to_value(&response.errors[0].path).unwrap(), denied);
    }

    let records = sink.records();
    let mut ids = HashSet::new();
    for n in 0..THREADS {
        let correlation_id = format!("thread-{n}");
        let own = records
            .iter()
            .filter(|record| record.correlation_id.as_deref() == Some(correlation_id.as_str()))
            .map(|record| record.id.clone())
            .collect::<HashSet<_>>();
        assert_eq!(own.len(), 1, "{correlation_id} records carry {own:?}");
        ids.extend(own);
    }
    assert_eq!(ids.len(), THREADS);
}
