//! A small in-memory user directory served by the binary.

use rolegate_handler::GatewayBuilder;
use rolegate_schema::{
    scalars::DEFAULT_LANGUAGE,
    FieldError,
    FieldResult,
    MetaField,
    MetaInputValue,
    MetaType,
    TypeRef,
};
use serde_json::json;
use value::{ConstValue, Name};

fn directory() -> FieldResult<Vec<ConstValue>> {
    let users = json!([
        {
            "id": "6f1c3a6e-7f0b-4d3e-9a51-0c2f3d7a9b10",
            "email": "olena@example.com",
            "phone": "380981234567",
            "name": "Olena",
            "lang": "ua",
            "createdAt": "2021-03-14 09:26:53",
            "visits": 12,
        },
        {
            "id": "8d0a4c71-2e55-4b8f-b7a2-13c9e0f4d6aa",
            "email": "ivan@example.com",
            "phone": null,
            "name": "Ivan",
            "lang": "ru",
            "createdAt": "2022-11-02 18:00:00",
            "visits": 0,
        },
    ]);
    match ConstValue::from_json(users).map_err(FieldError::internal)? {
        ConstValue::List(users) => Ok(users),
        _ => Ok(Vec::new()),
    }
}

fn field<'a>(value: &'a ConstValue, name: &str) -> Option<&'a ConstValue> {
    match value {
        ConstValue::Object(object) => object.get(name),
        _ => None,
    }
}

fn find_user(id: &ConstValue) -> FieldResult<Option<ConstValue>> {
    Ok(directory()?.into_iter().find(|user| field(user, "id") == Some(id)))
}

fn user_type() -> MetaType {
    MetaType::new("User")
        .description("A registered user.")
        .field(MetaField::new("id", TypeRef::named_nn("Uuid")))
        .field(MetaField::new("email", TypeRef::named_nn("Email")))
        .field(MetaField::new("phone", TypeRef::named("Phone")))
        .field(MetaField::new("name", TypeRef::named("Varchar")))
        .field(MetaField::new("lang", TypeRef::named_nn("Lang")))
        .field(MetaField::new("createdAt", TypeRef::named("Datetime")))
        .field(MetaField::new("visits", TypeRef::named_nn("UnsignedInteger")))
}

fn query_type() -> MetaType {
    MetaType::new("Query")
        .field(
            MetaField::new("user", TypeRef::named("User"))
                .argument(MetaInputValue::new("id", TypeRef::named_nn("Uuid")))
                .resolve(|_, args, _, _| match args.get("id") {
                    Some(id) => Ok(find_user(id)?.unwrap_or(ConstValue::Null)),
                    None => Ok(ConstValue::Null),
                }),
        )
        .field(
            MetaField::new("users", TypeRef::named_nn_list_nn("User"))
                .argument(MetaInputValue::new("lang", TypeRef::named("Lang")))
                .argument(MetaInputValue::new("first", TypeRef::named("PositiveInt")))
                .resolve(|_, args, _, _| {
                    let lang = match args.get("lang") {
                        Some(ConstValue::Enum(lang)) => Some(lang.as_str().to_string()),
                        _ => None,
                    };
                    let first = match args.get("first") {
                        Some(ConstValue::Number(first)) => first.as_u64().map(|first| first as usize),
                        _ => None,
                    };
                    let users = directory()?
                        .into_iter()
                        .filter(|user| match (&lang, field(user, "lang")) {
                            (Some(lang), Some(ConstValue::String(user_lang))) => user_lang == lang,
                            (Some(_), _) => false,
                            (None, _) => true,
                        })
                        .take(first.unwrap_or(usize::MAX))
                        .collect();
                    Ok(ConstValue::List(users))
                }),
        )
        .field(
            MetaField::new("me", TypeRef::named("String"))
                .description("Subject of the presented token.")
                .resolve(|_, _, ctx, _| Ok(ctx.user().map_or(ConstValue::Null, |user| ConstValue::String(user.to_string())))),
        )
}

fn user_mutation_type() -> MetaType {
    MetaType::new("UserMutation")
        .field(
            MetaField::new("create", TypeRef::named("User"))
                .argument(MetaInputValue::new("email", TypeRef::named_nn("Email")))
                .argument(MetaInputValue::new("phone", TypeRef::named("Phone")))
                .argument(MetaInputValue::new("name", TypeRef::named("Varchar")))
                .argument(
                    MetaInputValue::new("lang", TypeRef::named("Lang"))
                        .default_value(ConstValue::Enum(Name::new(DEFAULT_LANGUAGE))),
                )
                .resolve(|_, args, _, _| {
                    let email = args.get("email").cloned().unwrap_or_default();
                    let taken = directory()?.iter().any(|user| field(user, "email") == Some(&email));
                    if taken {
                        return Err(FieldError::extended("Email is already taken", "email").with_code(422));
                    }
                    let lang = match args.get("lang") {
                        Some(ConstValue::Enum(lang)) => ConstValue::String(lang.to_string()),
                        _ => ConstValue::String(DEFAULT_LANGUAGE.to_string()),
                    };
                    ConstValue::from_json(json!({
                        "id": "00000000-0000-4000-8000-000000000000",
                        "visits": 0,
                    }))
                    .map(|user| match user {
                        ConstValue::Object(mut user) => {
                            user.insert(Name::new("email"), email);
                            user.insert(Name::new("phone"), args.get("phone").cloned().unwrap_or_default());
                            user.insert(Name::new("name"), args.get("name").cloned().unwrap_or_default());
                            user.insert(Name::new("lang"), lang);
                            ConstValue::Object(user)
                        },
                        other => other,
                    })
                    .map_err(FieldError::internal)
                }),
        )
        .field(
            MetaField::new("delete", TypeRef::named_nn("Boolean"))
                .argument(MetaInputValue::new("id", TypeRef::named_nn("Uuid")))
                .resolve(|_, args, _, _| {
                    let id = args.get("id").cloned().unwrap_or_default();
                    match find_user(&id)? {
                        Some(_) => Ok(ConstValue::Boolean(true)),
                        None => Err(FieldError::extended("User not found", "id").with_code(404)),
                    }
                }),
        )
}

/// Register the user directory on `builder`.
pub fn users(builder: GatewayBuilder) -> GatewayBuilder {
    builder
        .query(query_type())
        .mutation(MetaType::new("Mutation").field(
            MetaField::new("user", TypeRef::named_nn("UserMutation"))
                .resolve(|_, _, _, _| Ok(ConstValue::Object(Default::default()))),
        ))
        .register(user_type())
        .register(user_mutation_type())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rolegate_handler::{Gateway, MemorySink, Request, TransportMeta, UserContext};
    use serde_json::json;
    use value::Variables;

    use super::*;

    fn gateway() -> Gateway {
        users(Gateway::builder())
            .role_checker(true)
            .sink(Arc::new(MemorySink::default()))
            .finish()
            .expect("demo schema is valid")
    }

    fn run(query: &str, roles: &[&str]) -> serde_json::Value {
        let ctx = UserContext::new(Some("olena".to_string()), roles.iter().map(ToString::to_string).collect());
        let request = Request {
            query: Some(query.to_string()),
            operation_name: None,
            variables: Variables::default(),
        };
        let response = gateway().execute(request, &ctx, TransportMeta::default()).unwrap();
        serde_json::to_value(response).unwrap()
    }

    #[test]
    fn lists_users_by_language() {
        assert_eq!(
            run(r#"{ users(lang: ua) { name lang } me }"#, &["query"]),
            json!({ "data": { "users": [{ "name": "Olena", "lang": "ua" }], "me": "olena" } })
        );
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let response = run(
            r#"mutation { user { create(email: "ivan@example.com") { id } } }"#,
            &["mutation.user.create"],
        );
        assert_eq!(
            response["errors"][0]["extensions"],
            json!({ "code": 422, "field": "email" })
        );
    }

    #[test]
    fn delete_needs_its_own_role() {
        let response = run(
            r#"mutation { user { delete(id: "6f1c3a6e-7f0b-4d3e-9a51-0c2f3d7a9b10") } }"#,
            &["query.users"],
        );
        assert_eq!(response["errors"][0]["extensions"]["code"], json!(401));
    }
}
