use serde::{Deserialize, Deserializer, Serialize};
use value::Variables;

/// A GraphQL request as sent by a client.
///
/// The query is optional here so that a missing query surfaces as a gateway
/// fault instead of a decoding error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default)]
    pub query: Option<String>,

    #[serde(default, alias = "operation")]
    pub operation_name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_variables")]
    pub variables: Variables,
}

impl Request {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }
}

fn deserialize_variables<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Variables, D::Error> {
    Ok(Option::<serde_json::Value>::deserialize(deserializer)?
        .map(Variables::from_json)
        .unwrap_or_default())
}
