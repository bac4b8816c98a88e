//! Request and response envelopes exchanged with the fileshare API.
//!
//! Every call, GraphQL or REST, is described by a `RequestEnvelope` and
//! answered with a `ResponseEnvelope` so the session layer can apply one
//! retry policy to both.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ApiError;

/// HTTP verbs used by the REST file endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestMethod {
    Get,
    Put,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// A GraphQL document posted to the GraphQL endpoint.
    GraphQl {
        name: &'static str,
        document: &'static str,
    },
    /// A REST call relative to the API base URL.
    Rest { method: RestMethod, path: String },
}

impl Operation {
    pub fn name(&self) -> &str {
        match self {
            Operation::GraphQl { name, .. } => name,
            Operation::Rest { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    pub operation: Operation,
    /// GraphQL variables, or the JSON body of a REST call (`Null` for none).
    pub variables: Value,
}

impl RequestEnvelope {
    pub fn graphql(name: &'static str, document: &'static str, variables: Value) -> Self {
        Self {
            operation: Operation::GraphQl { name, document },
            variables,
        }
    }

    pub fn rest(method: RestMethod, path: impl Into<String>, body: Value) -> Self {
        Self {
            operation: Operation::Rest {
                method,
                path: path.into(),
            },
            variables: body,
        }
    }

    /// Body sent for a GraphQL operation.
    pub fn graphql_body(&self) -> Option<Value> {
        match &self.operation {
            Operation::GraphQl { document, .. } => Some(serde_json::json!({
                "query": document,
                "variables": self.variables,
            })),
            Operation::Rest { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<EnvelopeError>,
}

impl ResponseEnvelope {
    pub fn success(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            data: None,
            errors: vec![EnvelopeError {
                message: message.into(),
            }],
        }
    }

    /// Unwrap the payload, turning the first reported error into an `ApiError`.
    pub fn into_data(self) -> Result<Value, ApiError> {
        if let Some(first) = self.errors.into_iter().next() {
            return Err(ApiError::from_message(first.message));
        }
        self.data
            .ok_or_else(|| ApiError::InvalidResponse("No data returned from server".to_string()))
    }
}
