//! JSON body validation.
//!
//! [`ValidationGuard`] reads the body, deserializes it and runs its `validator`
//! rules before the handler is reached. A valid body is handed to the handler as
//! [`Validated<T>`]; an invalid one is answered with 400 and one entry per offending
//! field.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use anyhow::anyhow;
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use serde_path_to_error::Segment;
use tastelog_core::{AppError, FieldError, field_errors};
use tracing::debug;
use validator::Validate;

use crate::middleware::pipeline::{Guard, Stage};

pub struct ValidationGuard<T> {
    max_body_bytes: usize,
    _body: PhantomData<fn() -> T>,
}

impl<T> ValidationGuard<T> {
    pub fn new(max_body_bytes: usize) -> Self {
        Self {
            max_body_bytes,
            _body: PhantomData,
        }
    }
}

impl<T> Clone for ValidationGuard<T> {
    fn clone(&self) -> Self {
        Self::new(self.max_body_bytes)
    }
}

impl<T> fmt::Debug for ValidationGuard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationGuard")
            .field("body", &std::any::type_name::<T>())
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

/// Stand-ins tried, in order, for a missing or mistyped field so the remaining
/// fields still get checked.
fn placeholders() -> [Value; 6] {
    [
        Value::Null,
        Value::from(0),
        Value::from(""),
        Value::Bool(false),
        Value::Array(Vec::new()),
        Value::Object(Map::new()),
    ]
}

/// Upper bound on deserialization passes for one body.
const MAX_PASSES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(String),
    Index(usize),
}

/// Where a deserialization error points: the dotted field name and the steps
/// leading to it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Problem {
    field: String,
    steps: Vec<Step>,
    missing: bool,
}

fn field_name(steps: &[Step]) -> String {
    let mut name = String::new();
    for step in steps {
        match step {
            Step::Key(key) if name.is_empty() => name.push_str(key),
            Step::Key(key) => {
                name.push('.');
                name.push_str(key);
            }
            Step::Index(index) => name.push_str(&format!("[{}]", index)),
        }
    }
    name
}

fn missing_field(message: &str) -> Option<&str> {
    message.split("missing field `").nth(1)?.split('`').next()
}

fn locate(error: &serde_path_to_error::Error<serde_json::Error>) -> Option<Problem> {
    let mut steps = Vec::new();
    for segment in error.path().iter() {
        match segment {
            Segment::Map { key } => steps.push(Step::Key(key.clone())),
            Segment::Seq { index } => steps.push(Step::Index(*index)),
            Segment::Enum { .. } | Segment::Unknown => return None,
        }
    }

    let message = error.inner().to_string();
    let missing = match missing_field(&message) {
        Some(field) => {
            steps.push(Step::Key(field.to_string()));
            true
        }
        None => false,
    };

    if steps.is_empty() {
        return None;
    }

    Some(Problem {
        field: field_name(&steps),
        steps,
        missing,
    })
}

fn slot<'a>(value: &'a mut Value, steps: &[Step]) -> Option<&'a mut Value> {
    steps.iter().try_fold(value, |current, step| match step {
        Step::Key(key) => Some(
            current
                .as_object_mut()?
                .entry(key.clone())
                .or_insert(Value::Null),
        ),
        Step::Index(index) => current.as_array_mut()?.get_mut(*index),
    })
}

/// Deserializes and validates `bytes`, reporting every offending field.
///
/// Structural problems (missing or mistyped fields) are collected across the whole
/// body first; `validator` rules only run once the body has the right shape.
pub fn parse_body<T>(bytes: &[u8]) -> Result<T, Vec<FieldError>>
where
    T: DeserializeOwned + Validate,
{
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(vec![FieldError::new("body", "body is required")]);
    }

    let mut value: Value = serde_json::from_slice(bytes)
        .map_err(|_| vec![FieldError::new("body", "body must be valid JSON")])?;
    if !value.is_object() {
        return Err(vec![FieldError::new("body", "body must be a JSON object")]);
    }

    let mut fields: Vec<FieldError> = Vec::new();
    let mut attempts: HashMap<String, usize> = HashMap::new();

    for _ in 0..MAX_PASSES {
        let outcome: Result<T, _> = serde_path_to_error::deserialize(&value);
        let error = match outcome {
            Ok(parsed) if fields.is_empty() => {
                parsed.validate().map_err(|errors| field_errors(&errors))?;
                return Ok(parsed);
            }
            Ok(_) => break,
            Err(error) => error,
        };

        let Some(problem) = locate(&error) else {
            if fields.is_empty() {
                fields.push(FieldError::new("body", "Invalid field type in request"));
            }
            break;
        };

        if !fields.iter().any(|f| f.field == problem.field) {
            let message = if problem.missing {
                format!("{} is required", problem.field)
            } else {
                format!("{} has an invalid type", problem.field)
            };
            fields.push(FieldError::new(problem.field.clone(), message));
        }

        let attempt = attempts.entry(problem.field).or_default();
        let (Some(placeholder), Some(target)) = (
            placeholders().into_iter().nth(*attempt),
            slot(&mut value, &problem.steps),
        ) else {
            break;
        };
        *target = placeholder;
        *attempt += 1;
    }

    if fields.is_empty() {
        fields.push(FieldError::new("body", "Invalid field type in request"));
    }
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    Err(fields)
}

#[async_trait]
impl<T> Guard for ValidationGuard<T>
where
    T: DeserializeOwned + Validate + Clone + Send + Sync + 'static,
{
    fn stage(&self) -> Stage {
        Stage::Validation
    }

    async fn handle(&self, req: Request, next: Next) -> Response {
        let (mut parts, body) = req.into_parts();

        let bytes = match axum::body::to_bytes(body, self.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(error = %e, limit = self.max_body_bytes, "Unreadable request body");
                return AppError::validation(vec![FieldError::new(
                    "body",
                    format!("body must be at most {} bytes", self.max_body_bytes),
                )])
                .into_response();
            }
        };

        match parse_body::<T>(&bytes) {
            Ok(value) => {
                parts.extensions.insert(Validated(value));
                next.run(Request::from_parts(parts, Body::empty())).await
            }
            Err(fields) => {
                debug!(fields = fields.len(), "Request body failed validation");
                AppError::validation(fields).into_response()
            }
        }
    }
}

/// A request body that passed [`ValidationGuard`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Validated<T>(pub T);

impl<T, S> FromRequestParts<S> for Validated<T>
where
    T: Clone + Send + Sync + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.remove::<Validated<T>>().ok_or_else(|| {
            AppError::internal(anyhow!(
                "no validated {} body; the route has no matching validation guard",
                std::any::type_name::<T>()
            ))
        })
    }
}
