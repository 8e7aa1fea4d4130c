use serde_json::Value;

use crate::error::HttpError;

/// A validated `POST /v1/responses` body.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateResponseRequest {
    pub body: Value,
    /// Whether the client asked for an SSE stream.
    pub stream: bool,
}

impl TryFrom<Value> for CreateResponseRequest {
    type Error = HttpError;

    fn try_from(body: Value) -> Result<Self, Self::Error> {
        let object = body
            .as_object()
            .ok_or_else(|| HttpError::bad_request("Request body must be a JSON object"))?;

        match object.get("model") {
            Some(Value::String(model)) if !model.trim().is_empty() => {}
            Some(Value::String(_)) | None => {
                return Err(HttpError::invalid_param("model", "Missing required parameter: 'model'"));
            }
            Some(_) => {
                return Err(HttpError::invalid_param("model", "'model' must be a string"));
            }
        }

        if object
            .get("input")
            .is_some_and(|input| !(input.is_string() || input.is_array()))
        {
            return Err(HttpError::invalid_param(
                "input",
                "'input' must be a string or an array of input items",
            ));
        }

        let stream = match object.get("stream") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(stream)) => *stream,
            Some(_) => {
                return Err(HttpError::invalid_param("stream", "'stream' must be a boolean"));
            }
        };

        Ok(Self { body, stream })
    }
}

/// Require a JSON object body.
pub fn validate_object_body(body: Value) -> Result<Value, HttpError> {
    if body.is_object() {
        Ok(body)
    } else {
        Err(HttpError::bad_request("Request body must be a JSON object"))
    }
}

/// Resource ids are interpolated into upstream paths, so only plain id
/// characters are accepted.
pub fn validate_id<'a>(param: &str, id: &'a str) -> Result<&'a str, HttpError> {
    let valid = !id.is_empty()
        && id.len() <= 256
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && id != "."
        && id != "..";
    if valid {
        Ok(id)
    } else {
        Err(HttpError::invalid_param(param, format!("Invalid {param}: '{id}'")))
    }
}
