use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::errors::{UploadError, UtResult};

/// Parses and validates the client's `input` for one route.
pub type InputParser = Arc<dyn Fn(&Value) -> UtResult<Value> + Send + Sync>;

/// Field → messages, the shape sent back as `error.data`.
///
/// Nested fields are dotted (`owner.email`), list items indexed
/// (`tags[1].name`).
#[derive(Default)]
pub struct InputErrors {
    map: Map<String, Value>,
}

impl InputErrors {
    pub fn push_schema(&mut self, msg: impl Into<String>) {
        self.push_field("_schema", msg);
    }

    pub fn push_field(&mut self, field: &str, msg: impl Into<String>) {
        let msg = Value::String(msg.into());
        match self.map.get_mut(field) {
            Some(Value::Array(arr)) => arr.push(msg),
            _ => {
                self.map.insert(field.to_string(), Value::Array(vec![msg]));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn into_bad_request(self) -> UploadError {
        UploadError::bad_request("Invalid input").with_data(Value::Object(self.map))
    }

    fn collect(&mut self, at: &[String], errs: &ValidationErrors) {
        for (field, kind) in errs.errors() {
            let mut path = at.to_vec();
            path.push(field.to_string());

            match kind {
                ValidationErrorsKind::Field(list) => {
                    let key = path.join(".");
                    for e in list {
                        self.push_field(&key, describe(e));
                    }
                }
                ValidationErrorsKind::Struct(nested) => self.collect(&path, nested),
                ValidationErrorsKind::List(items) => {
                    for (idx, nested) in items {
                        let mut item = path.clone();
                        if let Some(last) = item.last_mut() {
                            last.push_str(&format!("[{idx}]"));
                        }
                        self.collect(&item, nested);
                    }
                }
            }
        }
    }
}

impl From<&ValidationErrors> for InputErrors {
    fn from(errs: &ValidationErrors) -> Self {
        let mut out = InputErrors::default();
        out.collect(&[], errs);
        if out.is_empty() {
            out.push_schema(errs.to_string());
        }
        out
    }
}

/// The rule's own message, else a short phrase for the built-in rule.
fn describe(e: &ValidationError) -> String {
    if let Some(msg) = &e.message {
        return msg.to_string();
    }
    let phrase = match &*e.code {
        "required" => "is required",
        "length" => "has the wrong length",
        "range" => "is out of range",
        "email" => "is not an email address",
        "url" => "is not a URL",
        other => return format!("failed `{other}`"),
    };
    phrase.to_string()
}

/// Deserialize `data` as `T` and run its `validator` rules.
///
/// Returns the normalized JSON of the parsed value, so middleware sees
/// defaults applied by serde.
pub fn validate_input<T>(data: &Value) -> UtResult<Value>
where
    T: DeserializeOwned + Validate + Serialize,
{
    let parsed: T = serde_json::from_value(data.clone()).map_err(|e| {
        UploadError::bad_request("Invalid input").with_data(json!({"_schema": [e.to_string()]}))
    })?;

    if let Err(e) = parsed.validate() {
        return Err(InputErrors::from(&e).into_bad_request());
    }

    serde_json::to_value(&parsed)
        .map_err(|e| UploadError::internal("Failed to serialize input").with_source(e))
}

/// Build an [`InputParser`] for `T`.
pub fn input_parser<T>() -> InputParser
where
    T: DeserializeOwned + Validate + Serialize + 'static,
{
    Arc::new(|data: &Value| validate_input::<T>(data))
}
