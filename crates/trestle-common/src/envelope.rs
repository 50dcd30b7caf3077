//! Wire types crossing the host/content boundary.
//!
//! Content-to-host traffic is a JSON [`CallEnvelope`] posted on a named
//! channel. Host-to-content traffic is a [`ResolutionCall`] rendered as
//! a script that invokes the per-call resolver the content side parked
//! under `window[funName]`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CodecError;

/// Body of a content-to-host call: the resolver id the content side is
/// waiting on plus the call arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEnvelope {
    #[serde(rename = "funName")]
    pub fun_name: String,
    #[serde(default)]
    pub property: Vec<Value>,
}

impl CallEnvelope {
    pub fn new(fun_name: impl Into<String>, property: Vec<Value>) -> Self {
        Self {
            fun_name: fun_name.into(),
            property,
        }
    }

    /// Copy of this envelope with every argument flattened to its display
    /// string. Used to retry console forwards whose arguments could not
    /// cross the channel as structured values.
    pub fn stringified(&self) -> Self {
        Self {
            fun_name: self.fun_name.clone(),
            property: self
                .property
                .iter()
                .map(|value| Value::String(display_value(value)))
                .collect(),
        }
    }
}

/// A message as it arrives from the content side: the channel it was
/// posted on and its raw JSON body.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub name: String,
    pub body: Value,
}

impl InboundMessage {
    pub fn new(name: impl Into<String>, body: Value) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    pub fn envelope(&self) -> Result<CallEnvelope, CodecError> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

/// How a call ended, from the host's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Handler finished; `None` is a bare acknowledgement.
    Success(Option<Value>),
    /// Handler failed with a reason the content side surfaces.
    Failure(String),
}

/// A resolver invocation to send back to content. Renders as
/// `window["<id>"](success, errorOrNull, resultOrNull);` so every
/// resolver sees the same three-argument shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionCall {
    pub fun_name: String,
    pub outcome: Outcome,
}

impl ResolutionCall {
    pub fn success(fun_name: impl Into<String>, value: Value) -> Self {
        Self {
            fun_name: fun_name.into(),
            outcome: Outcome::Success(Some(value)),
        }
    }

    /// Acknowledge without a payload.
    pub fn ack(fun_name: impl Into<String>) -> Self {
        Self {
            fun_name: fun_name.into(),
            outcome: Outcome::Success(None),
        }
    }

    pub fn failure(fun_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            fun_name: fun_name.into(),
            outcome: Outcome::Failure(reason.into()),
        }
    }

    pub fn to_script(&self) -> String {
        let (success, error, result) = match &self.outcome {
            Outcome::Success(value) => {
                (true, Value::Null, value.clone().unwrap_or(Value::Null))
            }
            Outcome::Failure(reason) => {
                (false, Value::String(reason.clone()), Value::Null)
            }
        };
        format!(
            "window[\"{}\"]({}, {}, {});",
            self.fun_name, success, error, result
        )
    }

    /// Parse a rendered resolver script back into its parts.
    pub fn from_script(script: &str) -> Result<Self, CodecError> {
        let malformed = || CodecError::MalformedScript(script.to_string());
        let rest = script.trim().strip_prefix("window[\"").ok_or_else(malformed)?;
        let (fun_name, rest) = rest.split_once("\"](").ok_or_else(malformed)?;
        let mut tail = rest.trim_end();
        tail = tail.strip_suffix(';').unwrap_or(tail).trim_end();
        let args_text = tail.strip_suffix(')').ok_or_else(malformed)?;
        let args: Vec<Value> = serde_json::from_str(&format!("[{args_text}]"))?;
        if args.len() != 3 {
            return Err(malformed());
        }
        let succeeded = args[0].as_bool().ok_or_else(malformed)?;
        let outcome = if succeeded {
            match &args[2] {
                Value::Null => Outcome::Success(None),
                value => Outcome::Success(Some(value.clone())),
            }
        } else {
            let reason = match &args[1] {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            Outcome::Failure(reason)
        };
        Ok(Self {
            fun_name: fun_name.to_string(),
            outcome,
        })
    }
}

/// Coerce a handler's optional string return into the value the caller
/// resolves with: absent means null, JSON text means the parsed value,
/// anything else passes through as a plain string.
pub fn coerce_result(raw: Option<String>) -> Value {
    let Some(text) = raw else {
        return Value::Null;
    };
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(_) => Value::String(text),
    }
}

/// Human-readable rendering: strings stay bare, everything else renders
/// as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
