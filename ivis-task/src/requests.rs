//! Builders for host request payloads
//!
//! Optional descriptor fields are left out of the payload entirely when they
//! are not set. The host treats a missing key differently from a key holding
//! `null` or an empty value.

use ivis_ipc::RequestMessage;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::{TaskError, TaskResult};

/// Assembles a JSON object from required fields plus optional insertions
#[derive(Debug, Clone, Default)]
pub struct PayloadBuilder {
    fields: Map<String, JsonValue>,
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always insert `field`
    pub fn required(mut self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// Insert `field` only when `value` is `Some`
    pub fn optional<V>(mut self, field: &str, value: Option<V>) -> Self
    where
        V: Into<JsonValue>,
    {
        if let Some(value) = value {
            self.fields.insert(field.to_string(), value.into());
        }
        self
    }

    /// Merge caller-supplied fields; they replace anything already assembled
    pub fn extend(mut self, extra: Map<String, JsonValue>) -> Self {
        self.fields.extend(extra);
        self
    }

    pub fn into_map(self) -> Map<String, JsonValue> {
        self.fields
    }

    pub fn build(self) -> JsonValue {
        JsonValue::Object(self.fields)
    }
}

/// Descriptor of a signal set to create
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSet {
    pub cid: String,
    pub namespace: JsonValue,
    pub name: Option<String>,
    pub description: Option<String>,
    pub record_id_template: Option<String>,
    pub signals: Option<JsonValue>,
}

impl SignalSet {
    pub fn new(cid: impl Into<String>, namespace: impl Into<JsonValue>) -> Self {
        Self {
            cid: cid.into(),
            namespace: namespace.into(),
            name: None,
            description: None,
            record_id_template: None,
            signals: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn record_id_template(mut self, template: impl Into<String>) -> Self {
        self.record_id_template = Some(template.into());
        self
    }

    /// Signals to create inside the new set, in the host's descriptor format
    pub fn signals(mut self, signals: JsonValue) -> Self {
        self.signals = Some(signals);
        self
    }

    pub fn to_payload(&self) -> JsonValue {
        PayloadBuilder::new()
            .required("cid", self.cid.as_str())
            .required("namespace", self.namespace.clone())
            .optional("name", self.name.as_deref())
            .optional("description", self.description.as_deref())
            .optional("record_id_template", self.record_id_template.as_deref())
            .optional("signals", self.signals.clone())
            .build()
    }
}

/// Descriptor of a signal to create inside an existing signal set
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub cid: String,
    pub namespace: JsonValue,
    pub signal_type: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub indexed: Option<bool>,
    pub settings: Option<JsonValue>,
    pub weight_list: Option<JsonValue>,
    pub weight_edit: Option<JsonValue>,
    /// Passed through as-is and applied last, overriding the fields above
    pub extra: Map<String, JsonValue>,
}

impl Signal {
    pub fn new(
        cid: impl Into<String>,
        namespace: impl Into<JsonValue>,
        signal_type: impl Into<String>,
    ) -> Self {
        Self {
            cid: cid.into(),
            namespace: namespace.into(),
            signal_type: signal_type.into(),
            name: None,
            description: None,
            indexed: None,
            settings: None,
            weight_list: None,
            weight_edit: None,
            extra: Map::new(),
        }
    }

    /// Build from a loosely-typed descriptor such as the host's REST format.
    ///
    /// `cid`, `namespace` and `type` must be present. The known optional keys
    /// fill the typed fields, with `null` meaning absent. Every other key is
    /// kept verbatim as an extra field.
    pub fn from_descriptor(descriptor: JsonValue) -> TaskResult<Self> {
        let JsonValue::Object(mut fields) = descriptor else {
            return Err(TaskError::InvalidField {
                field: "signal".to_string(),
                reason: "descriptor must be a JSON object".to_string(),
            });
        };

        let cid = take_string(&mut fields, "cid")?;
        let signal_type = take_string(&mut fields, "type")?;
        let namespace = fields
            .remove("namespace")
            .ok_or_else(|| missing("namespace"))?;

        let mut signal = Signal::new(cid, namespace, signal_type);
        signal.name = take_optional_string(&mut fields, "name")?;
        signal.description = take_optional_string(&mut fields, "description")?;
        signal.indexed = match take_optional(&mut fields, "indexed") {
            None => None,
            Some(JsonValue::Bool(indexed)) => Some(indexed),
            Some(other) => return Err(invalid("indexed", "a boolean", &other)),
        };
        signal.settings = take_optional(&mut fields, "settings");
        signal.weight_list = take_optional(&mut fields, "weight_list");
        signal.weight_edit = take_optional(&mut fields, "weight_edit");
        signal.extra = fields;
        Ok(signal)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn indexed(mut self, indexed: bool) -> Self {
        self.indexed = Some(indexed);
        self
    }

    pub fn settings(mut self, settings: JsonValue) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn weight_list(mut self, weight_list: JsonValue) -> Self {
        self.weight_list = Some(weight_list);
        self
    }

    pub fn weight_edit(mut self, weight_edit: JsonValue) -> Self {
        self.weight_edit = Some(weight_edit);
        self
    }

    pub fn extra_field(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.extra.insert(field.into(), value.into());
        self
    }

    pub fn to_payload(&self) -> JsonValue {
        PayloadBuilder::new()
            .required("cid", self.cid.as_str())
            .required("type", self.signal_type.as_str())
            .required("namespace", self.namespace.clone())
            .optional("indexed", self.indexed)
            .optional("settings", self.settings.clone())
            .optional("weight_list", self.weight_list.clone())
            .optional("weight_edit", self.weight_edit.clone())
            .optional("name", self.name.as_deref())
            .optional("description", self.description.as_deref())
            .extend(self.extra.clone())
            .build()
    }
}

/// `create_signals` with whichever of the two payloads were supplied
pub fn create_signals_request(
    signal_sets: Option<JsonValue>,
    signals: Option<JsonValue>,
) -> RequestMessage {
    RequestMessage::CreateSignals {
        signal_sets,
        signals,
    }
}

/// `create_signals` carrying a single signal set
pub fn create_signal_set_request(signal_set: &SignalSet) -> RequestMessage {
    create_signals_request(Some(signal_set.to_payload()), None)
}

/// `create_signals` carrying one signal keyed by its parent set
pub fn create_signal_request(signal_set_cid: &str, signal: &Signal) -> RequestMessage {
    let mut signals = Map::new();
    signals.insert(signal_set_cid.to_string(), signal.to_payload());
    create_signals_request(None, Some(JsonValue::Object(signals)))
}

/// `store_state` carrying the serialized state
pub fn store_state_request<S>(state: &S) -> TaskResult<RequestMessage>
where
    S: Serialize + ?Sized,
{
    Ok(RequestMessage::StoreState {
        state: serde_json::to_value(state)?,
    })
}

fn missing(field: &str) -> TaskError {
    TaskError::MissingField {
        field: field.to_string(),
    }
}

fn invalid(field: &str, expected: &str, got: &JsonValue) -> TaskError {
    TaskError::InvalidField {
        field: field.to_string(),
        reason: format!("expected {}, got {}", expected, got),
    }
}

fn take_string(fields: &mut Map<String, JsonValue>, field: &str) -> TaskResult<String> {
    match fields.remove(field) {
        Some(JsonValue::String(value)) => Ok(value),
        Some(other) => Err(invalid(field, "a string", &other)),
        None => Err(missing(field)),
    }
}

/// Remove `field`, treating `null` the same as a missing key
fn take_optional(fields: &mut Map<String, JsonValue>, field: &str) -> Option<JsonValue> {
    fields.remove(field).filter(|value| !value.is_null())
}

fn take_optional_string(
    fields: &mut Map<String, JsonValue>,
    field: &str,
) -> TaskResult<Option<String>> {
    match take_optional(fields, field) {
        None => Ok(None),
        Some(JsonValue::String(value)) => Ok(Some(value)),
        Some(other) => Err(invalid(field, "a string", &other)),
    }
}
