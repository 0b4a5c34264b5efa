use std::collections::BTreeMap;

/// Declared kind of an input field.
///
/// Decided by the input's `type` attribute: `"number"` is numeric, anything
/// else (or no attribute at all) is text.
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Text,
    Number,
}

impl FieldKind {
    /// The `type` attribute value that marks an input as numeric.
    pub const NUMBER_TYPE: &'static str = "number";

    pub fn from_type_attr(ty: Option<&str>) -> Self {
        match ty {
            Some(Self::NUMBER_TYPE) => Self::Number,
            _ => Self::Text,
        }
    }

    /// The `type` attribute a host should put on an input of this kind.
    pub fn type_attr(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => Self::NUMBER_TYPE,
        }
    }

    /// Convert a raw input value according to this kind.
    pub fn read(self, raw: &str) -> FieldValue {
        match self {
            Self::Text => FieldValue::Text(raw.to_string()),
            Self::Number => FieldValue::Number(parse_int(raw)),
        }
    }
}

/// Value of a numeric field.
///
/// [`NumberValue::NaN`] is the parse failure sentinel. It is forwarded to the
/// server as-is (serialized as JSON `null`), no validation is performed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumberValue {
    Int(i64),
    NaN,
}

impl NumberValue {
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(v),
            Self::NaN => None,
        }
    }

    pub fn is_nan(self) -> bool {
        matches!(self, Self::NaN)
    }
}

impl serde::Serialize for NumberValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::NaN => serializer.serialize_none(),
        }
    }
}

/// Lenient integer parsing, matching what browsers do for numeric inputs.
///
/// Leading whitespace is skipped, an optional sign is accepted, a `0x`/`0X`
/// prefix switches to hexadecimal and the longest run of digits is taken.
/// Trailing garbage is ignored (`"42abc"` is 42, `"3.9"` is 3).
///
/// Input without any leading digits yields [`NumberValue::NaN`].
///
/// Unlike a browser, which falls back to an imprecise float, values that do
/// not fit in an `i64` also yield [`NumberValue::NaN`].
pub fn parse_int(raw: &str) -> NumberValue {
    let s = raw.trim_start();

    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, s) = match s.get(..2) {
        Some("0x" | "0X") => (16, &s[2..]),
        _ => (10, s),
    };

    let end = s
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(s.len());
    let digits = &s[..end];
    if digits.is_empty() {
        return NumberValue::NaN;
    }

    let Ok(magnitude) = u64::from_str_radix(digits, radix) else {
        return NumberValue::NaN;
    };

    let value = if negative {
        0i64.checked_sub_unsigned(magnitude)
    } else {
        i64::try_from(magnitude).ok()
    };

    value.map(NumberValue::Int).unwrap_or(NumberValue::NaN)
}

/// A single field value, tagged by the declared kind of its input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Number(NumberValue),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            Self::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<NumberValue> {
        match self {
            Self::Text(_) => None,
            Self::Number(v) => Some(*v),
        }
    }
}

impl serde::Serialize for FieldValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(v) => serializer.serialize_str(v),
            Self::Number(v) => v.serialize(serializer),
        }
    }
}

/// What a host reports for one input element at click time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputSnapshot {
    /// The `name` attribute. Inputs without a name are not submitted.
    pub name: Option<String>,
    pub kind: FieldKind,
    /// The current value, unconverted.
    pub raw: String,
}

impl InputSnapshot {
    pub fn new(name: impl Into<String>, kind: FieldKind, raw: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            kind,
            raw: raw.into(),
        }
    }

    pub fn value(&self) -> FieldValue {
        self.kind.read(&self.raw)
    }
}

/// Collected form values, keyed by field name.
///
/// Inserting a name twice keeps the last value.
#[derive(serde::Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct FormValues {
    fields: BTreeMap<String, FieldValue>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the value previously stored under `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(name.into(), value)
    }

    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(name, value)| {
                    let value = match value {
                        FieldValue::Text(v) => serde_json::Value::String(v.clone()),
                        FieldValue::Number(NumberValue::Int(v)) => serde_json::Value::from(*v),
                        FieldValue::Number(NumberValue::NaN) => serde_json::Value::Null,
                    };
                    (name.clone(), value)
                })
                .collect(),
        )
    }
}

impl FromIterator<InputSnapshot> for FormValues {
    fn from_iter<T: IntoIterator<Item = InputSnapshot>>(iter: T) -> Self {
        let mut values = Self::new();
        for input in iter {
            let value = input.value();
            match input.name {
                Some(name) => {
                    values.insert(name, value);
                }
                None => {
                    tracing::warn!(raw = %input.raw, "collect::skipped_unnamed_input");
                }
            }
        }
        values
    }
}

/// One form submission: the values POSTed to `/<action>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub action: String,
    pub values: FormValues,
}

impl Submission {
    pub const CONTENT_TYPE: &'static str = "application/json";

    pub fn new(action: impl Into<String>, values: FormValues) -> Self {
        Self {
            action: action.into(),
            values,
        }
    }

    /// The request path, `/<action>`.
    pub fn path(&self) -> String {
        format!("/{}", self.action.trim_start_matches('/'))
    }

    /// JSON request body.
    pub fn body(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.values)
    }
}

/// Which state the result element is showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    /// Successful response.
    Neutral,
    /// Failed request.
    Alert,
}

/// Text and tone to put into a form's result element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultView {
    pub text: String,
    pub tone: Tone,
}

impl ResultView {
    /// Render a successful response as JSON with 2-space indentation.
    ///
    /// Object keys keep the order the server sent them in, and floats without
    /// a fractional part print as integers (`1.0` renders as `1`).
    pub fn success(value: &serde_json::Value) -> Self {
        let value = integral_floats_as_ints(value);
        let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
        Self {
            text,
            tone: Tone::Neutral,
        }
    }

    /// Render a failed request as its raw response body.
    pub fn failure(error: &crate::RequestFailed) -> Self {
        Self {
            text: error.body.clone(),
            tone: Tone::Alert,
        }
    }
}

fn integral_floats_as_ints(value: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            // 2^63 is exactly representable, so the upper bound is exclusive.
            Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Value::from(f as i64)
            }
            _ => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(integral_floats_as_ints).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), integral_floats_as_ints(v)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Text colors used for the result element.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Palette {
    pub neutral: String,
    pub alert: String,
}

impl Palette {
    pub fn color(&self, tone: Tone) -> &str {
        match tone {
            Tone::Neutral => &self.neutral,
            Tone::Alert => &self.alert,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            neutral: "black".to_string(),
            alert: "red".to_string(),
        }
    }
}

/// Class names and attributes that make up the page contract.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Selectors {
    /// Class of form containers.
    pub form_class: String,
    /// Class of the submit trigger inside a container.
    pub submit_class: String,
    /// Class of the result element inside a container.
    pub result_class: String,
    /// Class shared by all submitted inputs.
    pub input_class: String,
    /// Container attribute holding the action name.
    pub action_attribute: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            form_class: "myForm".to_string(),
            submit_class: "myFormSubmit".to_string(),
            result_class: "myFormResult".to_string(),
            input_class: "myFormInput".to_string(),
            action_attribute: "data-action".to_string(),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct BinderOptions {
    pub selectors: Selectors,
    pub palette: Palette,
}

/// Host independent description of a form: its action and inputs.
///
/// Used to build forms in hosts that do not come with markup, like the
/// in-memory document, and as the form section of page configs.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FormLayout {
    pub action: String,
    #[serde(default)]
    pub inputs: Vec<InputLayout>,
}

impl FormLayout {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            inputs: Vec::new(),
        }
    }

    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.push(InputLayout {
            name: name.into(),
            kind: FieldKind::Text,
            value: value.into(),
        });
        self
    }

    pub fn with_number(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.push(InputLayout {
            name: name.into(),
            kind: FieldKind::Number,
            value: value.into(),
        });
        self
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct InputLayout {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: FieldKind,
    /// Initial value of the input.
    #[serde(default)]
    pub value: String,
}
