//! Property schema: fixed keys, value builders for create requests, and tolerant decoding
//! of page properties returned by database queries.

use serde_json::{json, Map, Value};

pub const NAME: &str = "Name";
pub const TITLE: &str = "Title";
pub const ADDRESS: &str = "Address";
pub const EMAIL: &str = "Email";
pub const PHONE_NUMBER: &str = "Phone Number";
pub const TAGS: &str = "Tags";
pub const IMG: &str = "Img";

/// Notion property types used by the person schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Title,
    RichText,
    Email,
    PhoneNumber,
    MultiSelect,
    Files,
}

impl PropertyKind {
    /// The `type` tag Notion uses for this property.
    pub fn type_name(self) -> &'static str {
        match self {
            PropertyKind::Title => "title",
            PropertyKind::RichText => "rich_text",
            PropertyKind::Email => "email",
            PropertyKind::PhoneNumber => "phone_number",
            PropertyKind::MultiSelect => "multi_select",
            PropertyKind::Files => "files",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PropertySpec {
    pub key: &'static str,
    pub kind: PropertyKind,
}

pub const NAME_SPEC: PropertySpec = PropertySpec {
    key: NAME,
    kind: PropertyKind::Title,
};
pub const TITLE_SPEC: PropertySpec = PropertySpec {
    key: TITLE,
    kind: PropertyKind::RichText,
};
pub const ADDRESS_SPEC: PropertySpec = PropertySpec {
    key: ADDRESS,
    kind: PropertyKind::RichText,
};
pub const EMAIL_SPEC: PropertySpec = PropertySpec {
    key: EMAIL,
    kind: PropertyKind::Email,
};
pub const PHONE_NUMBER_SPEC: PropertySpec = PropertySpec {
    key: PHONE_NUMBER,
    kind: PropertyKind::PhoneNumber,
};
pub const TAGS_SPEC: PropertySpec = PropertySpec {
    key: TAGS,
    kind: PropertyKind::MultiSelect,
};
pub const IMG_SPEC: PropertySpec = PropertySpec {
    key: IMG,
    kind: PropertyKind::Files,
};

pub const PERSON_SCHEMA: [PropertySpec; 7] = [
    NAME_SPEC,
    TITLE_SPEC,
    ADDRESS_SPEC,
    EMAIL_SPEC,
    PHONE_NUMBER_SPEC,
    TAGS_SPEC,
    IMG_SPEC,
];

/// Schema entry for a known key, if any.
pub fn spec_for(key: &str) -> Option<PropertySpec> {
    PERSON_SCHEMA.iter().copied().find(|s| s.key == key)
}

// --- create-request values ---

fn rich_text_items(content: &str) -> Value {
    json!([{ "type": "text", "text": { "content": content } }])
}

pub fn title_value(content: &str) -> Value {
    json!({ "title": rich_text_items(content) })
}

pub fn rich_text_value(content: &str) -> Value {
    json!({ "rich_text": rich_text_items(content) })
}

/// Empty strings are sent as null; Notion rejects "" for email.
pub fn email_value(email: &str) -> Value {
    json!({ "email": non_empty(email) })
}

pub fn phone_number_value(phone: &str) -> Value {
    json!({ "phone_number": non_empty(phone) })
}

pub fn multi_select_value(tags: &[String]) -> Value {
    let options: Vec<Value> = tags.iter().map(|t| json!({ "name": t })).collect();
    json!({ "multi_select": options })
}

pub fn external_file_value(url: &str) -> Value {
    json!({
        "files": [{
            "name": "image",
            "type": "external",
            "external": { "url": url }
        }]
    })
}

fn non_empty(s: &str) -> Value {
    if s.is_empty() {
        Value::Null
    } else {
        Value::String(s.to_string())
    }
}

/// Equality filter for a database query on `key`. Unknown keys are filtered as rich text.
/// Returns None for properties that have no equality condition (files).
pub fn equals_filter(key: &str, value: &str) -> Option<Value> {
    let kind = spec_for(key).map(|s| s.kind).unwrap_or(PropertyKind::RichText);
    let condition = match kind {
        PropertyKind::Files => return None,
        PropertyKind::MultiSelect => json!({ "contains": value }),
        _ => json!({ "equals": value }),
    };
    let mut filter = Map::new();
    filter.insert("property".to_string(), Value::String(key.to_string()));
    filter.insert(kind.type_name().to_string(), condition);
    Some(Value::Object(filter))
}

// --- decoding ---

/// Outcome of reading one property from a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<T> {
    Value(T),
    Absent,
    /// The key exists but holds a different property type.
    WrongType { found: String },
}

impl<T> Decoded<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Decoded::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: Default> Decoded<T> {
    pub fn unwrap_or_default(self) -> T {
        self.into_option().unwrap_or_default()
    }
}

/// Look up `spec.key` and check its `type` tag before handing the payload to `read`.
fn decode_with<T>(
    properties: &Map<String, Value>,
    spec: PropertySpec,
    read: impl FnOnce(&Value) -> T,
) -> Decoded<T> {
    let Some(prop) = properties.get(spec.key) else {
        return Decoded::Absent;
    };
    let found = prop.get("type").and_then(|t| t.as_str()).unwrap_or("");
    if found != spec.kind.type_name() {
        return Decoded::WrongType {
            found: found.to_string(),
        };
    }
    match prop.get(spec.kind.type_name()) {
        Some(payload) => Decoded::Value(read(payload)),
        None => Decoded::Absent,
    }
}

/// First rich-text item's plain text, falling back to `text.content`.
fn first_plain_text(items: &Value) -> String {
    items
        .as_array()
        .and_then(|a| a.first())
        .and_then(|item| {
            item.get("plain_text")
                .and_then(|t| t.as_str())
                .or_else(|| item.pointer("/text/content").and_then(|t| t.as_str()))
        })
        .unwrap_or_default()
        .to_string()
}

/// Decode a text-like property (title, rich_text, email, phone_number) as a string.
pub fn decode_text(properties: &Map<String, Value>, spec: PropertySpec) -> Decoded<String> {
    match spec.kind {
        PropertyKind::Title | PropertyKind::RichText => {
            decode_with(properties, spec, first_plain_text)
        }
        PropertyKind::Email | PropertyKind::PhoneNumber => decode_with(properties, spec, |v| {
            v.as_str().unwrap_or_default().to_string()
        }),
        PropertyKind::MultiSelect | PropertyKind::Files => match properties.get(spec.key) {
            Some(prop) => Decoded::WrongType {
                found: prop
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or_default()
                    .to_string(),
            },
            None => Decoded::Absent,
        },
    }
}

/// Decode a multi_select property into option names, in order.
pub fn decode_tags(properties: &Map<String, Value>, spec: PropertySpec) -> Decoded<Vec<String>> {
    decode_with(properties, spec, |v| {
        v.as_array()
            .map(|opts| {
                opts.iter()
                    .filter_map(|o| o.get("name").and_then(|n| n.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    })
}

/// Decode a files property into the URL of its first external file.
pub fn decode_external_url(properties: &Map<String, Value>, spec: PropertySpec) -> Decoded<String> {
    decode_with(properties, spec, |v| {
        v.as_array()
            .and_then(|files| {
                files
                    .iter()
                    .find(|f| f.get("type").and_then(|t| t.as_str()) == Some("external"))
            })
            .and_then(|f| f.pointer("/external/url").and_then(|u| u.as_str()))
            .unwrap_or_default()
            .to_string()
    })
}
