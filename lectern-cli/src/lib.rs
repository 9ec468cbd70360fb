use anyhow::{anyhow, Context};
pub use anyhow::Result;
use lazy_static::lazy_static;
use lectern::client::{multipart, Method};
use lectern::endpoints::query_value;
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::str::FromStr;

pub mod pretty;

/// Represents fields/content specified on the command line.
///
/// Sort of like HTTPie. Query parameters are '==', body values (JSON) are '='. Only single-level
/// body values are allowed currently, not JSON Pointer assignment.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ArgField {
    Query(String, serde_json::Value),
    Body(String, serde_json::Value),
}

impl FromStr for ArgField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lazy_static! {
            static ref FIELD_RE: Regex = Regex::new(r"^([a-zA-Z_][a-zA-Z0-9_]*)=(=)?(.*)$").unwrap();
        }
        if let Some(captures) = FIELD_RE.captures(s) {
            let key = captures[1].to_string();
            let val =
                Value::from_str(&captures[3]).unwrap_or(Value::String(captures[3].to_string()));
            let val = match val {
                Value::String(s) if s.is_empty() => Value::Null,
                _ => val,
            };
            if captures.get(2).is_some() {
                Ok(ArgField::Query(key, val))
            } else {
                Ok(ArgField::Body(key, val))
            }
        } else {
            Err(anyhow!("could not parse as a field assignment: {}", s))
        }
    }
}

/// HTTP method names, case-insensitive ("get", "POST", ...)
pub fn parse_method(s: &str) -> Result<Method> {
    let upper = s.to_ascii_uppercase();
    match upper.as_str() {
        "GET" | "POST" | "PUT" | "PATCH" | "DELETE" | "HEAD" | "OPTIONS" => {
            Ok(Method::from_str(&upper)?)
        }
        _ => Err(anyhow!("unsupported HTTP method: {}", s)),
    }
}

/// Appends any query fields to an API path, form-encoded
pub fn path_with_query(path: &str, fields: &[ArgField]) -> String {
    let mut out = path.to_string();
    for f in fields.iter() {
        if let ArgField::Query(ref k, ref v) = f {
            let v = match v {
                Value::String(s) => s.to_string(),
                Value::Null => "".to_string(),
                _ => v.to_string(),
            };
            out.push(if out.contains('?') { '&' } else { '?' });
            out.push_str(&query_value(k));
            out.push('=');
            out.push_str(&query_value(&v));
        }
    }
    out
}

pub fn update_value_from_fields(fields: Vec<ArgField>, value: &mut Value) {
    if let Value::Object(map) = value {
        for f in fields.into_iter() {
            if let ArgField::Body(k, v) = f {
                map.insert(k, v);
            }
        }
    }
}

/// Consumes the entire Vec of fields passed in; query fields are dropped
pub fn value_from_fields(fields: Vec<ArgField>) -> Value {
    let mut value = Value::Object(serde_json::Map::new());
    update_value_from_fields(fields, &mut value);
    value
}

/// Builds a multipart form from body fields (as text parts) plus an optional file part
pub fn form_from_fields(
    fields: Vec<ArgField>,
    file: Option<&Path>,
    file_field: &str,
) -> Result<multipart::Form> {
    let mut form = multipart::Form::new();
    for f in fields.into_iter() {
        if let ArgField::Body(k, v) = f {
            let text = match v {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            form = form.text(k, text);
        }
    }
    if let Some(path) = file {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading upload {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        form = form.part(
            file_field.to_string(),
            multipart::Part::bytes(bytes).file_name(file_name),
        );
    }
    Ok(form)
}

#[test]
fn test_argfield() {
    use serde_json::json;
    assert_eq!(
        ArgField::from_str("limit=3").unwrap(),
        ArgField::Body("limit".to_string(), json!(3)),
    );
    assert_eq!(
        ArgField::from_str("course==3").unwrap(),
        ArgField::Query("course".to_string(), json!(3)),
    );
    assert_eq!(
        ArgField::from_str("subject==\"billing\"").unwrap(),
        ArgField::Query("subject".to_string(), Value::String("billing".to_string()))
    );
    assert_eq!(
        ArgField::from_str("subject=billing").unwrap(),
        ArgField::Body("subject".to_string(), Value::String("billing".to_string()))
    );
    assert_eq!(
        ArgField::from_str("notes=").unwrap(),
        ArgField::Body("notes".to_string(), Value::Null),
    );
    assert_eq!(
        ArgField::from_str("tags=[\"a\",\"b\"]").unwrap(),
        ArgField::Body("tags".to_string(), json!(["a", "b"])),
    );

    assert!(ArgField::from_str("a").is_err());
    assert!(ArgField::from_str("").is_err());
    assert!(ArgField::from_str("asdf.fee").is_err());
    assert!(ArgField::from_str("9lives=1").is_err());

    assert!(ArgField::from_str("text=\"other value\"").is_ok());
}

#[test]
fn test_fields_to_request_parts() {
    use serde_json::json;
    let fields: Vec<ArgField> = ["range==30 days", "page==2", "subject=Billing", "priority=2"]
        .iter()
        .map(|s| ArgField::from_str(s).unwrap())
        .collect();
    assert_eq!(
        path_with_query("/admin/analytics", &fields),
        "/admin/analytics?range=30+days&page=2"
    );
    assert_eq!(
        path_with_query("/leaderboard?limit=5", &fields[1..2]),
        "/leaderboard?limit=5&page=2"
    );
    assert_eq!(
        value_from_fields(fields),
        json!({"subject": "Billing", "priority": 2})
    );

    let mut existing = json!({"subject": "old", "body": "kept"});
    update_value_from_fields(
        vec![ArgField::from_str("subject=new").unwrap()],
        &mut existing,
    );
    assert_eq!(existing, json!({"subject": "new", "body": "kept"}));
}

#[test]
fn test_parse_method() {
    assert_eq!(parse_method("get").unwrap(), Method::GET);
    assert_eq!(parse_method("Delete").unwrap(), Method::DELETE);
    assert!(parse_method("fetch").is_err());
}

#[test]
fn test_form_from_fields() {
    let fields = vec![ArgField::from_str("title=Intro").unwrap()];
    assert!(form_from_fields(fields.clone(), None, "file").is_ok());
    assert!(form_from_fields(fields, Some(Path::new("/nonexistent/upload.bin")), "file").is_err());
}
