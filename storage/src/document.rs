use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A schemaless document as returned by any [`DocumentStore`](crate::DocumentStore).
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Document {
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(fields: Map<String, Value>) -> Document {
        Document { fields }
    }

    pub fn get(&self, field_name: &str) -> Option<&Value> {
        self.fields.get(field_name)
    }

    pub fn insert<V: Into<Value>>(&mut self, field_name: &str, value: V) {
        self.fields.insert(field_name.to_owned(), value.into());
    }

    pub fn extract_string(&self, field_name: &str) -> Result<String, String> {
        match self.fields.get(field_name) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(format!(
                "Field '{}' is not a string: {}",
                field_name, other
            )),
            None => Err(format!("Missing field '{}'", field_name)),
        }
    }

    /// Like `extract_string`, but absent and null fields are `None`.
    pub fn extract_optional_string(&self, field_name: &str) -> Result<Option<String>, String> {
        match self.fields.get(field_name) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.extract_string(field_name).map(Some),
        }
    }

    pub fn matches(&self, filter: &Filter) -> bool {
        filter
            .equals
            .iter()
            .all(|(field, value)| self.fields.get(field) == Some(value))
    }

    pub fn project(&self, projection: &Projection) -> Document {
        let fields = projection
            .fields
            .iter()
            .filter_map(|f| self.fields.get(f).map(|v| (f.clone(), v.clone())))
            .collect();
        Document { fields }
    }
}

impl From<Map<String, Value>> for Document {
    fn from(fields: Map<String, Value>) -> Self {
        Document { fields }
    }
}

/// Field selection applied to returned documents.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Projection {
    pub fields: Vec<String>,
}

impl Projection {
    pub fn fields(fields: &[&str]) -> Projection {
        Projection {
            fields: fields.iter().map(|f| (*f).to_owned()).collect(),
        }
    }
}

/// Conjunction of field equality conditions. An empty filter matches everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    pub equals: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Filter {
        Filter::default()
    }

    pub fn eq<V: Into<Value>>(mut self, field: &str, value: V) -> Filter {
        self.equals.push((field.to_owned(), value.into()));
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindOptions {
    pub filter: Filter,
    pub skip: u64,
    pub limit: Option<u64>,
    pub projection: Option<Projection>,
}

impl FindOptions {
    pub fn new(filter: Filter) -> FindOptions {
        FindOptions {
            filter,
            ..FindOptions::default()
        }
    }

    pub fn skip(mut self, skip: u64) -> FindOptions {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> FindOptions {
        self.limit = Some(limit);
        self
    }

    pub fn projection(mut self, projection: Projection) -> FindOptions {
        self.projection = Some(projection);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn projection_keeps_only_requested_fields() {
        let d = doc(json!({ "_id": 7, "content": "hello", "author": "x" }));
        let projected = d.project(&Projection::fields(&["content"]));
        assert_eq!(projected, doc(json!({ "content": "hello" })));
    }

    #[test]
    fn filter_requires_every_condition() {
        let d = doc(json!({ "id": "kim", "nickname": "k" }));
        assert!(d.matches(&Filter::new()));
        assert!(d.matches(&Filter::new().eq("id", "kim")));
        assert!(!d.matches(&Filter::new().eq("id", "kim").eq("nickname", "z")));
        assert!(!d.matches(&Filter::new().eq("missing", "kim")));
    }

    #[test]
    fn extract_string_reports_wrong_types() {
        let d = doc(json!({ "content": 3, "note": null }));
        assert!(d.extract_string("content").is_err());
        assert!(d.extract_string("absent").is_err());
        assert_eq!(d.extract_optional_string("note"), Ok(None));
        assert_eq!(d.extract_optional_string("absent"), Ok(None));
    }
}
