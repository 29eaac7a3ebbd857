use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered alias lists for one entity: the identifier plus each display field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    id: Vec<String>,
    fields: Vec<(String, Vec<String>)>,
}

impl AliasTable {
    pub fn new(id_aliases: Vec<String>) -> Self {
        Self {
            id: id_aliases,
            fields: Vec::new(),
        }
    }

    /// Adds a canonical field resolved from `aliases`, first present value wins.
    pub fn field(mut self, canonical: &str, aliases: Vec<String>) -> Self {
        self.fields.push((canonical.to_string(), aliases));
        self
    }

    pub fn id_aliases(&self) -> &[String] {
        &self.id
    }

    pub fn aliases_for(&self, canonical: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|(name, _)| name == canonical)
            .map(|(_, aliases)| aliases.as_slice())
    }

    /// Resolves the identifier of `raw`, if any alias carries a non-empty value.
    pub fn resolve_id(&self, raw: &Value) -> Option<String> {
        resolve(raw, &self.id)
            .map(stringify)
            .filter(|id| !id.is_empty())
    }

    /// Maps `raw` into canonical shape; `None` when the identifier is unresolvable.
    pub fn normalize(&self, raw: &Value) -> Option<NormalizedRecord> {
        let id = self.resolve_id(raw)?;
        let fields = self
            .fields
            .iter()
            .map(|(canonical, aliases)| {
                let value = resolve(raw, aliases).map(stringify).unwrap_or_default();
                (canonical.clone(), value)
            })
            .collect();
        Some(NormalizedRecord { id, fields })
    }
}

/// Canonical record: stringified `id` plus display fields keyed by canonical name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub id: String,
    pub fields: BTreeMap<String, String>,
}

impl NormalizedRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), name.into());
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn name(&self) -> &str {
        self.get("name")
    }

    /// Display value for `field`, empty when the entity has no such field.
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    /// Flat JSON object with `id` and every canonical field.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        for (key, value) in &self.fields {
            map.insert(key.clone(), Value::String(value.clone()));
        }
        Value::Object(map)
    }
}

/// Normalizes every raw record, dropping those without a resolvable identifier.
pub fn normalize_all(table: &AliasTable, raw: &[Value]) -> Vec<NormalizedRecord> {
    raw.iter().filter_map(|item| table.normalize(item)).collect()
}

fn resolve<'a>(raw: &'a Value, aliases: &[String]) -> Option<&'a Value> {
    let object = raw.as_object()?;
    aliases
        .iter()
        .filter_map(|alias| object.get(alias))
        .find(|value| !value.is_null())
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> AliasTable {
        AliasTable::new(vec!["id".into(), "ID".into(), "locationId".into()])
            .field("name", vec!["name".into(), "Name".into()])
    }

    #[test]
    fn numbers_and_bools_are_stringified() {
        let record = table().normalize(&json!({"ID": 42, "Name": true})).unwrap();
        assert_eq!(record.id, "42");
        assert_eq!(record.name(), "true");
    }

    #[test]
    fn null_alias_falls_through_to_next() {
        let record = table()
            .normalize(&json!({"id": null, "locationId": "L-1"}))
            .unwrap();
        assert_eq!(record.id, "L-1");
        assert_eq!(record.name(), "");
    }

    #[test]
    fn empty_or_missing_id_is_dropped() {
        assert_eq!(table().normalize(&json!({"name": "x"})), None);
        assert_eq!(table().normalize(&json!({"id": "", "name": "x"})), None);
        assert_eq!(table().normalize(&json!("not an object")), None);
    }

    #[test]
    fn normalize_all_skips_unidentified() {
        let raw = vec![json!({"id": 1}), json!({"Name": "orphan"}), json!({"ID": "2"})];
        let ids: Vec<_> = normalize_all(&table(), &raw).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}
