//! JSON:API compound-document model.
//!
//! The parser is tolerant by design: `data` may be an object, an array, or
//! null; unknown top-level members (`meta`, `errors`, `links`, `jsonapi`)
//! are captured verbatim and re-emitted unchanged. Operations that walk the
//! primary data see a uniform sequence regardless of the wire shape, while
//! re-serialization keeps the original cardinality so clients observe the
//! same document shape the backend produced.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A `{type, id}` pair naming one resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl ResourceIdentifier {
    #[must_use]
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// The `data` member of a relationship: one identifier, a sequence, or an
/// explicit null (empty to-one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    Many(Vec<ResourceIdentifier>),
    One(ResourceIdentifier),
    Null,
}

/// A relationship object. `links` and `meta` pass through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// `None` means the member was absent; an explicit `"data": null`
    /// (empty to-one) round-trips as [`RelationshipData::Null`].
    #[serde(
        default,
        deserialize_with = "present_member",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<RelationshipData>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Relationship {
    /// The identifiers this relationship points at, regardless of
    /// cardinality.
    pub fn identifiers(&self) -> impl Iterator<Item = &ResourceIdentifier> {
        let slice: &[ResourceIdentifier] = match &self.data {
            Some(RelationshipData::Many(ids)) => ids,
            Some(RelationshipData::One(id)) => std::slice::from_ref(id),
            Some(RelationshipData::Null) | None => &[],
        };
        slice.iter()
    }
}

/// A single resource object in `data` or `included`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Relationship>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl ResourceObject {
    /// The `{type, id}` identity of this resource.
    #[must_use]
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(self.kind.clone(), self.id.clone())
    }
}

/// The primary `data` member: object, array, or null on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<ResourceObject>),
    One(Box<ResourceObject>),
    Null,
}

/// Deserialize a member that was present on the wire, mapping JSON null
/// onto the target's own null variant instead of `None`. `None` is
/// reserved for the member being absent, so absence and explicit null
/// survive a round trip distinctly.
fn present_member<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    serde_json::from_value(value)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

/// A parsed JSON:API document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonApiDocument {
    #[serde(
        default,
        deserialize_with = "present_member",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<PrimaryData>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<ResourceObject>,

    /// Remaining top-level members (`meta`, `errors`, `links`, `jsonapi`),
    /// preserved verbatim.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl JsonApiDocument {
    /// Parse a document from response bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Serialize back to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Iterate the primary resources as a sequence, whatever the wire shape.
    pub fn primary(&self) -> impl Iterator<Item = &ResourceObject> {
        let slice: &[ResourceObject] = match &self.data {
            Some(PrimaryData::Many(items)) => items,
            Some(PrimaryData::One(item)) => std::slice::from_ref(item.as_ref()),
            Some(PrimaryData::Null) | None => &[],
        };
        slice.iter()
    }

    /// Mutable variant of [`primary`](Self::primary).
    pub fn primary_mut(&mut self) -> Vec<&mut ResourceObject> {
        match &mut self.data {
            Some(PrimaryData::Many(items)) => items.iter_mut().collect(),
            Some(PrimaryData::One(item)) => vec![item.as_mut()],
            Some(PrimaryData::Null) | None => Vec::new(),
        }
    }

    /// Append a resource to `included`, coalescing duplicates by `{type,id}`.
    pub fn push_included(&mut self, resource: ResourceObject) {
        let key = resource.identifier();
        if self.included.iter().any(|r| r.identifier() == key) {
            return;
        }
        self.included.push(resource);
    }

    /// Every `{type,id}` reachable from a relationship in the primary data.
    #[must_use]
    pub fn referenced_identifiers(&self) -> std::collections::BTreeSet<ResourceIdentifier> {
        self.primary()
            .flat_map(|res| res.relationships.values())
            .flat_map(Relationship::identifiers)
            .cloned()
            .collect()
    }

    /// Drop included resources no relationship in `data` points at.
    pub fn retain_referenced_included(&mut self) {
        if self.included.is_empty() {
            return;
        }
        let referenced = self.referenced_identifiers();
        self.included.retain(|r| referenced.contains(&r.identifier()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_object_data() {
        let doc = JsonApiDocument::parse(
            br#"{"data":{"type":"users","id":"42","attributes":{"name":"A","email":"a@x"}}}"#,
        )
        .unwrap();

        assert!(matches!(doc.data, Some(PrimaryData::One(_))));
        let primary: Vec<_> = doc.primary().collect();
        assert_eq!(primary.len(), 1);
        assert_eq!(primary[0].kind, "users");
        assert_eq!(primary[0].attributes["name"], "A");
    }

    #[test]
    fn parses_array_and_null_data() {
        let doc = JsonApiDocument::parse(br#"{"data":[{"type":"posts","id":"1"}]}"#).unwrap();
        assert_eq!(doc.primary().count(), 1);

        let doc = JsonApiDocument::parse(br#"{"data":null}"#).unwrap();
        assert!(matches!(doc.data, Some(PrimaryData::Null)));
        assert_eq!(doc.primary().count(), 0);

        // Explicit null is preserved on re-serialize, distinct from absent.
        let out: Value = serde_json::from_slice(&doc.to_bytes().unwrap()).unwrap();
        assert!(out.get("data").is_some_and(Value::is_null));
    }

    #[test]
    fn single_object_round_trips_as_object() {
        let raw = br#"{"data":{"type":"users","id":"42"}}"#;
        let doc = JsonApiDocument::parse(raw).unwrap();
        let out: Value = serde_json::from_slice(&doc.to_bytes().unwrap()).unwrap();
        assert!(out["data"].is_object());
    }

    #[test]
    fn meta_and_errors_pass_through() {
        let raw = serde_json::json!({
            "data": null,
            "meta": {"total": 7},
            "errors": [{"status": "500", "title": "boom"}]
        });
        let doc = JsonApiDocument::parse(raw.to_string().as_bytes()).unwrap();
        let out: Value = serde_json::from_slice(&doc.to_bytes().unwrap()).unwrap();
        assert_eq!(out["meta"]["total"], 7);
        assert_eq!(out["errors"][0]["title"], "boom");
    }

    #[test]
    fn relationship_cardinalities() {
        let raw = serde_json::json!({
            "data": {
                "type": "posts", "id": "1",
                "relationships": {
                    "author": {"data": {"type": "users", "id": "9"}},
                    "tags": {"data": [{"type": "tags", "id": "a"}, {"type": "tags", "id": "b"}]},
                    "editor": {"data": null},
                    "comments": {"links": {"related": "/posts/1/comments"}}
                }
            }
        });
        let doc = JsonApiDocument::parse(raw.to_string().as_bytes()).unwrap();
        let post = doc.primary().next().unwrap();

        assert_eq!(post.relationships["author"].identifiers().count(), 1);
        assert_eq!(post.relationships["tags"].identifiers().count(), 2);
        assert_eq!(post.relationships["editor"].identifiers().count(), 0);
        assert_eq!(post.relationships["comments"].identifiers().count(), 0);

        // Links-only relationship keeps its links on re-serialize.
        let out: Value = serde_json::from_slice(&doc.to_bytes().unwrap()).unwrap();
        assert_eq!(
            out["data"]["relationships"]["comments"]["links"]["related"],
            "/posts/1/comments"
        );
    }

    #[test]
    fn push_included_coalesces_duplicates() {
        let mut doc = JsonApiDocument::default();
        let user = ResourceObject {
            kind: "users".into(),
            id: "9".into(),
            ..ResourceObject::default()
        };
        doc.push_included(user.clone());
        doc.push_included(user);
        assert_eq!(doc.included.len(), 1);
    }

    #[test]
    fn unreferenced_included_resources_are_discarded() {
        let raw = serde_json::json!({
            "data": {
                "type": "posts", "id": "1",
                "relationships": {"author": {"data": {"type": "users", "id": "9"}}}
            },
            "included": [
                {"type": "users", "id": "9"},
                {"type": "users", "id": "10"}
            ]
        });
        let mut doc = JsonApiDocument::parse(raw.to_string().as_bytes()).unwrap();
        doc.retain_referenced_included();

        assert_eq!(doc.included.len(), 1);
        assert_eq!(doc.included[0].id, "9");
    }
}
