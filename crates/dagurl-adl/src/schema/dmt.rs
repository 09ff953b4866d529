//! DMT descriptor parsing and DSL rendering.
//!
//! Parsing is strict about structure (a malformed DMT is `InvalidSchema`)
//! but deliberately shallow about semantics: validation of data against a
//! descriptor happens in `typed`, not here.

use dagurl_core::node::Node;
use dagurl_core::{DagError, DagResult};

/// Scalar kinds a descriptor can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Int,
    Float,
    Bool,
    Bytes,
}

impl ScalarKind {
    fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "string" => Some(ScalarKind::String),
            "int" => Some(ScalarKind::Int),
            "float" => Some(ScalarKind::Float),
            "bool" => Some(ScalarKind::Bool),
            "bytes" => Some(ScalarKind::Bytes),
            _ => None,
        }
    }

    /// The builtin type name (`String`, `Int`, ...) for this kind.
    pub fn builtin_name(&self) -> &'static str {
        match self {
            ScalarKind::String => "String",
            ScalarKind::Int => "Int",
            ScalarKind::Float => "Float",
            ScalarKind::Bool => "Bool",
            ScalarKind::Bytes => "Bytes",
        }
    }

    fn from_builtin_name(name: &str) -> Option<Self> {
        match name {
            "String" => Some(ScalarKind::String),
            "Int" => Some(ScalarKind::Int),
            "Float" => Some(ScalarKind::Float),
            "Bool" => Some(ScalarKind::Bool),
            "Bytes" => Some(ScalarKind::Bytes),
            _ => None,
        }
    }
}

/// Struct representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructRepr {
    Map,
    Tuple,
    Listpairs,
}

/// Map-type representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapRepr {
    Map,
    Listpairs,
}

/// A reference to a type: by name, or written inline.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeTerm {
    Named(String),
    Inline(Box<Descriptor>),
}

/// One parsed type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    Struct {
        fields: Vec<(String, TypeTerm)>,
        repr: StructRepr,
    },
    MapType {
        key_type: Box<TypeTerm>,
        value_type: Box<TypeTerm>,
        repr: MapRepr,
    },
    ListType {
        value_type: Box<TypeTerm>,
    },
    Scalar(ScalarKind),
    LinkType {
        expected_type: Option<String>,
    },
    /// Acknowledged gap: unions pass through untyped.
    Union,
}

/// Look up `name` in a DMT: builtin scalar names first, then the DMT's
/// `types` map.
pub fn lookup_descriptor(dmt: &Node, name: &str) -> DagResult<Descriptor> {
    if let Some(kind) = ScalarKind::from_builtin_name(name) {
        return Ok(Descriptor::Scalar(kind));
    }

    let types = dmt
        .as_map()
        .and_then(|m| m.get("types"))
        .and_then(Node::as_map)
        .ok_or_else(|| DagError::invalid_schema("DMT has no types map"))?;

    let descriptor = types
        .get(name)
        .ok_or_else(|| DagError::invalid_schema(format!("type not found in schema: {name}")))?;

    parse_descriptor(descriptor)
}

/// Parse one descriptor node.
pub fn parse_descriptor(node: &Node) -> DagResult<Descriptor> {
    let map = node
        .as_map()
        .ok_or_else(|| DagError::invalid_schema("descriptor is not a map"))?;
    let kind = map
        .get("kind")
        .and_then(Node::as_str)
        .ok_or_else(|| DagError::invalid_schema("descriptor has no kind"))?;

    if let Some(scalar) = ScalarKind::from_kind(kind) {
        return Ok(Descriptor::Scalar(scalar));
    }

    match kind {
        "struct" => {
            let field_map = map
                .get("fields")
                .and_then(Node::as_map)
                .ok_or_else(|| DagError::invalid_schema("struct descriptor has no fields"))?;
            let mut fields = Vec::with_capacity(field_map.len());
            for (field_name, field) in field_map.iter() {
                let term = field
                    .as_map()
                    .and_then(|f| f.get("type"))
                    .ok_or_else(|| {
                        DagError::invalid_schema(format!("struct field {field_name} has no type"))
                    })?;
                fields.push((field_name.to_string(), parse_type_term(term)?));
            }
            let repr = match representation_key(map)? {
                None | Some("map") => StructRepr::Map,
                Some("tuple") => StructRepr::Tuple,
                Some("listpairs") => StructRepr::Listpairs,
                Some(other) => {
                    return Err(DagError::invalid_schema(format!(
                        "unsupported struct representation: {other}"
                    )))
                }
            };
            Ok(Descriptor::Struct { fields, repr })
        }
        "map" => {
            let key_type = match map.get("keyType") {
                Some(term) => parse_type_term(term)?,
                None => TypeTerm::Named("String".to_string()),
            };
            let value_type = map
                .get("valueType")
                .ok_or_else(|| DagError::invalid_schema("map descriptor has no valueType"))?;
            let repr = match representation_key(map)? {
                None | Some("map") => MapRepr::Map,
                Some("listpairs") => MapRepr::Listpairs,
                Some(other) => {
                    return Err(DagError::invalid_schema(format!(
                        "unsupported map representation: {other}"
                    )))
                }
            };
            Ok(Descriptor::MapType {
                key_type: Box::new(key_type),
                value_type: Box::new(parse_type_term(value_type)?),
                repr,
            })
        }
        "list" => {
            let value_type = map
                .get("valueType")
                .ok_or_else(|| DagError::invalid_schema("list descriptor has no valueType"))?;
            Ok(Descriptor::ListType {
                value_type: Box::new(parse_type_term(value_type)?),
            })
        }
        "link" => {
            let expected_type = match map.get("expectedType") {
                Some(node) => Some(
                    node.as_str()
                        .ok_or_else(|| DagError::invalid_schema("expectedType is not a string"))?
                        .to_string(),
                ),
                None => None,
            };
            Ok(Descriptor::LinkType { expected_type })
        }
        "union" => Ok(Descriptor::Union),
        other => Err(DagError::invalid_schema(format!(
            "unsupported descriptor kind: {other}"
        ))),
    }
}

/// Parse a type term: a type name string, or an inline descriptor.
pub fn parse_type_term(node: &Node) -> DagResult<TypeTerm> {
    match node {
        Node::String(name) => Ok(TypeTerm::Named(name.clone())),
        Node::Map(_) => Ok(TypeTerm::Inline(Box::new(parse_descriptor(node)?))),
        other => Err(DagError::invalid_schema(format!(
            "type term must be a name or inline descriptor, got {}",
            other.kind()
        ))),
    }
}

/// Resolve a term to its descriptor, following one name indirection.
pub fn resolve_term(dmt: &Node, term: &TypeTerm) -> DagResult<Descriptor> {
    match term {
        TypeTerm::Named(name) => lookup_descriptor(dmt, name),
        TypeTerm::Inline(descriptor) => Ok((**descriptor).clone()),
    }
}

fn representation_key(map: &dagurl_core::node::NodeMap) -> DagResult<Option<&str>> {
    let Some(repr) = map.get("representation") else {
        return Ok(None);
    };
    let repr_map = repr
        .as_map()
        .ok_or_else(|| DagError::invalid_schema("representation is not a map"))?;
    match repr_map.keys().next() {
        Some(key) => Ok(Some(key)),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// DSL rendering for diagnostics
// ---------------------------------------------------------------------------

/// Render a DMT back to schema DSL text.
///
/// Used in `SchemaMismatch` diagnostics; best-effort and lossy, not a
/// serializer. Types that fail to parse render as a comment line.
pub fn render_dsl(dmt: &Node) -> String {
    let Some(types) = dmt.as_map().and_then(|m| m.get("types")).and_then(Node::as_map) else {
        return "# (no types)".to_string();
    };

    let mut out = String::new();
    for (name, descriptor) in types.iter() {
        if !out.is_empty() {
            out.push('\n');
        }
        match parse_descriptor(descriptor) {
            Ok(desc) => render_type(&mut out, name, &desc),
            Err(_) => out.push_str(&format!("# type {name}: unparseable descriptor")),
        }
    }
    out
}

fn render_type(out: &mut String, name: &str, desc: &Descriptor) {
    match desc {
        Descriptor::Struct { fields, repr } => {
            out.push_str(&format!("type {name} struct {{"));
            for (field, term) in fields {
                out.push_str(&format!("\n  {field} {}", render_term(term)));
            }
            out.push_str("\n}");
            match repr {
                StructRepr::Map => {}
                StructRepr::Tuple => out.push_str(" representation tuple"),
                StructRepr::Listpairs => out.push_str(" representation listpairs"),
            }
        }
        Descriptor::MapType {
            key_type,
            value_type,
            repr,
        } => {
            out.push_str(&format!(
                "type {name} {{{}:{}}}",
                render_term(key_type),
                render_term(value_type)
            ));
            match repr {
                MapRepr::Map => {}
                MapRepr::Listpairs => out.push_str(" representation listpairs"),
            }
        }
        Descriptor::ListType { value_type } => {
            out.push_str(&format!("type {name} [{}]", render_term(value_type)));
        }
        Descriptor::Scalar(kind) => {
            out.push_str(&format!("type {name} {}", kind.builtin_name()));
        }
        Descriptor::LinkType { expected_type } => match expected_type {
            Some(expected) => out.push_str(&format!("type {name} &{expected}")),
            None => out.push_str(&format!("type {name} Link")),
        },
        Descriptor::Union => out.push_str(&format!("type {name} union")),
    }
}

fn render_term(term: &TypeTerm) -> String {
    match term {
        TypeTerm::Named(name) => name.clone(),
        TypeTerm::Inline(desc) => match &**desc {
            Descriptor::LinkType {
                expected_type: Some(expected),
            } => format!("&{expected}"),
            Descriptor::LinkType { expected_type: None } => "Link".to_string(),
            Descriptor::Scalar(kind) => kind.builtin_name().to_string(),
            Descriptor::MapType {
                key_type,
                value_type,
                ..
            } => format!("{{{}:{}}}", render_term(key_type), render_term(value_type)),
            Descriptor::ListType { value_type } => format!("[{}]", render_term(value_type)),
            _ => "(inline)".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagurl_core::node::node_from_json;

    fn dmt_fixture() -> Node {
        node_from_json(&serde_json::json!({
            "types": {
                "Example": {
                    "kind": "struct",
                    "fields": {
                        "Hello": {"type": "String"},
                        "Goodbye": {"type": {"kind": "link", "expectedType": "NestedExample"}}
                    },
                    "representation": {"tuple": {}}
                },
                "NestedExample": {
                    "kind": "struct",
                    "fields": {"region": {"type": "String"}},
                    "representation": {"tuple": {}}
                },
                "Pairs": {
                    "kind": "map",
                    "keyType": "String",
                    "valueType": "String",
                    "representation": {"listpairs": {}}
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn lookup_builtin_scalars() {
        let dmt = dmt_fixture();
        assert_eq!(
            lookup_descriptor(&dmt, "String").unwrap(),
            Descriptor::Scalar(ScalarKind::String)
        );
        assert_eq!(
            lookup_descriptor(&dmt, "Int").unwrap(),
            Descriptor::Scalar(ScalarKind::Int)
        );
    }

    #[test]
    fn parse_struct_with_link_field() {
        let dmt = dmt_fixture();
        let desc = lookup_descriptor(&dmt, "Example").unwrap();
        let Descriptor::Struct { fields, repr } = desc else {
            panic!("expected struct");
        };
        assert_eq!(repr, StructRepr::Tuple);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].0, "Hello");
        match &fields[1].1 {
            TypeTerm::Inline(inner) => assert_eq!(
                **inner,
                Descriptor::LinkType {
                    expected_type: Some("NestedExample".to_string())
                }
            ),
            other => panic!("expected inline link term, got {other:?}"),
        }
    }

    #[test]
    fn parse_listpairs_map() {
        let dmt = dmt_fixture();
        let desc = lookup_descriptor(&dmt, "Pairs").unwrap();
        assert!(matches!(
            desc,
            Descriptor::MapType {
                repr: MapRepr::Listpairs,
                ..
            }
        ));
    }

    #[test]
    fn missing_type_is_invalid_schema() {
        let dmt = dmt_fixture();
        let err = lookup_descriptor(&dmt, "Nope").unwrap_err();
        assert!(matches!(err, DagError::InvalidSchema(_)));
    }

    #[test]
    fn dsl_rendering_mentions_every_type() {
        let dsl = render_dsl(&dmt_fixture());
        assert!(dsl.contains("type Example struct {"));
        assert!(dsl.contains("Goodbye &NestedExample"));
        assert!(dsl.contains("representation tuple"));
        assert!(dsl.contains("type Pairs {String:String} representation listpairs"));
    }
}
