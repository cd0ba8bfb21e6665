//! What each kind of node expands into.

use super::NodeKind;
use crate::connection::Session;
use crate::metadata::ObjectType;

/// A child about to be attached.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct ChildSpec {
    pub kind: NodeKind,
    pub name: String,
    pub otype: String,
}

impl ChildSpec {
    fn new(kind: NodeKind, name: impl Into<String>, otype: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            otype: otype.into(),
        }
    }
}

/// Raw names of the enclosing catalog, schema and object.
#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct NodePath {
    pub catalog: String,
    pub schema: String,
    pub object: String,
    pub object_type: Option<ObjectType>,
}

pub(super) fn children(session: &Session, kind: NodeKind, path: &NodePath) -> Vec<ChildSpec> {
    match kind {
        NodeKind::Connection => connection_children(session),
        NodeKind::Catalog => catalog_children(session, &path.catalog),
        NodeKind::Schema => schema_children(session, path),
        NodeKind::Table | NodeKind::Function => object_children(session, path),
        NodeKind::Column => Vec::new(),
    }
}

fn pattern(session: &Session, name: &str) -> String {
    if name.is_empty() {
        "%".to_string()
    } else {
        session.sanitize_search_string(name)
    }
}

fn distinct_schemas(session: &Session, catalog: &str) -> Vec<ChildSpec> {
    let mut names: Vec<String> = Vec::new();
    for table in session.find_tables(catalog, "%", "%", "") {
        if !table.schema.is_empty() && !names.contains(&table.schema) {
            names.push(table.schema);
        }
    }
    names
        .into_iter()
        .map(|n| ChildSpec::new(NodeKind::Schema, n, "schema"))
        .collect()
}

fn tables_of(session: &Session, catalog: &str, schema: &str) -> Vec<ChildSpec> {
    session
        .find_tables(catalog, schema, "", "")
        .into_iter()
        .map(|t| ChildSpec::new(NodeKind::Table, t.name, t.kind.to_lowercase()))
        .collect()
}

fn connection_children(session: &Session) -> Vec<ChildSpec> {
    if session.catalog_support() {
        let catalogs: Vec<ChildSpec> = session
            .list_catalogs()
            .into_iter()
            .map(|c| ChildSpec::new(NodeKind::Catalog, c, "catalog"))
            .collect();
        if !catalogs.is_empty() {
            return catalogs;
        }
    }
    let schemas = distinct_schemas(session, "%");
    if !schemas.is_empty() {
        return schemas;
    }
    tables_of(session, "%", "%")
}

fn catalog_children(session: &Session, catalog: &str) -> Vec<ChildSpec> {
    let cat = pattern(session, catalog);
    let schemas: Vec<ChildSpec> = session
        .list_schemas(Some(&cat))
        .into_iter()
        .map(|s| ChildSpec::new(NodeKind::Schema, s, "schema"))
        .collect();
    if !schemas.is_empty() {
        return schemas;
    }
    let implied = distinct_schemas(session, &cat);
    if !implied.is_empty() {
        return implied;
    }
    tables_of(session, &cat, "")
}

fn schema_children(session: &Session, path: &NodePath) -> Vec<ChildSpec> {
    let cat = pattern(session, &path.catalog);
    let sch = pattern(session, &path.schema);
    let tables = session.find_tables(&cat, &sch, "", "");
    let procedures = session.find_procedures(&cat, &sch, "");

    let codec = session.codec();
    let (catalog_key, schema_key) = (codec.escape_name(&path.catalog), codec.escape_name(&path.schema));
    let names_of = |otype: ObjectType| -> Vec<String> {
        tables
            .iter()
            .filter(|t| ObjectType::from_table_kind(&t.kind) == otype)
            .map(|t| codec.escape_name(&t.name))
            .collect()
    };
    let cache = session.metadata();
    cache.extend_objects(&catalog_key, &schema_key, ObjectType::Table, &names_of(ObjectType::Table));
    cache.extend_objects(&catalog_key, &schema_key, ObjectType::View, &names_of(ObjectType::View));
    cache.extend_objects(
        &catalog_key,
        &schema_key,
        ObjectType::Function,
        &codec.escape_names(procedures.iter().map(|p| p.name.as_str())),
    );

    tables
        .into_iter()
        .map(|t| ChildSpec::new(NodeKind::Table, t.name, t.kind.to_lowercase()))
        .chain(
            procedures
                .into_iter()
                .map(|p| ChildSpec::new(NodeKind::Function, p.name, "function")),
        )
        .collect()
}

fn object_children(session: &Session, path: &NodePath) -> Vec<ChildSpec> {
    let codec = session.codec();
    let otype = path.object_type.unwrap_or(ObjectType::Table);
    session
        .columns(
            &codec.escape_name(&path.catalog),
            &codec.escape_name(&path.schema),
            &codec.escape_name(&path.object),
            otype,
        )
        .into_iter()
        .map(|c| ChildSpec::new(NodeKind::Column, codec.unescape_name(&c.name), c.type_name))
        .collect()
}
