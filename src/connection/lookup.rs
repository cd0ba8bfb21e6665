//! Cache-first catalog lookups.
//!
//! Each call reads the metadata cache, asks the driver only when the level
//! was never fetched, stores the answer and reads again. Names go in and come
//! out escaped. A busy or disconnected session answers from the cache alone.

use super::Session;
use crate::metadata::{ColumnMetadata, Lookup, ObjectType};

impl Session {
    /// Search pattern for an escaped name; `""` selects unqualified objects.
    fn search_pattern(&self, escaped: &str) -> String {
        let raw = self.unescape_name(escaped);
        if raw.is_empty() {
            "\0".to_string()
        } else {
            self.sanitize_search_string(&raw)
        }
    }

    pub fn catalogs(&self) -> Vec<String> {
        let cache = self.metadata();
        if matches!(cache.get_catalogs(), Lookup::Unqueried) && self.is_ready() {
            let codec = self.codec();
            let mut names = codec.escape_names(self.list_catalogs());
            if names.is_empty() {
                names.push(String::new());
            }
            cache.extend_catalogs(&names);
        }
        cache.get_catalogs().names().unwrap_or_default()
    }

    pub fn schemas(&self, catalog: &str) -> Vec<String> {
        self.catalogs();
        let cache = self.metadata();
        if matches!(cache.get_schemas(catalog), Lookup::Unqueried) && self.is_ready() {
            let pattern = self.search_pattern(catalog);
            let mut names = self.list_schemas(Some(&pattern));
            if names.is_empty() {
                for table in self.find_tables(&pattern, "", "", "") {
                    if !table.schema.is_empty() && !names.contains(&table.schema) {
                        names.push(table.schema);
                    }
                }
            }
            cache.extend_schemas(catalog, &self.codec().escape_names(names));
        }
        cache.get_schemas(catalog).names().unwrap_or_default()
    }

    pub fn objects(&self, catalog: &str, schema: &str, otype: ObjectType) -> Vec<String> {
        self.schemas(catalog);
        let cache = self.metadata();
        match cache.get_objects(catalog, schema, otype) {
            Lookup::Missing => return Vec::new(),
            Lookup::Unqueried if self.is_ready() => {
                let cat = self.search_pattern(catalog);
                let sch = self.search_pattern(schema);
                let names: Vec<String> = match otype {
                    ObjectType::Function => self
                        .find_procedures(&cat, &sch, "")
                        .into_iter()
                        .map(|p| p.name)
                        .collect(),
                    ObjectType::Table | ObjectType::View => {
                        let kind = if otype == ObjectType::View { "VIEW" } else { "TABLE" };
                        self.find_tables(&cat, &sch, "", kind)
                            .into_iter()
                            .map(|t| t.name)
                            .collect()
                    }
                    ObjectType::Datatype => Vec::new(),
                };
                cache.extend_objects(catalog, schema, otype, &self.codec().escape_names(names));
            }
            _ => {}
        }
        cache
            .get_objects(catalog, schema, otype)
            .names()
            .unwrap_or_default()
    }

    pub fn columns(
        &self,
        catalog: &str,
        schema: &str,
        object: &str,
        otype: ObjectType,
    ) -> Vec<ColumnMetadata> {
        let cache = self.metadata();
        let cached = cache.get_columns(catalog, schema, object, otype);
        if cached.is_loaded() || !self.is_ready() {
            return cached.names().unwrap_or_default();
        }

        let codec = self.codec();
        let cat = self.search_pattern(catalog);
        let sch = self.search_pattern(schema);
        let obj = self.sanitize_search_string(&self.unescape_name(object));
        let columns = if otype == ObjectType::Function {
            self.find_procedure_columns(&cat, &sch, &obj, "")
                .into_iter()
                .map(|c| ColumnMetadata::new(codec.escape_name(&c.column), c.type_name))
                .collect()
        } else {
            let raw_table = self.unescape_name(object);
            let keys = self.foreign_keys(
                &self.unescape_name(catalog),
                &self.unescape_name(schema),
                &raw_table,
            );
            self.find_columns(&cat, &sch, &obj, "")
                .into_iter()
                .map(|c| {
                    let foreign_keys = keys
                        .iter()
                        .filter(|fk| {
                            (fk.child_table.eq_ignore_ascii_case(&raw_table)
                                && fk.child_column.eq_ignore_ascii_case(&c.column))
                                || (fk.parent_table.eq_ignore_ascii_case(&raw_table)
                                    && fk.parent_column.eq_ignore_ascii_case(&c.column))
                        })
                        .cloned()
                        .collect();
                    ColumnMetadata {
                        name: codec.escape_name(&c.column),
                        type_name: c.type_name,
                        has_default: c.default.is_some(),
                        default: c.default,
                        foreign_keys,
                    }
                })
                .collect()
        };
        cache.extend_columns(catalog, schema, object, otype, columns);
        cache
            .get_columns(catalog, schema, object, otype)
            .names()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use crate::connection::testing::{FIXTURE, session_from, shop};
    use crate::metadata::{Lookup, ObjectType};

    #[test]
    fn test_catalogs_and_schemas() {
        let session = shop();
        assert_eq!(session.catalogs(), vec!["shop", "archive", ""]);
        assert_eq!(session.schemas("shop"), vec!["public", "audit", ""]);
        // Other databases are out of reach for this driver family.
        assert!(session.schemas("archive").is_empty());
        assert!(session.schemas("nowhere").is_empty());
    }

    #[test]
    fn test_objects_by_type() {
        let session = shop();
        assert_eq!(
            session.objects("shop", "public", ObjectType::Table),
            vec!["orders", "customers"]
        );
        assert_eq!(
            session.objects("shop", "public", ObjectType::View),
            vec!["order_summary"]
        );
        assert_eq!(
            session.objects("shop", "public", ObjectType::Function),
            vec!["total_spent"]
        );
        assert!(session.objects("shop", "missing", ObjectType::Table).is_empty());
        // Cross-database lookups come back empty and are remembered as such.
        assert!(session.objects("archive", "", ObjectType::Table).is_empty());
        assert_eq!(
            session.metadata().get_objects("archive", "", ObjectType::Table),
            Lookup::Loaded(vec![])
        );
    }

    #[test]
    fn test_columns_carry_foreign_keys() {
        let session = shop();
        let columns = session.columns("shop", "public", "orders", ObjectType::Table);
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "customer_id", "total"]);
        assert_eq!(columns[1].foreign_keys.len(), 1);
        assert_eq!(columns[1].foreign_keys[0].parent_table, "customers");
        assert!(columns[2].has_default);

        let customers = session.columns("shop", "public", "customers", ObjectType::Table);
        assert_eq!(customers[1].name, "\"Name\"");
        assert_eq!(customers[0].foreign_keys.len(), 1);

        let params = session.columns("shop", "public", "total_spent", ObjectType::Function);
        assert_eq!(params[0].name, "customer");
    }

    #[test]
    fn test_disconnected_session_reads_cache_only() {
        let session = session_from(FIXTURE, "shop");
        assert!(session.catalogs().is_empty());
        assert_eq!(session.metadata().get_catalogs(), Lookup::Unqueried);
    }

    #[test]
    fn test_catalogless_driver() {
        let session = session_from(FIXTURE, "notes");
        session.connect("", "", false).unwrap();
        assert_eq!(session.catalogs(), vec![""]);
        assert!(session.schemas("").is_empty());
        assert_eq!(
            session.objects("", "", ObjectType::Table),
            vec!["notes", "tags"]
        );
    }
}
