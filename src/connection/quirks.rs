//! Per-DBMS overrides of catalog behaviour.
//!
//! A [`DriverQuirks`] value is picked once at connect time from the product
//! name the driver reports. Each hook is optional; a missing hook (or a hook
//! answering `None`) means the plain driver call is used.

use tracing::debug;

use super::identifier::IdentifierCodec;
use crate::driver::{DbConnection, DbResult, Value};

/// What a hook may look at.
pub struct QuirkContext<'a> {
    pub conn: &'a dyn DbConnection,
    pub codec: &'a IdentifierCodec,
    pub current_catalog: &'a str,
}

/// Catalog/schema/object arguments of a search call, open to rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchArgs {
    pub catalog: String,
    pub schema: String,
    pub name: String,
}

pub type CatalogHook = fn(&QuirkContext<'_>) -> Option<DbResult<Vec<String>>>;
pub type SchemaHook = fn(&QuirkContext<'_>, Option<&str>) -> Option<DbResult<Vec<String>>>;
/// Returns `false` when the call must answer with no rows.
pub type SearchHook = fn(&QuirkContext<'_>, &mut SearchArgs) -> bool;
/// `(object, filter, limit)` to SQL.
pub type PreviewHook = fn(&str, &str, i64) -> String;

#[derive(Clone, Copy)]
pub struct DriverQuirks {
    pub family: &'static str,
    pub list_catalogs: Option<CatalogHook>,
    pub list_schemas: Option<SchemaHook>,
    pub find_tables: Option<SearchHook>,
    pub find_columns: Option<SearchHook>,
    pub preview: PreviewHook,
}

impl std::fmt::Debug for DriverQuirks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverQuirks")
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}

impl Default for DriverQuirks {
    fn default() -> Self {
        Self {
            family: "default",
            list_catalogs: None,
            list_schemas: Some(schemas_of_current_catalog),
            find_tables: None,
            find_columns: None,
            preview: limit_preview,
        }
    }
}

/// Fixed database roles SQL Server lists as schemas.
const SQLSERVER_ROLE_SCHEMAS: &[&str] = &[
    "db_owner",
    "db_accessadmin",
    "db_securityadmin",
    "db_ddladmin",
    "db_backupoperator",
    "db_datareader",
    "db_datawriter",
    "db_denydatareader",
    "db_denydatawriter",
];

impl DriverQuirks {
    /// Choose the strategy for a driver-reported product name.
    pub fn for_dbms(dbms_name: &str) -> Self {
        let name = dbms_name.to_lowercase();
        if name.contains("sql server") {
            Self {
                family: "sqlserver",
                list_schemas: Some(sqlserver_schemas),
                find_tables: Some(sqlserver_tables),
                preview: top_preview,
                ..Self::default()
            }
        } else if name.contains("postgresql") {
            Self {
                family: "postgresql",
                find_tables: Some(current_catalog_only),
                find_columns: Some(current_catalog_only),
                ..Self::default()
            }
        } else if name.contains("mysql") || name.contains("mariadb") {
            Self {
                family: "mysql",
                list_schemas: Some(no_schemas),
                find_tables: Some(swap_catalog_and_schema),
                find_columns: Some(swap_catalog_and_schema),
                ..Self::default()
            }
        } else if name.contains("sqlite") {
            Self {
                family: "sqlite",
                list_catalogs: Some(no_catalogs),
                list_schemas: Some(no_schemas),
                ..Self::default()
            }
        } else {
            Self::default()
        }
    }

    /// SQL previewing the rows of `object`.
    pub fn preview_sql(&self, object: &str, filter: &str, limit: i64) -> String {
        (self.preview)(object, filter, limit)
    }
}

fn is_current_catalog(ctx: &QuirkContext<'_>, catalog: &str) -> bool {
    catalog == ctx.current_catalog
        || catalog == ctx.codec.sanitize_search_string(ctx.current_catalog)
}

fn schemas_of_current_catalog(
    ctx: &QuirkContext<'_>,
    catalog: Option<&str>,
) -> Option<DbResult<Vec<String>>> {
    match catalog {
        Some(c) if !is_current_catalog(ctx, c) => Some(Ok(Vec::new())),
        _ => None,
    }
}

fn no_schemas(_ctx: &QuirkContext<'_>, _catalog: Option<&str>) -> Option<DbResult<Vec<String>>> {
    Some(Ok(Vec::new()))
}

fn no_catalogs(_ctx: &QuirkContext<'_>) -> Option<DbResult<Vec<String>>> {
    Some(Ok(Vec::new()))
}

fn sqlserver_schemas(
    ctx: &QuirkContext<'_>,
    catalog: Option<&str>,
) -> Option<DbResult<Vec<String>>> {
    let target = match catalog {
        Some(c) if !c.is_empty() => ctx.codec.unsanitize_search_string(c),
        _ => ctx.current_catalog.to_string(),
    };
    let roles = SQLSERVER_ROLE_SCHEMAS
        .iter()
        .map(|r| format!("'{r}'"))
        .collect::<Vec<_>>()
        .join(",");
    let query = format!(
        "SELECT name FROM {}.sys.schemas WHERE name NOT IN ({roles})",
        ctx.codec.escape_name(&target)
    );
    match single_column(ctx.conn, &query) {
        Ok(names) if !names.is_empty() => Some(Ok(names)),
        Ok(_) => schemas_of_current_catalog(ctx, catalog),
        Err(e) => {
            debug!("sys.schemas lookup failed, falling back: {e}");
            schemas_of_current_catalog(ctx, catalog)
        }
    }
}

fn sqlserver_tables(_ctx: &QuirkContext<'_>, args: &mut SearchArgs) -> bool {
    !(args.catalog == "\0" && args.schema == "\0")
}

fn current_catalog_only(ctx: &QuirkContext<'_>, args: &mut SearchArgs) -> bool {
    is_current_catalog(ctx, &args.catalog)
}

fn swap_catalog_and_schema(_ctx: &QuirkContext<'_>, args: &mut SearchArgs) -> bool {
    let blank = |s: &str| s.is_empty() || s == "null";
    if blank(&args.catalog) && !blank(&args.schema) {
        std::mem::swap(&mut args.catalog, &mut args.schema);
    }
    true
}

fn limit_preview(object: &str, filter: &str, limit: i64) -> String {
    let mut sql = format!("SELECT * FROM {object}");
    if !filter.trim().is_empty() {
        sql.push(' ');
        sql.push_str(filter.trim());
    }
    if limit > 0 {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    sql
}

fn top_preview(object: &str, filter: &str, limit: i64) -> String {
    let mut sql = if limit > 0 {
        format!("SELECT TOP {limit} * FROM {object}")
    } else {
        format!("SELECT * FROM {object}")
    };
    if !filter.trim().is_empty() {
        sql.push(' ');
        sql.push_str(filter.trim());
    }
    sql
}

/// Run `sql` on a fresh cursor and collect the first column as text.
fn single_column(conn: &dyn DbConnection, sql: &str) -> DbResult<Vec<String>> {
    let cursor = conn.cursor()?;
    cursor.execute(sql, &[])?;
    let mut names = Vec::new();
    loop {
        let rows = cursor.fetch_many(500)?;
        if rows.is_empty() {
            break;
        }
        for row in rows {
            match row.into_iter().next() {
                Some(Value::Null) | None => {}
                Some(value) => names.push(value.to_string()),
            }
        }
    }
    cursor.close();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{Driver, MemoryDriver};
    use std::sync::Arc;
    use std::time::Duration;

    const FIXTURE: &str = r#"
        [[data_sources]]
        name = "mssql"
        dbms_name = "Microsoft SQL Server"
        quote_char = "["
        current_catalog = "master"

        [[data_sources.tables]]
        catalog = "master"
        schema = "dbo"
        name = "t"

        [[data_sources.queries]]
        sql = "SELECT name FROM master.sys.schemas WHERE name NOT IN ('db_owner','db_accessadmin','db_securityadmin','db_ddladmin','db_backupoperator','db_datareader','db_datawriter','db_denydatareader','db_denydatawriter')"
        columns = ["name"]
        rows = [["dbo"], ["sales"]]
    "#;

    fn connect() -> Arc<dyn DbConnection> {
        MemoryDriver::from_toml_str(FIXTURE)
            .unwrap()
            .connect("DSN=mssql;", Duration::from_secs(1))
            .unwrap()
    }

    #[test]
    fn test_family_selection() {
        assert_eq!(DriverQuirks::for_dbms("Microsoft SQL Server").family, "sqlserver");
        assert_eq!(DriverQuirks::for_dbms("PostgreSQL").family, "postgresql");
        assert_eq!(DriverQuirks::for_dbms("MySQL").family, "mysql");
        assert_eq!(DriverQuirks::for_dbms("SQLite").family, "sqlite");
        assert_eq!(DriverQuirks::for_dbms("Oracle").family, "default");
    }

    #[test]
    fn test_sqlserver_schemas_query_sys_schemas() {
        let conn = connect();
        let codec = IdentifierCodec::new("[", "\\");
        let ctx = QuirkContext {
            conn: conn.as_ref(),
            codec: &codec,
            current_catalog: "master",
        };
        let quirks = DriverQuirks::for_dbms("Microsoft SQL Server");
        let hook = quirks.list_schemas.unwrap();
        assert_eq!(hook(&ctx, None).unwrap().unwrap(), vec!["dbo", "sales"]);
        // Unknown catalog: the query fails and the default rule answers empty.
        assert_eq!(hook(&ctx, Some("other")).unwrap().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_search_hooks() {
        let conn = connect();
        let codec = IdentifierCodec::new("\"", "\\");
        let ctx = QuirkContext {
            conn: conn.as_ref(),
            codec: &codec,
            current_catalog: "my_db",
        };
        let mut args = SearchArgs {
            catalog: "\0".into(),
            schema: "\0".into(),
            name: String::new(),
        };
        assert!(!sqlserver_tables(&ctx, &mut args));

        args.catalog = "my\\_db".into();
        assert!(current_catalog_only(&ctx, &mut args));
        args.catalog = "other".into();
        assert!(!current_catalog_only(&ctx, &mut args));

        let mut args = SearchArgs {
            catalog: "null".into(),
            schema: "shop".into(),
            name: "t".into(),
        };
        assert!(swap_catalog_and_schema(&ctx, &mut args));
        assert_eq!(args.catalog, "shop");
        assert_eq!(args.schema, "null");
    }

    #[test]
    fn test_default_schema_scope() {
        let conn = connect();
        let codec = IdentifierCodec::new("\"", "\\");
        let ctx = QuirkContext {
            conn: conn.as_ref(),
            codec: &codec,
            current_catalog: "my_db",
        };
        assert!(schemas_of_current_catalog(&ctx, None).is_none());
        assert!(schemas_of_current_catalog(&ctx, Some("my\\_db")).is_none());
        assert_eq!(
            schemas_of_current_catalog(&ctx, Some("elsewhere")).unwrap().unwrap(),
            Vec::<String>::new()
        );
    }

    #[test]
    fn test_preview_sql() {
        let default = DriverQuirks::default();
        assert_eq!(default.preview_sql("t", "", 10), "SELECT * FROM t LIMIT 10");
        assert_eq!(default.preview_sql("t", "WHERE a = 1", 0), "SELECT * FROM t WHERE a = 1");
        let mssql = DriverQuirks::for_dbms("Microsoft SQL Server");
        assert_eq!(mssql.preview_sql("t", "WHERE a = 1", 5), "SELECT TOP 5 * FROM t WHERE a = 1");
        assert_eq!(mssql.preview_sql("t", "", -1), "SELECT * FROM t");
    }
}
