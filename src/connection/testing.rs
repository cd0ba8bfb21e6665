//! Shared fixture for tests that need a live session.

use std::sync::Arc;
use std::time::Duration;

use super::Session;
use crate::driver::MemoryDriver;

pub(crate) const FIXTURE: &str = r#"
[[data_sources]]
name = "shop"
description = "Order database"
dbms_name = "PostgreSQL"
current_catalog = "shop"
catalogs = ["shop", "archive"]

[[data_sources.tables]]
catalog = "shop"
schema = "public"
name = "orders"
columns = [
    { name = "id", type_name = "integer", nullable = false },
    { name = "customer_id", type_name = "integer" },
    { name = "total", type_name = "numeric", default = "0" },
]
rows = [[1, 10, 5.5], [2, 11, 7.25]]

[[data_sources.tables]]
catalog = "shop"
schema = "public"
name = "customers"
columns = [
    { name = "id", type_name = "integer", nullable = false },
    { name = "Name" },
    { name = "email" },
]
rows = [[10, "Ann", "ann@example.com"], [11, "Bo", "bo@example.com"]]

[[data_sources.tables]]
catalog = "shop"
schema = "public"
name = "order_summary"
kind = "VIEW"
columns = [{ name = "customer_id", type_name = "integer" }, { name = "spent", type_name = "numeric" }]

[[data_sources.tables]]
catalog = "shop"
schema = "audit"
name = "log"
columns = [{ name = "id", type_name = "integer" }, { name = "message" }]

[[data_sources.tables]]
catalog = "archive"
schema = "public"
name = "old_orders"
columns = [{ name = "id", type_name = "integer" }]

[[data_sources.procedures]]
catalog = "shop"
schema = "public"
name = "total_spent"
parameters = [{ name = "customer", type_name = "integer" }]

[[data_sources.foreign_keys]]
catalog = "shop"
parent_schema = "public"
parent_table = "customers"
parent_column = "id"
child_schema = "public"
child_table = "orders"
child_column = "customer_id"

[[data_sources.queries]]
sql = "SELECT 1"
columns = ["one"]
rows = [[1]]

[[data_sources.queries]]
sql = "SELECT boom"
error = 'relation "boom" does not exist'

[[data_sources.queries]]
sql = "SELECT slow"
columns = ["x"]
delay_ms = 3000

[[data_sources.queries]]
sql = "SELECT n"
columns = ["n"]
rows = [[0], [1], [2], [3], [4], [5], [6], [7], [8], [9]]
fetch_delay_ms = 5

[[data_sources]]
name = "notes"
dbms_name = "SQLite"
catalog_support = false

[[data_sources.tables]]
name = "notes"
columns = [{ name = "id", type_name = "integer" }, { name = "body", type_name = "text" }]

[[data_sources.tables]]
name = "tags"
columns = [{ name = "note_id", type_name = "integer" }, { name = "tag", type_name = "text" }]
"#;

/// A disconnected session for `dsn` over `fixture`.
pub(crate) fn session_from(fixture: &str, dsn: &str) -> Arc<Session> {
    let driver = MemoryDriver::from_toml_str(fixture).unwrap();
    Arc::new(Session::new(dsn, Arc::new(driver), Duration::from_secs(2)))
}

/// The `shop` session, connected.
pub(crate) fn shop() -> Arc<Session> {
    let session = session_from(FIXTURE, "shop");
    session.connect("", "", false).unwrap();
    session
}
