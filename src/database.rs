//! Database file detection and metadata-only summaries.
//!
//! Database files are recognized by extension before any attempt to decode
//! them as text. SQLite files are opened read-only to count tables and read
//! page statistics; every other format gets a static description. Row data
//! is never read.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use tracing::debug;

use crate::walker::DiscoveredEntry;

/// Number of tables listed with column counts in a rendered summary.
pub const LISTED_TABLES: usize = 3;

/// Known database families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DbKind {
    Sqlite,
    Mysql,
    Postgresql,
    Mongodb,
    Redis,
    Access,
    Dbase,
    Generic,
}

impl DbKind {
    /// Every kind, in declaration order.
    pub fn all() -> &'static [DbKind] {
        &[
            DbKind::Sqlite,
            DbKind::Mysql,
            DbKind::Postgresql,
            DbKind::Mongodb,
            DbKind::Redis,
            DbKind::Access,
            DbKind::Dbase,
            DbKind::Generic,
        ]
    }

    /// Lowercase extensions (without the dot) recognized for this kind.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            DbKind::Sqlite => &["db", "sqlite", "sqlite3"],
            DbKind::Mysql => &["frm", "myd", "myi", "ibd"],
            DbKind::Postgresql => &["pgc", "pgd"],
            DbKind::Mongodb => &["bson", "wt"],
            DbKind::Redis => &["rdb"],
            DbKind::Access => &["mdb", "accdb"],
            DbKind::Dbase => &["dbf", "dbc"],
            DbKind::Generic => &[],
        }
    }

    /// Map a lowercase extension to a kind.
    pub fn from_extension(ext: &str) -> Option<DbKind> {
        match ext {
            "db" | "sqlite" | "sqlite3" => Some(DbKind::Sqlite),
            "frm" | "myd" | "myi" | "ibd" => Some(DbKind::Mysql),
            "pgc" | "pgd" => Some(DbKind::Postgresql),
            "bson" | "wt" => Some(DbKind::Mongodb),
            "rdb" => Some(DbKind::Redis),
            "mdb" | "accdb" => Some(DbKind::Access),
            "dbf" | "dbc" => Some(DbKind::Dbase),
            _ => None,
        }
    }
}

impl fmt::Display for DbKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DbKind::Sqlite => "sqlite",
            DbKind::Mysql => "mysql",
            DbKind::Postgresql => "postgresql",
            DbKind::Mongodb => "mongodb",
            DbKind::Redis => "redis",
            DbKind::Access => "access",
            DbKind::Dbase => "dbase",
            DbKind::Generic => "generic",
        };
        write!(f, "{name}")
    }
}

/// Database kind for a recognized extension. Never returns
/// [`DbKind::Generic`].
pub fn detect_kind(entry: &DiscoveredEntry) -> Option<DbKind> {
    let ext = entry.extension.as_deref()?;
    DbKind::from_extension(&ext.to_lowercase())
}

/// Explicit probe: like [`detect_kind`], but unknown extensions land in
/// the [`DbKind::Generic`] bucket.
pub fn probe_kind(entry: &DiscoveredEntry) -> DbKind {
    detect_kind(entry).unwrap_or(DbKind::Generic)
}

/// One column from `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: String,
    pub not_null: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_sql: Option<String>,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeInfo {
    pub page_size: u64,
    pub page_count: u64,
    pub estimated_size: u64,
}

/// Metadata-only description of a database file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseSummary {
    pub kind: DbKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_count: Option<u64>,
    /// Per-table schema, keyed by table name. Empty unless schema
    /// extraction was requested and succeeded.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub schema: BTreeMap<String, TableSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeInfo>,
    /// Static description of the on-disk format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    pub binary_format: bool,
}

impl DatabaseSummary {
    /// A summary carrying only the kind.
    pub fn empty(kind: DbKind) -> Self {
        Self {
            kind,
            table_count: None,
            schema: BTreeMap::new(),
            size: None,
            file_type: None,
            binary_format: false,
        }
    }

    /// Column counts for the first [`LISTED_TABLES`] tables.
    pub fn column_counts(&self) -> Vec<(&str, usize)> {
        self.schema
            .iter()
            .take(LISTED_TABLES)
            .map(|(name, table)| (name.as_str(), table.columns.len()))
            .collect()
    }

    /// Human-readable multi-line description used as the entry body.
    pub fn describe(&self, file_size: u64) -> String {
        let mut lines = vec![
            format!("[Database file - {}]", self.kind),
            format!("File size: {file_size} bytes"),
        ];

        if let Some(count) = self.table_count {
            lines.push(format!("Tables: {count}"));
        }

        if let Some(size) = &self.size {
            lines.push(format!("Page size: {} bytes", size.page_size));
            lines.push(format!("Page count: {}", size.page_count));
            lines.push(format!("Estimated size: {} bytes", size.estimated_size));
        }

        if let Some(file_type) = &self.file_type {
            lines.push(format!("File type: {file_type}"));
        }

        if !self.schema.is_empty() {
            let names: Vec<&str> = self.schema.keys().map(String::as_str).collect();
            lines.push(format!("Table names: {}", names.join(", ")));
            for (name, columns) in self.column_counts() {
                lines.push(format!("  - {name}: {columns} columns"));
            }
        }

        lines.join("\n")
    }
}

/// Options for [`summarize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SummarizeOptions {
    /// Capture per-table columns and create statements (SQLite only).
    pub extract_schema: bool,
}

/// Build a summary for `entry` as a database of `kind`. Never fails: a
/// database that cannot be opened or queried yields
/// [`DatabaseSummary::empty`].
pub fn summarize(entry: &DiscoveredEntry, kind: DbKind, options: SummarizeOptions) -> DatabaseSummary {
    match kind {
        DbKind::Sqlite => match summarize_sqlite(&entry.path, options) {
            Ok(summary) => summary,
            Err(e) => {
                debug!("sqlite analysis failed for {}: {e}", entry.path.display());
                DatabaseSummary::empty(DbKind::Sqlite)
            }
        },
        other => DatabaseSummary {
            file_type: Some(file_type_label(other, entry.extension.as_deref())),
            binary_format: true,
            ..DatabaseSummary::empty(other)
        },
    }
}

fn file_type_label(kind: DbKind, ext: Option<&str>) -> String {
    let ext = ext.unwrap_or_default();
    let label = match (kind, ext) {
        (DbKind::Mysql, "frm") => "Table definition file",
        (DbKind::Mysql, "myd") => "MyISAM data file",
        (DbKind::Mysql, "myi") => "MyISAM index file",
        (DbKind::Mysql, "ibd") => "InnoDB data file",
        (DbKind::Mysql, _) => "Unknown MySQL file",
        (DbKind::Postgresql, "pgc") => "PostgreSQL global cache file",
        (DbKind::Postgresql, "pgd") => "PostgreSQL data file",
        (DbKind::Postgresql, _) => "Unknown PostgreSQL file",
        (DbKind::Mongodb, "bson") => "MongoDB BSON data file",
        (DbKind::Mongodb, "wt") => "MongoDB WiredTiger data file",
        (DbKind::Mongodb, _) => "Unknown MongoDB file",
        (DbKind::Redis, _) => "Redis RDB file",
        (DbKind::Access, "accdb") => "Microsoft Access 2007+ database",
        (DbKind::Access, _) => "Microsoft Access database",
        (DbKind::Dbase, "dbc") => "dBASE database container",
        (DbKind::Dbase, _) => "dBASE table file",
        (DbKind::Sqlite, _) => "SQLite database",
        (DbKind::Generic, "") => "unknown database file",
        (DbKind::Generic, ext) => return format!("{ext} database file"),
    };
    label.to_string()
}

/// Connection is dropped (and closed) on every return path.
fn summarize_sqlite(path: &Path, options: SummarizeOptions) -> rusqlite::Result<DatabaseSummary> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    let table_count: u64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
        [],
        |row| row.get(0),
    )?;

    let schema = if options.extract_schema {
        read_schema(&conn)?
    } else {
        BTreeMap::new()
    };

    let page_size: u64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;
    let page_count: u64 = conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;

    Ok(DatabaseSummary {
        kind: DbKind::Sqlite,
        table_count: Some(table_count),
        schema,
        size: Some(SizeInfo {
            page_size,
            page_count,
            estimated_size: page_size.saturating_mul(page_count),
        }),
        file_type: None,
        binary_format: false,
    })
}

fn read_schema(conn: &Connection) -> rusqlite::Result<BTreeMap<String, TableSchema>> {
    let mut stmt = conn.prepare("SELECT name, sql FROM sqlite_master WHERE type = 'table'")?;
    let tables = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut schema = BTreeMap::new();
    for (name, create_sql) in tables {
        let pragma = format!("PRAGMA table_info(\"{}\")", name.replace('"', "\"\""));
        let mut stmt = conn.prepare(&pragma)?;
        let columns = stmt
            .query_map([], |row| {
                Ok(ColumnInfo {
                    name: row.get(1)?,
                    declared_type: row.get(2)?,
                    not_null: row.get::<_, i64>(3)? != 0,
                    default_value: row.get(4)?,
                    primary_key: row.get::<_, i64>(5)? != 0,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        schema.insert(name, TableSchema { create_sql, columns });
    }

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn entry_at(dir: &TempDir, name: &str) -> DiscoveredEntry {
        DiscoveredEntry::from_path(dir.path(), &dir.path().join(name)).unwrap()
    }

    fn bare_entry(name: &str) -> DiscoveredEntry {
        DiscoveredEntry {
            path: PathBuf::from("/nonexistent").join(name),
            relative_path: PathBuf::from(name),
            name: name.to_string(),
            extension: Path::new(name)
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase()),
            size: 0,
            is_file: true,
            is_hidden: false,
            modified: None,
        }
    }

    fn create_sqlite(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL, name TEXT DEFAULT 'anon');
             CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER, body TEXT);
             INSERT INTO users (email) VALUES ('a@example.com');",
        )
        .unwrap();
    }

    #[test]
    fn test_detect_kind_table() {
        assert_eq!(detect_kind(&bare_entry("app.db")), Some(DbKind::Sqlite));
        assert_eq!(detect_kind(&bare_entry("data.SQLITE3")), Some(DbKind::Sqlite));
        assert_eq!(detect_kind(&bare_entry("t.ibd")), Some(DbKind::Mysql));
        assert_eq!(detect_kind(&bare_entry("x.pgd")), Some(DbKind::Postgresql));
        assert_eq!(detect_kind(&bare_entry("dump.bson")), Some(DbKind::Mongodb));
        assert_eq!(detect_kind(&bare_entry("dump.rdb")), Some(DbKind::Redis));
        assert_eq!(detect_kind(&bare_entry("old.accdb")), Some(DbKind::Access));
        assert_eq!(detect_kind(&bare_entry("table.dbf")), Some(DbKind::Dbase));
        assert_eq!(detect_kind(&bare_entry("main.rs")), None);
        assert_eq!(detect_kind(&bare_entry("Makefile")), None);
    }

    #[test]
    fn test_extensions_agree_with_lookup() {
        for kind in DbKind::all() {
            for ext in kind.extensions() {
                assert_eq!(DbKind::from_extension(ext), Some(*kind));
            }
        }
    }

    #[test]
    fn test_probe_falls_back_to_generic() {
        assert_eq!(probe_kind(&bare_entry("blob.dat")), DbKind::Generic);
        assert_eq!(probe_kind(&bare_entry("app.sqlite")), DbKind::Sqlite);
    }

    #[test]
    fn test_sqlite_summary_without_schema() {
        let dir = TempDir::new().unwrap();
        create_sqlite(&dir.path().join("app.sqlite"));

        let summary = summarize(&entry_at(&dir, "app.sqlite"), DbKind::Sqlite, SummarizeOptions::default());

        assert_eq!(summary.kind, DbKind::Sqlite);
        assert_eq!(summary.table_count, Some(2));
        assert!(summary.schema.is_empty());
        let size = summary.size.unwrap();
        assert!(size.page_size > 0);
        assert_eq!(size.estimated_size, size.page_size * size.page_count);
    }

    #[test]
    fn test_sqlite_summary_with_schema() {
        let dir = TempDir::new().unwrap();
        create_sqlite(&dir.path().join("app.db"));

        let summary = summarize(
            &entry_at(&dir, "app.db"),
            DbKind::Sqlite,
            SummarizeOptions { extract_schema: true },
        );

        let users = &summary.schema["users"];
        assert_eq!(users.columns.len(), 3);
        assert!(users.columns[0].primary_key);
        assert_eq!(users.columns[1].name, "email");
        assert_eq!(users.columns[1].declared_type, "TEXT");
        assert!(users.columns[1].not_null);
        assert_eq!(users.columns[2].default_value.as_deref(), Some("'anon'"));
        assert!(users.create_sql.as_deref().unwrap().starts_with("CREATE TABLE users"));

        let description = summary.describe(4096);
        assert!(description.contains("Tables: 2"));
        assert!(description.contains("  - users: 3 columns"));
        // Row data never appears.
        assert!(!description.contains("a@example.com"));
    }

    #[test]
    fn test_empty_sqlite_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.sqlite");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE t (x); DROP TABLE t;")
            .unwrap();

        let summary = summarize(&entry_at(&dir, "empty.sqlite"), DbKind::Sqlite, SummarizeOptions::default());
        assert_eq!(summary.table_count, Some(0));
    }

    #[test]
    fn test_text_file_with_db_extension_yields_empty_summary() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.db"), "just some text\n").unwrap();

        let summary = summarize(&entry_at(&dir, "notes.db"), DbKind::Sqlite, SummarizeOptions::default());
        assert_eq!(summary, DatabaseSummary::empty(DbKind::Sqlite));
    }

    #[test]
    fn test_static_summaries() {
        let summary = summarize(&bare_entry("t.myd"), DbKind::Mysql, SummarizeOptions::default());
        assert_eq!(summary.file_type.as_deref(), Some("MyISAM data file"));
        assert!(summary.binary_format);
        assert_eq!(summary.table_count, None);

        let summary = summarize(&bare_entry("dump.rdb"), DbKind::Redis, SummarizeOptions::default());
        assert_eq!(summary.file_type.as_deref(), Some("Redis RDB file"));

        let summary = summarize(&bare_entry("blob.dat"), DbKind::Generic, SummarizeOptions::default());
        assert_eq!(summary.file_type.as_deref(), Some("dat database file"));
    }

    #[test]
    fn test_describe_static_summary() {
        let summary = summarize(&bare_entry("x.wt"), DbKind::Mongodb, SummarizeOptions::default());
        let text = summary.describe(10);
        assert!(text.starts_with("[Database file - mongodb]\nFile size: 10 bytes"));
        assert!(text.contains("File type: MongoDB WiredTiger data file"));
        assert!(!text.contains("Tables:"));
    }

    #[test]
    fn test_column_counts_limited_to_three_tables() {
        let mut summary = DatabaseSummary::empty(DbKind::Sqlite);
        for name in ["a", "b", "c", "d"] {
            summary.schema.insert(
                name.to_string(),
                TableSchema {
                    create_sql: None,
                    columns: Vec::new(),
                },
            );
        }
        assert_eq!(summary.column_counts().len(), LISTED_TABLES);
    }
}
