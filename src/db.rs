use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, Row};

use crate::error::SetupError;

/// A row type with a fixed table layout in the record store.
pub trait Table: Sized {
    const NAME: &'static str;
    /// Column definitions, in insert order.
    const COLUMNS: &'static [(&'static str, &'static str)];

    fn bind(&self, stmt: &mut rusqlite::Statement<'_>) -> rusqlite::Result<usize>;
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

fn create_sql<T: Table>() -> String {
    let cols: Vec<String> = T::COLUMNS
        .iter()
        .map(|(name, ty)| format!("{} {}", name, ty))
        .collect();
    format!("CREATE TABLE IF NOT EXISTS {} ({})", T::NAME, cols.join(", "))
}

fn insert_sql<T: Table>() -> String {
    let names: Vec<&str> = T::COLUMNS.iter().map(|(name, _)| *name).collect();
    let slots: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        T::NAME,
        names.join(", "),
        slots.join(", ")
    )
}

fn select_sql<T: Table>() -> String {
    let names: Vec<&str> = T::COLUMNS.iter().map(|(name, _)| *name).collect();
    format!("SELECT {} FROM {} ORDER BY rowid", names.join(", "), T::NAME)
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, SetupError> {
        let open = || -> rusqlite::Result<Connection> {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .map_err(|_| rusqlite::Error::InvalidPath(dir.to_path_buf()))?;
            }
            let conn = Connection::open(path)?;
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
            Ok(conn)
        };
        let conn = open().map_err(|source| SetupError::OpenStore {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Store { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Ok(Store {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Drop and recreate the table for `T`.
    pub fn create_or_clear<T: Table>(&self) -> Result<()> {
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {};", T::NAME))?;
        self.ensure::<T>()
    }

    /// Create the table for `T` if it does not exist yet; existing rows are kept.
    pub fn ensure<T: Table>(&self) -> Result<()> {
        self.conn
            .execute(&create_sql::<T>(), [])
            .with_context(|| format!("creating table {}", T::NAME))?;
        Ok(())
    }

    pub fn append<T: Table>(&self, row: &T) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(&insert_sql::<T>())?;
        row.bind(&mut stmt)?;
        Ok(())
    }

    /// Append all rows in one transaction: either every row lands or none does.
    pub fn append_many<T: Table>(&self, rows: &[T]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(&insert_sql::<T>())?;
            for row in rows {
                count += row.bind(&mut stmt)?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn read_all<T: Table>(&self) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(&select_sql::<T>())?;
        let rows = stmt
            .query_map([], T::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count<T: Table>(&self) -> Result<usize> {
        let n: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", T::NAME), [], |r| r.get(0))?;
        Ok(n as usize)
    }

    // ── Output table ──

    /// Every URL already present in the output table.
    pub fn scraped_urls(&self) -> Result<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT source_url FROM {}", ExtractedFiling::NAME))?;
        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(urls)
    }

    pub fn completed_by_category(&self) -> Result<HashMap<String, usize>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT category, COUNT(*) FROM {} GROUP BY category",
            ExtractedFiling::NAME
        ))?;
        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(counts)
    }
}

// ── Rows ──

/// One line of an archive period index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub cik: String,
    pub company_name: String,
    pub form_type: String,
    pub filing_date: String,
    pub document_path: String,
}

impl Table for IndexRecord {
    const NAME: &'static str = "filing_index";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("cik", "TEXT NOT NULL"),
        ("company_name", "TEXT NOT NULL"),
        ("form_type", "TEXT NOT NULL"),
        ("filing_date", "TEXT NOT NULL"),
        ("document_path", "TEXT NOT NULL"),
    ];

    fn bind(&self, stmt: &mut rusqlite::Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(rusqlite::params![
            self.cik,
            self.company_name,
            self.form_type,
            self.filing_date,
            self.document_path,
        ])
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(IndexRecord {
            cik: row.get(0)?,
            company_name: row.get(1)?,
            form_type: row.get(2)?,
            filing_date: row.get(3)?,
            document_path: row.get(4)?,
        })
    }
}

/// Header metadata and keyword tallies pulled from one filing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFiling {
    pub cik: String,
    pub filing_date: String,
    pub form_type: String,
    pub company_name: String,
    pub source_url: String,
    pub splitoff_count: u32,
    pub exchange_count: u32,
    pub stock_exchange_count: u32,
    /// Worklist grouping that produced `source_url`.
    pub category: String,
}

impl Table for ExtractedFiling {
    const NAME: &'static str = "extracted_filings";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("cik", "TEXT NOT NULL"),
        ("filing_date", "TEXT NOT NULL"),
        ("form_type", "TEXT NOT NULL"),
        ("company_name", "TEXT NOT NULL"),
        ("source_url", "TEXT NOT NULL"),
        ("splitoff_count", "INTEGER NOT NULL DEFAULT 0"),
        ("exchange_count", "INTEGER NOT NULL DEFAULT 0"),
        ("stock_exchange_count", "INTEGER NOT NULL DEFAULT 0"),
        ("category", "TEXT NOT NULL"),
    ];

    fn bind(&self, stmt: &mut rusqlite::Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(rusqlite::params![
            self.cik,
            self.filing_date,
            self.form_type,
            self.company_name,
            self.source_url,
            self.splitoff_count,
            self.exchange_count,
            self.stock_exchange_count,
            self.category,
        ])
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ExtractedFiling {
            cik: row.get(0)?,
            filing_date: row.get(1)?,
            form_type: row.get(2)?,
            company_name: row.get(3)?,
            source_url: row.get(4)?,
            splitoff_count: row.get(5)?,
            exchange_count: row.get(6)?,
            stock_exchange_count: row.get(7)?,
            category: row.get(8)?,
        })
    }
}
