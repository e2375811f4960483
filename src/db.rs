use std::collections::HashMap;

use color_eyre::eyre::Context;
use sqlx::Row as _;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tokio_stream::StreamExt;

use crate::error::{LoadError, Result};

/// One parsed CSV row: column name to raw string value. Lives for a single
/// pass of the load loop.
pub type Row = HashMap<String, String>;

pub async fn build(url: &str) -> color_eyre::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect(url)
        .await
        .wrap_err("Failed to open database")?;

    Ok(pool)
}

/// Declared shape of one target table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSchema {
    pub app_label: String,
    pub name: String,
    pub columns: Vec<String>,
}

impl ModelSchema {
    pub fn new(app_label: &str, name: &str, columns: &[&str]) -> Self {
        Self {
            app_label: app_label.to_string(),
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Backing table name: `{app_label}_{name}`, lowercased.
    pub fn table(&self) -> String {
        format!("{}_{}", self.app_label, self.name).to_lowercase()
    }
}

/// Registered models, keyed by `(app_label, name)`.
pub struct Registry {
    pool: SqlitePool,
    models: HashMap<(String, String), ModelSchema>,
}

impl Registry {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            models: HashMap::new(),
        }
    }

    /// Creates the backing table and records the model.
    pub async fn register(&mut self, schema: ModelSchema) -> Result<()> {
        let mut defs = vec!["id INTEGER PRIMARY KEY".to_string()];
        defs.extend(schema.columns.iter().map(|c| format!("\"{c}\" TEXT")));

        let create = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({});",
            schema.table(),
            defs.join(", ")
        );
        sqlx::query(&create).execute(&self.pool).await?;

        self.models
            .insert((schema.app_label.clone(), schema.name.clone()), schema);

        Ok(())
    }

    /// Resolves a registered model to a live handle.
    pub fn get(&self, app_label: &str, model_name: &str) -> Result<Model> {
        let schema = self
            .models
            .get(&(app_label.to_string(), model_name.to_string()))
            .ok_or_else(|| LoadError::ModelNotFound {
                app_label: app_label.to_string(),
                model_name: model_name.to_string(),
            })?;

        Ok(Model {
            schema: schema.clone(),
            pool: self.pool.clone(),
        })
    }
}

/// Live handle to one registered table.
#[derive(Debug, Clone)]
pub struct Model {
    schema: ModelSchema,
    pool: SqlitePool,
}

impl Model {
    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    /// Submits every row as a single multi-row INSERT, preserving row order.
    /// Absent keys bind NULL. Returns the inserted row count.
    pub async fn insert_many(&self, columns: &[String], rows: &[Row]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        for column in columns {
            if !self.schema.columns.contains(column) {
                return Err(LoadError::UnknownColumn {
                    column: column.clone(),
                    model: format!("{}.{}", self.schema.app_label, self.schema.name),
                });
            }
        }

        let column_list = columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let row_values = format!("({})", vec!["?"; columns.len()].join(", "));
        let insert = format!(
            "INSERT INTO \"{}\" ({}) VALUES {};",
            self.schema.table(),
            column_list,
            vec![row_values.as_str(); rows.len()].join(", ")
        );

        let mut query = sqlx::query(&insert);
        for row in rows {
            for column in columns {
                query = query.bind(row.get(column).map(String::as_str));
            }
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Removes every existing row, with foreign key enforcement suspended
    /// around the delete.
    pub async fn truncate(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        sqlx::query("PRAGMA foreign_keys = OFF;")
            .execute(&mut *conn)
            .await?;
        sqlx::query(&format!("DELETE FROM \"{}\";", self.schema.table()))
            .execute(&mut *conn)
            .await?;
        sqlx::query("PRAGMA foreign_keys = ON;")
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) FROM \"{}\";",
            self.schema.table()
        ))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get(0usize)?)
    }

    /// Reads every row back in insertion order.
    pub async fn rows(&self) -> Result<Vec<Row>> {
        let column_list = self
            .schema
            .columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let select = format!(
            "SELECT {} FROM \"{}\" ORDER BY id;",
            column_list,
            self.schema.table()
        );

        let mut fetched = sqlx::query(&select).fetch(&self.pool);

        let mut rows = Vec::new();
        while let Some(fetched_row) = fetched.try_next().await? {
            let mut row = Row::new();
            for (idx, column) in self.schema.columns.iter().enumerate() {
                let value: Option<String> = fetched_row.try_get(idx)?;
                if let Some(value) = value {
                    row.insert(column.clone(), value);
                }
            }
            rows.push(row);
        }

        Ok(rows)
    }
}
