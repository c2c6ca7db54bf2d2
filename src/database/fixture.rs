use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use serde_json::Value;

use super::{MemoryStore, Row};
use crate::schema::validate_identifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureFormat {
    Json,
    Yaml,
}

impl FixtureFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => FixtureFormat::Yaml,
            _ => FixtureFormat::Json,
        }
    }
}

/// Parse `{ "<table>": [ {row}, ... ], ... }`
pub fn parse(contents: &str, format: FixtureFormat) -> anyhow::Result<HashMap<String, Vec<Row>>> {
    let document: Value = match format {
        FixtureFormat::Json => serde_json::from_str(contents).context("invalid JSON fixture")?,
        FixtureFormat::Yaml => serde_yaml::from_str(contents).context("invalid YAML fixture")?,
    };

    let Value::Object(tables) = document else {
        bail!("fixture root must be an object keyed by table name");
    };

    let mut out = HashMap::new();
    for (table, rows) in tables {
        validate_identifier(&table).map_err(|e| anyhow!("fixture table {}: {}", table, e))?;
        let Value::Array(rows) = rows else {
            bail!("fixture table {} must be an array of rows", table);
        };
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| match row {
                Value::Object(map) => Ok(map),
                _ => Err(anyhow!("fixture table {} row {} is not an object", table, i)),
            })
            .collect::<anyhow::Result<Vec<Row>>>()?;
        out.insert(table, rows);
    }
    Ok(out)
}

pub async fn load_file(path: &Path) -> anyhow::Result<MemoryStore> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read fixtures from {}", path.display()))?;
    let tables = parse(&contents, FixtureFormat::from_path(path))?;

    for (table, rows) in &tables {
        tracing::info!(table = %table, rows = rows.len(), "loaded fixture table");
    }
    Ok(MemoryStore::from_tables(tables))
}
