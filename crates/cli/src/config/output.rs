use indexmap::IndexMap;
use prettytable::{
    format::{FormatBuilder, LinePosition, LineSeparator},
    row, Cell, Table,
};
use serde::Serialize;
use serde_json::{Map, Value};

/// Output format.
#[derive(
    clap::ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Table.
    #[default]
    Table,
    /// JSON.
    Json,
}

impl OutputFormat {
    /// Returns whether the format is [`OutputFormat::Table`].
    pub fn is_table(&self) -> bool {
        matches!(self, Self::Table)
    }

    /// Display a single serializable item.
    pub fn display_one(&self, item: impl Serialize, options: DisplayOptions) -> eyre::Result<String> {
        let row = self.to_row(item, &options)?;
        match self {
            Self::Json => Ok(serde_json::to_string_pretty(&row)?),
            Self::Table => {
                let mut table = new_table(row!["Key", "Value"]);
                for (key, value) in &row {
                    table.add_row(row![key, cell(value)]);
                }
                Ok(table.to_string())
            }
        }
    }

    /// Display a list of serializable items.
    pub fn display_many(
        &self,
        items: impl IntoIterator<Item = impl Serialize>,
        options: DisplayOptions,
    ) -> eyre::Result<String> {
        let rows = items
            .into_iter()
            .map(|item| self.to_row(item, &options))
            .collect::<eyre::Result<Vec<_>>>()?;
        match self {
            Self::Json => Ok(serde_json::to_string_pretty(&rows)?),
            Self::Table => {
                let Some(first) = rows.first() else {
                    return Ok("empty".to_string());
                };
                let mut table = new_table(first.keys().into());
                for row in &rows {
                    table.add_row(row.values().map(cell).collect());
                }
                Ok(table.to_string())
            }
        }
    }

    fn to_row(&self, item: impl Serialize, options: &DisplayOptions) -> eyre::Result<Row> {
        let Value::Object(map) = serde_json::to_value(item)? else {
            eyre::bail!("internal: only map-like structures are supported");
        };
        let projection = options
            .projection
            .as_ref()
            .filter(|_| self.is_table() || !options.projection_table_only);
        let Some(projection) = projection else {
            return Ok(map);
        };
        let mut flat = Row::new();
        flatten_into(&mut flat, "", map);
        Ok(projection
            .iter()
            .map(|(key, title)| (title.clone(), flat.get(key).cloned().unwrap_or(Value::Null)))
            .collect())
    }
}

type Row = Map<String, Value>;

/// Display options.
#[derive(Debug, Clone, Default)]
pub struct DisplayOptions {
    /// Dotted keys to keep, in order, each mapped to the name it is shown under.
    pub projection: Option<IndexMap<String, String>>,
    /// Apply the projection to table output only.
    pub projection_table_only: bool,
}

impl DisplayOptions {
    /// Create a projection for table format only.
    pub fn table_projection(
        keys: impl IntoIterator<Item = (impl ToString, impl ToString)>,
    ) -> Self {
        Self::projection(keys, true)
    }

    /// Create a projection.
    pub fn projection(
        keys: impl IntoIterator<Item = (impl ToString, impl ToString)>,
        projection_table_only: bool,
    ) -> Self {
        Self {
            projection: Some(
                keys.into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            projection_table_only,
        }
    }
}

fn new_table(titles: prettytable::Row) -> Table {
    let mut table = Table::new();
    table.set_format(
        FormatBuilder::new()
            .padding(0, 2)
            .separator(LinePosition::Title, LineSeparator::new('-', '+', '+', '+'))
            .build(),
    );
    table.set_titles(titles);
    table
}

fn cell(value: &Value) -> Cell {
    match value {
        Value::String(s) => Cell::new(s),
        Value::Null => Cell::new(""),
        other => Cell::new(&other.to_string()),
    }
}

/// Nested objects become `parent.child` keys.
fn flatten_into(out: &mut Row, prefix: &str, map: Row) {
    for (key, value) in map {
        let key = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) => flatten_into(out, &key, inner),
            value => {
                out.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn projection_flattens_nested_keys() -> eyre::Result<()> {
        let item = json!({
            "member": 7,
            "balance": { "available": "1.5", "locked": "0" },
        });
        let options = DisplayOptions::projection(
            [("member", "member"), ("balance.available", "available")],
            false,
        );
        let output = OutputFormat::Json.display_one(item, options)?;
        let value: Value = serde_json::from_str(&output)?;
        assert_eq!(value, json!({ "member": 7, "available": "1.5" }));
        Ok(())
    }

    #[test]
    fn table_only_projection_keeps_json_intact() -> eyre::Result<()> {
        let items = [json!({ "level": 1, "locked": "2" })];
        let options = DisplayOptions::table_projection([("level", "Level")]);
        let output = OutputFormat::Json.display_many(items.clone(), options.clone())?;
        let value: Value = serde_json::from_str(&output)?;
        assert_eq!(value, json!([{ "level": 1, "locked": "2" }]));

        let table = OutputFormat::Table.display_many(items, options)?;
        assert!(table.contains("Level"));
        assert!(!table.contains("locked"));
        Ok(())
    }

    #[test]
    fn empty_list() -> eyre::Result<()> {
        let items: [Value; 0] = [];
        assert_eq!(
            OutputFormat::Table.display_many(items, DisplayOptions::default())?,
            "empty"
        );
        Ok(())
    }
}
