//! Schema catalog handed to the model.
//!
//! The built-in catalog describes the three tables of the `agent` schema,
//! how the glucose reading is embedded in free text, and worked example
//! queries. A deployment may replace the whole description with a file.

use std::path::Path;

use crate::error::{AgentError, Result};

/// Expression that recovers the numeric glucose value from `bs_rslt_cn`.
pub const GLUCOSE_EXTRACT_EXPR: &str =
    "CAST(SUBSTRING(bs_rslt_cn FROM 'Glucose Level: ([0-9]+)') AS INTEGER)";

/// A documented table in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDoc {
    /// Schema-qualified table name.
    pub name: String,
    /// Short description of what the table holds.
    pub description: String,
    pub columns: Vec<ColumnDoc>,
}

impl TableDoc {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            columns: Vec::new(),
        }
    }

    /// Adds a column.
    pub fn column(mut self, column: ColumnDoc) -> Self {
        self.columns.push(column);
        self
    }

    fn format_for_llm(&self, index: usize) -> String {
        let column_lines = self
            .columns
            .iter()
            .map(ColumnDoc::format_line)
            .collect::<Vec<_>>()
            .join("");

        format!(
            "{}. {} ({})\n{}\n",
            index + 1,
            self.name,
            self.description,
            column_lines
        )
    }
}

/// A documented column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDoc {
    pub name: String,
    pub data_type: String,
    pub primary_key: bool,
    pub description: String,
}

impl ColumnDoc {
    pub fn new(
        name: impl Into<String>,
        data_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            primary_key: false,
            description: description.into(),
        }
    }

    /// Marks the column as part of the primary key.
    pub fn pk(mut self) -> Self {
        self.primary_key = true;
        self
    }

    fn format_line(&self) -> String {
        let annotation = if self.primary_key { ", PK" } else { "" };
        format!(
            "   - {} ({}{}): {}\n",
            self.name, self.data_type, annotation, self.description
        )
    }
}

/// Static description of the queryable tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaCatalog {
    text: String,
}

impl SchemaCatalog {
    /// Creates a catalog from a hand-written description.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Loads a replacement description from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AgentError::config(format!(
                "Failed to read catalog file {}: {}",
                path.display(),
                e
            ))
        })?;

        if text.trim().is_empty() {
            return Err(AgentError::config(format!(
                "Catalog file {} is empty",
                path.display()
            )));
        }

        Ok(Self::new(text))
    }

    /// The built-in catalog for the health monitoring database.
    pub fn health() -> Self {
        let tables = health_tables();
        let tables_text = tables
            .iter()
            .enumerate()
            .map(|(i, table)| table.format_for_llm(i))
            .collect::<Vec<_>>()
            .join("");

        Self::new(format!(
            "Database Schema:\n\n{}{}{}",
            tables_text,
            health_notes(),
            health_examples()
        ))
    }

    /// Returns the description handed to the model.
    pub fn describe(&self) -> &str {
        &self.text
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::health()
    }
}

fn health_tables() -> Vec<TableDoc> {
    vec![
        TableDoc::new("agent.tb_user_info", "user information")
            .column(ColumnDoc::new("user_uuid", "VARCHAR(32)", "user UUID").pk())
            .column(ColumnDoc::new("eml_addr", "VARCHAR(320)", "email address"))
            .column(ColumnDoc::new("flnm", "VARCHAR(300)", "full name"))
            .column(ColumnDoc::new("gndr_cd", "CHAR(1)", "gender code (M/F)"))
            .column(ColumnDoc::new("brdt", "VARCHAR(300)", "birth date (YYYYMMDD)"))
            .column(ColumnDoc::new("ntn_cd", "CHAR(2)", "country code"))
            .column(ColumnDoc::new("ntn_no", "VARCHAR(10)", "country calling number"))
            .column(ColumnDoc::new("mbl_telno", "VARCHAR(300)", "mobile phone number"))
            .column(ColumnDoc::new("user_type_cd", "CHAR(5)", "user type code"))
            .column(ColumnDoc::new("join_dt", "TIMESTAMP", "sign-up time"))
            .column(ColumnDoc::new("use_yn", "CHAR(1)", "active flag (Y/N)"))
            .column(ColumnDoc::new("reg_dt", "TIMESTAMP", "registration time")),
        TableDoc::new("agent.tb_glucose_msrmt", "blood glucose measurements")
            .column(ColumnDoc::new("user_uuid", "VARCHAR(32)", "user UUID").pk())
            .column(ColumnDoc::new("sn_nm", "VARCHAR(100)", "device serial number").pk())
            .column(ColumnDoc::new("msrmt_ymd", "CHAR(8)", "measurement date (YYYYMMDD)").pk())
            .column(ColumnDoc::new("bs_rslt_cn", "TEXT", "glucose measurement result"))
            .column(ColumnDoc::new("rd_cn", "TEXT", "raw device data"))
            .column(ColumnDoc::new("reg_dt", "TIMESTAMP", "registration time")),
        TableDoc::new("agent.tb_sensor_log", "sensor log")
            .column(ColumnDoc::new("user_uuid", "VARCHAR(32)", "user UUID").pk())
            .column(ColumnDoc::new("sn_nm", "VARCHAR(100)", "device serial number").pk())
            .column(
                ColumnDoc::new("msrmt_dt", "TIMESTAMP WITH TIME ZONE", "measurement time").pk(),
            )
            .column(ColumnDoc::new("analog_glucose", "TEXT", "analog glucose value"))
            .column(ColumnDoc::new("rcd_indx_no", "TEXT", "record index number"))
            .column(ColumnDoc::new("reg_dt", "TIMESTAMP", "registration time")),
    ]
}

fn health_notes() -> String {
    format!(
        "Notes:\n\
         - All tables live in the agent schema\n\
         - Date format: YYYYMMDD (e.g. 20251205)\n\
         - Use LIKE when searching users by name\n\
         - Join tables on user_uuid\n\
         \n\
         Important: bs_rslt_cn format\n\
         - bs_rslt_cn is TEXT shaped like \"Glucose Level: 126\"\n\
         - Extract the numeric value with:\n\
         \x20 {}\n\n",
        GLUCOSE_EXTRACT_EXPR
    )
}

fn health_examples() -> String {
    format!(
        "Example queries:\n\
         \n\
         1. Find users:\n\
         SELECT * FROM agent.tb_user_info WHERE flnm LIKE '%User_1%' LIMIT 10\n\
         \n\
         2. Glucose readings with the value extracted:\n\
         SELECT user_uuid, msrmt_ymd, bs_rslt_cn, {expr} AS glucose_value\n\
         FROM agent.tb_glucose_msrmt\n\
         WHERE user_uuid = 'xxx'\n\
         ORDER BY msrmt_ymd DESC\n\
         LIMIT 10\n\
         \n\
         3. Glucose analysis with a CTE:\n\
         WITH user_glucose AS (\n\
         \x20   SELECT msrmt_ymd, {expr} AS glucose_value\n\
         \x20   FROM agent.tb_glucose_msrmt\n\
         \x20   WHERE user_uuid = 'xxx'\n\
         )\n\
         SELECT msrmt_ymd, glucose_value,\n\
         \x20   CASE\n\
         \x20       WHEN glucose_value < 70 THEN 'low'\n\
         \x20       WHEN glucose_value > 140 THEN 'high'\n\
         \x20       ELSE 'normal'\n\
         \x20   END AS status\n\
         FROM user_glucose\n\
         ORDER BY msrmt_ymd DESC\n",
        expr = GLUCOSE_EXTRACT_EXPR
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::classify_text;
    use std::io::Write;

    #[test]
    fn test_health_catalog_lists_tables() {
        let catalog = SchemaCatalog::health();
        let text = catalog.describe();

        for table in [
            "agent.tb_user_info",
            "agent.tb_glucose_msrmt",
            "agent.tb_sensor_log",
        ] {
            assert!(text.contains(table), "missing table {}", table);
        }
        assert!(text.contains("   - user_uuid (VARCHAR(32), PK): user UUID\n"));
        assert!(text.contains("   - bs_rslt_cn (TEXT): glucose measurement result\n"));
    }

    #[test]
    fn test_health_catalog_explains_glucose_extraction() {
        let text = SchemaCatalog::health().describe().to_string();
        assert!(text.contains("Glucose Level: 126"));
        assert!(text.contains(GLUCOSE_EXTRACT_EXPR));
    }

    #[test]
    fn test_example_queries_pass_the_guard() {
        let text = SchemaCatalog::health().describe().to_string();
        let examples = text
            .split("Example queries:")
            .nth(1)
            .expect("examples section");

        let queries: Vec<String> = examples
            .split("\n\n")
            .filter_map(|block| block.split_once(":\n").map(|(_, sql)| sql.trim().to_string()))
            .collect();

        assert_eq!(queries.len(), 3);
        for sql in queries {
            assert!(classify_text(&sql).is_allowed(), "rejected: {}", sql);
        }
    }

    #[test]
    fn test_table_doc_format() {
        let table = TableDoc::new("agent.t", "things")
            .column(ColumnDoc::new("id", "INT", "identifier").pk())
            .column(ColumnDoc::new("name", "TEXT", "label"));

        assert_eq!(
            table.format_for_llm(0),
            "1. agent.t (things)\n   - id (INT, PK): identifier\n   - name (TEXT): label\n\n"
        );
    }

    #[test]
    fn test_custom_catalog() {
        let catalog = SchemaCatalog::new("Table: widgets");
        assert_eq!(catalog.describe(), "Table: widgets");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Table: agent.readings (id INT)").unwrap();

        let catalog = SchemaCatalog::from_file(file.path()).unwrap();
        assert_eq!(catalog.describe(), "Table: agent.readings (id INT)");
    }

    #[test]
    fn test_from_file_rejects_empty_or_missing() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(SchemaCatalog::from_file(file.path()).is_err());

        let missing = SchemaCatalog::from_file(Path::new("/nonexistent/catalog.txt"));
        assert!(matches!(missing, Err(AgentError::Config(_))));
    }
}
