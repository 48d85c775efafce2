use std::fmt;

use serde::{Deserialize, Serialize};
use sqlparser::dialect::{
    AnsiDialect, BigQueryDialect, DatabricksDialect, Dialect, DuckDbDialect, GenericDialect,
    HiveDialect, MySqlDialect, PostgreSqlDialect, SnowflakeDialect,
};

/// SQL dialect used to parse the query corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// Permissive dialect accepting most common syntax.
    Generic,
    /// Databricks SQL (the query-history source the profiler was built for).
    #[default]
    Databricks,
    /// Snowflake.
    Snowflake,
    /// `PostgreSQL`.
    Postgres,
    /// `MySQL`.
    Mysql,
    /// Google `BigQuery`.
    Bigquery,
    /// Apache Hive / Spark SQL.
    Hive,
    /// `DuckDB`.
    Duckdb,
    /// Strict ANSI SQL.
    Ansi,
}

impl DialectKind {
    /// Build the `sqlparser` dialect for this kind.
    pub fn dialect(self) -> Box<dyn Dialect> {
        match self {
            DialectKind::Generic => Box::new(GenericDialect {}),
            DialectKind::Databricks => Box::new(DatabricksDialect {}),
            DialectKind::Snowflake => Box::new(SnowflakeDialect {}),
            DialectKind::Postgres => Box::new(PostgreSqlDialect {}),
            DialectKind::Mysql => Box::new(MySqlDialect {}),
            DialectKind::Bigquery => Box::new(BigQueryDialect {}),
            DialectKind::Hive => Box::new(HiveDialect {}),
            DialectKind::Duckdb => Box::new(DuckDbDialect {}),
            DialectKind::Ansi => Box::new(AnsiDialect {}),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DialectKind::Generic => "generic",
            DialectKind::Databricks => "databricks",
            DialectKind::Snowflake => "snowflake",
            DialectKind::Postgres => "postgres",
            DialectKind::Mysql => "mysql",
            DialectKind::Bigquery => "bigquery",
            DialectKind::Hive => "hive",
            DialectKind::Duckdb => "duckdb",
            DialectKind::Ansi => "ansi",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for DialectKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generic" => Ok(DialectKind::Generic),
            "databricks" | "spark" => Ok(DialectKind::Databricks),
            "snowflake" => Ok(DialectKind::Snowflake),
            "postgres" | "postgresql" => Ok(DialectKind::Postgres),
            "mysql" => Ok(DialectKind::Mysql),
            "bigquery" => Ok(DialectKind::Bigquery),
            "hive" => Ok(DialectKind::Hive),
            "duckdb" => Ok(DialectKind::Duckdb),
            "ansi" => Ok(DialectKind::Ansi),
            _ => Err(format!("Invalid SQL dialect: {s}")),
        }
    }
}
