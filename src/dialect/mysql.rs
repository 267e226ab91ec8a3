use super::Dialect;
use crate::sql_generator::fragment::Fragment;
use crate::value::SqlType;

/// MySQL / MariaDB: backtick identifiers, `@0` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_name(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("@{index}")
    }

    fn concat(&self, args: Vec<Fragment>) -> Fragment {
        Fragment::call("CONCAT", args)
    }

    fn sql_type_name(&self, sql_type: SqlType) -> &'static str {
        match sql_type {
            SqlType::Bool => "UNSIGNED",
            SqlType::Int | SqlType::BigInt => "SIGNED",
            SqlType::Float => "DECIMAL(38,6)",
            SqlType::Text | SqlType::Uuid => "CHAR",
            SqlType::Bytes => "BINARY",
            SqlType::Date => "DATE",
            SqlType::DateTime => "DATETIME",
        }
    }

    fn limit_clause(&self, offset: Option<u64>, rows: Option<u64>, _has_order_by: bool) -> Option<String> {
        match (offset, rows) {
            (None, None) => None,
            (None, Some(rows)) => Some(format!("LIMIT {rows}")),
            (Some(offset), Some(rows)) => Some(format!("LIMIT {offset}, {rows}")),
            (Some(offset), None) => Some(format!("LIMIT {offset}, {}", u64::MAX)),
        }
    }

    fn insert_returning_id(&self, insert_sql: &str, _quoted_pk: &str) -> String {
        format!("{insert_sql}; SELECT LAST_INSERT_ID()")
    }
}
