use super::Dialect;
use crate::sql_generator::fragment::Fragment;
use crate::value::SqlType;

/// SQL Server 2012+: bracketed identifiers, `@0` placeholders,
/// `OFFSET .. FETCH` paging.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn quote_name(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("@{index}")
    }

    fn format_bytes(&self, bytes: &[u8]) -> String {
        format!("0x{}", hex::encode(bytes))
    }

    fn concat(&self, args: Vec<Fragment>) -> Fragment {
        Fragment::call("CONCAT", args)
    }

    fn sql_type_name(&self, sql_type: SqlType) -> &'static str {
        match sql_type {
            SqlType::Bool => "BIT",
            SqlType::Int => "INT",
            SqlType::BigInt => "BIGINT",
            SqlType::Float => "FLOAT",
            SqlType::Text => "NVARCHAR(MAX)",
            SqlType::Bytes => "VARBINARY(MAX)",
            SqlType::Date => "DATE",
            SqlType::DateTime => "DATETIME2",
            SqlType::Uuid => "UNIQUEIDENTIFIER",
        }
    }

    /// OFFSET/FETCH is only legal after an ORDER BY; order by the first
    /// column when the query has none.
    fn limit_clause(&self, offset: Option<u64>, rows: Option<u64>, has_order_by: bool) -> Option<String> {
        if offset.is_none() && rows.is_none() {
            return None;
        }
        let mut clause = String::new();
        if !has_order_by {
            clause.push_str("ORDER BY 1 ");
        }
        clause.push_str(&format!("OFFSET {} ROWS", offset.unwrap_or(0)));
        if let Some(rows) = rows {
            clause.push_str(&format!(" FETCH NEXT {rows} ROWS ONLY"));
        }
        Some(clause)
    }

    fn insert_returning_id(&self, insert_sql: &str, _quoted_pk: &str) -> String {
        format!("{insert_sql}; SELECT SCOPE_IDENTITY()")
    }
}
