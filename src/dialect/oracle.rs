use super::Dialect;
use crate::sql_generator::fragment::Fragment;
use crate::value::SqlType;

/// Oracle 12c+: double-quoted identifiers, `:0` placeholders, `MOD()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl Dialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn quote_name(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!(":{index}")
    }

    fn format_bytes(&self, bytes: &[u8]) -> String {
        format!("HEXTORAW('{}')", hex::encode(bytes))
    }

    fn modulo(&self, left: Fragment, right: Fragment) -> Fragment {
        Fragment::call("MOD", vec![left, right])
    }

    fn sql_type_name(&self, sql_type: SqlType) -> &'static str {
        match sql_type {
            SqlType::Bool => "NUMBER(1)",
            SqlType::Int => "NUMBER(10)",
            SqlType::BigInt => "NUMBER(19)",
            SqlType::Float => "BINARY_DOUBLE",
            SqlType::Text => "VARCHAR2(4000)",
            SqlType::Bytes => "BLOB",
            SqlType::Date => "DATE",
            SqlType::DateTime => "TIMESTAMP",
            SqlType::Uuid => "VARCHAR2(36)",
        }
    }

    fn limit_clause(&self, offset: Option<u64>, rows: Option<u64>, _has_order_by: bool) -> Option<String> {
        if offset.is_none() && rows.is_none() {
            return None;
        }
        let mut clause = format!("OFFSET {} ROWS", offset.unwrap_or(0));
        if let Some(rows) = rows {
            clause.push_str(&format!(" FETCH NEXT {rows} ROWS ONLY"));
        }
        Some(clause)
    }

    /// The executor binds the trailing output parameter and returns it as
    /// the scalar result.
    fn insert_returning_id(&self, insert_sql: &str, quoted_pk: &str) -> String {
        format!("{insert_sql} RETURNING {quoted_pk} INTO :new_id")
    }
}
