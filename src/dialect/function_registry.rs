/// Portable function names to per-dialect SQL functions
///
/// Lookups go through the dialect override table first, then the common
/// table. Keys are lower-case.
use std::collections::HashMap;

use crate::sql_generator::fragment::Fragment;

/// Function mapping entry
#[derive(Clone)]
pub struct FunctionMapping {
    /// Portable name used in expressions (lowercase for lookup)
    pub name: &'static str,
    /// SQL function emitted for the dialect
    pub sql_name: &'static str,
    /// Optional argument transformation, applied to compiled arguments
    pub arg_transform: Option<fn(Vec<Fragment>) -> Vec<Fragment>>,
}

impl std::fmt::Debug for FunctionMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionMapping")
            .field("name", &self.name)
            .field("sql_name", &self.sql_name)
            .field("arg_transform", &self.arg_transform.is_some())
            .finish()
    }
}

/// Get function mapping for a portable function name under a dialect
pub fn get_function_mapping(dialect: &str, function: &str) -> Option<FunctionMapping> {
    let fn_lower = function.to_lowercase();
    DIALECT_OVERRIDES
        .get(dialect)
        .and_then(|overrides| overrides.get(fn_lower.as_str()))
        .or_else(|| FUNCTION_MAPPINGS.get(fn_lower.as_str()))
        .cloned()
}

fn common(name: &'static str, sql_name: &'static str) -> FunctionMapping {
    FunctionMapping {
        name,
        sql_name,
        arg_transform: None,
    }
}

lazy_static::lazy_static! {
    static ref FUNCTION_MAPPINGS: HashMap<&'static str, FunctionMapping> = {
        let mut m = HashMap::new();

        // ===== STRING FUNCTIONS =====
        m.insert("upper", common("upper", "UPPER"));
        m.insert("lower", common("lower", "LOWER"));
        m.insert("length", common("length", "LENGTH"));
        m.insert("trim", common("trim", "TRIM"));
        m.insert("ltrim", common("ltrim", "LTRIM"));
        m.insert("rtrim", common("rtrim", "RTRIM"));
        m.insert("replace", common("replace", "REPLACE"));
        m.insert("substring", common("substring", "SUBSTRING"));

        // ===== MATH FUNCTIONS =====
        m.insert("abs", common("abs", "ABS"));
        m.insert("round", common("round", "ROUND"));
        m.insert("floor", common("floor", "FLOOR"));
        m.insert("ceiling", common("ceiling", "CEILING"));

        // ===== NULL HANDLING =====
        m.insert("nullif", common("nullif", "NULLIF"));

        m
    };

    static ref DIALECT_OVERRIDES: HashMap<&'static str, HashMap<&'static str, FunctionMapping>> = {
        let mut m: HashMap<&'static str, HashMap<&'static str, FunctionMapping>> = HashMap::new();

        // SQLite
        m.entry("sqlite").or_default().insert("substring", common("substring", "SUBSTR"));
        m.entry("sqlite").or_default().insert("ceiling", FunctionMapping {
            name: "ceiling",
            sql_name: "ROUND",
            // SQLite < 3.35 lacks CEIL: ROUND(x + 0.4999999)
            arg_transform: Some(|mut args| {
                if let Some(first) = args.pop() {
                    let mut shifted = first;
                    shifted.push_sql(" + 0.4999999");
                    vec![shifted]
                } else {
                    args
                }
            }),
        });

        // PostgreSQL
        m.entry("postgresql").or_default().insert("ceiling", common("ceiling", "CEIL"));

        // SQL Server
        m.entry("sqlserver").or_default().insert("length", common("length", "LEN"));
        m.entry("sqlserver").or_default().insert("trim", FunctionMapping {
            name: "trim",
            sql_name: "LTRIM",
            // TRIM is 2017+; LTRIM(RTRIM(x)) works everywhere
            arg_transform: Some(|args| {
                args.into_iter()
                    .map(|a| Fragment::call("RTRIM", vec![a]))
                    .collect()
            }),
        });

        // MySQL
        m.entry("mysql").or_default().insert("length", common("length", "CHAR_LENGTH"));

        // Oracle
        m.entry("oracle").or_default().insert("substring", common("substring", "SUBSTR"));
        m.entry("oracle").or_default().insert("ceiling", common("ceiling", "CEIL"));

        m
    };
}
