//! Marker helpers: pseudo-functions the translator rewrites into SQL syntax
//! or alias qualification.
//!
//! Each helper only has meaning in specific positions (e.g. [`as_`] at the
//! top of a projection item, [`desc`] at the top of an order item). Used
//! anywhere else they fail translation instead of producing SQL.

use crate::entity_catalog::{entity_type, Entity};
use crate::sql_generator::fragment::Fragment;
use crate::value::{SqlType, Value};

use super::{AggregateFn, Col, Expr, InSource, IntoExpr, Marker, QualifierKind};

pub fn in_list<I, V>(expr: impl IntoExpr, values: I) -> Expr
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    Expr::marker(Marker::In {
        expr: expr.into_expr(),
        source: InSource::Values(Some(values.into_iter().map(Into::into).collect())),
    })
}

/// `IN` over a list that may be missing entirely; a missing list matches nothing.
pub fn in_opt_list(expr: impl IntoExpr, values: Option<Vec<Value>>) -> Expr {
    Expr::marker(Marker::In {
        expr: expr.into_expr(),
        source: InSource::Values(values),
    })
}

/// `expr IN (sub-query)`; the sub-query keeps its own literals.
pub fn in_query(expr: impl IntoExpr, query: impl Into<Fragment>) -> Expr {
    Expr::marker(Marker::In {
        expr: expr.into_expr(),
        source: InSource::SubQuery(query.into()),
    })
}

pub fn exists(query: impl Into<Fragment>) -> Expr {
    Expr::marker(Marker::Exists {
        query: query.into(),
        negated: false,
    })
}

pub fn not_exists(query: impl Into<Fragment>) -> Expr {
    Expr::marker(Marker::Exists {
        query: query.into(),
        negated: true,
    })
}

fn aggregate(func: AggregateFn, arg: Option<Expr>) -> Expr {
    Expr::marker(Marker::Aggregate { func, arg })
}

/// `COUNT(*)`
pub fn count_all() -> Expr {
    aggregate(AggregateFn::Count, None)
}

pub fn count(expr: impl IntoExpr) -> Expr {
    aggregate(AggregateFn::Count, Some(expr.into_expr()))
}

pub fn count_distinct(expr: impl IntoExpr) -> Expr {
    aggregate(AggregateFn::CountDistinct, Some(expr.into_expr()))
}

pub fn min(expr: impl IntoExpr) -> Expr {
    aggregate(AggregateFn::Min, Some(expr.into_expr()))
}

pub fn max(expr: impl IntoExpr) -> Expr {
    aggregate(AggregateFn::Max, Some(expr.into_expr()))
}

pub fn sum(expr: impl IntoExpr) -> Expr {
    aggregate(AggregateFn::Sum, Some(expr.into_expr()))
}

pub fn avg(expr: impl IntoExpr) -> Expr {
    aggregate(AggregateFn::Avg, Some(expr.into_expr()))
}

/// Output column alias: `expr AS "alias"`.
pub fn as_(expr: impl IntoExpr, alias: &str) -> Expr {
    Expr::marker(Marker::As {
        expr: expr.into_expr(),
        alias: alias.to_string(),
    })
}

/// Raw SQL emitted verbatim.
pub fn custom(sql: &str) -> Expr {
    Expr::marker(Marker::Custom(sql.to_string()))
}

pub fn table_alias<E: Entity>(column: Col<E>, alias: &str) -> Expr {
    Expr::marker(Marker::Qualified {
        column: column.column_ref(),
        alias: alias.to_string(),
        kind: QualifierKind::Table,
    })
}

pub fn join_alias<E: Entity>(column: Col<E>, alias: &str) -> Expr {
    Expr::marker(Marker::Qualified {
        column: column.column_ref(),
        alias: alias.to_string(),
        kind: QualifierKind::Join,
    })
}

pub fn asc(expr: impl IntoExpr) -> Expr {
    Expr::marker(Marker::Order {
        expr: expr.into_expr(),
        descending: false,
    })
}

pub fn desc(expr: impl IntoExpr) -> Expr {
    Expr::marker(Marker::Order {
        expr: expr.into_expr(),
        descending: true,
    })
}

/// End-of-tuple: columns before it map to one result object, columns after
/// it to the next.
pub fn eot() -> Expr {
    Expr::marker(Marker::EndOfTuple)
}

/// Every column of `E`.
pub fn all_fields<E: Entity>() -> Expr {
    Expr::marker(Marker::AllFields {
        entity: entity_type::<E>(),
        alias: None,
    })
}

/// Every column of `E`, qualified by a bound alias.
pub fn all_fields_as<E: Entity>(alias: &str) -> Expr {
    Expr::marker(Marker::AllFields {
        entity: entity_type::<E>(),
        alias: Some(alias.to_string()),
    })
}

pub fn cast(expr: impl IntoExpr, sql_type: SqlType) -> Expr {
    Expr::marker(Marker::Cast {
        expr: expr.into_expr(),
        sql_type,
    })
}

pub fn concat(args: Vec<Expr>) -> Expr {
    func("concat", args)
}

/// A function looked up in the dialect's function registry.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Function {
        name: name.to_string(),
        args,
    }
}
