//! Typed predicate and projection expressions.
//!
//! Expressions are plain trees built from [`Col`] handles, literals and the
//! marker helpers in [`sql`]. Nothing here knows about SQL text; the
//! [`ExprTranslator`](crate::sql_generator::translator::ExprTranslator)
//! decides how each node is rendered.
//!
//! ```ignore
//! use ormgraph::expression::sql;
//!
//! let adults = Person::AGE.ge(18) & Person::CITY.is_not_null();
//! let items = vec![Person::NAME.as_("PersonName"), sql::count_all()];
//! ```

pub mod sql;

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::ops;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::entity_catalog::{entity_type, Entity, EntityType};
use crate::sql_generator::fragment::Fragment;
use crate::value::{SqlType, Value};

/// A column of a specific entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub entity: EntityType,
    /// Property name (or column name) on the entity
    pub field: Cow<'static, str>,
}

/// A closure read evaluated when the expression is translated.
#[derive(Clone)]
pub struct Captured(Arc<dyn Fn() -> Value + Send + Sync>);

impl Captured {
    pub fn evaluate(&self) -> Value {
        (self.0)()
    }
}

impl fmt::Debug for Captured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Captured(..)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }

    /// SQL operator text; `Mod` is rendered by the dialect instead.
    pub fn sql_operator(self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeKind {
    StartsWith,
    EndsWith,
    Contains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    CountDistinct,
    Min,
    Max,
    Sum,
    Avg,
}

impl AggregateFn {
    pub fn name(self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::CountDistinct => "COUNT DISTINCT",
            AggregateFn::Min => "MIN",
            AggregateFn::Max => "MAX",
            AggregateFn::Sum => "SUM",
            AggregateFn::Avg => "AVG",
        }
    }
}

/// How an alias marker qualifies its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualifierKind {
    /// Alias must be bound in the query
    Table,
    /// Alias may come from raw join SQL the query cannot see
    Join,
}

#[derive(Debug, Clone)]
pub enum InSource {
    /// `None` is a missing list, which matches nothing
    Values(Option<Vec<Value>>),
    SubQuery(Fragment),
}

/// Helper calls recognised by the translator.
#[derive(Debug, Clone)]
pub enum Marker {
    In {
        expr: Expr,
        source: InSource,
    },
    Aggregate {
        func: AggregateFn,
        /// `None` is `COUNT(*)`
        arg: Option<Expr>,
    },
    As {
        expr: Expr,
        alias: String,
    },
    /// Raw SQL passed through verbatim
    Custom(String),
    Qualified {
        column: ColumnRef,
        alias: String,
        kind: QualifierKind,
    },
    Order {
        expr: Expr,
        descending: bool,
    },
    EndOfTuple,
    AllFields {
        entity: EntityType,
        alias: Option<String>,
    },
    Exists {
        query: Fragment,
        negated: bool,
    },
    Cast {
        expr: Expr,
        sql_type: SqlType,
    },
}

#[derive(Debug, Clone)]
pub enum Expr {
    Column(ColumnRef),
    Literal(Value),
    Captured(Captured),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Coalesce(Vec<Expr>),
    Function {
        name: String,
        args: Vec<Expr>,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        kind: LikeKind,
    },
    Marker(Box<Marker>),
}

/// Conversion into an expression node.
pub trait IntoExpr {
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl IntoExpr for &Expr {
    fn into_expr(self) -> Expr {
        self.clone()
    }
}

impl IntoExpr for Value {
    fn into_expr(self) -> Expr {
        Expr::Literal(self)
    }
}

macro_rules! impl_into_expr_literal {
    ($($t:ty),*) => {
        $(impl IntoExpr for $t {
            fn into_expr(self) -> Expr {
                Expr::Literal(Value::from(self))
            }
        })*
    };
}

impl_into_expr_literal!(
    i8, i16, i32, i64, u8, u16, u32, f32, f64, bool, &str, String, &String, NaiveDate,
    NaiveDateTime, Uuid
);

impl<T: Into<Value>> IntoExpr for Option<T> {
    fn into_expr(self) -> Expr {
        Expr::Literal(self.map_or(Value::Null, Into::into))
    }
}

impl Expr {
    pub fn column(entity: EntityType, field: impl Into<Cow<'static, str>>) -> Self {
        Expr::Column(ColumnRef {
            entity,
            field: field.into(),
        })
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// A value read from the closure when the expression is translated.
    pub fn captured<F>(read: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Expr::Captured(Captured(Arc::new(read)))
    }

    pub fn null() -> Self {
        Expr::Literal(Value::Null)
    }

    pub(crate) fn marker(marker: Marker) -> Self {
        Expr::Marker(Box::new(marker))
    }

    fn binary(self, op: BinaryOp, right: impl IntoExpr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(right.into_expr()),
        }
    }

    pub fn eq(self, other: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Eq, other)
    }

    pub fn ne(self, other: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Ne, other)
    }

    pub fn lt(self, other: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Lt, other)
    }

    pub fn le(self, other: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Le, other)
    }

    pub fn gt(self, other: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Gt, other)
    }

    pub fn ge(self, other: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Ge, other)
    }

    pub fn and(self, other: impl IntoExpr) -> Self {
        self.binary(BinaryOp::And, other)
    }

    pub fn or(self, other: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Or, other)
    }

    pub fn not(self) -> Self {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }

    pub fn is_null(self) -> Self {
        self.eq(Value::Null)
    }

    pub fn is_not_null(self) -> Self {
        self.ne(Value::Null)
    }

    pub fn in_list<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        sql::in_list(self, values)
    }

    pub fn in_query(self, query: impl Into<Fragment>) -> Self {
        sql::in_query(self, query)
    }

    pub fn starts_with(self, pattern: impl IntoExpr) -> Self {
        self.like(pattern, LikeKind::StartsWith)
    }

    pub fn ends_with(self, pattern: impl IntoExpr) -> Self {
        self.like(pattern, LikeKind::EndsWith)
    }

    pub fn contains(self, pattern: impl IntoExpr) -> Self {
        self.like(pattern, LikeKind::Contains)
    }

    fn like(self, pattern: impl IntoExpr, kind: LikeKind) -> Self {
        Expr::Like {
            expr: Box::new(self),
            pattern: Box::new(pattern.into_expr()),
            kind,
        }
    }

    /// `COALESCE(self, fallback)`
    pub fn coalesce(self, fallback: impl IntoExpr) -> Self {
        Expr::Coalesce(vec![self, fallback.into_expr()])
    }

    pub fn upper(self) -> Self {
        sql::func("upper", vec![self])
    }

    pub fn lower(self) -> Self {
        sql::func("lower", vec![self])
    }

    pub fn cast(self, sql_type: SqlType) -> Self {
        sql::cast(self, sql_type)
    }

    pub fn asc(self) -> Self {
        sql::asc(self)
    }

    pub fn desc(self) -> Self {
        sql::desc(self)
    }

    pub fn as_(self, alias: &str) -> Self {
        sql::as_(self, alias)
    }
}

/// Typed handle to one field of entity `E`.
///
/// Declared as associated constants on the entity:
/// `pub const NAME: Col<Team> = Col::new("Name");`
pub struct Col<E> {
    field: &'static str,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Col<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Col<E> {}

impl<E> fmt::Debug for Col<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Col({})", self.field)
    }
}

impl<E> Col<E> {
    pub const fn new(field: &'static str) -> Self {
        Self {
            field,
            _entity: PhantomData,
        }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }
}

impl<E: Entity> Col<E> {
    pub fn column_ref(&self) -> ColumnRef {
        ColumnRef {
            entity: entity_type::<E>(),
            field: Cow::Borrowed(self.field),
        }
    }

    pub fn expr(self) -> Expr {
        Expr::Column(self.column_ref())
    }

    /// Qualify with a table alias bound in the query.
    pub fn table_alias(self, alias: &str) -> Expr {
        sql::table_alias(self, alias)
    }

    /// Qualify with a join alias, which may come from raw join SQL.
    pub fn join_alias(self, alias: &str) -> Expr {
        sql::join_alias(self, alias)
    }
}

macro_rules! delegate_to_expr {
    ($($name:ident($($arg:ident: $ty:ty),*)),* $(,)?) => {
        impl<E: Entity> Col<E> {
            $(pub fn $name(self, $($arg: $ty),*) -> Expr {
                self.expr().$name($($arg),*)
            })*
        }
    };
}

delegate_to_expr!(
    eq(other: impl IntoExpr),
    ne(other: impl IntoExpr),
    lt(other: impl IntoExpr),
    le(other: impl IntoExpr),
    gt(other: impl IntoExpr),
    ge(other: impl IntoExpr),
    is_null(),
    is_not_null(),
    in_query(query: impl Into<Fragment>),
    starts_with(pattern: impl IntoExpr),
    ends_with(pattern: impl IntoExpr),
    contains(pattern: impl IntoExpr),
    coalesce(fallback: impl IntoExpr),
    upper(),
    lower(),
    cast(sql_type: SqlType),
    asc(),
    desc(),
    as_(alias: &str),
);

impl<E: Entity> Col<E> {
    pub fn in_list<I, V>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.expr().in_list(values)
    }
}

impl<E: Entity> IntoExpr for Col<E> {
    fn into_expr(self) -> Expr {
        self.expr()
    }
}

macro_rules! impl_binary_ops {
    ($($trait:ident, $method:ident, $op:expr);* $(;)?) => {
        $(
            impl<R: IntoExpr> ops::$trait<R> for Expr {
                type Output = Expr;
                fn $method(self, rhs: R) -> Expr {
                    self.binary($op, rhs)
                }
            }

            impl<E: Entity, R: IntoExpr> ops::$trait<R> for Col<E> {
                type Output = Expr;
                fn $method(self, rhs: R) -> Expr {
                    self.expr().binary($op, rhs)
                }
            }
        )*
    };
}

impl_binary_ops!(
    Add, add, BinaryOp::Add;
    Sub, sub, BinaryOp::Sub;
    Mul, mul, BinaryOp::Mul;
    Div, div, BinaryOp::Div;
    Rem, rem, BinaryOp::Mod;
    BitAnd, bitand, BinaryOp::And;
    BitOr, bitor, BinaryOp::Or;
);

impl ops::Not for Expr {
    type Output = Expr;
    fn not(self) -> Expr {
        Expr::not(self)
    }
}

impl<E: Entity> ops::Not for Col<E> {
    type Output = Expr;
    fn not(self) -> Expr {
        self.expr().not()
    }
}

impl ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(self),
        }
    }
}

impl<E: Entity> ops::Neg for Col<E> {
    type Output = Expr;
    fn neg(self) -> Expr {
        -self.expr()
    }
}
