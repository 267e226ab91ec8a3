/// Expression → SQL translation
///
/// Walks an [`Expr`] tree and produces a [`Fragment`]. Columns are qualified
/// through the query's [`AliasResolver`]; every engine-specific piece of
/// syntax comes from the [`Dialect`]. Any node without a translation fails
/// the whole expression, there is no best-effort output.
use crate::dialect::Dialect;
use crate::entity_catalog::FieldDefinition;
use crate::expression::{
    AggregateFn, BinaryOp, ColumnRef, Expr, InSource, LikeKind, Marker, QualifierKind, UnaryOp,
};
use crate::value::{SqlType, Value};

use super::alias_resolver::{AliasBinding, AliasResolver};
use super::errors::TranslateError;
use super::fragment::Fragment;

/// Clause an expression is translated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// WHERE and JOIN .. ON
    Predicate,
    Projection,
    OrderItem,
    GroupKey,
    Having,
}

impl Position {
    fn allows_aggregates(self) -> bool {
        matches!(
            self,
            Position::Projection | Position::Having | Position::OrderItem
        )
    }
}

/// One entry of a SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionItem {
    Column {
        fragment: Fragment,
        /// Output column name when known
        name: Option<String>,
    },
    /// End of one tuple element, start of the next
    TupleBreak,
}

#[derive(Debug, Clone, Copy)]
struct Ctx {
    position: Position,
    /// The value is used as a condition
    boolean: bool,
    in_arithmetic: bool,
    in_aggregate: bool,
}

impl Ctx {
    fn new(position: Position) -> Self {
        Self {
            position,
            boolean: matches!(position, Position::Predicate | Position::Having),
            in_arithmetic: false,
            in_aggregate: false,
        }
    }

    fn value(self) -> Self {
        Self {
            boolean: false,
            ..self
        }
    }

    fn condition(self) -> Self {
        Self {
            boolean: true,
            ..self
        }
    }

    fn arithmetic(self) -> Self {
        Self {
            boolean: false,
            in_arithmetic: true,
            ..self
        }
    }
}

pub struct ExprTranslator<'a> {
    dialect: &'a dyn Dialect,
    aliases: &'a AliasResolver,
    /// The join whose ON condition is being translated
    join_target: Option<&'a AliasBinding>,
}

impl<'a> ExprTranslator<'a> {
    pub fn new(dialect: &'a dyn Dialect, aliases: &'a AliasResolver) -> Self {
        Self {
            dialect,
            aliases,
            join_target: None,
        }
    }

    /// Unqualified columns of the join target's entity resolve to the join
    /// being added, as long as no other source binds that entity. Otherwise
    /// they resolve exactly as they would in WHERE.
    pub fn for_join(
        dialect: &'a dyn Dialect,
        aliases: &'a AliasResolver,
        target: &'a AliasBinding,
    ) -> Self {
        Self {
            dialect,
            aliases,
            join_target: Some(target),
        }
    }

    pub fn translate(&self, expr: &Expr, position: Position) -> Result<Fragment, TranslateError> {
        let ctx = Ctx::new(position);
        match (position, expr) {
            (Position::OrderItem, Expr::Marker(marker)) => match marker.as_ref() {
                Marker::Order { expr, descending } => {
                    let mut fragment = self.visit(expr, ctx)?;
                    if *descending {
                        fragment.push_sql(" DESC");
                    }
                    Ok(fragment)
                }
                _ => self.visit(expr, ctx),
            },
            (Position::Projection, Expr::Marker(marker)) => match marker.as_ref() {
                Marker::As { expr, alias } => self.aliased(expr, alias, ctx),
                _ => self.visit(expr, ctx),
            },
            _ => self.visit(expr, ctx),
        }
    }

    /// Translate one SELECT item; `AllFields` expands to several columns.
    pub fn translate_projection(&self, expr: &Expr) -> Result<Vec<ProjectionItem>, TranslateError> {
        let ctx = Ctx::new(Position::Projection);
        let marker = match expr {
            Expr::Marker(marker) => marker.as_ref(),
            Expr::Column(column) => {
                let (binding, field) = self.resolve_column(column)?;
                return Ok(vec![ProjectionItem::Column {
                    fragment: Fragment::sql(binding.qualify(self.dialect, field.column_name())),
                    name: Some(field.column_name().to_string()),
                }]);
            }
            other => {
                return Ok(vec![ProjectionItem::Column {
                    fragment: self.visit(other, ctx)?,
                    name: None,
                }])
            }
        };

        match marker {
            Marker::EndOfTuple => Ok(vec![ProjectionItem::TupleBreak]),
            Marker::AllFields { entity, alias } => {
                let binding = match alias {
                    Some(alias) => self.aliases.by_alias(alias),
                    None => self.aliases.for_entity(entity),
                }
                .map_err(|e| TranslateError::unsupported("AllFields", e.to_string()))?;
                Ok(binding
                    .meta
                    .fields()
                    .iter()
                    .map(|f| ProjectionItem::Column {
                        fragment: Fragment::sql(binding.qualify(self.dialect, f.column_name())),
                        name: Some(f.column_name().to_string()),
                    })
                    .collect())
            }
            Marker::As { expr, alias } => Ok(vec![ProjectionItem::Column {
                fragment: self.aliased(expr, alias, ctx)?,
                name: Some(alias.clone()),
            }]),
            Marker::Qualified { column, .. } => {
                let name = column
                    .entity
                    .metadata()
                    .field(&column.field)
                    .map(|f| f.column_name().to_string());
                Ok(vec![ProjectionItem::Column {
                    fragment: self.visit(expr, ctx)?,
                    name,
                }])
            }
            _ => Ok(vec![ProjectionItem::Column {
                fragment: self.visit(expr, ctx)?,
                name: None,
            }]),
        }
    }

    fn aliased(&self, expr: &Expr, alias: &str, ctx: Ctx) -> Result<Fragment, TranslateError> {
        let mut fragment = self.visit(expr, ctx)?;
        fragment.push_sql(&format!(" AS {}", self.dialect.quote_name(alias)));
        Ok(fragment)
    }

    fn visit(&self, expr: &Expr, ctx: Ctx) -> Result<Fragment, TranslateError> {
        match expr {
            Expr::Column(column) => {
                let (binding, field) = self.resolve_column(column)?;
                let sql = binding.qualify(self.dialect, field.column_name());
                Ok(self.column_fragment(sql, field, ctx))
            }
            Expr::Literal(value) => Ok(self.literal(value.clone(), ctx)),
            Expr::Captured(read) => {
                let value = read.evaluate();
                log::trace!("Captured value resolved to {value}");
                Ok(self.literal(value, ctx))
            }
            Expr::Unary { op, operand } => match op {
                UnaryOp::Not => {
                    let inner = self.visit(operand, ctx.condition())?;
                    Ok(inner.wrap("(NOT ", ")"))
                }
                UnaryOp::Negate => {
                    let inner = self.visit(operand, ctx.arithmetic())?;
                    Ok(inner.wrap("(-", ")"))
                }
            },
            Expr::Binary { op, left, right } => self.binary(*op, left, right, ctx),
            Expr::Coalesce(args) => {
                if args.len() < 2 {
                    return Err(TranslateError::unsupported(
                        "Coalesce",
                        "needs a value and at least one fallback",
                    ));
                }
                let args = args
                    .iter()
                    .map(|a| self.visit(a, ctx.value()))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.dialect.coalesce(args))
            }
            Expr::Function { name, args } => self.function(name, args, ctx),
            Expr::Like {
                expr,
                pattern,
                kind,
            } => self.like(expr, pattern, *kind, ctx),
            Expr::Marker(marker) => self.marker(marker, ctx),
        }
    }

    fn literal(&self, value: Value, ctx: Ctx) -> Fragment {
        match value {
            // A bare boolean used as a condition becomes an always-true/false predicate
            Value::Bool(b) if ctx.boolean => Fragment::sql(if b {
                self.dialect.true_literal()
            } else {
                self.dialect.false_literal()
            }),
            value => Fragment::param(value),
        }
    }

    fn column_fragment(&self, sql: String, field: &FieldDefinition, ctx: Ctx) -> Fragment {
        if ctx.boolean && field.sql_type == SqlType::Bool {
            return Fragment::sql(format!("({} = {})", sql, self.dialect.bool_literal(true)));
        }
        Fragment::sql(sql)
    }

    fn resolve_column(
        &self,
        column: &ColumnRef,
    ) -> Result<(&'a AliasBinding, &'a FieldDefinition), TranslateError> {
        let construct = || format!("{}.{}", column.entity.name(), column.field);

        let binding = match self.join_target {
            Some(target) if target.entity == column.entity && !self.rebinds(target) => target,
            _ => self
                .aliases
                .for_entity(&column.entity)
                .map_err(|e| TranslateError::unsupported(construct(), e.to_string()))?,
        };
        let field = binding.meta.field(&column.field).ok_or_else(|| {
            TranslateError::unsupported(
                construct(),
                format!("no such field on entity '{}'", binding.meta.name()),
            )
        })?;
        Ok((binding, field))
    }

    /// Another source of the query already binds the target's entity.
    fn rebinds(&self, target: &AliasBinding) -> bool {
        self.aliases
            .bindings()
            .iter()
            .any(|b| b.entity == target.entity && b.token != target.token)
    }

    /// Literal value of a node, evaluating captured reads once.
    fn resolved_literal(expr: &Expr) -> Option<Value> {
        match expr {
            Expr::Literal(value) => Some(value.clone()),
            Expr::Captured(read) => Some(read.evaluate()),
            _ => None,
        }
    }

    fn operand(&self, expr: &Expr, resolved: Option<Value>, ctx: Ctx) -> Result<Fragment, TranslateError> {
        match resolved {
            Some(value) => Ok(self.literal(value, ctx)),
            None => self.visit(expr, ctx),
        }
    }

    fn binary(&self, op: BinaryOp, left: &Expr, right: &Expr, ctx: Ctx) -> Result<Fragment, TranslateError> {
        if op.is_logical() {
            let l = self.visit(left, ctx.condition())?;
            let r = self.visit(right, ctx.condition())?;
            return Ok(Fragment::infix(l, op.sql_operator(), r));
        }

        if op.is_arithmetic() {
            let l = self.visit(left, ctx.arithmetic())?;
            let r = self.visit(right, ctx.arithmetic())?;
            return Ok(match op {
                BinaryOp::Mod => self.dialect.modulo(l, r),
                _ => Fragment::infix(l, op.sql_operator(), r),
            });
        }

        let left_value = Self::resolved_literal(left);
        let right_value = Self::resolved_literal(right);

        if matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
            let null_test = if op == BinaryOp::Eq {
                " IS NULL)"
            } else {
                " IS NOT NULL)"
            };
            // `x = NULL` is never true in SQL; compare with IS [NOT] NULL
            let other = match (&left_value, &right_value) {
                (_, Some(Value::Null)) => Some((left, left_value.clone())),
                (Some(Value::Null), _) => Some((right, right_value.clone())),
                _ => None,
            };
            if let Some((expr, resolved)) = other {
                log::trace!("Comparison with NULL rewritten as{}", null_test.trim_end_matches(')'));
                let operand = self.operand(expr, resolved, ctx.value())?;
                return Ok(operand.wrap("(", null_test));
            }
        }

        let l = self.operand(left, left_value, ctx.value())?;
        let r = self.operand(right, right_value, ctx.value())?;
        Ok(Fragment::infix(l, op.sql_operator(), r))
    }

    fn function(&self, name: &str, args: &[Expr], ctx: Ctx) -> Result<Fragment, TranslateError> {
        let mut args = args
            .iter()
            .map(|a| self.visit(a, ctx.value()))
            .collect::<Result<Vec<_>, _>>()?;

        match (name.to_lowercase().as_str(), args.len()) {
            ("concat", _) => return Ok(self.dialect.concat(args)),
            ("coalesce", n) if n >= 2 => return Ok(self.dialect.coalesce(args)),
            ("lower", 1) => return Ok(self.dialect.lower(args.remove(0))),
            ("upper", 1) => return Ok(self.dialect.upper(args.remove(0))),
            _ => {}
        }

        let mapping = self.dialect.map_function(name).ok_or_else(|| {
            TranslateError::unsupported(
                format!("{name}()"),
                format!("no mapping for dialect '{}'", self.dialect.name()),
            )
        })?;
        let args = match mapping.arg_transform {
            Some(transform) => transform(args),
            None => args,
        };
        Ok(Fragment::call(mapping.sql_name, args))
    }

    fn like(&self, expr: &Expr, pattern: &Expr, kind: LikeKind, ctx: Ctx) -> Result<Fragment, TranslateError> {
        let text = match Self::resolved_literal(pattern) {
            Some(Value::Text(text)) => text,
            _ => {
                return Err(TranslateError::unsupported(
                    format!("{kind:?}"),
                    "pattern must be a text value",
                ))
            }
        };
        let escaped = self.dialect.escape_wildcards(&text);
        let pattern = match kind {
            LikeKind::StartsWith => format!("{escaped}%"),
            LikeKind::EndsWith => format!("%{escaped}"),
            LikeKind::Contains => format!("%{escaped}%"),
        };

        let mut fragment = self.visit(expr, ctx.value())?.wrap("(", " LIKE ");
        fragment.push_param(Value::Text(pattern));
        fragment.push_sql(&self.dialect.like_escape_clause());
        fragment.push_sql(")");
        Ok(fragment)
    }

    fn marker(&self, marker: &Marker, ctx: Ctx) -> Result<Fragment, TranslateError> {
        match marker {
            Marker::In { expr, source } => {
                if ctx.in_arithmetic {
                    return Err(TranslateError::unsupported(
                        "In",
                        "cannot be used inside an arithmetic expression",
                    ));
                }
                let target = self.visit(expr, ctx.value())?;
                match source {
                    InSource::Values(None) => Ok(Fragment::sql(self.dialect.false_literal())),
                    InSource::Values(Some(values)) if values.is_empty() => {
                        Ok(Fragment::sql(self.dialect.false_literal()))
                    }
                    InSource::Values(Some(values)) => {
                        let list = Fragment::join(values.iter().cloned().map(Fragment::param), ",");
                        let mut fragment = target.wrap("(", " IN (");
                        fragment.append(list);
                        fragment.push_sql("))");
                        Ok(fragment)
                    }
                    InSource::SubQuery(query) => {
                        let mut fragment = target.wrap("(", " IN (");
                        fragment.push_sub_query(query.clone());
                        fragment.push_sql("))");
                        Ok(fragment)
                    }
                }
            }
            Marker::Aggregate { func, arg } => self.aggregate(*func, arg.as_ref(), ctx),
            Marker::As { .. } => Err(TranslateError::unsupported(
                "As",
                "only allowed at the top of a projection item",
            )),
            Marker::EndOfTuple => Err(TranslateError::unsupported(
                "EOT",
                "only allowed as a projection item",
            )),
            Marker::AllFields { entity, .. } => Err(TranslateError::unsupported(
                format!("AllFields<{}>", entity.name()),
                "only allowed as a projection item",
            )),
            Marker::Order { descending, .. } => Err(TranslateError::unsupported(
                if *descending { "Desc" } else { "Asc" },
                "only allowed at the top of an order item",
            )),
            Marker::Custom(sql) => Ok(Fragment::sql(sql.clone())),
            Marker::Qualified {
                column,
                alias,
                kind,
            } => self.qualified(column, alias, *kind, ctx),
            Marker::Exists { query, negated } => {
                if ctx.in_arithmetic {
                    return Err(TranslateError::unsupported(
                        "Exists",
                        "cannot be used inside an arithmetic expression",
                    ));
                }
                let prefix = if *negated { "NOT EXISTS (" } else { "EXISTS (" };
                Ok(Fragment::sub_query(query.clone()).wrap(prefix, ")"))
            }
            Marker::Cast { expr, sql_type } => {
                let inner = self.visit(expr, ctx.value())?;
                Ok(self.dialect.cast(inner, *sql_type))
            }
        }
    }

    fn aggregate(&self, func: AggregateFn, arg: Option<&Expr>, ctx: Ctx) -> Result<Fragment, TranslateError> {
        if !ctx.position.allows_aggregates() {
            return Err(TranslateError::unsupported(
                func.name(),
                format!("aggregates are not allowed in {:?} position", ctx.position),
            ));
        }
        if ctx.in_aggregate {
            return Err(TranslateError::unsupported(
                func.name(),
                "aggregates cannot be nested",
            ));
        }

        let inner_ctx = Ctx {
            in_aggregate: true,
            ..ctx.value()
        };
        let arg = match arg {
            Some(arg) => self.visit(arg, inner_ctx)?,
            None if func == AggregateFn::Count => return Ok(Fragment::sql("COUNT(*)")),
            None => {
                return Err(TranslateError::unsupported(
                    func.name(),
                    "needs an argument",
                ))
            }
        };

        Ok(match func {
            AggregateFn::CountDistinct => self.dialect.count_distinct(arg),
            _ => Fragment::call(func.name(), vec![arg]),
        })
    }

    fn qualified(
        &self,
        column: &ColumnRef,
        alias: &str,
        kind: QualifierKind,
        ctx: Ctx,
    ) -> Result<Fragment, TranslateError> {
        let construct = || format!("{}.{} via '{}'", column.entity.name(), column.field, alias);
        let meta = column.entity.metadata();
        let field = meta.field(&column.field).ok_or_else(|| {
            TranslateError::unsupported(
                construct(),
                format!("no such field on entity '{}'", meta.name()),
            )
        })?;

        let qualifier = match (self.aliases.by_alias(alias), kind) {
            (Ok(binding), _) => binding.qualifier.clone(),
            (Err(_), QualifierKind::Join) => self.dialect.quote_name(alias),
            (Err(e), QualifierKind::Table) => {
                return Err(TranslateError::unsupported(construct(), e.to_string()))
            }
        };
        let sql = format!("{}.{}", qualifier, self.dialect.quote_name(field.column_name()));
        Ok(self.column_fragment(sql, field, ctx))
    }
}
