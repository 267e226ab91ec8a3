//! Fluent query builder.
//!
//! A [`Query`] accumulates joins, filters, grouping, ordering and the
//! projection. Each builder call compiles its expression immediately
//! against the aliases bound so far, so mistakes surface at the call that
//! made them. [`Query::to_select_statement`] only assembles the compiled
//! pieces and numbers the parameters; it is pure and repeatable.
//!
//! ```ignore
//! let mut q = Query::from::<Team>(Arc::new(SqliteDialect));
//! q.join_as::<TeamUser>("tu", TeamUser::TEAM_ID.eq(Team::ID))?
//!     .filter(Team::NAME.starts_with("A"))?
//!     .order_by(Team::NAME)?;
//! let compiled = q.to_select_statement();
//! ```

pub mod errors;
pub mod join;
pub mod projection;
pub mod statements;

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config;
use crate::dialect::DialectRef;
use crate::entity_catalog::{metadata, Entity, EntityMetadata};
use crate::expression::{sql, Expr, IntoExpr};
use crate::sql_generator::{
    inline_literals, AliasBinding, AliasResolver, ExprTranslator, Fragment, Position,
};
use crate::value::Value;

pub use errors::QueryError;
pub use join::{JoinDescriptor, JoinKind};
pub use projection::{Projection, ResultShape};
pub use statements::CompiledSql;

lazy_static! {
    static ref POSITIONAL_TOKEN: Regex = Regex::new(r"\{(\d+)\}").expect("valid regex");
    static ref NAMED_TOKEN: Regex =
        Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    fn sql(self) -> &'static str {
        match self {
            Conjunction::And => " AND ",
            Conjunction::Or => " OR ",
        }
    }
}

/// Predicates combined in call order.
#[derive(Debug, Clone, Default)]
struct FilterChain {
    fragment: Option<Fragment>,
    count: usize,
    last: Option<Conjunction>,
}

impl FilterChain {
    fn push(&mut self, predicate: Fragment, conjunction: Conjunction) {
        let predicate = if predicate.is_parenthesized() {
            predicate
        } else {
            predicate.parenthesized()
        };

        self.fragment = Some(match self.fragment.take() {
            None => predicate,
            Some(existing) => {
                // Switching between AND and OR groups everything so far
                let mut combined = if self.count > 1 && self.last != Some(conjunction) {
                    existing.parenthesized()
                } else {
                    existing
                };
                combined.push_sql(conjunction.sql());
                combined.append(predicate);
                combined
            }
        });
        self.count += 1;
        self.last = Some(conjunction);
    }

    fn fragment(&self) -> Option<&Fragment> {
        self.fragment.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct Query {
    dialect: DialectRef,
    aliases: AliasResolver,
    joins: Vec<JoinDescriptor>,
    filter: FilterChain,
    group_by: Vec<Fragment>,
    having: FilterChain,
    order_by: Vec<Fragment>,
    projection: Option<Projection>,
    distinct: bool,
    offset: Option<u64>,
    rows: Option<u64>,
}

impl Query {
    pub fn from<T: Entity>(dialect: DialectRef) -> Self {
        Self::from_metadata(metadata::<T>(), dialect)
    }

    pub fn from_aliased<T: Entity>(dialect: DialectRef, alias: &str) -> Self {
        Self::with_root(metadata::<T>(), Some(alias), dialect)
    }

    pub fn from_metadata(meta: Arc<EntityMetadata>, dialect: DialectRef) -> Self {
        Self::with_root(meta, None, dialect)
    }

    fn with_root(meta: Arc<EntityMetadata>, alias: Option<&str>, dialect: DialectRef) -> Self {
        let aliases = AliasResolver::with_root(meta, alias, dialect.as_ref());
        Self {
            dialect,
            aliases,
            joins: Vec::new(),
            filter: FilterChain::default(),
            group_by: Vec::new(),
            having: FilterChain::default(),
            order_by: Vec::new(),
            projection: None,
            distinct: false,
            offset: None,
            rows: None,
        }
    }

    pub fn dialect(&self) -> &DialectRef {
        &self.dialect
    }

    pub fn root(&self) -> &AliasBinding {
        &self.aliases.bindings()[0]
    }

    pub fn root_metadata(&self) -> Arc<EntityMetadata> {
        Arc::clone(&self.root().meta)
    }

    pub fn aliases(&self) -> &AliasResolver {
        &self.aliases
    }

    pub fn joins(&self) -> &[JoinDescriptor] {
        &self.joins
    }

    fn translate(&self, expr: &Expr, position: Position) -> Result<Fragment, QueryError> {
        let translator = ExprTranslator::new(self.dialect.as_ref(), &self.aliases);
        Ok(translator.translate(expr, position)?)
    }

    // ----- joins -------------------------------------------------------

    fn add_join(
        &mut self,
        meta: Arc<EntityMetadata>,
        kind: JoinKind,
        alias: Option<&str>,
        on: Option<Expr>,
    ) -> Result<&mut Self, QueryError> {
        let target = self
            .aliases
            .bind(meta, alias, self.dialect.as_ref())?
            .clone();

        let on = match on {
            Some(expr) => {
                let translator =
                    ExprTranslator::for_join(self.dialect.as_ref(), &self.aliases, &target);
                match translator.translate(&expr, Position::Predicate) {
                    Ok(fragment) => Some(fragment),
                    Err(e) => {
                        self.aliases.unbind_last();
                        return Err(e.into());
                    }
                }
            }
            None => None,
        };

        self.push_join(target, kind, on, None);
        Ok(self)
    }

    fn push_join(
        &mut self,
        target: AliasBinding,
        kind: JoinKind,
        on: Option<Fragment>,
        custom_sql: Option<String>,
    ) {
        log::trace!("{:?} join to {} as '{}'", kind, target.meta.name(), target.token);
        self.joins.push(JoinDescriptor {
            target: target.entity,
            kind,
            alias: target.alias,
            table_reference: target.table_reference,
            on,
            custom_sql,
        });
    }

    pub fn join<J: Entity>(&mut self, on: impl IntoExpr) -> Result<&mut Self, QueryError> {
        self.add_join(metadata::<J>(), JoinKind::Inner, None, Some(on.into_expr()))
    }

    pub fn join_as<J: Entity>(&mut self, alias: &str, on: impl IntoExpr) -> Result<&mut Self, QueryError> {
        self.add_join(metadata::<J>(), JoinKind::Inner, Some(alias), Some(on.into_expr()))
    }

    pub fn left_join<J: Entity>(&mut self, on: impl IntoExpr) -> Result<&mut Self, QueryError> {
        self.add_join(metadata::<J>(), JoinKind::Left, None, Some(on.into_expr()))
    }

    pub fn left_join_as<J: Entity>(&mut self, alias: &str, on: impl IntoExpr) -> Result<&mut Self, QueryError> {
        self.add_join(metadata::<J>(), JoinKind::Left, Some(alias), Some(on.into_expr()))
    }

    pub fn right_join<J: Entity>(&mut self, on: impl IntoExpr) -> Result<&mut Self, QueryError> {
        self.add_join(metadata::<J>(), JoinKind::Right, None, Some(on.into_expr()))
    }

    pub fn right_join_as<J: Entity>(&mut self, alias: &str, on: impl IntoExpr) -> Result<&mut Self, QueryError> {
        self.add_join(metadata::<J>(), JoinKind::Right, Some(alias), Some(on.into_expr()))
    }

    pub fn full_join<J: Entity>(&mut self, on: impl IntoExpr) -> Result<&mut Self, QueryError> {
        self.add_join(metadata::<J>(), JoinKind::Full, None, Some(on.into_expr()))
    }

    pub fn full_join_as<J: Entity>(&mut self, alias: &str, on: impl IntoExpr) -> Result<&mut Self, QueryError> {
        self.add_join(metadata::<J>(), JoinKind::Full, Some(alias), Some(on.into_expr()))
    }

    pub fn cross_join<J: Entity>(&mut self) -> Result<&mut Self, QueryError> {
        self.add_join(metadata::<J>(), JoinKind::Cross, None, None)
    }

    pub fn cross_join_as<J: Entity>(&mut self, alias: &str) -> Result<&mut Self, QueryError> {
        self.add_join(metadata::<J>(), JoinKind::Cross, Some(alias), None)
    }

    /// Inner join whose ON condition comes from foreign-key metadata.
    pub fn join_ref<J: Entity>(&mut self) -> Result<&mut Self, QueryError> {
        self.join_ref_kind(metadata::<J>(), JoinKind::Inner, None)
    }

    pub fn left_join_ref<J: Entity>(&mut self) -> Result<&mut Self, QueryError> {
        self.join_ref_kind(metadata::<J>(), JoinKind::Left, None)
    }

    pub fn join_ref_as<J: Entity>(&mut self, alias: &str) -> Result<&mut Self, QueryError> {
        self.join_ref_kind(metadata::<J>(), JoinKind::Inner, Some(alias))
    }

    fn join_ref_kind(
        &mut self,
        meta: Arc<EntityMetadata>,
        kind: JoinKind,
        alias: Option<&str>,
    ) -> Result<&mut Self, QueryError> {
        let target = self
            .aliases
            .bind(meta, alias, self.dialect.as_ref())?
            .clone();
        let existing = &self.aliases.bindings()[..self.aliases.bindings().len() - 1];

        match join::infer_join_condition(self.dialect.as_ref(), existing, &target) {
            Some(on) => {
                self.push_join(target, kind, Some(on), None);
                Ok(self)
            }
            None => {
                self.aliases.unbind_last();
                Err(QueryError::NoJoinCondition {
                    target: target.meta.name().to_string(),
                })
            }
        }
    }

    /// Join written as raw SQL; `J` is still bound so later column
    /// references resolve to it.
    pub fn custom_join<J: Entity>(&mut self, join_sql: &str) -> Result<&mut Self, QueryError> {
        self.custom_join_inner(metadata::<J>(), None, join_sql)
    }

    pub fn custom_join_as<J: Entity>(&mut self, alias: &str, join_sql: &str) -> Result<&mut Self, QueryError> {
        self.custom_join_inner(metadata::<J>(), Some(alias), join_sql)
    }

    fn custom_join_inner(
        &mut self,
        meta: Arc<EntityMetadata>,
        alias: Option<&str>,
        join_sql: &str,
    ) -> Result<&mut Self, QueryError> {
        let target = self
            .aliases
            .bind(meta, alias, self.dialect.as_ref())?
            .clone();
        self.push_join(target, JoinKind::Custom, None, Some(join_sql.to_string()));
        Ok(self)
    }

    // ----- filters -----------------------------------------------------

    /// Add a predicate; successive calls are combined with AND.
    pub fn filter(&mut self, predicate: impl IntoExpr) -> Result<&mut Self, QueryError> {
        self.and(predicate)
    }

    pub fn and(&mut self, predicate: impl IntoExpr) -> Result<&mut Self, QueryError> {
        let fragment = self.translate(&predicate.into_expr(), Position::Predicate)?;
        self.filter.push(fragment, Conjunction::And);
        Ok(self)
    }

    pub fn or(&mut self, predicate: impl IntoExpr) -> Result<&mut Self, QueryError> {
        let fragment = self.translate(&predicate.into_expr(), Position::Predicate)?;
        self.filter.push(fragment, Conjunction::Or);
        Ok(self)
    }

    /// Raw predicate with `{0}`, `{1}`, .. standing for `params`.
    pub fn filter_raw(&mut self, raw_sql: &str, params: Vec<Value>) -> Result<&mut Self, QueryError> {
        let fragment = positional_fragment(raw_sql, &params)?;
        self.filter.push(fragment, Conjunction::And);
        Ok(self)
    }

    /// Raw predicate with `{name}` tokens resolved from `params`.
    ///
    /// Both the tokens and the keys go through the configured parameter-name
    /// filter before they are compared.
    pub fn filter_named(
        &mut self,
        raw_sql: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<&mut Self, QueryError> {
        let fragment = named_fragment(raw_sql, params)?;
        self.filter.push(fragment, Conjunction::And);
        Ok(self)
    }

    pub fn filter_exists(&mut self, sub_query: &Query) -> Result<&mut Self, QueryError> {
        self.and(sql::exists(sub_query))
    }

    pub fn filter_not_exists(&mut self, sub_query: &Query) -> Result<&mut Self, QueryError> {
        self.and(sql::not_exists(sub_query))
    }

    pub fn clear_filter(&mut self) -> &mut Self {
        self.filter = FilterChain::default();
        self
    }

    // ----- grouping and ordering ---------------------------------------

    pub fn group_by(&mut self, key: impl IntoExpr) -> Result<&mut Self, QueryError> {
        let fragment = self.translate(&key.into_expr(), Position::GroupKey)?;
        self.group_by.push(fragment);
        Ok(self)
    }

    /// Post-aggregation predicate; successive calls are combined with AND.
    pub fn having(&mut self, predicate: impl IntoExpr) -> Result<&mut Self, QueryError> {
        let fragment = self.translate(&predicate.into_expr(), Position::Having)?;
        self.having.push(fragment, Conjunction::And);
        Ok(self)
    }

    /// Replace the ordering. A `desc()` marker on the item is honoured.
    pub fn order_by(&mut self, item: impl IntoExpr) -> Result<&mut Self, QueryError> {
        let fragment = self.translate(&item.into_expr(), Position::OrderItem)?;
        self.order_by = vec![fragment];
        Ok(self)
    }

    /// Add a tie-breaker after the existing ordering.
    pub fn then_by(&mut self, item: impl IntoExpr) -> Result<&mut Self, QueryError> {
        let fragment = self.translate(&item.into_expr(), Position::OrderItem)?;
        self.order_by.push(fragment);
        Ok(self)
    }

    pub fn order_by_descending(&mut self, item: impl IntoExpr) -> Result<&mut Self, QueryError> {
        self.order_by(sql::desc(item))
    }

    pub fn then_by_descending(&mut self, item: impl IntoExpr) -> Result<&mut Self, QueryError> {
        self.then_by(sql::desc(item))
    }

    pub fn clear_order(&mut self) -> &mut Self {
        self.order_by.clear();
        self
    }

    // ----- projection and paging ---------------------------------------

    pub fn select(&mut self, items: Vec<Expr>) -> Result<&mut Self, QueryError> {
        let translator = ExprTranslator::new(self.dialect.as_ref(), &self.aliases);
        self.projection = Some(Projection::compile(&translator, &items)?);
        self.distinct = false;
        Ok(self)
    }

    pub fn select_distinct(&mut self, items: Vec<Expr>) -> Result<&mut Self, QueryError> {
        self.select(items)?;
        self.distinct = true;
        Ok(self)
    }

    /// Raw select list, emitted verbatim.
    pub fn select_raw(&mut self, select_sql: &str) -> &mut Self {
        self.projection = Some(Projection::raw(select_sql));
        self.distinct = false;
        self
    }

    pub fn limit(&mut self, rows: u64) -> &mut Self {
        self.rows = Some(rows);
        self
    }

    pub fn skip(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    pub fn shape(&self) -> ResultShape {
        self.projection
            .as_ref()
            .map_or(ResultShape::Entity, |p| p.shape().clone())
    }

    // ----- output ------------------------------------------------------

    fn body_fragment(&self, out: &mut Fragment) {
        out.push_sql("\nFROM ");
        out.push_sql(&self.root().table_reference);
        for join in &self.joins {
            out.push_sql("\n");
            out.append(join.to_fragment());
        }
        if let Some(filter) = self.filter.fragment() {
            out.push_sql("\nWHERE ");
            out.append(filter.clone());
        }
        if !self.group_by.is_empty() {
            out.push_sql("\nGROUP BY ");
            out.append(Fragment::join(self.group_by.iter().cloned(), ", "));
        }
        if let Some(having) = self.having.fragment() {
            out.push_sql("\nHAVING ");
            out.append(having.clone());
        }
    }

    /// The whole SELECT, literals still attached, for embedding elsewhere.
    pub fn to_fragment(&self) -> Fragment {
        let mut out = Fragment::sql(if self.distinct {
            "SELECT DISTINCT "
        } else {
            "SELECT "
        });
        match &self.projection {
            Some(projection) => out.append(projection.to_fragment()),
            None => out.append(Projection::entity(self.dialect.as_ref(), self.root()).to_fragment()),
        }

        self.body_fragment(&mut out);

        if !self.order_by.is_empty() {
            out.push_sql("\nORDER BY ");
            out.append(Fragment::join(self.order_by.iter().cloned(), ", "));
        }
        if let Some(limit) = self
            .dialect
            .limit_clause(self.offset, self.rows, !self.order_by.is_empty())
        {
            out.push_sql("\n");
            out.push_sql(&limit);
        }
        out
    }

    pub fn to_select_statement(&self) -> CompiledSql {
        let compiled = CompiledSql::from_fragment(self.dialect.as_ref(), &self.to_fragment(), self.shape());
        log::debug!("Compiled select ({} params): {}", compiled.params.len(), compiled.sql);
        compiled
    }

    /// `SELECT COUNT(*)` over the same sources and filters.
    pub fn to_count_statement(&self) -> CompiledSql {
        let needs_sub_query = !self.group_by.is_empty()
            || self.distinct
            || self.offset.is_some()
            || self.rows.is_some();

        let fragment = if needs_sub_query {
            let mut out = Fragment::sql("SELECT COUNT(*)\nFROM (");
            out.push_sub_query(self.to_fragment());
            out.push_sql(&format!(") {}", self.dialect.quote_name("count_q")));
            out
        } else {
            let mut out = Fragment::sql("SELECT COUNT(*)");
            self.body_fragment(&mut out);
            out
        };

        let compiled = CompiledSql::from_fragment(self.dialect.as_ref(), &fragment, ResultShape::Map);
        log::debug!("Compiled count ({} params): {}", compiled.params.len(), compiled.sql);
        compiled
    }

    /// The select with literals inlined, for logs and diagnostics.
    pub fn to_merged_params_select_statement(&self) -> String {
        inline_literals(self.dialect.as_ref(), &self.to_fragment())
    }

    /// `DELETE` of the root rows this query selects.
    pub fn to_delete_statement(&self) -> Result<CompiledSql, QueryError> {
        let meta = self.root_metadata();
        let mut fragment = Fragment::sql(format!(
            "DELETE FROM {}",
            self.dialect.quote_table(meta.schema(), meta.table())
        ));
        if let Some(predicate) = self.dml_predicate()? {
            fragment.push_sql(" WHERE ");
            fragment.append(predicate);
        }

        let compiled = CompiledSql::from_fragment(self.dialect.as_ref(), &fragment, ResultShape::Map);
        log::debug!("Compiled delete ({} params): {}", compiled.params.len(), compiled.sql);
        Ok(compiled)
    }

    /// `UPDATE` of the root rows this query selects, setting each
    /// `(field, value)` pair. SET parameters are numbered before the
    /// filter's.
    ///
    /// Auto-generated keys are never set, and a `NULL` for a non-nullable
    /// field is dropped.
    pub fn to_update_statement<I, S, V>(&self, assignments: I) -> Result<CompiledSql, QueryError>
    where
        I: IntoIterator<Item = (S, V)>,
        S: AsRef<str>,
        V: Into<Value>,
    {
        let meta = self.root_metadata();
        let mut sets = Vec::new();
        for (name, value) in assignments {
            let index = meta.require_field(name.as_ref())?;
            let field = &meta.fields()[index];
            let value = value.into();
            if field.is_auto_generated && meta.primary_key_index() == Some(index) {
                log::debug!("Not updating generated key {}.{}", meta.name(), field.name);
                continue;
            }
            if value.is_null() && !field.is_nullable {
                continue;
            }
            let mut set = Fragment::sql(format!("{}=", self.dialect.quote_name(field.column_name())));
            set.push_param(value);
            sets.push(set);
        }
        if sets.is_empty() {
            return Err(QueryError::EmptyUpdate {
                entity: meta.name().to_string(),
            });
        }

        let mut fragment = Fragment::sql(format!(
            "UPDATE {} SET ",
            self.dialect.quote_table(meta.schema(), meta.table())
        ));
        fragment.append(Fragment::join(sets, ", "));
        if let Some(predicate) = self.dml_predicate()? {
            fragment.push_sql(" WHERE ");
            fragment.append(predicate);
        }

        let compiled = CompiledSql::from_fragment(self.dialect.as_ref(), &fragment, ResultShape::Map);
        log::debug!("Compiled update ({} params): {}", compiled.params.len(), compiled.sql);
        Ok(compiled)
    }

    /// WHERE condition for DML on the root table.
    ///
    /// Without joins or a root alias the filter applies as is. Otherwise the
    /// root keys are selected through the full FROM/JOIN/WHERE body.
    fn dml_predicate(&self) -> Result<Option<Fragment>, QueryError> {
        let root = self.root();
        if self.joins.is_empty() && root.alias.is_none() {
            return Ok(self.filter.fragment().cloned());
        }

        let pk = root.meta.fields()[root.meta.require_primary_key()?].column_name();
        let mut out = Fragment::sql(format!("{} IN (SELECT ", self.dialect.quote_name(pk)));
        out.push_sql(&root.qualify(self.dialect.as_ref(), pk));
        self.body_fragment(&mut out);
        out.push_sql(")");
        Ok(Some(out))
    }
}

impl From<&Query> for Fragment {
    fn from(query: &Query) -> Self {
        query.to_fragment()
    }
}

impl From<&mut Query> for Fragment {
    fn from(query: &mut Query) -> Self {
        query.to_fragment()
    }
}

fn positional_fragment(raw_sql: &str, params: &[Value]) -> Result<Fragment, QueryError> {
    let mut fragment = Fragment::new();
    let mut last = 0;
    for caps in POSITIONAL_TOKEN.captures_iter(raw_sql) {
        let (Some(whole), Some(index)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let index: usize = index.as_str().parse().map_err(|_| QueryError::MissingRawParameter {
            index: usize::MAX,
            provided: params.len(),
            sql: raw_sql.to_string(),
        })?;
        let value = params.get(index).ok_or_else(|| QueryError::MissingRawParameter {
            index,
            provided: params.len(),
            sql: raw_sql.to_string(),
        })?;
        fragment.push_sql(&raw_sql[last..whole.start()]);
        fragment.push_param(value.clone());
        last = whole.end();
    }
    fragment.push_sql(&raw_sql[last..]);
    Ok(fragment)
}

fn named_fragment(
    raw_sql: &str,
    params: &HashMap<String, serde_json::Value>,
) -> Result<Fragment, QueryError> {
    let lookup: HashMap<String, &serde_json::Value> = params
        .iter()
        .map(|(k, v)| (config::param_name(k), v))
        .collect();

    let mut fragment = Fragment::new();
    let mut last = 0;
    for caps in NAMED_TOKEN.captures_iter(raw_sql) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let key = config::param_name(name.as_str());
        let value = lookup
            .get(&key)
            .ok_or_else(|| QueryError::MissingNamedParameter(name.as_str().to_string()))?;
        fragment.push_sql(&raw_sql[last..whole.start()]);
        fragment.push_param(Value::from(*value));
        last = whole.end();
    }
    fragment.push_sql(&raw_sql[last..]);
    Ok(fragment)
}
