//! Join descriptors and foreign-key based join inference.

use crate::dialect::Dialect;
use crate::entity_catalog::{EntityMetadata, EntityType, FieldDefinition, ForeignKeyKind};
use crate::sql_generator::{AliasBinding, Fragment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
    /// Caller-supplied join SQL
    Custom,
}

impl JoinKind {
    pub fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
            JoinKind::Cross => "CROSS JOIN",
            JoinKind::Custom => "",
        }
    }
}

/// One join of a query, already compiled against the aliases bound before it.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinDescriptor {
    pub target: EntityType,
    pub kind: JoinKind,
    pub alias: Option<String>,
    /// Quoted `table alias`
    pub table_reference: String,
    pub on: Option<Fragment>,
    pub custom_sql: Option<String>,
}

impl JoinDescriptor {
    pub fn to_fragment(&self) -> Fragment {
        if let Some(sql) = &self.custom_sql {
            return Fragment::sql(sql.clone());
        }
        let mut fragment = Fragment::sql(format!("{} {}", self.kind.keyword(), self.table_reference));
        if let Some(on) = &self.on {
            fragment.push_sql(" ON ");
            fragment.append(on.clone());
        }
        fragment
    }
}

fn fk_to<'m>(meta: &'m EntityMetadata, target: &EntityMetadata) -> Option<&'m FieldDefinition> {
    let entity = target.entity_type();
    let explicit: Vec<&FieldDefinition> = meta
        .fields()
        .iter()
        .filter(|f| f.references_type(&entity))
        .collect();

    explicit
        .iter()
        .find(|f| matches!(f.foreign_key.as_ref().map(|fk| fk.kind), Some(ForeignKeyKind::Owning)))
        .or_else(|| explicit.first())
        .copied()
        .or_else(|| {
            let by_convention = format!("{}Id", target.name());
            meta.fields()
                .iter()
                .find(|f| f.name.eq_ignore_ascii_case(&by_convention))
        })
}

/// ON condition linking `target` to the first compatible source already in
/// the query, in either direction.
pub fn infer_join_condition(
    dialect: &dyn Dialect,
    existing: &[AliasBinding],
    target: &AliasBinding,
) -> Option<Fragment> {
    for source in existing {
        let condition = if let (Some(fk), Some(pk)) =
            (fk_to(&target.meta, &source.meta), source.meta.primary_key())
        {
            Some((target.qualify(dialect, fk.column_name()), source.qualify(dialect, pk.column_name())))
        } else if let (Some(fk), Some(pk)) =
            (fk_to(&source.meta, &target.meta), target.meta.primary_key())
        {
            Some((target.qualify(dialect, pk.column_name()), source.qualify(dialect, fk.column_name())))
        } else {
            None
        };

        if let Some((left, right)) = condition {
            return Some(Fragment::sql(format!("({left} = {right})")));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SqliteDialect;
    use crate::entity_catalog::metadata;
    use crate::sql_generator::AliasResolver;
    use crate::testing::{Customer, CustomerAddress, Team, TeamUser};

    #[test]
    fn test_infer_child_to_parent() {
        let mut aliases = AliasResolver::new();
        aliases.bind(metadata::<Team>(), None, &SqliteDialect).unwrap();
        let target = aliases
            .bind(metadata::<TeamUser>(), None, &SqliteDialect)
            .unwrap()
            .clone();
        let on = infer_join_condition(&SqliteDialect, &aliases.bindings()[..1], &target).unwrap();
        assert_eq!(on.to_string(), "(\"TeamUser\".\"TeamId\" = \"Team\".\"Id\")");
    }

    #[test]
    fn test_infer_parent_joined_after_child() {
        let mut aliases = AliasResolver::new();
        aliases.bind(metadata::<CustomerAddress>(), None, &SqliteDialect).unwrap();
        let target = aliases
            .bind(metadata::<Customer>(), Some("c"), &SqliteDialect)
            .unwrap()
            .clone();
        let on = infer_join_condition(&SqliteDialect, &aliases.bindings()[..1], &target).unwrap();
        assert_eq!(on.to_string(), "(\"c\".\"Id\" = \"CustomerAddress\".\"CustomerId\")");
    }

    #[test]
    fn test_join_fragment() {
        let join = JoinDescriptor {
            target: metadata::<TeamUser>().entity_type(),
            kind: JoinKind::Left,
            alias: Some("tu".into()),
            table_reference: "\"TeamUser\" \"tu\"".into(),
            on: Some(Fragment::sql("(\"tu\".\"TeamId\" = \"Team\".\"Id\")")),
            custom_sql: None,
        };
        assert_eq!(
            join.to_fragment().to_string(),
            "LEFT JOIN \"TeamUser\" \"tu\" ON (\"tu\".\"TeamId\" = \"Team\".\"Id\")"
        );
    }
}
