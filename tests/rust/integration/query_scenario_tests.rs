use ormgraph::sql;
use ormgraph::sql_generator::{AliasError, ParamOrigin};
use ormgraph::{Query, QueryError, ResultShape, Value};

use crate::fixtures::{sqlite, Team, TeamUser};

fn team_with_users_and_leader() -> anyhow::Result<Query> {
    let mut q = Query::from::<Team>(sqlite());
    q.join_as::<TeamUser>("tu", TeamUser::TEAM_ID.eq(Team::ID))?
        .join_as::<TeamUser>("leader", TeamUser::ID.table_alias("leader").eq(Team::LEADER_ID))?;
    Ok(q)
}

#[test]
fn test_root_self_join_on_references_root_and_alias() -> anyhow::Result<()> {
    let mut q = Query::from::<Team>(sqlite());
    q.join_as::<Team>("other", Team::LEADER_ID.table_alias("other").eq(Team::LEADER_ID))?
        .filter(Team::ID.eq(1))?
        .filter(Team::ID.table_alias("other").ne(Team::ID))?;

    let compiled = q.to_select_statement();
    assert_eq!(
        compiled.sql,
        "SELECT \"Team\".\"Id\", \"Team\".\"Name\", \"Team\".\"TeamLeaderId\"\n\
         FROM \"Team\"\n\
         INNER JOIN \"Team\" \"other\" ON (\"other\".\"TeamLeaderId\" = \"Team\".\"TeamLeaderId\")\n\
         WHERE (\"Team\".\"Id\" = @0) AND (\"other\".\"Id\" <> \"Team\".\"Id\")"
    );
    assert_eq!(compiled.values(), vec![Value::Int(1)]);
    Ok(())
}

#[test]
fn test_second_explicit_alias_needs_qualified_on() {
    let mut q = Query::from::<Team>(sqlite());
    q.join_as::<TeamUser>("tu", TeamUser::TEAM_ID.eq(Team::ID)).unwrap();
    let err = q
        .join_as::<TeamUser>("leader", TeamUser::ID.eq(Team::LEADER_ID))
        .unwrap_err();
    assert!(matches!(err, QueryError::Translate(_)));
    assert!(err.to_string().contains("joined more than once"));
    // The failed join released its alias
    q.join_as::<TeamUser>("leader", TeamUser::ID.table_alias("leader").eq(Team::LEADER_ID))
        .unwrap();
    assert_eq!(q.joins().len(), 2);
}

#[test]
fn test_self_join_aliases_resolve_independently() -> anyhow::Result<()> {
    let mut q = team_with_users_and_leader()?;
    q.select(vec![
        Team::NAME.expr(),
        TeamUser::NAME.table_alias("tu").as_("UserName"),
        TeamUser::NAME.table_alias("leader").as_("LeaderName"),
    ])?
    .filter(TeamUser::NAME.table_alias("leader").eq("ann"))?;

    let compiled = q.to_select_statement();
    assert_eq!(
        compiled.sql,
        "SELECT \"Team\".\"Name\", \"tu\".\"Name\" AS \"UserName\", \"leader\".\"Name\" AS \"LeaderName\"\n\
         FROM \"Team\"\n\
         INNER JOIN \"TeamUser\" \"tu\" ON (\"tu\".\"TeamId\" = \"Team\".\"Id\")\n\
         INNER JOIN \"TeamUser\" \"leader\" ON (\"leader\".\"Id\" = \"Team\".\"TeamLeaderId\")\n\
         WHERE (\"leader\".\"Name\" = @0)"
    );
    assert_eq!(compiled.values(), vec![Value::from("ann")]);
    assert_eq!(compiled.shape, ResultShape::Map);
    Ok(())
}

#[test]
fn test_unqualified_column_is_ambiguous_between_explicit_aliases() -> anyhow::Result<()> {
    let mut q = team_with_users_and_leader()?;
    let err = q.filter(TeamUser::NAME.eq("ann")).unwrap_err();
    assert!(matches!(err, QueryError::Translate(_)));
    Ok(())
}

#[test]
fn test_second_default_alias_collides() {
    let mut q = Query::from::<Team>(sqlite());
    q.join::<TeamUser>(TeamUser::TEAM_ID.eq(Team::ID)).unwrap();
    let err = q
        .join::<TeamUser>(TeamUser::ID.eq(Team::LEADER_ID))
        .unwrap_err();
    assert!(matches!(err, QueryError::Alias(AliasError::Collision { .. })));
}

#[test]
fn test_parameters_are_contiguous_across_sub_queries() -> anyhow::Result<()> {
    let mut members = Query::from::<TeamUser>(sqlite());
    members.filter(TeamUser::NAME.starts_with("a"))?;
    members.filter(TeamUser::ID.gt(5))?;

    let mut q = Query::from::<Team>(sqlite());
    q.filter(Team::NAME.eq("Red"))?
        .filter(Team::ID.in_query(&members))?
        .filter(Team::LEADER_ID.is_not_null())?
        .filter(Team::ID.lt(100))?;

    let compiled = q.to_select_statement();
    let indexes: Vec<usize> = compiled.params.iter().map(|p| p.index).collect();
    assert_eq!(indexes, vec![0, 1, 2, 3]);
    assert_eq!(
        compiled.values(),
        vec![Value::from("Red"), Value::from("a%"), Value::Int(5), Value::Int(100)]
    );
    assert_eq!(compiled.params[1].origin, ParamOrigin::MergedSubQuery);
    assert_eq!(compiled.params[3].origin, ParamOrigin::Outer);
    for i in 0..4 {
        assert!(compiled.sql.contains(&format!("@{i}")));
    }
    assert!(!compiled.sql.contains("@4"));
    Ok(())
}

#[test]
fn test_grouped_projection_with_having() -> anyhow::Result<()> {
    let mut q = Query::from::<TeamUser>(sqlite());
    q.select(vec![TeamUser::TEAM_ID.expr(), sql::as_(sql::count_all(), "Members")])?
        .group_by(TeamUser::TEAM_ID)?
        .having(sql::count_all().gt(2))?
        .order_by_descending(sql::count_all())?;

    assert_eq!(
        q.to_select_statement().sql,
        "SELECT \"TeamUser\".\"TeamId\", COUNT(*) AS \"Members\"\n\
         FROM \"TeamUser\"\n\
         GROUP BY \"TeamUser\".\"TeamId\"\n\
         HAVING (COUNT(*) > @0)\n\
         ORDER BY COUNT(*) DESC"
    );
    Ok(())
}

#[test]
fn test_aggregate_in_where_is_rejected() {
    let mut q = Query::from::<TeamUser>(sqlite());
    let before = q.to_select_statement();
    assert!(q.filter(sql::count_all().gt(1)).is_err());
    assert_eq!(q.to_select_statement(), before);
}

#[test]
fn test_join_inferred_from_foreign_key() -> anyhow::Result<()> {
    let mut q = Query::from::<Team>(sqlite());
    q.join_ref::<TeamUser>()?;
    assert!(q
        .to_select_statement()
        .sql
        .contains("INNER JOIN \"TeamUser\" ON (\"TeamUser\".\"TeamId\" = \"Team\".\"Id\")"));
    Ok(())
}

#[test]
fn test_tuple_projection_shape() -> anyhow::Result<()> {
    let mut q = Query::from::<Team>(sqlite());
    q.join_as::<TeamUser>("tu", TeamUser::TEAM_ID.eq(Team::ID))?
        .select(vec![
            sql::all_fields::<Team>(),
            sql::eot(),
            sql::all_fields_as::<TeamUser>("tu"),
        ])?;
    assert_eq!(q.shape(), ResultShape::Tuple(vec![3, 4]));
    Ok(())
}

#[test]
fn test_update_and_delete_keep_parameters_contiguous() -> anyhow::Result<()> {
    let mut members = Query::from::<TeamUser>(sqlite());
    members.filter(TeamUser::NAME.starts_with("a"))?;

    let mut q = Query::from::<Team>(sqlite());
    q.filter(Team::NAME.eq("Red"))?
        .filter(Team::ID.in_query(&members))?;

    let update = q.to_update_statement([(Team::LEADER_ID.field(), Value::Int(9))])?;
    assert!(update.sql.starts_with("UPDATE \"Team\" SET \"TeamLeaderId\"=@0 WHERE "));
    assert_eq!(
        update.values(),
        vec![Value::Int(9), Value::from("Red"), Value::from("a%")]
    );
    assert_eq!(update.params[0].origin, ParamOrigin::Outer);
    assert_eq!(update.params[2].origin, ParamOrigin::MergedSubQuery);
    assert!(update.sql.contains("@2") && !update.sql.contains("@3"));

    let delete = q.to_delete_statement()?;
    assert!(delete.sql.starts_with("DELETE FROM \"Team\" WHERE (\"Team\".\"Name\" = @0)"));
    assert_eq!(delete.values(), vec![Value::from("Red"), Value::from("a%")]);
    Ok(())
}
