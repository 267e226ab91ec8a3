use mockall::mock;
use mockall::predicate::always;
use serial_test::serial;

use ormgraph::config::{self, OrmSettings};
use ormgraph::{
    AsyncGraphLoader, EntityGraph, ExecutionError, Executor, GraphError, GraphLoader, Include,
    OrmError, Query, Row, Value,
};

use crate::fixtures::{init_logging, row, sqlite, FakeDb, Region, Team, TeamUser};

mock! {
    pub Db {}

    impl Executor for Db {
        fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ExecutionError>;
        fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, ExecutionError>;
        fn scalar(&mut self, sql: &str, params: &[Value]) -> Result<Option<Value>, ExecutionError>;
    }
}

fn team_row(id: i64, name: &str, leader: Option<i64>) -> Row {
    row(&[
        ("Id", Value::Int(id)),
        ("Name", Value::from(name)),
        ("TeamLeaderId", Value::from(leader)),
    ])
}

fn user_row(id: i64, name: &str, team: i64) -> Row {
    row(&[
        ("Id", Value::Int(id)),
        ("Name", Value::from(name)),
        ("TeamId", Value::Int(team)),
        ("IsDeleted", Value::Bool(false)),
    ])
}

#[test]
#[serial]
fn test_null_foreign_key_issues_no_reference_query() {
    init_logging();
    let mut db = MockDb::new();
    db.expect_query()
        .withf(|sql, _| sql.contains("FROM \"Team\""))
        .times(1)
        .returning(|_, _| Ok(vec![team_row(1, "Red", None), team_row(2, "Blue", None)]));

    let mut loader = GraphLoader::new(db, sqlite());
    let teams = loader
        .load_select(&Query::from::<Team>(sqlite()), &Include::only(["TeamLeader"]))
        .unwrap();

    assert_eq!(teams.len(), 2);
    assert!(teams.iter().all(|t| t.reference("TeamLeader").is_none()));
    loader.executor_mut().checkpoint();
}

#[test]
#[serial]
fn test_references_load_in_one_query_per_property() {
    init_logging();
    let db = FakeDb::new()
        .with_rows("Team", vec![team_row(1, "Red", Some(10)), team_row(2, "Blue", None)])
        .with_rows("TeamUser", vec![user_row(10, "ann", 1), user_row(11, "bob", 1)]);

    let mut loader = GraphLoader::new(db, sqlite());
    let teams = loader
        .load_select(&Query::from::<Team>(sqlite()), &Include::All)
        .unwrap();

    let db = loader.into_executor();
    let selects = db.selects();
    assert_eq!(selects.len(), 3);
    assert!(selects[1].0.ends_with("WHERE (\"TeamUser\".\"TeamId\" IN (@0,@1))"));
    assert_eq!(selects[1].1, vec![Value::Int(1), Value::Int(2)]);
    assert!(selects[2].0.ends_with("WHERE (\"TeamUser\".\"Id\" IN (@0))"));
    assert_eq!(selects[2].1, vec![Value::Int(10)]);

    let users = teams[0].many("Users").unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(teams[0].one("TeamLeader").unwrap().get("Name").unwrap(), Value::from("ann"));

    assert_eq!(teams[1].many("Users").map(|u| u.len()), Some(0));
    assert!(teams[1].one("TeamLeader").is_none());
}

#[test]
#[serial]
fn test_case_insensitive_keys_match_in_query_and_memory() {
    init_logging();
    let _settings = OrmSettings {
        case_insensitive: true,
        ..Default::default()
    }
    .apply()
    .unwrap();

    let db = FakeDb::new()
        .with_rows(
            "Region",
            vec![row(&[("Code", Value::from("WEST")), ("Name", Value::from("West coast"))])],
        )
        .with_rows(
            "Store",
            vec![row(&[("Id", Value::Int(1)), ("RegionCode", Value::from("West"))])],
        );

    let mut loader = GraphLoader::new(db, sqlite());
    let regions = loader
        .load_select(&Query::from::<Region>(sqlite()), &Include::All)
        .unwrap();

    let stores = regions[0].many("Stores").unwrap();
    assert_eq!(stores.len(), 1);

    let db = loader.into_executor();
    let (sql, params) = db.selects()[1];
    assert!(sql.contains("(LOWER(\"Store\".\"RegionCode\") IN (@0))"));
    assert_eq!(params, &vec![Value::from("west")]);
}

#[test]
#[serial]
fn test_case_sensitive_keys_do_not_match() {
    let db = FakeDb::new()
        .with_rows(
            "Region",
            vec![row(&[("Code", Value::from("WEST")), ("Name", Value::from("West coast"))])],
        )
        .with_rows(
            "Store",
            vec![row(&[("Id", Value::Int(1)), ("RegionCode", Value::from("West"))])],
        );

    let mut loader = GraphLoader::new(db, sqlite());
    let regions = loader
        .load_select(&Query::from::<Region>(sqlite()), &Include::All)
        .unwrap();
    assert_eq!(regions[0].many("Stores").map(|s| s.len()), Some(0));
}

#[test]
#[serial]
fn test_select_filter_applies_to_root_and_reference_queries() {
    config::register_select_filter("SoftDelete", |q| {
        q.filter(TeamUser::IS_DELETED.eq(false))?;
        Ok(())
    });

    let db = FakeDb::new()
        .with_rows("Team", vec![team_row(1, "Red", None)])
        .with_rows("TeamUser", vec![user_row(10, "ann", 1)]);
    let mut loader = GraphLoader::new(db, sqlite());

    loader
        .load_select(&Query::from::<Team>(sqlite()), &Include::only(["Users"]))
        .unwrap();
    loader
        .load_select(&Query::from::<TeamUser>(sqlite()), &Include::Nothing)
        .unwrap();
    config::clear_select_filters();

    let db = loader.into_executor();
    let selects = db.selects();
    // Team itself has no SoftDelete capability
    assert!(!selects[0].0.contains("IsDeleted"));
    assert!(selects[1]
        .0
        .ends_with("WHERE (\"TeamUser\".\"IsDeleted\" = @0) AND (\"TeamUser\".\"TeamId\" IN (@1))"));
    assert!(selects[2].0.ends_with("WHERE (\"TeamUser\".\"IsDeleted\" = @0)"));
}

#[test]
#[serial]
fn test_load_single_by_id() {
    let db = FakeDb::new().with_rows("Team", vec![team_row(7, "Red", None)]);
    let mut loader = GraphLoader::new(db, sqlite());
    let team = loader
        .load_single_by_id::<Team>(7, &Include::Nothing)
        .unwrap()
        .unwrap();
    assert_eq!(team.key(), Value::Int(7));

    let db = loader.into_executor();
    assert!(db.selects()[0].0.ends_with("WHERE (\"Team\".\"Id\" = @0)"));
}

#[test]
fn test_projection_queries_cannot_load_graphs() {
    let mut q = Query::from::<Team>(sqlite());
    q.select_raw("COUNT(*)");
    let mut loader = GraphLoader::new(FakeDb::new(), sqlite());
    let err = loader.load_select(&q, &Include::All).unwrap_err();
    assert!(matches!(err, GraphError::NotEntityProjection { .. }));
}

#[test]
fn test_executor_errors_pass_through() {
    let mut db = MockDb::new();
    db.expect_query()
        .with(always(), always())
        .returning(|_, _| Err(ExecutionError::message("connection reset")));

    let mut loader = GraphLoader::new(db, sqlite());
    let err: OrmError = loader
        .load_select(&Query::from::<Team>(sqlite()), &Include::All)
        .unwrap_err()
        .into();
    assert!(matches!(err, OrmError::Execution(_)));
    assert_eq!(err.to_string(), "connection reset");
}

#[tokio::test]
#[serial]
async fn test_async_loader_matches_blocking_loader() {
    let rows = || {
        FakeDb::new()
            .with_rows("Team", vec![team_row(1, "Red", Some(10))])
            .with_rows("TeamUser", vec![user_row(10, "ann", 1)])
    };

    let mut blocking = GraphLoader::new(rows(), sqlite());
    blocking
        .load_select(&Query::from::<Team>(sqlite()), &Include::All)
        .unwrap();

    let mut suspending = AsyncGraphLoader::new(rows(), sqlite());
    let teams: Vec<EntityGraph> = suspending
        .load_select(&Query::from::<Team>(sqlite()), &Include::All)
        .await
        .unwrap();

    assert_eq!(teams[0].one("TeamLeader").unwrap().key(), Value::Int(10));
    assert_eq!(
        blocking.into_executor().statements,
        suspending.into_executor().statements
    );
}
