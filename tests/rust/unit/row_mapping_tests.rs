use ormgraph::execution::{map_tuple_row, ColumnMappingError};
use ormgraph::{metadata, RowMapper, Value};

use crate::fixtures::{row, TeamUser};

fn snake_case_row() -> ormgraph::Row {
    row(&[
        ("Id", Value::Int(3)),
        ("Name", Value::from("ann")),
        ("team_id", Value::Int(1)),
        ("is_deleted", Value::Bool(false)),
    ])
}

#[test]
fn test_lenient_mapping_guesses_normalized_names() {
    let values = RowMapper::new(metadata::<TeamUser>())
        .strict(false)
        .map_row(&snake_case_row())
        .unwrap();
    assert_eq!(
        values,
        vec![Value::Int(3), Value::from("ann"), Value::Int(1), Value::Bool(false)]
    );
}

#[test]
fn test_strict_mapping_names_every_unmatched_field() {
    let err = RowMapper::new(metadata::<TeamUser>())
        .strict(true)
        .map_row(&snake_case_row())
        .unwrap_err();
    assert_eq!(
        err,
        ColumnMappingError::ColumnMappingMismatch {
            entity: "TeamUser".into(),
            fields: vec!["TeamId".into(), "IsDeleted".into()],
        }
    );
}

#[test]
fn test_missing_columns_map_to_null() {
    let values = RowMapper::new(metadata::<TeamUser>())
        .strict(false)
        .map_row(&row(&[("Id", Value::Int(3))]))
        .unwrap();
    assert_eq!(values[0], Value::Int(3));
    assert!(values[1..].iter().all(Value::is_null));
}

#[test]
fn test_rows_share_one_plan() {
    let rows = vec![
        row(&[("id", Value::Int(1)), ("name", Value::from("ann"))]),
        row(&[("id", Value::Int(2)), ("name", Value::from("bob"))]),
    ];
    let mapped = RowMapper::new(metadata::<TeamUser>())
        .strict(false)
        .map_rows(&rows)
        .unwrap();
    assert_eq!(mapped.len(), 2);
    assert_eq!(mapped[1][1], Value::from("bob"));
}

#[test]
fn test_tuple_row_split() {
    let joined = row(&[
        ("Id", Value::Int(1)),
        ("Name", Value::from("Red")),
        ("Id", Value::Int(3)),
        ("Name", Value::from("ann")),
    ]);
    let parts = map_tuple_row(&joined, &[2, 2]).unwrap();
    assert_eq!(parts[0].get("Name"), Some(&Value::from("Red")));
    assert_eq!(parts[1].get("Name"), Some(&Value::from("ann")));
}
