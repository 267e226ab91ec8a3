use ormgraph::{AsyncGraphLoader, EntityGraph, GraphLoader, Value};

use crate::fixtures::{init_logging, sqlite, Author, Book, FakeDb, Team, TeamUser};

fn user(name: &str) -> EntityGraph {
    EntityGraph::new::<TeamUser>()
        .with("Name", name)
        .unwrap()
        .with("IsDeleted", false)
        .unwrap()
}

#[test]
fn test_save_sets_child_keys_and_parent_held_key() {
    init_logging();
    let team = EntityGraph::new::<Team>().with("Name", "Red").unwrap();
    let ann = user("ann");
    let bob = user("bob");
    team.set_many("Users", vec![ann.clone(), bob.clone()]).unwrap();
    team.set_one("TeamLeader", &bob).unwrap();

    let mut loader = GraphLoader::new(FakeDb::new(), sqlite());
    loader.save(&team, true).unwrap();

    assert_eq!(team.key(), Value::Int(100));
    assert_eq!(ann.get("TeamId").unwrap(), Value::Int(100));
    assert_eq!(bob.get("TeamId").unwrap(), Value::Int(100));
    assert_eq!(team.get("TeamLeaderId").unwrap(), bob.key());

    let db = loader.into_executor();
    let writes = db.writes();
    // team, ann, bob, then the leader update on team
    assert_eq!(writes.len(), 4);
    assert!(writes[0].0.starts_with("INSERT INTO \"Team\""));
    assert_eq!(
        writes[3].0,
        "UPDATE \"Team\" SET \"Name\"=@0, \"TeamLeaderId\"=@1 WHERE \"Id\"=@2"
    );
    assert_eq!(writes[3].1, vec![Value::from("Red"), Value::Int(102), Value::Int(100)]);
}

#[test]
fn test_leader_who_is_also_member_is_written_once() {
    let team = EntityGraph::new::<Team>().with("Name", "Red").unwrap();
    let ann = user("ann");
    team.set_one("TeamLeader", &ann).unwrap();
    team.set_many("Users", vec![ann.clone()]).unwrap();

    let mut loader = GraphLoader::new(FakeDb::new(), sqlite());
    loader.save(&team, true).unwrap();

    assert_eq!(ann.get("TeamId").unwrap(), team.key());
    assert_eq!(team.get("TeamLeaderId").unwrap(), ann.key());

    let db = loader.into_executor();
    // team, ann, then the leader update on team
    assert_eq!(db.writes().len(), 3);
}

#[test]
fn test_cyclic_save_terminates_with_both_keys_set() {
    init_logging();
    let author = EntityGraph::new::<Author>().with("Name", "Le Guin").unwrap();
    let book = EntityGraph::new::<Book>().with("Title", "The Dispossessed").unwrap();
    author.set_one("FavoriteBook", &book).unwrap();
    book.set_one("Author", &author).unwrap();

    let mut loader = GraphLoader::new(FakeDb::new(), sqlite());
    loader.save(&author, true).unwrap();

    assert_eq!(author.key(), Value::Int(100));
    assert_eq!(book.key(), Value::Int(101));
    assert_eq!(book.get("AuthorId").unwrap(), Value::Int(100));
    assert_eq!(author.get("FavoriteBookId").unwrap(), Value::Int(101));

    let db = loader.into_executor();
    // author insert, book insert, author update
    assert_eq!(db.writes().len(), 3);
}

#[test]
fn test_existing_key_is_probed_then_updated() {
    let team = EntityGraph::new::<Team>()
        .with("Id", 5)
        .unwrap()
        .with("Name", "Red")
        .unwrap();

    let mut loader = GraphLoader::new(FakeDb::new().with_existing(Value::Int(5)), sqlite());
    loader.save(&team, false).unwrap();

    let db = loader.into_executor();
    assert_eq!(db.statements[0].0, "SELECT COUNT(*) FROM \"Team\" WHERE \"Id\"=@0");
    assert!(db.statements[1].0.starts_with("UPDATE \"Team\""));
}

#[test]
fn test_assigned_key_without_row_is_inserted() {
    let team = EntityGraph::new::<Team>()
        .with("Id", 6)
        .unwrap()
        .with("Name", "Blue")
        .unwrap();

    let mut loader = GraphLoader::new(FakeDb::new(), sqlite());
    loader.save(&team, false).unwrap();

    let db = loader.into_executor();
    assert_eq!(
        db.statements[1].0,
        "INSERT INTO \"Team\" (\"Id\",\"Name\",\"TeamLeaderId\") VALUES (@0,@1,@2)"
    );
    assert_eq!(team.key(), Value::Int(6));
}

#[test]
fn test_save_all_writes_shared_child_once() {
    let ann = user("ann");
    let red = EntityGraph::new::<Team>().with("Name", "Red").unwrap();
    let blue = EntityGraph::new::<Team>().with("Name", "Blue").unwrap();
    red.set_one("TeamLeader", &ann).unwrap();
    blue.set_one("TeamLeader", &ann).unwrap();

    let mut loader = GraphLoader::new(FakeDb::new(), sqlite());
    loader.save_all(&[red.clone(), blue.clone()], true).unwrap();

    let db = loader.into_executor();
    let user_inserts = db
        .writes()
        .iter()
        .filter(|(sql, _)| sql.starts_with("INSERT INTO \"TeamUser\""))
        .count();
    assert_eq!(user_inserts, 1);
    assert_eq!(red.get("TeamLeaderId").unwrap(), ann.key());
    assert_eq!(blue.get("TeamLeaderId").unwrap(), ann.key());
}

#[tokio::test]
async fn test_async_cyclic_save() {
    let author = EntityGraph::new::<Author>().with("Name", "Le Guin").unwrap();
    let book = EntityGraph::new::<Book>().with("Title", "The Dispossessed").unwrap();
    author.set_one("FavoriteBook", &book).unwrap();
    book.set_one("Author", &author).unwrap();

    let mut loader = AsyncGraphLoader::new(FakeDb::new(), sqlite());
    loader.save(&author, true).await.unwrap();

    assert_eq!(book.get("AuthorId").unwrap(), author.key());
    assert_eq!(author.get("FavoriteBookId").unwrap(), book.key());
}
