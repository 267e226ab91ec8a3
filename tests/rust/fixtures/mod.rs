//! Shared entities and a scripted in-memory executor for the test binaries.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use ormgraph::{
    AsyncExecutor, Col, Entity, EntityDescriptor, ExecutionError, Executor, FieldDef, Row,
    SqlType, SqliteDialect, Value,
};

pub fn sqlite() -> ormgraph::DialectRef {
    Arc::new(SqliteDialect)
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    Row::from_pairs(pairs.iter().map(|(c, v)| (c.to_string(), v.clone())))
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Team;

impl Team {
    pub const ID: Col<Team> = Col::new("Id");
    pub const NAME: Col<Team> = Col::new("Name");
    pub const LEADER_ID: Col<Team> = Col::new("TeamLeaderId");
}

impl Entity for Team {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("Team")
            .field(FieldDef::new("Id", SqlType::Int).primary_key().auto_increment())
            .field(FieldDef::new("Name", SqlType::Text))
            .field(
                FieldDef::new("TeamLeaderId", SqlType::Int)
                    .nullable()
                    .references_as::<TeamUser>(),
            )
            .reference_many::<TeamUser>("Users")
            .reference_one::<TeamUser>("TeamLeader")
    }
}

pub struct TeamUser;

impl TeamUser {
    pub const ID: Col<TeamUser> = Col::new("Id");
    pub const NAME: Col<TeamUser> = Col::new("Name");
    pub const TEAM_ID: Col<TeamUser> = Col::new("TeamId");
    pub const IS_DELETED: Col<TeamUser> = Col::new("IsDeleted");
}

impl Entity for TeamUser {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("TeamUser")
            .field(FieldDef::new("Id", SqlType::Int).primary_key().auto_increment())
            .field(FieldDef::new("Name", SqlType::Text))
            .field(FieldDef::new("TeamId", SqlType::Int).nullable().references::<Team>())
            .field(FieldDef::new("IsDeleted", SqlType::Bool))
            .capability("SoftDelete")
    }
}

/// Holds the key of its favourite book; books point back at their author.
pub struct Author;

impl Entity for Author {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("Author")
            .field(FieldDef::new("Id", SqlType::Int).primary_key().auto_increment())
            .field(FieldDef::new("Name", SqlType::Text))
            .field(
                FieldDef::new("FavoriteBookId", SqlType::Int)
                    .nullable()
                    .references_self::<Book>(),
            )
            .reference_one::<Book>("FavoriteBook")
    }
}

pub struct Book;

impl Entity for Book {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("Book")
            .field(FieldDef::new("Id", SqlType::Int).primary_key().auto_increment())
            .field(FieldDef::new("Title", SqlType::Text))
            .field(FieldDef::new("AuthorId", SqlType::Int).nullable().references::<Author>())
            .reference_one::<Author>("Author")
    }
}

/// Keyed by a textual code.
pub struct Region;

impl Entity for Region {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("Region")
            .field(FieldDef::new("Code", SqlType::Text).primary_key())
            .field(FieldDef::new("Name", SqlType::Text))
            .reference_many::<Store>("Stores")
    }
}

pub struct Store;

impl Entity for Store {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("Store")
            .field(FieldDef::new("Id", SqlType::Int).primary_key().auto_increment())
            .field(FieldDef::new("RegionCode", SqlType::Text).references::<Region>())
    }
}

/// Executor answering from canned rows and recording every statement.
///
/// Inserts that ask for a generated key get 100, 101, .. in order. A key
/// probe answers 1 for keys listed in `existing`, 0 otherwise.
#[derive(Debug, Default)]
pub struct FakeDb {
    pub statements: Vec<(String, Vec<Value>)>,
    tables: Vec<(String, Vec<Row>)>,
    existing: HashSet<String>,
    next_id: i64,
}

impl FakeDb {
    pub fn new() -> Self {
        Self {
            next_id: 100,
            ..Default::default()
        }
    }

    pub fn with_rows(mut self, table: &str, rows: Vec<Row>) -> Self {
        self.tables.push((format!("FROM \"{table}\""), rows));
        self
    }

    pub fn with_existing(mut self, key: Value) -> Self {
        self.existing.insert(key.to_string());
        self
    }

    pub fn selects(&self) -> Vec<&(String, Vec<Value>)> {
        self.statements
            .iter()
            .filter(|(sql, _)| sql.starts_with("SELECT") && !sql.starts_with("SELECT COUNT"))
            .collect()
    }

    pub fn writes(&self) -> Vec<&(String, Vec<Value>)> {
        self.statements
            .iter()
            .filter(|(sql, _)| sql.starts_with("INSERT") || sql.starts_with("UPDATE"))
            .collect()
    }

    fn record(&mut self, sql: &str, params: &[Value]) {
        self.statements.push((sql.to_string(), params.to_vec()));
    }
}

impl Executor for FakeDb {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ExecutionError> {
        self.record(sql, params);
        Ok(self
            .tables
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, ExecutionError> {
        self.record(sql, params);
        Ok(1)
    }

    fn scalar(&mut self, sql: &str, params: &[Value]) -> Result<Option<Value>, ExecutionError> {
        self.record(sql, params);
        if sql.contains("last_insert_rowid()") {
            let id = self.next_id;
            self.next_id += 1;
            return Ok(Some(Value::Int(id)));
        }
        if sql.starts_with("SELECT COUNT(*)") {
            let found = params
                .first()
                .is_some_and(|key| self.existing.contains(&key.to_string()));
            return Ok(Some(Value::Int(i64::from(found))));
        }
        Ok(None)
    }
}

#[async_trait]
impl AsyncExecutor for FakeDb {
    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ExecutionError> {
        Executor::query(self, sql, params)
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, ExecutionError> {
        Executor::execute(self, sql, params)
    }

    async fn scalar(&mut self, sql: &str, params: &[Value])
        -> Result<Option<Value>, ExecutionError> {
        Executor::scalar(self, sql, params)
    }
}
