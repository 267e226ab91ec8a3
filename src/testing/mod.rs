//! Entities shared by the unit tests.

use crate::entity_catalog::{Entity, EntityDescriptor, FieldDef};
use crate::expression::Col;
use crate::value::SqlType;

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
}

impl Entity for TeamUser {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("TeamUser")
            .field(FieldDef::new("Id", SqlType::Int).primary_key().auto_increment())
            .field(FieldDef::new("Name", SqlType::Text))
            .field(FieldDef::new("TeamId", SqlType::Int).nullable().references::<Team>())
    }
}

pub struct Customer;

impl Entity for Customer {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("Customer")
            .field(FieldDef::new("Id", SqlType::Int).primary_key().auto_increment())
            .field(FieldDef::new("Name", SqlType::Text))
            .reference_one::<CustomerAddress>("PrimaryAddress")
    }
}

pub struct CustomerAddress;

impl Entity for CustomerAddress {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("CustomerAddress")
            .field(FieldDef::new("Id", SqlType::Int).primary_key().auto_increment())
            .field(FieldDef::new("CustomerId", SqlType::Int).references::<Customer>())
            .field(FieldDef::new("City", SqlType::Text))
    }
}

pub struct Employee;

impl Entity for Employee {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("Employee")
            .field(FieldDef::new("Id", SqlType::Int).primary_key().auto_increment())
            .field(FieldDef::new("Name", SqlType::Text))
            .field(
                FieldDef::new("ManagerId", SqlType::Int)
                    .nullable()
                    .references::<Employee>(),
            )
            .reference_one::<Employee>("Manager")
            .reference_many::<Employee>("Reports")
    }
}
