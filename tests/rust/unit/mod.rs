#[path = "../fixtures/mod.rs"]
mod fixtures;

mod dialect_rendering_tests;
mod row_mapping_tests;
