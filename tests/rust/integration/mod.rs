//! Integration tests - builder, loader and saver working together against a
//! scripted executor.

#[path = "../fixtures/mod.rs"]
mod fixtures;

mod graph_load_tests;
mod graph_save_tests;
mod query_scenario_tests;
mod settings_tests;
