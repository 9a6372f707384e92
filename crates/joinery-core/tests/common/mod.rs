#![allow(dead_code)]

use joinery_core::model::Table;
use joinery_core::rows::{Chunk, Seed};

pub fn table(json: &str) -> Table {
    serde_json::from_str(json).unwrap_or_else(|e| panic!("Invalid table fixture: {e}"))
}

pub fn build_test_v1() -> Table {
    table(include_str!("../fixtures/build_test_v1.json"))
}

pub fn build_test_v2() -> Table {
    table(include_str!("../fixtures/build_test_v2.json"))
}

pub fn seed_chunk(seeds: Vec<Seed>) -> Chunk {
    Chunk::new("seed_test", &["id", "string", "time", "null"], seeds)
}
