#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

pub mod grid;
pub mod ratio;
pub mod survival;
pub mod types;

#[path = "../scenario/mod.rs"]
pub mod scenario;

#[path = "../output/mod.rs"]
pub mod output;
