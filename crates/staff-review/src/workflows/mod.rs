pub mod evaluation;
pub mod sheet;
