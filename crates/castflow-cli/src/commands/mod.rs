pub mod nodes;
pub mod probe;
pub mod run;
