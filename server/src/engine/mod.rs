pub mod backend;
pub mod bootstrap;
pub mod join;
