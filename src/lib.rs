pub mod auto_assign;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod interval_tree;
pub mod ledger;
pub mod limits;
pub mod model;
pub mod observability;
pub mod store;
pub mod users;
pub mod validate;
