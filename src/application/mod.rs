//! Application services layer scaffolding.

pub mod error;
pub mod feed;
pub mod paginator;
pub mod repos;
pub mod site;
