//! Stellato renders a blog from a hosted headless CMS: a paginated post
//! listing and per-post pages, generated once and served as static HTML
//! with timed regeneration.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
