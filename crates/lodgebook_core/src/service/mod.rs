//! Use-case services consumed by the REST/console layers.

pub mod catalog;

pub use catalog::CatalogService;
