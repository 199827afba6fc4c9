pub mod product_catalog;
pub mod product_models;
pub mod product_repository;
