pub mod jwt;
pub mod password;

pub mod auth_models;
pub mod auth_dto;
pub mod auth_repository;
pub mod auth_handlers;
pub mod auth_service;
pub mod routes;

pub use jwt::resolve_bearer;
