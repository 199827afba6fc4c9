pub mod notification_handlers;
pub mod notification_models;
pub mod notification_repository;
pub mod notification_service;
pub mod notifier;
pub mod routes;

pub use notifier::Notifier;
