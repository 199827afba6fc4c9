use crate::db::DbPool;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::{
    auth::{auth_repository::RefreshTokenRepository, auth_service::AuthService},
    conversation::{
        conversation_repository::ConversationRepository, conversation_service::ConversationService,
    },
    message::{
        message_models::MessageEvent, message_repository::MessageRepository,
        message_service::MessageService,
    },
    notification::{
        notification_repository::NotificationRepository, notification_service::RealtimeNotifier,
    },
    product::product_repository::ProductRepository,
    user::{user_repository::UserRepository, user_service::UserService},
    websocket::ConnectionManager,
};

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub message_tx: broadcast::Sender<MessageEvent>,
    pub ws_connections: ConnectionManager,
    pub user_repository: UserRepository,
    pub refresh_token_repository: RefreshTokenRepository,
    pub notification_repository: NotificationRepository,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub conversation_service: ConversationService,
    pub message_service: MessageService,
}

impl AppState {
    /// Wires repositories, the realtime notifier and services over one pool.
    pub fn new(db: DbPool, config: Config) -> Self {
        let config = Arc::new(config);
        let (message_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));
        let ws_connections = ConnectionManager::new();

        let user_repository = UserRepository::new(db.clone());
        let refresh_token_repository = RefreshTokenRepository::new(db.clone());
        let notification_repository = NotificationRepository::new(db.clone());
        let conversation_repository = Arc::new(ConversationRepository::new(db.clone()));
        let message_repository = Arc::new(MessageRepository::new(db.clone()));
        let product_repository = Arc::new(ProductRepository::new(db.clone()));
        let user_directory = Arc::new(user_repository.clone());

        let notifier = Arc::new(RealtimeNotifier::new(
            message_tx.clone(),
            ws_connections.clone(),
            notification_repository.clone(),
        ));

        let auth_service = AuthService::new(
            db.clone(),
            user_repository.clone(),
            refresh_token_repository.clone(),
            &config,
        );
        let user_service = UserService::new(user_repository.clone());
        let conversation_service = ConversationService::new(
            conversation_repository.clone(),
            message_repository.clone(),
            user_directory.clone(),
            product_repository,
        );
        let message_service = MessageService::new(
            conversation_repository,
            message_repository,
            user_directory,
            notifier,
        );

        Self {
            db,
            config,
            message_tx,
            ws_connections,
            user_repository,
            refresh_token_repository,
            notification_repository,
            auth_service,
            user_service,
            conversation_service,
            message_service,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{0} must be a number")]
    NotANumber(&'static str),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub host: String,
    pub port: u16,
    pub event_channel_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: number_or("DATABASE_MAX_CONNECTIONS", 5)?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_minutes: number_or("ACCESS_TOKEN_MINUTES", 15)?,
            refresh_token_days: number_or("REFRESH_TOKEN_DAYS", 7)?,
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: number_or("PORT", 3000)?,
            event_channel_capacity: number_or("EVENT_CHANNEL_CAPACITY", 100)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn number_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::NotANumber(key)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_or_uses_default_when_unset() {
        let value: u32 = number_or("BARTER_API_TEST_UNSET_NUMBER", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_number_or_rejects_garbage() {
        std::env::set_var("BARTER_API_TEST_GARBAGE_NUMBER", "seven");
        let result: Result<u32, _> = number_or("BARTER_API_TEST_GARBAGE_NUMBER", 7);
        assert!(matches!(result, Err(ConfigError::NotANumber(_))));
    }

    #[test]
    fn test_bind_addr_joins_host_and_port() {
        let config = Config {
            database_url: "postgres://localhost/barter".into(),
            database_max_connections: 5,
            jwt_secret: "secret".into(),
            access_token_minutes: 15,
            refresh_token_days: 7,
            host: "0.0.0.0".into(),
            port: 8080,
            event_channel_capacity: 100,
        };
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }
}
