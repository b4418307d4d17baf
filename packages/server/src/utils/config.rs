use once_cell::sync::Lazy;
use std::env;

pub static CONFIG: Lazy<ServerConfig> = Lazy::new(ServerConfig::new);

pub struct ServerConfig {
    pub bind_addr: String,
    pub allowed_origin: String,
}

impl ServerConfig {
    fn new() -> Self {
        Self {
            bind_addr: env::var("WEREWOLF_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            allowed_origin: env::var("WEREWOLF_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        }
    }
}
