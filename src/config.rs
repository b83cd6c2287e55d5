use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub registration: RegistrationMode,
    pub token_ttl_hours: i64,
    pub max_body_size: usize,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationMode {
    Open,
    Closed,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("USERHUB_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid USERHUB_HOST: {e}"))?;

        let port: u16 = env_or("USERHUB_PORT", "8080")
            .parse()
            .map_err(|e| format!("Invalid USERHUB_PORT: {e}"))?;

        let registration = match env_or("USERHUB_REGISTRATION", "open").as_str() {
            "closed" => RegistrationMode::Closed,
            _ => RegistrationMode::Open,
        };

        let token_ttl_hours: i64 = env_or("USERHUB_TOKEN_TTL_HOURS", "168")
            .parse()
            .map_err(|e| format!("Invalid USERHUB_TOKEN_TTL_HOURS: {e}"))?;
        if token_ttl_hours <= 0 {
            return Err("USERHUB_TOKEN_TTL_HOURS must be positive".to_string());
        }

        let max_body_size: usize = env_or("USERHUB_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid USERHUB_MAX_BODY_SIZE: {e}"))?;

        let cors_origins = parse_list(&env_or("USERHUB_CORS_ORIGINS", ""));

        let db_max_connections: u32 = env_or("USERHUB_DB_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|e| format!("Invalid USERHUB_DB_MAX_CONNECTIONS: {e}"))?;

        let log_level = env_or("USERHUB_LOG_LEVEL", "info");

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            registration,
            token_ttl_hours,
            max_body_size,
            cors_origins,
            db_max_connections,
            log_level,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
