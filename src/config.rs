use std::env;
use std::fmt;

/// Which store implementation the server runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// PostgreSQL through a sqlx connection pool.
    Postgres { url: String, max_connections: u32 },
    /// Process-local store. Data is lost on restart.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Configuration error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub storage: StorageBackend,
    pub jwt_secret: String,
    pub jwt_expires_in_days: i64,
    pub bcrypt_cost: u32,
    pub cors_origin: Option<String>,
}

impl Config {
    /// Reads the configuration from the process environment, after loading `.env`
    /// if one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = match lookup("STORAGE_BACKEND").as_deref() {
            None | Some("postgres") => StorageBackend::Postgres {
                url: lookup("DATABASE_URL")
                    .ok_or_else(|| ConfigError("DATABASE_URL must be set".into()))?,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            },
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(ConfigError(format!(
                    "STORAGE_BACKEND must be `postgres` or `memory`, got `{}`",
                    other
                )))
            }
        };

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError("JWT_SECRET must be set".into()))?;

        let jwt_expires_in_days = parse_or(&lookup, "JWT_EXPIRES_IN_DAYS", 30)?;
        if jwt_expires_in_days <= 0 {
            return Err(ConfigError("JWT_EXPIRES_IN_DAYS must be positive".into()));
        }

        let bcrypt_cost = parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError("BCRYPT_COST must be between 4 and 31".into()));
        }

        Ok(Self {
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            server_port: parse_or(&lookup, "SERVER_PORT", 8080)?,
            storage,
            jwt_secret,
            jwt_expires_in_days,
            bcrypt_cost,
            cors_origin: lookup("CORS_ORIGIN").filter(|s| !s.is_empty()),
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError(format!("{} must be a number, got `{}`", key, raw))),
        None => Ok(default),
    }
}
