/*
 * Responsibility
 * - 環境変数や設定の読み込み (JWT_SECRET, AUTH_TRUSTED_ISSUERS など)
 * - 設定値のバリデーション (不正なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Development fallback for `JWT_SECRET`. Running production with this value
/// is an operational risk; `from_env` logs a warning when that happens.
const DEV_JWT_SECRET: &str = "test";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    /// Shared HS256 secret used to verify internally issued tokens.
    /// Read once at startup and handed to the Authenticator; never consulted
    /// again at request time.
    pub jwt_secret: String,

    /// Issuers whose *unverified* tokens the fallback tier may accept.
    /// Empty means any decodable token is accepted (historical behavior).
    pub trusted_issuers: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                if app_env.is_production() {
                    tracing::warn!(
                        "JWT_SECRET is not set; falling back to the development default"
                    );
                }
                DEV_JWT_SECRET.to_string()
            }
        };

        let trusted_issuers = std::env::var("AUTH_TRUSTED_ISSUERS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        Ok(Self {
            addr,
            app_env,
            jwt_secret,
            trusted_issuers,
        })
    }
}
