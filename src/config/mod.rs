use serde::Deserialize;
use std::env;

// Top-level configuration container.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub payment: PaymentConfig,
    pub bookings: BookingConfig,
    pub notifications: NotificationConfig,
}

// Application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
}

// Database settings
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Identity provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

// Payment provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    pub gateway_url: String,
    pub secret_key: String,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Ordered: verification tries each in turn, so a new secret can be
    /// prepended while the old one still validates in-flight deliveries.
    pub webhook_secrets: Vec<String>,
    pub signature_tolerance_secs: i64,
}

// Seat hold settings
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    pub hold_minutes: i64,
    pub sweep_interval_secs: u64,
}

// Downstream confirmation settings
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    pub confirmation_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "boxoffice=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            },
            payment: PaymentConfig {
                gateway_url: env::var("PAYMENT_GATEWAY_URL")
                    .unwrap_or_else(|_| "https://pay.example.com".to_string()),
                secret_key: env::var("PAYMENT_SECRET_KEY")
                    .expect("PAYMENT_SECRET_KEY must be set"),
                currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "usd".to_string()),
                success_url: env::var("PAYMENT_SUCCESS_URL")
                    .unwrap_or_else(|_| "https://your-domain.com/loading/my-bookings".to_string()),
                cancel_url: env::var("PAYMENT_CANCEL_URL")
                    .unwrap_or_else(|_| "https://your-domain.com/my-bookings".to_string()),
                webhook_secrets: env::var("PAYMENT_WEBHOOK_SECRETS")
                    .expect("PAYMENT_WEBHOOK_SECRETS must be set")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                signature_tolerance_secs: env::var("PAYMENT_SIGNATURE_TOLERANCE_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .expect("PAYMENT_SIGNATURE_TOLERANCE_SECS must be a valid number"),
            },
            bookings: BookingConfig {
                hold_minutes: env::var("BOOKING_HOLD_MINUTES")
                    .unwrap_or_else(|_| "15".to_string())
                    .parse()
                    .expect("BOOKING_HOLD_MINUTES must be a valid number"),
                sweep_interval_secs: env::var("EXPIRY_SWEEP_SECONDS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .expect("EXPIRY_SWEEP_SECONDS must be a valid number"),
            },
            notifications: NotificationConfig {
                confirmation_url: env::var("CONFIRMATION_URL").ok(),
            },
        }
    }
}
