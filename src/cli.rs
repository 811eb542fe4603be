//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::config::AuthConfig;
use crate::db::{Database, UserRole};
use crate::jwt::AccessTokenIssuer;
use crate::rate_limit::RateLimitConfig;
use crate::validation::normalize_email;
use clap::Parser;
use tracing::{error, info, warn};

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "coffeenotes",
    about = "Coffee notes backend: accounts, sessions and token authentication"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "coffeenotes.db")]
    pub database: String,

    /// PEM file with the RSA private key used to sign access tokens
    #[arg(long, env = "JWT_PRIVATE_KEY_FILE")]
    pub jwt_private_key: Option<String>,

    /// PEM file with the RSA public key used to verify access tokens
    #[arg(long, env = "JWT_PUBLIC_KEY_FILE")]
    pub jwt_public_key: Option<String>,

    /// `iss` claim of issued access tokens
    #[arg(long, default_value = "coffeenotes")]
    pub jwt_issuer: String,

    /// `aud` claim of issued access tokens
    #[arg(long, default_value = "coffeenotes-api")]
    pub jwt_audience: String,

    /// Omit the Secure flag on the refresh cookie (local HTTP development only)
    #[arg(long)]
    pub insecure_cookies: bool,

    /// Read the client IP from this header (e.g. x-forwarded-for) when behind a proxy
    #[arg(long, value_parser = validate_ip_header)]
    pub ip_header: Option<String>,

    /// Grant the admin role to the account with this email on startup
    #[arg(long)]
    pub grant_admin: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn validate_ip_header(s: &str) -> Result<String, String> {
    axum::http::HeaderName::from_bytes(s.as_bytes())
        .map(|name| name.as_str().to_string())
        .map_err(|_| format!("Invalid header name: {}", s))
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

fn read_pem(path: Option<&str>, what: &str, flag: &str, env: &str) -> Option<Vec<u8>> {
    let Some(path) = path else {
        error!("{} is required. Use {} or set {}", what, flag, env);
        return None;
    };

    match std::fs::read(path) {
        Ok(content) => Some(content),
        Err(e) => {
            error!(path = %path, error = %e, "Failed to read {}", what);
            None
        }
    }
}

/// Load the RSA key pair and build the access token issuer.
/// Returns None and logs an error if the keys cannot be loaded.
pub fn load_token_issuer(
    private_key_path: Option<&str>,
    public_key_path: Option<&str>,
    auth: &AuthConfig,
) -> Option<AccessTokenIssuer> {
    let private_pem = read_pem(
        private_key_path,
        "JWT private key",
        "--jwt-private-key",
        "JWT_PRIVATE_KEY_FILE",
    )?;
    let public_pem = read_pem(
        public_key_path,
        "JWT public key",
        "--jwt-public-key",
        "JWT_PUBLIC_KEY_FILE",
    )?;

    match AccessTokenIssuer::from_rsa_pem(&private_pem, &public_pem, auth) {
        Ok(issuer) => Some(issuer),
        Err(e) => {
            error!(error = %e, "Invalid JWT key material");
            None
        }
    }
}

/// Build the auth settings from arguments.
pub fn build_auth_config(args: &Args) -> AuthConfig {
    if args.insecure_cookies {
        warn!("Secure flag disabled on refresh cookies");
    }

    AuthConfig::new(&args.jwt_issuer, &args.jwt_audience)
        .with_secure_cookies(!args.insecure_cookies)
        .with_ip_header(args.ip_header.clone())
}

/// Handle the --grant-admin flag. Returns false if the grant failed.
pub async fn handle_grant_admin(db: &Database, email: &str) -> bool {
    let email = normalize_email(email);

    let user = match db.users().get_by_email(&email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            error!(email = %email, "No account with this email");
            return false;
        }
        Err(e) => {
            error!(error = %e, "Failed to look up account");
            return false;
        }
    };

    if user.role == UserRole::Admin {
        info!(user_id = %user.uuid, "Account is already an admin");
        return true;
    }

    match db.users().set_role(user.id, UserRole::Admin).await {
        Ok(_) => {
            info!(user_id = %user.uuid, "Admin role granted");
            true
        }
        Err(e) => {
            error!(error = %e, "Failed to grant admin role");
            false
        }
    }
}

/// Build ServerConfig from validated parts.
pub fn build_config(db: Database, auth: AuthConfig, issuer: AccessTokenIssuer) -> ServerConfig {
    let rate_limits = RateLimitConfig::new();

    ServerConfig {
        db,
        auth,
        issuer,
        rate_limits,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
