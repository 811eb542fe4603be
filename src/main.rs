use clap::Parser;
use coffeenotes::cli::{
    Args, build_auth_config, build_config, handle_grant_admin, init_logging, load_token_issuer,
    open_database,
};
use coffeenotes::run_server;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let auth = build_auth_config(&args);

    let Some(issuer) = load_token_issuer(
        args.jwt_private_key.as_deref(),
        args.jwt_public_key.as_deref(),
        &auth,
    ) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(email) = args.grant_admin.as_deref() {
        if !handle_grant_admin(&db, email).await {
            std::process::exit(1);
        }
    }

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap_or_else(|e| {
        error!(error = %e, "Failed to read local address");
        std::process::exit(1);
    });

    let config = build_config(db, auth, issuer);

    info!(address = %local_addr, "Listening");

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
