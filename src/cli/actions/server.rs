use crate::{
    api::{self, handlers::auth::AllowList, handlers::auth::AuthConfig},
    cli::telemetry,
};
use anyhow::{anyhow, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub db_password: Option<SecretString>,
    pub session_ttl_seconds: i64,
    pub allow_list: AllowList,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the DSN is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let dsn = build_dsn(&args.dsn, args.db_password.as_ref())?;

    let auth_config = AuthConfig::new()
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_allow_list(args.allow_list);

    let result = api::new(args.port, dsn, auth_config).await;

    telemetry::shutdown_tracer();

    result
}

/// Inject the password into the DSN, keeping any user already present.
fn build_dsn(dsn: &str, password: Option<&SecretString>) -> Result<String> {
    let mut dsn = Url::parse(dsn)?;

    if let Some(password) = password {
        dsn.set_password(Some(password.expose_secret()))
            .map_err(|()| anyhow!("Error setting password"))?;
    }

    Ok(dsn.to_string())
}

fn log_startup_args(args: &Args) {
    info!(
        "Starting folio on port {} (session TTL {}s)",
        args.port, args.session_ttl_seconds
    );
    debug!(
        "DSN host: {}, password from flag: {}, public routes: {}",
        Url::parse(&args.dsn)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string()),
        args.db_password.is_some(),
        args.allow_list.len()
    );
}
