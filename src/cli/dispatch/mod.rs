//! Command-line argument dispatch.
//!
//! Validated matches become an [`Action`]; building the allow list happens
//! here so a bad `--allow` entry fails before anything connects.

use crate::api::handlers::auth::AllowList;
use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{self, auth};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or an allow-list entry is malformed.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(commands::ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let db_password = matches
        .get_one::<String>(commands::ARG_DB_PASSWORD)
        .map(|password| SecretString::from(password.clone()));

    let auth_opts = auth::Options::parse(matches);
    let allow_list = auth_opts
        .allow
        .iter()
        .try_fold(AllowList::default_routes(), |list, entry| {
            list.with_entry(entry)
        })
        .context("invalid --allow entry")?;

    Ok(Action::Server(Args {
        port,
        dsn,
        db_password,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        allow_list,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    const ENV_VARS: [&str; 6] = [
        "FOLIO_PORT",
        "FOLIO_DSN",
        "FOLIO_DB_PASSWORD",
        "FOLIO_SESSION_TTL_SECONDS",
        "FOLIO_ALLOW",
        "FOLIO_LOG_LEVEL",
    ];

    #[test]
    fn server_action_from_env() {
        temp_env::with_vars(
            [
                ("FOLIO_PORT", Some("9000")),
                ("FOLIO_DSN", Some("postgres://folio@localhost:5432/folio")),
                ("FOLIO_DB_PASSWORD", Some("secret")),
                ("FOLIO_SESSION_TTL_SECONDS", Some("120")),
                ("FOLIO_ALLOW", Some("/api/tags=GET")),
                ("FOLIO_LOG_LEVEL", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec!["folio"]);
                let action = handler(&matches).unwrap_or_else(|err| panic!("{err}"));
                let Action::Server(args) = action;
                assert_eq!(args.port, 9000);
                assert_eq!(args.session_ttl_seconds, 120);
                assert!(args.db_password.is_some());
                assert!(args.allow_list.is_exempt("/api/tags", &Method::GET));
                assert!(args.allow_list.is_exempt("/api/users/login", &Method::POST));
                assert!(!args.allow_list.is_exempt("/api/user", &Method::GET));
            },
        );
    }

    #[test]
    fn malformed_allow_entry_is_rejected() {
        temp_env::with_vars_unset(ENV_VARS, || {
            let matches = commands::new().get_matches_from(vec![
                "folio",
                "--dsn",
                "postgres://folio@localhost:5432/folio",
                "--allow",
                "no-equals-sign",
            ]);
            let result = handler(&matches);
            assert!(result.is_err());
            if let Err(err) = result {
                assert!(err.to_string().contains("invalid --allow entry"));
            }
        });
    }
}
