use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::api::handlers::auth::DEFAULT_SESSION_TTL_SECONDS;

pub const ARG_SESSION_TTL: &str = "session-ttl";
pub const ARG_ALLOW: &str = "allow";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TTL)
                .long(ARG_SESSION_TTL)
                .help("Session lifetime in seconds, 0 keeps sessions until logout [default: 30 days]")
                .env("FOLIO_SESSION_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_ALLOW)
                .long(ARG_ALLOW)
                .help("Extra public route, ROUTE=METHOD[,METHOD...]")
                .long_help(
                    "Extra route that skips authentication, in ROUTE=METHOD[,METHOD...] form. \
                     Repeat the flag for more routes; in the environment separate entries with ';'.",
                )
                .env("FOLIO_ALLOW")
                .value_delimiter(';')
                .action(ArgAction::Append),
        )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub session_ttl_seconds: i64,
    pub allow: Vec<String>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let session_ttl_seconds = matches
            .get_one::<i64>(ARG_SESSION_TTL)
            .copied()
            .unwrap_or(DEFAULT_SESSION_TTL_SECONDS);
        let allow = matches
            .get_many::<String>(ARG_ALLOW)
            .map(|entries| {
                entries
                    .map(|entry| entry.trim().to_string())
                    .filter(|entry| !entry.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            session_ttl_seconds,
            allow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> Command {
        with_args(Command::new("folio"))
    }

    #[test]
    fn defaults() {
        temp_env::with_vars_unset(["FOLIO_SESSION_TTL_SECONDS", "FOLIO_ALLOW"], || {
            let matches = command().get_matches_from(vec!["folio"]);
            let options = Options::parse(&matches);
            assert_eq!(options.session_ttl_seconds, 30 * 24 * 60 * 60);
            assert_eq!(options.session_ttl_seconds, DEFAULT_SESSION_TTL_SECONDS);
            assert!(options.allow.is_empty());
        });
    }

    #[test]
    fn allow_flag_repeats() {
        temp_env::with_vars_unset(["FOLIO_SESSION_TTL_SECONDS", "FOLIO_ALLOW"], || {
            let matches = command().get_matches_from(vec![
                "folio",
                "--allow",
                "/api/tags=GET",
                "--allow",
                "/api/profiles=GET,POST",
                "--session-ttl",
                "60",
            ]);
            let options = Options::parse(&matches);
            assert_eq!(options.session_ttl_seconds, 60);
            assert_eq!(
                options.allow,
                vec!["/api/tags=GET".to_string(), "/api/profiles=GET,POST".to_string()]
            );
        });
    }

    #[test]
    fn env_entries_split_on_semicolon() {
        temp_env::with_vars(
            [
                ("FOLIO_ALLOW", Some("/api/tags=GET;/api/profiles=GET,POST")),
                ("FOLIO_SESSION_TTL_SECONDS", Some("0")),
            ],
            || {
                let matches = command().get_matches_from(vec!["folio"]);
                let options = Options::parse(&matches);
                assert_eq!(options.session_ttl_seconds, 0);
                assert_eq!(options.allow.len(), 2);
                assert_eq!(options.allow[1], "/api/profiles=GET,POST");
            },
        );
    }
}
