//! Command-line parsing, connection precedence and end-to-end runs
//!
//! Exports run against an in-memory executor; no database is needed.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::uninlined_format_args)]

use async_trait::async_trait;
use clap::Parser;
use pgview2csv::{CONNECTION_STRING_ENV, Cli, ConnectionSource, resolve_connection, run};
use pgview2csv_core::{
    ConnectionDescriptor, ExportError, QueryExecutor, Row, TabularResult, from_env_mapping,
};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const SENSITIVE_PASSWORD: &str = "super_secret_password_123";

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    temp_env::with_var_unset(CONNECTION_STRING_ENV, || {
        Cli::try_parse_from(std::iter::once("pgview2csv").chain(args.iter().copied()))
    })
}

/// Returns two fixed rows and remembers the descriptor it was called with.
#[derive(Default)]
struct RecordingExecutor {
    seen: Mutex<Vec<(ConnectionDescriptor, String)>>,
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    async fn fetch_all(
        &self,
        descriptor: &ConnectionDescriptor,
        sql: &str,
    ) -> pgview2csv_core::Result<TabularResult> {
        self.seen
            .lock()
            .unwrap()
            .push((descriptor.clone(), sql.to_string()));
        TabularResult::from_rows([
            Row::new().with("id", 1_i64).with("name", "a"),
            Row::new().with("id", 2_i64).with("name", "b,c"),
        ])
    }
}

mod parsing {
    use super::*;

    #[test]
    fn test_minimal_arguments_and_defaults() {
        let cli = parse(&["--file", "out.csv", "--view", "v_sales"]).unwrap();

        assert_eq!(cli.file, std::path::PathBuf::from("out.csv"));
        assert_eq!(cli.view, "v_sales");
        assert_eq!(cli.limit, 0);
        assert!(!cli.no_overwrite);
        assert_eq!(cli.application_name, "pgview2csv");
        assert_eq!(cli.connection_string, None);
        assert_eq!(cli.global.verbose, 0);
        assert!(!cli.global.quiet);
    }

    #[test]
    fn test_all_arguments() {
        let cli = parse(&[
            "-f",
            "out.csv",
            "-c",
            "Host=db;Database=app",
            "--view",
            "reports.daily",
            "--limit",
            "25",
            "--no-overwrite",
            "--application-name",
            "nightly",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.connection_string.as_deref(), Some("Host=db;Database=app"));
        assert_eq!(cli.view, "reports.daily");
        assert_eq!(cli.limit, 25);
        assert!(cli.no_overwrite);
        assert_eq!(cli.application_name, "nightly");
        assert_eq!(cli.global.verbose, 2);
    }

    #[test]
    fn test_missing_required_arguments() {
        let err = parse(&["--file", "out.csv"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let err = parse(&["--view", "v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_invalid_limit_rejected() {
        assert!(parse(&["-f", "o.csv", "--view", "v", "--limit", "-1"]).is_err());
        assert!(parse(&["-f", "o.csv", "--view", "v", "--limit", "ten"]).is_err());
    }

    #[test]
    fn test_help_and_version_are_parse_errors() {
        assert_eq!(
            parse(&["--help"]).unwrap_err().kind(),
            clap::error::ErrorKind::DisplayHelp
        );
        assert_eq!(
            parse(&["--version"]).unwrap_err().kind(),
            clap::error::ErrorKind::DisplayVersion
        );
    }

    #[test]
    fn test_connection_string_from_env() {
        let cli = temp_env::with_var(CONNECTION_STRING_ENV, Some("Host=from-env"), || {
            Cli::try_parse_from(["pgview2csv", "-f", "o.csv", "--view", "v"]).unwrap()
        });
        assert_eq!(cli.connection_string.as_deref(), Some("Host=from-env"));
    }

    #[test]
    fn test_help_does_not_show_env_connection_string() {
        let help = temp_env::with_var(
            CONNECTION_STRING_ENV,
            Some(format!("Host=h;Password={}", SENSITIVE_PASSWORD)),
            || {
                Cli::try_parse_from(["pgview2csv", "--help"])
                    .unwrap_err()
                    .to_string()
            },
        );
        assert!(!help.contains(SENSITIVE_PASSWORD));
    }
}

mod precedence {
    use super::*;

    #[test]
    fn test_env_descriptor_wins() {
        let from_env = from_env_mapping([("PGHOST", "env-host")]).unwrap();

        let (descriptor, source) =
            resolve_connection(from_env, Some("Host=cli-host;Database=app")).unwrap();

        assert_eq!(source, ConnectionSource::Environment);
        assert_eq!(descriptor.host.as_deref(), Some("env-host"));
        assert_eq!(descriptor.database, None);
    }

    #[test]
    fn test_cli_string_used_when_env_empty() {
        let (descriptor, source) = resolve_connection(
            ConnectionDescriptor::new(),
            Some("Host=cli-host;Database=app"),
        )
        .unwrap();

        assert_eq!(source, ConnectionSource::CommandLine);
        assert_eq!(descriptor.host.as_deref(), Some("cli-host"));
        assert_eq!(descriptor.database.as_deref(), Some("app"));
    }

    #[test]
    fn test_blank_env_values_do_not_count() {
        let from_env = from_env_mapping([("PGHOST", "  "), ("PGUSER", "")]).unwrap();
        let (_, source) = resolve_connection(from_env, Some("Host=cli")).unwrap();
        assert_eq!(source, ConnectionSource::CommandLine);
    }

    #[test]
    fn test_no_source_fails_fast() {
        for cli in [None, Some(""), Some("   "), Some(";;")] {
            let err = resolve_connection(ConnectionDescriptor::new(), cli).unwrap_err();
            assert!(
                matches!(err, ExportError::Configuration { .. }),
                "unexpected error for {:?}: {:?}",
                cli,
                err
            );
        }
    }

    #[test]
    fn test_invalid_cli_string_does_not_leak_password() {
        let text = format!("Host=h;Password={};garbage", SENSITIVE_PASSWORD);
        let err = resolve_connection(ConnectionDescriptor::new(), Some(text.as_str())).unwrap_err();

        assert!(matches!(err, ExportError::Configuration { .. }));
        assert!(!err.to_string().contains(SENSITIVE_PASSWORD));
    }

    #[test]
    fn test_export_request_appends_application_name() {
        let cli = parse(&["-f", "o.csv", "--view", "v", "--limit", "5", "--no-overwrite"]).unwrap();

        let plain = cli.export_request(ConnectionDescriptor::new().with_host("h"));
        assert_eq!(
            plain.connection().application_name.as_deref(),
            Some("pgview2csv")
        );
        assert_eq!(plain.row_limit(), Some(5));
        assert!(!plain.overwrite_existing());

        let named = cli.export_request(
            ConnectionDescriptor::new()
                .with_host("h")
                .set_application_name("etl"),
        );
        assert_eq!(
            named.connection().application_name.as_deref(),
            Some("etl_pgview2csv")
        );
    }
}

mod error_logging {
    use super::*;

    /// In-memory log sink for a scoped subscriber.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::ERROR)
            .finish();

        let out = tracing::subscriber::with_default(subscriber, f);
        let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        (out, text)
    }

    #[test]
    fn test_missing_connection_is_logged_as_error() {
        let (result, logs) =
            with_captured_logs(|| resolve_connection(ConnectionDescriptor::new(), None));

        assert!(matches!(result, Err(ExportError::Configuration { .. })));
        assert!(logs.contains("ERROR"), "logs: {}", logs);
        assert!(logs.contains("No connection information"), "logs: {}", logs);
    }

    #[test]
    fn test_invalid_connection_string_is_logged_without_password() {
        let text = format!("Host=h;Password={};garbage", SENSITIVE_PASSWORD);
        let (result, logs) = with_captured_logs(|| {
            resolve_connection(ConnectionDescriptor::new(), Some(text.as_str()))
        });

        assert!(matches!(result, Err(ExportError::Configuration { .. })));
        assert!(logs.contains("ERROR"), "logs: {}", logs);
        assert!(logs.contains("Invalid connection string"), "logs: {}", logs);
        assert!(!logs.contains(SENSITIVE_PASSWORD));
    }

    #[test]
    fn test_resolved_connection_logs_no_error() {
        let (result, logs) = with_captured_logs(|| {
            resolve_connection(ConnectionDescriptor::new(), Some("Host=h"))
        });

        assert!(result.is_ok());
        assert!(logs.is_empty(), "logs: {}", logs);
    }
}

mod end_to_end {
    use super::*;

    #[tokio::test]
    async fn test_run_writes_expected_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let connection = format!("Host=h;Password={}", SENSITIVE_PASSWORD);
        let cli = parse(&[
            "-f",
            path.to_str().unwrap(),
            "-c",
            connection.as_str(),
            "--view",
            "v_people",
        ])
        .unwrap();

        let executor = RecordingExecutor::default();
        let result = run(&cli, ConnectionDescriptor::new(), &executor)
            .await
            .unwrap();

        assert_eq!(result.rows_written, 2);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "\"id\",\"name\"\r\n\"1\",\"a\"\r\n\"2\",\"b,c\"\r\n"
        );

        let seen = executor.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, "SELECT * FROM v_people");
        assert_eq!(seen[0].0.host.as_deref(), Some("h"));
        assert_eq!(
            seen[0].0.application_name.as_deref(),
            Some("pgview2csv")
        );
    }

    #[tokio::test]
    async fn test_run_uses_env_descriptor_over_cli() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let cli = parse(&[
            "-f",
            path.to_str().unwrap(),
            "-c",
            "Host=cli-host",
            "--view",
            "v",
            "--limit",
            "1",
        ])
        .unwrap();

        let from_env = from_env_mapping([("PGHOST", "env-host"), ("PGPORT", "6543")]).unwrap();
        let executor = RecordingExecutor::default();
        run(&cli, from_env, &executor).await.unwrap();

        let seen = executor.seen.lock().unwrap();
        assert_eq!(seen[0].0.host.as_deref(), Some("env-host"));
        assert_eq!(seen[0].0.port, Some(6543));
        assert_eq!(seen[0].1, "SELECT * FROM v LIMIT 1");
    }

    #[tokio::test]
    async fn test_run_without_connection_fails_before_query() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let cli = parse(&["-f", path.to_str().unwrap(), "--view", "v"]).unwrap();

        let executor = RecordingExecutor::default();
        let err = run(&cli, ConnectionDescriptor::new(), &executor)
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("No connection information"));
        assert!(executor.seen.lock().unwrap().is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_run_no_overwrite_keeps_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "existing").unwrap();
        let cli = parse(&[
            "-f",
            path.to_str().unwrap(),
            "-c",
            "Host=h",
            "--view",
            "v",
            "--no-overwrite",
        ])
        .unwrap();

        let err = run(&cli, ConnectionDescriptor::new(), RecordingExecutor::default())
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("already exists"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing");
    }
}
