//! Command-line driver for the HyperJots note store.
//!
//! # Responsibility
//! - Run one note store operation per invocation against a local SQLite
//!   ledger file, on behalf of `--identity` or, when that flag is absent,
//!   the identity read from `HYPERJOTS_IDENTITY`.
//! - Print results as JSON on stdout and failures on stderr.

use clap::{Parser, Subcommand};
use hyperjots_core::db::open_db;
use hyperjots_core::{
    core_version, default_log_level, init_logging, EnvIdentity, IdentityResolver, Ledger,
    NoteId, NoteStore, NoteStoreError, SqliteLedger, StaticIdentity,
};
use log::error;
use serde_json::{json, Value};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "hyperjots", version, about = "Owner-scoped notes on a key-value ledger")]
struct Cli {
    /// SQLite ledger file.
    #[arg(long, env = "HYPERJOTS_DB", default_value = "hyperjots.db")]
    db: PathBuf,

    /// Caller identity the operation runs as [default: $HYPERJOTS_IDENTITY].
    #[arg(long)]
    identity: Option<String>,

    /// Log level (trace|debug|info|warn|error).
    #[arg(long)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off when unset.
    #[arg(long, env = "HYPERJOTS_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the core version.
    Version,
    #[command(flatten)]
    Note(NoteCommand),
}

/// Operations that run against the ledger on behalf of a caller.
#[derive(Debug, Subcommand)]
enum NoteCommand {
    /// Create a note owned by the caller.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        content: String,
    },
    /// Read one of the caller's notes.
    Read { id: NoteId },
    /// Replace title and content of one of the caller's notes.
    Update {
        id: NoteId,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        content: String,
    },
    /// Delete one of the caller's notes.
    Delete { id: NoteId },
    /// List every note owned by the caller.
    List,
    /// Show the id of the most recently allocated note.
    Counter,
    /// Reset the note counter to 0.
    ResetCounter,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_ref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("error[logging]: {err}");
            return ExitCode::FAILURE;
        }
    }

    match run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let code = err
                .downcast_ref::<NoteStoreError>()
                .map_or("internal", NoteStoreError::code);
            error!("event=cli_command module=cli status=error error_code={code}");
            eprintln!("error[{code}]: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Value, Box<dyn Error>> {
    let op = match cli.command {
        Command::Version => return Ok(json!({ "version": core_version() })),
        Command::Note(op) => op,
    };

    let conn = open_db(&cli.db)?;
    let ledger = SqliteLedger::try_new(&conn)?;
    match cli.identity {
        Some(identity) => execute(NoteStore::new(ledger, StaticIdentity::new(identity)), op),
        None => execute(NoteStore::new(ledger, EnvIdentity::default()), op),
    }
}

fn execute<L: Ledger, I: IdentityResolver>(
    store: NoteStore<L, I>,
    op: NoteCommand,
) -> Result<Value, Box<dyn Error>> {
    let output = match op {
        NoteCommand::Create { title, content } => {
            json!({ "id": store.create_note(title, content)? })
        }
        NoteCommand::Read { id } => serde_json::to_value(store.read_note(id)?)?,
        NoteCommand::Update { id, title, content } => {
            store.update_note(id, title, content)?;
            json!({ "id": id, "updated": true })
        }
        NoteCommand::Delete { id } => {
            store.delete_note(id)?;
            json!({ "id": id, "deleted": true })
        }
        NoteCommand::List => serde_json::to_value(store.get_all_notes()?)?,
        NoteCommand::Counter => json!({ "counter": store.get_note_counter()? }),
        NoteCommand::ResetCounter => {
            store.reset_note_counter()?;
            json!({ "counter": 0 })
        }
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::{execute, Cli, Command, NoteCommand};
    use hyperjots_core::{MemoryLedger, NoteStore, NoteStoreError, StaticIdentity};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_update_with_flags() {
        let cli = Cli::try_parse_from([
            "hyperjots",
            "--db",
            "/tmp/notes.db",
            "--identity",
            "alice",
            "update",
            "7",
            "--title",
            "Todo",
            "--content",
            "done",
        ])
        .unwrap();
        assert_eq!(cli.identity.as_deref(), Some("alice"));
        match cli.command {
            Command::Note(NoteCommand::Update { id, title, content }) => {
                assert_eq!(id, 7);
                assert_eq!(title, "Todo");
                assert_eq!(content, "done");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_non_numeric_note_id() {
        assert!(Cli::try_parse_from(["hyperjots", "read", "abc"]).is_err());
    }

    #[test]
    fn identity_flag_is_not_read_from_environment_by_clap() {
        let cli = Cli::try_parse_from(["hyperjots", "list"]).unwrap();
        assert!(cli.identity.is_none());
        assert!(matches!(cli.command, Command::Note(NoteCommand::List)));
    }

    #[test]
    fn version_parses_without_note_command() {
        let cli = Cli::try_parse_from(["hyperjots", "version"]).unwrap();
        assert!(matches!(cli.command, Command::Version));
    }

    #[test]
    fn execute_runs_note_commands_against_any_ledger() {
        let ledger = MemoryLedger::new();
        let create = NoteCommand::Create {
            title: "Groceries".into(),
            content: "milk".into(),
        };
        let created = execute(NoteStore::new(&ledger, StaticIdentity::new("alice")), create)
            .unwrap();
        assert_eq!(created["id"], 1);

        let listed = execute(
            NoteStore::new(&ledger, StaticIdentity::new("alice")),
            NoteCommand::List,
        )
        .unwrap();
        assert_eq!(listed[0]["title"], "Groceries");

        let err = execute(
            NoteStore::new(&ledger, StaticIdentity::new("bob")),
            NoteCommand::Read { id: 1 },
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<NoteStoreError>(),
            Some(NoteStoreError::AccessDenied(1))
        ));
    }
}
