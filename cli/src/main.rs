#![allow(clippy::print_stdout, clippy::print_stderr)]
use crate::cli::{
    Args, Command, DatabaseCommand, ProcedureCommand, RuleCommand, ServerCommand, UserCommand,
};
use anyhow::{bail, Context};
use clap::Parser;
use graphdesk_client::{
    ApiClient, MessageKind, OperationTracker, Outcome, Privilege, SessionStore, StatusSink,
    StoredProcedure,
};
use graphdesk_model::{QueryOutcome, ResultDecoder, ResultTable};
use prettytable::{Cell, Row, Table};
use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let store = FileStore::open(args.session);
    let mut client = ApiClient::new(args.endpoint)?.with_store(Box::new(store));
    let mut tracker = OperationTracker::new(Console, "graphdesk login", "console");

    match args.command {
        Command::Login { login, password } => {
            if !tracker.begin("Logging in ...", 1) {
                bail!("another operation is already running");
            }
            let outcome = client.login(&login, &password).await;
            if tracker.complete(
                outcome.status,
                &outcome.body,
                Some("Login failed: check the login and the password."),
            ) {
                tracker
                    .sink_mut()
                    .display(MessageKind::Success, &format!("Logged in as {login}."));
                Ok(())
            } else {
                bail!("login failed")
            }
        }
        Command::Logout => {
            client.logout();
            println!("Logged out.");
            Ok(())
        }
        Command::Whoami => {
            match client.session().principal() {
                Some(principal) => println!("{principal}"),
                None => println!("not logged in"),
            }
            Ok(())
        }
        Command::Server { command } => match command {
            ServerCommand::Product => {
                let outcome =
                    run(&mut tracker, "Fetching product ...", client.server_product()).await?;
                print_body(&outcome);
                Ok(())
            }
            ServerCommand::Shutdown => {
                confirm(
                    &mut tracker,
                    "Shutting down ...",
                    "Shutdown requested.",
                    client.server_shutdown(),
                )
                .await
            }
            ServerCommand::Restart => {
                confirm(
                    &mut tracker,
                    "Restarting ...",
                    "Restart requested.",
                    client.server_restart(),
                )
                .await
            }
            ServerCommand::Dependencies => {
                let outcome = run(
                    &mut tracker,
                    "Fetching dependencies ...",
                    client.server_product_dependencies(),
                )
                .await?;
                print_body(&outcome);
                Ok(())
            }
            ServerCommand::GrantAdmin { user } => {
                confirm(
                    &mut tracker,
                    "Granting ...",
                    "Privilege granted.",
                    client.grant_server_admin(&user),
                )
                .await
            }
            ServerCommand::RevokeAdmin { user } => {
                confirm(
                    &mut tracker,
                    "Revoking ...",
                    "Privilege revoked.",
                    client.revoke_server_admin(&user),
                )
                .await
            }
        },
        Command::User { command } => match command {
            UserCommand::List => {
                let outcome = run(&mut tracker, "Loading users ...", client.users()).await?;
                print_body(&outcome);
                Ok(())
            }
            UserCommand::Create { login, password } => {
                confirm(
                    &mut tracker,
                    "Creating user ...",
                    "User created.",
                    client.create_user(&login, &password),
                )
                .await
            }
            UserCommand::Delete { login } => {
                confirm(
                    &mut tracker,
                    "Deleting user ...",
                    "User deleted.",
                    client.delete_user(&login),
                )
                .await
            }
            UserCommand::Password { login, password } => {
                confirm(
                    &mut tracker,
                    "Updating password ...",
                    "Password updated.",
                    client.update_password(&login, &password),
                )
                .await
            }
            UserCommand::Privileges { login } => {
                let outcome = run(
                    &mut tracker,
                    "Loading privileges ...",
                    client.user_privileges(&login),
                )
                .await?;
                print_privileges(&outcome, "database")
            }
        },
        Command::Database { command } => match command {
            DatabaseCommand::List => {
                let outcome = run(&mut tracker, "Loading databases ...", client.databases()).await?;
                print_body(&outcome);
                Ok(())
            }
            DatabaseCommand::Create { name } => {
                confirm(
                    &mut tracker,
                    "Creating database ...",
                    "Database created.",
                    client.create_database(&name),
                )
                .await
            }
            DatabaseCommand::Drop { name } => {
                confirm(
                    &mut tracker,
                    "Dropping database ...",
                    "Database dropped.",
                    client.drop_database(&name),
                )
                .await
            }
            DatabaseCommand::Metric { database } => {
                let outcome = run(
                    &mut tracker,
                    "Loading metric ...",
                    client.database_metric(&database),
                )
                .await?;
                print_body(&outcome);
                Ok(())
            }
            DatabaseCommand::Statistics { database } => {
                let outcome = run(
                    &mut tracker,
                    "Loading statistics ...",
                    client.database_statistics(&database),
                )
                .await?;
                print_body(&outcome);
                Ok(())
            }
            DatabaseCommand::Entailment { database } => {
                let outcome = run(
                    &mut tracker,
                    "Loading entailment ...",
                    client.entailment(&database),
                )
                .await?;
                println!("{}", outcome.body);
                Ok(())
            }
            DatabaseCommand::SetEntailment { database, regime } => {
                confirm(
                    &mut tracker,
                    "Setting entailment ...",
                    "Entailment regime updated.",
                    client.set_entailment(&database, &regime),
                )
                .await
            }
            DatabaseCommand::Privileges { database } => {
                let outcome = run(
                    &mut tracker,
                    "Loading privileges ...",
                    client.database_privileges(&database),
                )
                .await?;
                print_privileges(&outcome, "user")
            }
            DatabaseCommand::Grant {
                database,
                access,
                user,
            } => {
                confirm(
                    &mut tracker,
                    "Granting ...",
                    "Privilege granted.",
                    client.grant(&database, &access, &user),
                )
                .await
            }
            DatabaseCommand::Revoke {
                database,
                access,
                user,
            } => {
                confirm(
                    &mut tracker,
                    "Revoking ...",
                    "Privilege revoked.",
                    client.revoke(&database, &access, &user),
                )
                .await
            }
        },
        Command::Rule { command } => match command {
            RuleCommand::List { database } => {
                let outcome = run(&mut tracker, "Loading rules ...", client.rules(&database)).await?;
                print_body(&outcome);
                Ok(())
            }
            RuleCommand::Show { database, rule } => {
                let outcome = run(&mut tracker, "Loading rule ...", client.rule(&database, &rule))
                    .await?;
                print_body(&outcome);
                Ok(())
            }
            RuleCommand::Add { database, file } => {
                let definition = fs::read_to_string(&file)
                    .with_context(|| format!("could not read {}", file.display()))?;
                confirm(
                    &mut tracker,
                    "Adding rule ...",
                    "Rule added.",
                    client.add_rule(&database, &definition),
                )
                .await
            }
            RuleCommand::Remove { database, rule } => {
                confirm(
                    &mut tracker,
                    "Removing rule ...",
                    "Rule removed.",
                    client.remove_rule(&database, &rule),
                )
                .await
            }
            RuleCommand::Activate { database, rule } => {
                confirm(
                    &mut tracker,
                    "Activating rule ...",
                    "Rule activated.",
                    client.activate_rule(&database, &rule),
                )
                .await
            }
            RuleCommand::Deactivate { database, rule } => {
                confirm(
                    &mut tracker,
                    "Deactivating rule ...",
                    "Rule deactivated.",
                    client.deactivate_rule(&database, &rule),
                )
                .await
            }
            RuleCommand::Status { database, rule } => {
                let outcome = run(
                    &mut tracker,
                    "Loading rule status ...",
                    client.rule_status(&database, &rule),
                )
                .await?;
                print_body(&outcome);
                Ok(())
            }
        },
        Command::Procedure { command } => match command {
            ProcedureCommand::List { database } => {
                let outcome = run(
                    &mut tracker,
                    "Loading procedures ...",
                    client.procedures(&database),
                )
                .await?;
                print_body(&outcome);
                Ok(())
            }
            ProcedureCommand::Show { database, name } => {
                let outcome = run(
                    &mut tracker,
                    "Loading procedure ...",
                    client.procedure(&database, &name),
                )
                .await?;
                print_body(&outcome);
                Ok(())
            }
            ProcedureCommand::Add {
                database,
                name,
                file,
                parameter,
            } => {
                let definition = fs::read_to_string(&file)
                    .with_context(|| format!("could not read {}", file.display()))?;
                let procedure = StoredProcedure {
                    name,
                    definition,
                    parameters: parameter,
                };
                confirm(
                    &mut tracker,
                    "Adding procedure ...",
                    "Procedure added.",
                    client.add_procedure(&database, &procedure),
                )
                .await
            }
            ProcedureCommand::Remove { database, name } => {
                confirm(
                    &mut tracker,
                    "Removing procedure ...",
                    "Procedure removed.",
                    client.remove_procedure(&database, &name),
                )
                .await
            }
            ProcedureCommand::Execute {
                database,
                name,
                context,
            } => {
                let context = serde_json::from_str(&context)
                    .context("the execution context must be a JSON object")?;
                let outcome = run(
                    &mut tracker,
                    "Executing procedure ...",
                    client.execute_procedure(&database, &name, context),
                )
                .await?;
                print_body(&outcome);
                Ok(())
            }
        },
        Command::Query { database, sparql } => {
            let sparql = match sparql {
                Some(text) => text,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buffer)
                        .context("could not read the query from stdin")?;
                    buffer
                }
            };
            if !tracker.begin("Executing query ...", 1) {
                bail!("another operation is already running");
            }
            if sparql.trim().is_empty() {
                tracker.abort("The query is empty.");
                bail!("empty query");
            }
            let outcome = client.query(&database, &sparql).await;
            if !tracker.complete(outcome.status, &outcome.body, None) {
                bail!("the query did not complete successfully");
            }
            let content_type = outcome
                .content_type
                .as_deref()
                .context("the response carries no content type")?;
            let mut decoder = ResultDecoder::new();
            match decoder.decode(content_type, &outcome.body)? {
                QueryOutcome::Boolean { value, error } => {
                    let verdict = if value { "OK" } else { "FAILED" };
                    match error {
                        Some(error) => println!("{verdict}: {error}"),
                        None => println!("{verdict}"),
                    }
                }
                QueryOutcome::Table(table) => print_table(&table),
            }
            Ok(())
        }
        Command::Upload {
            database,
            file,
            content_type,
        } => {
            let content = fs::read_to_string(&file)
                .with_context(|| format!("could not read {}", file.display()))?;
            confirm(
                &mut tracker,
                "Uploading ...",
                "Document uploaded.",
                client.upload(&database, &content_type, content),
            )
            .await
        }
        Command::Exec { command } => {
            let outcome = run(&mut tracker, "Executing ...", client.command(&command)).await?;
            print_body(&outcome);
            Ok(())
        }
    }
}

/// Runs one single-exchange operation under the tracker.
async fn run<S: StatusSink>(
    tracker: &mut OperationTracker<S>,
    message: &str,
    exchange: impl Future<Output = Outcome>,
) -> anyhow::Result<Outcome> {
    if !tracker.begin(message, 1) {
        bail!("another operation is already running");
    }
    let outcome = exchange.await;
    if tracker.complete(outcome.status, &outcome.body, None) {
        Ok(outcome)
    } else {
        bail!("the operation did not complete successfully")
    }
}

/// Runs a mutating operation and reports its happy path to the user.
async fn confirm<S: StatusSink>(
    tracker: &mut OperationTracker<S>,
    message: &str,
    done: &str,
    exchange: impl Future<Output = Outcome>,
) -> anyhow::Result<()> {
    run(tracker, message, exchange).await?;
    tracker.sink_mut().display(MessageKind::Success, done);
    Ok(())
}

fn print_body(outcome: &Outcome) {
    match outcome.json::<serde_json::Value>() {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => println!("{text}"),
            Err(_) => println!("{}", outcome.body),
        },
        Err(_) => println!("{}", outcome.body),
    }
}

fn print_privileges(outcome: &Outcome, subject_column: &str) -> anyhow::Result<()> {
    let value: serde_json::Value = outcome
        .json()
        .context("could not parse the privilege listing")?;
    // Listings are wrapped in an 'accesses' object in some server versions.
    let list = value.get("accesses").cloned().unwrap_or(value);
    let privileges: Vec<Privilege> =
        serde_json::from_value(list).context("could not parse the privilege listing")?;

    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new(subject_column),
        Cell::new("admin"),
        Cell::new("write"),
        Cell::new("read"),
    ]));
    for privilege in privileges {
        let subject = privilege
            .user
            .or(privilege.database)
            .unwrap_or_default();
        table.add_row(Row::new(vec![
            Cell::new(&subject),
            Cell::new(mark(privilege.is_admin)),
            Cell::new(mark(privilege.can_write)),
            Cell::new(mark(privilege.can_read)),
        ]));
    }
    table.printstd();
    Ok(())
}

fn print_table(result: &ResultTable) {
    let mut table = Table::new();
    table.add_row(Row::new(
        result.columns.iter().map(|column| Cell::new(column)).collect(),
    ));
    for row in &result.rows {
        table.add_row(Row::new(
            row.iter()
                .map(|cell| {
                    let text = cell
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default();
                    Cell::new(&text)
                })
                .collect(),
        ));
    }
    table.printstd();
}

fn mark(granted: bool) -> &'static str {
    if granted {
        "x"
    } else {
        ""
    }
}

/// A [StatusSink] for the terminal.
///
/// A terminal has no page to navigate, so session expiry prints a login hint
/// instead of scheduling a redirect.
struct Console;

impl StatusSink for Console {
    fn show_busy(&mut self, message: &str) {
        eprintln!("{message}");
    }

    fn clear_busy(&mut self) {}

    fn display(&mut self, kind: MessageKind, message: &str) {
        let prefix = match kind {
            MessageKind::Success => "ok",
            MessageKind::Error => "error",
        };
        eprintln!("[{prefix}] {message}");
    }

    fn schedule_redirect(&mut self, _target: &str, _delay: Duration) {
        eprintln!("The session is no longer valid; run `graphdesk login` and try again.");
    }
}

/// A [SessionStore] backed by a JSON file next to the user.
struct FileStore {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl FileStore {
    fn open(path: PathBuf) -> Self {
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        FileStore { path, entries }
    }

    fn flush(&self) {
        match serde_json::to_string_pretty(&self.entries) {
            Ok(text) => {
                if let Err(error) = fs::write(&self.path, text) {
                    eprintln!("warning: could not write the session file: {error}");
                }
            }
            Err(error) => eprintln!("warning: could not encode the session file: {error}"),
        }
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_owned(), value.to_owned());
        self.flush();
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.flush();
    }
}
