use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, version, name = "graphdesk")]
/// GraphDesk administration console for remote RDF triple stores
pub struct Args {
    /// Base URL of the server API
    #[arg(
        short,
        long,
        default_value = "http://localhost:3443/api/v1",
        value_hint = ValueHint::Url
    )]
    pub endpoint: String,
    /// File the session is cached in between invocations
    #[arg(long, default_value = "graphdesk-session.json", value_hint = ValueHint::FilePath)]
    pub session: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Log in to the server
    Login {
        /// Login of the user
        login: String,
        /// Password of the user
        password: String,
    },
    /// Forget the cached session
    Logout,
    /// Show who is currently logged in
    Whoami,
    /// Manage the server process
    Server {
        #[command(subcommand)]
        command: ServerCommand,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
    /// Manage databases
    Database {
        #[command(subcommand)]
        command: DatabaseCommand,
    },
    /// Manage inference rules
    Rule {
        #[command(subcommand)]
        command: RuleCommand,
    },
    /// Manage stored procedures
    Procedure {
        #[command(subcommand)]
        command: ProcedureCommand,
    },
    /// Send one line of the text command language to the command channel
    Exec {
        /// The command line, e.g. "ADMIN LIST USERS"
        command: String,
    },
    /// Run a SPARQL query against a database
    Query {
        /// Name of the database to query
        database: String,
        /// The query text
        ///
        /// If no query is given, stdin is read.
        sparql: Option<String>,
    },
    /// Upload an RDF document into a database
    Upload {
        /// Name of the target database
        database: String,
        /// File to upload
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Content type of the document, e.g. "text/turtle"
        #[arg(long)]
        content_type: String,
    },
}

#[derive(Subcommand)]
pub enum ServerCommand {
    /// Show the server product information
    Product,
    /// Request a server shutdown
    Shutdown,
    /// Request a server restart
    Restart,
    /// List the components the server is built from
    Dependencies,
    /// Grant server administration privileges to a user
    GrantAdmin {
        /// Login of the user
        user: String,
    },
    /// Revoke server administration privileges from a user
    RevokeAdmin {
        /// Login of the user
        user: String,
    },
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// List the users on the server
    List,
    /// Create a new user
    Create {
        /// Login for the new user
        login: String,
        /// Password for the new user
        password: String,
    },
    /// Delete a user
    Delete {
        /// Login of the user to delete
        login: String,
    },
    /// Update the password of a user
    Password {
        /// Login of the user
        login: String,
        /// The new password
        password: String,
    },
    /// List the privileges of a user
    Privileges {
        /// Login of the user
        login: String,
    },
}

#[derive(Subcommand)]
pub enum DatabaseCommand {
    /// List the databases on the server
    List,
    /// Create a new database
    Create {
        /// Name of the database
        name: String,
    },
    /// Drop a database and erase its data
    Drop {
        /// Name of the database
        name: String,
    },
    /// Show the entailment regime of a database
    Entailment {
        /// Name of the database
        database: String,
    },
    /// Set the entailment regime of a database
    SetEntailment {
        /// Name of the database
        database: String,
        /// The regime, one of: none, simple, RDF, RDFS, OWL2_RDF, OWL2_DIRECT
        regime: String,
    },
    /// Show the live metric definition of a database
    Metric {
        /// Name of the database
        database: String,
    },
    /// Show a snapshot of the statistics of a database
    Statistics {
        /// Name of the database
        database: String,
    },
    /// List the privileges granted on a database
    Privileges {
        /// Name of the database
        database: String,
    },
    /// Grant a privilege on a database to a user
    Grant {
        /// Name of the database
        database: String,
        /// The privilege to grant, one of ADMIN, WRITE and READ
        access: String,
        /// Login of the user
        user: String,
    },
    /// Revoke a privilege on a database from a user
    Revoke {
        /// Name of the database
        database: String,
        /// The privilege to revoke, one of ADMIN, WRITE and READ
        access: String,
        /// Login of the user
        user: String,
    },
}

#[derive(Subcommand)]
pub enum RuleCommand {
    /// List the rules in a database
    List {
        /// Name of the database
        database: String,
    },
    /// Show the definition of a rule
    Show {
        /// Name of the database
        database: String,
        /// IRI of the rule
        rule: String,
    },
    /// Add a new (inactive) rule to a database
    Add {
        /// Name of the database
        database: String,
        /// File holding the rule definition
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
    /// Remove a rule from a database
    Remove {
        /// Name of the database
        database: String,
        /// IRI of the rule
        rule: String,
    },
    /// Activate an inactive rule
    Activate {
        /// Name of the database
        database: String,
        /// IRI of the rule
        rule: String,
    },
    /// Deactivate an active rule
    Deactivate {
        /// Name of the database
        database: String,
        /// IRI of the rule
        rule: String,
    },
    /// Show the matching status of a rule
    Status {
        /// Name of the database
        database: String,
        /// IRI of the rule
        rule: String,
    },
}

#[derive(Subcommand)]
pub enum ProcedureCommand {
    /// List the stored procedures in a database
    List {
        /// Name of the database
        database: String,
    },
    /// Show the definition of a stored procedure
    Show {
        /// Name of the database
        database: String,
        /// Name of the procedure
        name: String,
    },
    /// Add a stored procedure to a database
    Add {
        /// Name of the database
        database: String,
        /// Name of the procedure
        name: String,
        /// File holding the SPARQL definition
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Names of the procedure parameters
        #[arg(long)]
        parameter: Vec<String>,
    },
    /// Remove a stored procedure from a database
    Remove {
        /// Name of the database
        database: String,
        /// Name of the procedure
        name: String,
    },
    /// Execute a stored procedure
    Execute {
        /// Name of the database
        database: String,
        /// Name of the procedure
        name: String,
        /// Execution context as a JSON object
        #[arg(long, default_value = "{}")]
        context: String,
    },
}
