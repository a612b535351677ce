//! The media types spoken on the wire.

/// The custom content type of the text command channel.
pub const COMMAND: &str = "application/x-graphdesk-command";
/// The content type of SPARQL query bodies.
pub const SPARQL_QUERY: &str = "application/sparql-query";
/// The content type of inference rule definitions.
pub const RULE: &str = "application/x-graphdesk-rule";
/// Plain text bodies (passwords, entailment regimes).
pub const TEXT_PLAIN: &str = "text/plain";
/// Structured JSON bodies.
pub const JSON: &str = "application/json";

/// The accept header of regular exchanges.
pub const ACCEPT_DEFAULT: &str = "text/plain, application/json";
/// The accept header of query exchanges. The server picks one of the two encodings.
pub const ACCEPT_QUERY: &str = "application/sparql-results+json, application/json";
