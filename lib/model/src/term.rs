use crate::DecodeError;
use serde_json::Value;
use std::fmt;

/// Prefix of the blank node identifiers synthesized while rebuilding RDF lists.
///
/// Identifiers with this prefix are generated locally and must never be sent back
/// to the server.
pub const LIST_BLANK_PREFIX: &str = "list_";

/// A normalized RDF term as it appears in server responses.
///
/// The two response encodings of the server (SPARQL results and quad sets) disagree
/// on the field names they use for the same logical value. [Term::from_json] absorbs
/// both shapes so that the rest of the console only ever deals with this one model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    /// An IRI reference.
    Iri(String),
    /// A blank node, identified by its label.
    BlankNode(String),
    /// A literal with its lexical form and an optional datatype or language tag.
    ///
    /// At most one of `datatype` and `language` is present, mirroring RDF 1.1 where
    /// language-tagged strings have a fixed datatype.
    Literal {
        lexical: String,
        datatype: Option<String>,
        language: Option<String>,
    },
    /// A SPARQL variable.
    Variable(String),
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri(value.into())
    }

    pub fn blank(id: impl Into<String>) -> Self {
        Term::BlankNode(id.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Term::Variable(name.into())
    }

    /// Creates a literal without datatype or language tag.
    pub fn simple_literal(lexical: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    /// Creates a literal with the given datatype IRI.
    pub fn typed_literal(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    /// Creates a language-tagged literal.
    pub fn language_literal(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    /// Decodes a term from its JSON wire representation.
    ///
    /// The tag is read from the `type` field: `uri`/`iri` decode to [Term::Iri],
    /// `bnode`/`blank` to [Term::BlankNode] (the identifier may live in `value` or
    /// `id`), `variable` to [Term::Variable] and anything else to [Term::Literal].
    /// Literals read their lexical form from `value` or `lexical`, the datatype from
    /// `datatype` and the language tag from `lang` or `xml:lang`. A missing field,
    /// an explicit `null` and an empty string all mean "absent".
    pub fn from_json(value: &Value) -> Result<Term, DecodeError> {
        let object = value
            .as_object()
            .ok_or_else(|| DecodeError::shape(format!("expected a term object, got {value}")))?;
        let kind = object.get("type").and_then(Value::as_str).unwrap_or("literal");
        match kind {
            "uri" | "iri" => {
                let value = string_field(object, &["value"]).ok_or_else(|| {
                    DecodeError::shape("an IRI term must carry a non-empty 'value' field")
                })?;
                Ok(Term::Iri(value))
            }
            "bnode" | "blank" => {
                let id = string_field(object, &["value", "id"]).ok_or_else(|| {
                    DecodeError::shape("a blank node term must carry a 'value' or 'id' field")
                })?;
                Ok(Term::BlankNode(id))
            }
            "variable" => {
                let name = string_field(object, &["value", "name"]).ok_or_else(|| {
                    DecodeError::shape("a variable term must carry a 'value' or 'name' field")
                })?;
                Ok(Term::Variable(name))
            }
            _ => {
                let lexical = string_field(object, &["value", "lexical"]).ok_or_else(|| {
                    DecodeError::shape("a literal term must carry a 'value' or 'lexical' field")
                })?;
                let language = string_field(object, &["lang", "xml:lang"]);
                // RDF 1.1: a language-tagged string has no separate datatype.
                let datatype = if language.is_some() {
                    None
                } else {
                    string_field(object, &["datatype"])
                };
                Ok(Term::Literal {
                    lexical,
                    datatype,
                    language,
                })
            }
        }
    }
}

/// Reads the first of the given fields that holds a non-empty string.
///
/// `null` values and empty strings count as absent, the same as a missing field.
fn string_field(object: &serde_json::Map<String, Value>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| object.get(*name))
        .find_map(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        })
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(value) => write!(f, "<{value}>"),
            Term::BlankNode(id) => write!(f, "_:{id}"),
            Term::Literal {
                lexical,
                datatype,
                language,
            } => {
                write!(f, "\"{lexical}\"")?;
                if let Some(language) = language {
                    write!(f, "@{language}")?;
                } else if let Some(datatype) = datatype {
                    write!(f, "^^<{datatype}>")?;
                }
                Ok(())
            }
            Term::Variable(name) => write!(f, "?{name}"),
        }
    }
}
