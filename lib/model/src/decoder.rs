use crate::vocab::rdf;
use crate::{DecodeError, ResultRow, ResultTable, Term, LIST_BLANK_PREFIX};
use mediatype::MediaType;
use serde_json::Value;

/// The media type of SPARQL results documents.
pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";
/// The media type of quad-set documents.
pub const QUADS_JSON: &str = "application/json";

/// Name of the synthetic leading column holding 1-based row numbers.
///
/// The column exists for rendering only; its cells are plain literals.
pub const ROW_NUMBER_COLUMN: &str = "#";

/// The decoded outcome of a query exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryOutcome {
    /// An ASK-style boolean outcome, possibly carrying a server-side error string.
    Boolean { value: bool, error: Option<String> },
    /// A tabular result.
    Table(ResultTable),
}

/// Decodes the two response encodings a query can come back in.
///
/// The decoder owns the counter for locally synthesized blank nodes. One decoder
/// instance lives as long as its page so that every `list_N` identifier stays unique
/// across all the results shown on that page.
#[derive(Debug, Default)]
pub struct ResultDecoder {
    next_blank: u64,
}

impl ResultDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a response body according to its content type.
    ///
    /// `application/sparql-results+json` selects the SPARQL results decoder,
    /// `application/json` the quad-set decoder. Anything else is a decode failure,
    /// never an empty table.
    pub fn decode(&mut self, content_type: &str, body: &str) -> Result<QueryOutcome, DecodeError> {
        let media = MediaType::parse(content_type)
            .map_err(|_| DecodeError::UnsupportedContentType(content_type.to_owned()))?;
        if media.ty.as_str() != "application" {
            return Err(DecodeError::UnsupportedContentType(content_type.to_owned()));
        }
        match (media.subty.as_str(), media.suffix.map(|suffix| suffix.as_str())) {
            ("sparql-results", Some("json")) => decode_solutions(body),
            ("json", None) => Ok(QueryOutcome::Table(self.decode_quads(body)?)),
            _ => Err(DecodeError::UnsupportedContentType(content_type.to_owned())),
        }
    }

    /// Decodes a quad-set document: a sequence of per-graph objects, each holding
    /// entities with their properties and values.
    fn decode_quads(&mut self, body: &str) -> Result<ResultTable, DecodeError> {
        let document: Value = serde_json::from_str(body)?;
        let graphs = document
            .as_array()
            .ok_or_else(|| DecodeError::shape("a quad result must be an array of graph objects"))?;
        let mut table = ResultTable::quads();
        for graph in graphs {
            let graph = graph
                .as_object()
                .ok_or_else(|| DecodeError::shape("each graph entry must be an object"))?;
            let graph_term = Term::from_json(
                graph
                    .get("graph")
                    .ok_or_else(|| DecodeError::shape("a graph entry must carry a 'graph' field"))?,
            )?;
            let entities = graph
                .get("entities")
                .and_then(Value::as_array)
                .ok_or_else(|| DecodeError::shape("a graph entry must carry an 'entities' array"))?;
            for entity in entities {
                let entity = entity
                    .as_object()
                    .ok_or_else(|| DecodeError::shape("each entity must be an object"))?;
                let subject = Term::from_json(
                    entity.get("subject").ok_or_else(|| {
                        DecodeError::shape("an entity must carry a 'subject' field")
                    })?,
                )?;
                let properties = entity
                    .get("properties")
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        DecodeError::shape("an entity must carry a 'properties' array")
                    })?;
                for property in properties {
                    let property = property
                        .as_object()
                        .ok_or_else(|| DecodeError::shape("each property must be an object"))?;
                    let predicate = Term::from_json(
                        property.get("property").ok_or_else(|| {
                            DecodeError::shape("a property must carry a 'property' field")
                        })?,
                    )?;
                    let values = property
                        .get("values")
                        .and_then(Value::as_array)
                        .ok_or_else(|| {
                            DecodeError::shape("a property must carry a 'values' array")
                        })?;
                    for value in values {
                        let object = self.decode_value(&mut table, &graph_term, value)?;
                        table.push_row(vec![
                            Some(graph_term.clone()),
                            Some(subject.clone()),
                            Some(predicate.clone()),
                            Some(object),
                        ]);
                    }
                }
            }
        }
        Ok(table)
    }

    /// Decodes a property value, which is either a single term or a nested array
    /// denoting an RDF collection.
    fn decode_value(
        &mut self,
        table: &mut ResultTable,
        graph: &Term,
        value: &Value,
    ) -> Result<Term, DecodeError> {
        if let Some(items) = value.as_array() {
            self.decode_list(table, graph, items)
        } else {
            Term::from_json(value)
        }
    }

    /// Materializes an RDF collection as a chain of fresh blank nodes.
    ///
    /// One `rdf:first` and one `rdf:rest` row is emitted per element, the chain ends
    /// in `rdf:nil`, and the returned head stands in for the collection in the row
    /// that referenced it. An empty collection is `rdf:nil` itself.
    fn decode_list(
        &mut self,
        table: &mut ResultTable,
        graph: &Term,
        items: &[Value],
    ) -> Result<Term, DecodeError> {
        if items.is_empty() {
            return Ok(Term::iri(rdf::NIL));
        }
        let head = self.fresh_blank();
        let mut current = head.clone();
        for (index, item) in items.iter().enumerate() {
            let element = self.decode_value(table, graph, item)?;
            let next = if index + 1 == items.len() {
                Term::iri(rdf::NIL)
            } else {
                self.fresh_blank()
            };
            table.push_row(vec![
                Some(graph.clone()),
                Some(current.clone()),
                Some(Term::iri(rdf::FIRST)),
                Some(element),
            ]);
            table.push_row(vec![
                Some(graph.clone()),
                Some(current),
                Some(Term::iri(rdf::REST)),
                Some(next.clone()),
            ]);
            current = next;
        }
        Ok(head)
    }

    fn fresh_blank(&mut self) -> Term {
        let term = Term::blank(format!("{LIST_BLANK_PREFIX}{}", self.next_blank));
        self.next_blank += 1;
        term
    }
}

/// Decodes a SPARQL results document.
///
/// A `boolean` field short-circuits to [QueryOutcome::Boolean]. Otherwise the
/// declared variables become the columns, prefixed with the synthetic row-number
/// column, and unbound variables yield blank cells.
fn decode_solutions(body: &str) -> Result<QueryOutcome, DecodeError> {
    let document: Value = serde_json::from_str(body)?;
    let document = document
        .as_object()
        .ok_or_else(|| DecodeError::shape("a SPARQL results document must be an object"))?;
    if let Some(value) = document.get("boolean") {
        let value = value
            .as_bool()
            .ok_or_else(|| DecodeError::shape("the 'boolean' field must hold a boolean"))?;
        let error = document
            .get("error")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);
        return Ok(QueryOutcome::Boolean { value, error });
    }
    let variables = document
        .get("head")
        .and_then(|head| head.get("vars"))
        .and_then(Value::as_array)
        .ok_or_else(|| DecodeError::shape("a SPARQL results document must carry 'head.vars'"))?
        .iter()
        .map(|name| {
            name.as_str()
                .ok_or_else(|| DecodeError::shape("variable names must be strings"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let bindings = document
        .get("results")
        .and_then(|results| results.get("bindings"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            DecodeError::shape("a SPARQL results document must carry 'results.bindings'")
        })?;

    let mut table =
        ResultTable::new(std::iter::once(ROW_NUMBER_COLUMN).chain(variables.iter().copied()));
    for (index, binding) in bindings.iter().enumerate() {
        let binding = binding
            .as_object()
            .ok_or_else(|| DecodeError::shape("each binding must be an object"))?;
        let mut row: ResultRow = Vec::with_capacity(variables.len() + 1);
        row.push(Some(Term::simple_literal((index + 1).to_string())));
        for variable in &variables {
            row.push(match binding.get(*variable) {
                Some(value) if !value.is_null() => Some(Term::from_json(value)?),
                _ => None,
            });
        }
        table.push_row(row);
    }
    Ok(QueryOutcome::Table(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SOLUTIONS: &str = r#"{
        "head": {"vars": ["x", "y"]},
        "results": {"bindings": [
            {"x": {"type": "uri", "value": "http://example.com/a"},
             "y": {"type": "literal", "value": "1"}},
            {"x": {"type": "uri", "value": "http://example.com/b"}},
            {"x": {"type": "bnode", "value": "b0"},
             "y": {"type": "literal", "value": "chat", "lang": "fr"}}
        ]}
    }"#;

    fn decoded_table(decoder: &mut ResultDecoder, content_type: &str, body: &str) -> ResultTable {
        match decoder.decode(content_type, body).unwrap() {
            QueryOutcome::Table(table) => table,
            QueryOutcome::Boolean { .. } => panic!("expected a table"),
        }
    }

    #[test]
    fn solutions_columns_and_row_numbers() {
        let mut decoder = ResultDecoder::new();
        let table = decoded_table(&mut decoder, SPARQL_RESULTS_JSON, SOLUTIONS);
        assert_eq!(table.columns, ["#", "x", "y"]);
        assert_eq!(table.len(), 3);
        for (index, row) in table.rows.iter().enumerate() {
            assert_eq!(row[0], Some(Term::simple_literal((index + 1).to_string())));
        }
    }

    #[test]
    fn solutions_unbound_variable_is_a_blank_cell() {
        let mut decoder = ResultDecoder::new();
        let table = decoded_table(&mut decoder, SPARQL_RESULTS_JSON, SOLUTIONS);
        assert_eq!(table.rows[1][2], None);
        assert_eq!(table.rows[1].len(), 3);
    }

    #[test]
    fn solutions_decoding_is_deterministic() {
        let mut decoder = ResultDecoder::new();
        let first = decoded_table(&mut decoder, SPARQL_RESULTS_JSON, SOLUTIONS);
        let second = decoded_table(&mut decoder, SPARQL_RESULTS_JSON, SOLUTIONS);
        assert_eq!(first, second);
    }

    #[test]
    fn solutions_boolean_short_circuits() {
        let mut decoder = ResultDecoder::new();
        let outcome = decoder
            .decode(SPARQL_RESULTS_JSON, r#"{"boolean": true}"#)
            .unwrap();
        assert_eq!(
            outcome,
            QueryOutcome::Boolean {
                value: true,
                error: None
            }
        );
        let outcome = decoder
            .decode(SPARQL_RESULTS_JSON, r#"{"boolean": false, "error": "boom"}"#)
            .unwrap();
        assert_eq!(
            outcome,
            QueryOutcome::Boolean {
                value: false,
                error: Some("boom".to_owned())
            }
        );
    }

    #[test]
    fn unsupported_content_type_is_an_error() {
        let mut decoder = ResultDecoder::new();
        let result = decoder.decode("text/html", "<html></html>");
        assert!(matches!(result, Err(DecodeError::UnsupportedContentType(_))));
        let result = decoder.decode("not a media type", "");
        assert!(matches!(result, Err(DecodeError::UnsupportedContentType(_))));
    }

    #[test]
    fn malformed_payload_is_an_error_not_an_empty_table() {
        let mut decoder = ResultDecoder::new();
        assert!(decoder.decode(QUADS_JSON, "{not json").is_err());
        assert!(decoder.decode(QUADS_JSON, r#"{"graph": "wrong shape"}"#).is_err());
    }

    fn quads_with_values(values: Value) -> String {
        json!([{
            "graph": {"type": "uri", "value": "http://example.com/g"},
            "entities": [{
                "subject": {"type": "uri", "value": "http://example.com/s"},
                "properties": [{
                    "property": {"type": "uri", "value": "http://example.com/p"},
                    "values": values
                }]
            }]
        }])
        .to_string()
    }

    #[test]
    fn quads_simple_values() {
        let mut decoder = ResultDecoder::new();
        let body = quads_with_values(json!([{"type": "literal", "value": "v"}]));
        let table = decoded_table(&mut decoder, QUADS_JSON, &body);
        assert_eq!(table.columns, ["graph", "subject", "predicate", "object"]);
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.rows[0],
            vec![
                Some(Term::iri("http://example.com/g")),
                Some(Term::iri("http://example.com/s")),
                Some(Term::iri("http://example.com/p")),
                Some(Term::simple_literal("v")),
            ]
        );
    }

    #[test]
    fn quads_collection_synthesizes_a_blank_node_chain() {
        let mut decoder = ResultDecoder::new();
        let body = quads_with_values(json!([[
            {"type": "literal", "value": "a"},
            {"type": "literal", "value": "b"}
        ]]));
        let table = decoded_table(&mut decoder, QUADS_JSON, &body);
        // 2 first/rest pairs plus the row referencing the chain head.
        assert_eq!(table.len(), 5);

        let blanks: Vec<&Term> = table
            .rows
            .iter()
            .filter_map(|row| match &row[1] {
                Some(term @ Term::BlankNode(_)) => Some(term),
                _ => None,
            })
            .collect();
        assert_eq!(blanks[0], &Term::blank("list_0"));
        assert!(blanks.contains(&&Term::blank("list_1")));

        // The chain terminates in rdf:nil.
        let last_rest = &table.rows[3];
        assert_eq!(last_rest[2], Some(Term::iri(rdf::REST)));
        assert_eq!(last_rest[3], Some(Term::iri(rdf::NIL)));

        // The property row comes last and points at the head of the chain.
        let reference = &table.rows[4];
        assert_eq!(reference[1], Some(Term::iri("http://example.com/s")));
        assert_eq!(reference[3], Some(Term::blank("list_0")));
    }

    #[test]
    fn quads_collection_chain_matches_element_count() {
        let mut decoder = ResultDecoder::new();
        let elements: Vec<Value> = (0..5)
            .map(|i| json!({"type": "literal", "value": i.to_string()}))
            .collect();
        let body = quads_with_values(json!([elements]));
        let table = decoded_table(&mut decoder, QUADS_JSON, &body);
        let first_links = table
            .rows
            .iter()
            .filter(|row| row[2] == Some(Term::iri(rdf::FIRST)))
            .count();
        assert_eq!(first_links, 5);

        let mut ids: Vec<String> = table
            .rows
            .iter()
            .filter_map(|row| match &row[1] {
                Some(Term::BlankNode(id)) => Some(id.clone()),
                _ => None,
            })
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5, "one distinct blank node per element");
    }

    #[test]
    fn quads_empty_collection_is_nil() {
        let mut decoder = ResultDecoder::new();
        let body = quads_with_values(json!([[]]));
        let table = decoded_table(&mut decoder, QUADS_JSON, &body);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][3], Some(Term::iri(rdf::NIL)));
    }

    #[test]
    fn blank_node_ids_stay_unique_across_decodes() {
        let mut decoder = ResultDecoder::new();
        let body = quads_with_values(json!([[
            {"type": "literal", "value": "a"},
            {"type": "literal", "value": "b"}
        ]]));
        let first = decoded_table(&mut decoder, QUADS_JSON, &body);
        let second = decoded_table(&mut decoder, QUADS_JSON, &body);
        let collect_ids = |table: &ResultTable| {
            table
                .rows
                .iter()
                .flatten()
                .filter_map(|cell| match cell {
                    Some(Term::BlankNode(id)) => Some(id.clone()),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };
        let first_ids = collect_ids(&first);
        let second_ids = collect_ids(&second);
        assert!(first_ids.iter().all(|id| !second_ids.contains(id)));
    }

    #[test]
    fn quads_content_type_with_parameters_is_accepted() {
        let mut decoder = ResultDecoder::new();
        let body = quads_with_values(json!([{"type": "literal", "value": "v"}]));
        let table = decoded_table(&mut decoder, "application/json;charset=utf-8", &body);
        assert_eq!(table.len(), 1);
    }
}
