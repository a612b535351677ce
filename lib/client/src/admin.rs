//! The typed administration operations of the resource channel.
//!
//! Each method issues exactly one exchange through [ApiClient::call]-style plumbing
//! and resolves to the uniform [Outcome]; response bodies stay raw so that pages
//! decide how to parse them (see [Outcome::json]).

use crate::api::encode;
use crate::{media_types, ApiClient, Method, Outcome, RequestBody};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A privilege line, as returned by the privilege listings.
///
/// User-centric listings carry the `database` field, database-centric listings the
/// `user` field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Privilege {
    pub database: Option<String>,
    pub user: Option<String>,
    pub is_admin: bool,
    pub can_write: bool,
    pub can_read: bool,
}

/// A stored procedure definition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredProcedure {
    pub name: String,
    pub definition: String,
    pub parameters: Vec<String>,
}

impl ApiClient {
    // Server management

    pub async fn server_product(&self) -> Outcome {
        self.call("/server/product", Method::GET, None, RequestBody::Empty)
            .await
    }

    pub async fn server_shutdown(&self) -> Outcome {
        self.call("/server/shutdown", Method::POST, None, RequestBody::Empty)
            .await
    }

    pub async fn server_restart(&self) -> Outcome {
        self.call("/server/restart", Method::POST, None, RequestBody::Empty)
            .await
    }

    pub async fn server_product_dependencies(&self) -> Outcome {
        self.call(
            "/server/product/dependencies",
            Method::GET,
            None,
            RequestBody::Empty,
        )
        .await
    }

    pub async fn grant_server_admin(&self, user: &str) -> Outcome {
        self.call(
            &format!("/server/grantAdmin?user={}", encode(user)),
            Method::POST,
            None,
            RequestBody::Empty,
        )
        .await
    }

    pub async fn revoke_server_admin(&self, user: &str) -> Outcome {
        self.call(
            &format!("/server/revokeAdmin?user={}", encode(user)),
            Method::POST,
            None,
            RequestBody::Empty,
        )
        .await
    }

    // Database management

    pub async fn databases(&self) -> Outcome {
        self.call("/databases", Method::GET, None, RequestBody::Empty)
            .await
    }

    pub async fn create_database(&self, database: &str) -> Outcome {
        self.call(
            &format!("/databases/{}", encode(database)),
            Method::PUT,
            None,
            RequestBody::Empty,
        )
        .await
    }

    pub async fn drop_database(&self, database: &str) -> Outcome {
        self.call(
            &format!("/databases/{}", encode(database)),
            Method::DELETE,
            None,
            RequestBody::Empty,
        )
        .await
    }

    /// Uploads a document into a database; the content type names the RDF format.
    pub async fn upload(&self, database: &str, content_type: &str, content: String) -> Outcome {
        self.call(
            &format!("/databases/{}", encode(database)),
            Method::POST,
            Some(content_type),
            RequestBody::Text(content),
        )
        .await
    }

    pub async fn entailment(&self, database: &str) -> Outcome {
        self.call(
            &format!("/databases/{}/entailment", encode(database)),
            Method::GET,
            None,
            RequestBody::Empty,
        )
        .await
    }

    /// Fetches the metric definition of a database.
    pub async fn database_metric(&self, database: &str) -> Outcome {
        self.call(
            &format!("/databases/{}/metric", encode(database)),
            Method::GET,
            None,
            RequestBody::Empty,
        )
        .await
    }

    /// Fetches a snapshot of the statistics of a database.
    pub async fn database_statistics(&self, database: &str) -> Outcome {
        self.call(
            &format!("/databases/{}/statistics", encode(database)),
            Method::GET,
            None,
            RequestBody::Empty,
        )
        .await
    }

    pub async fn set_entailment(&self, database: &str, regime: &str) -> Outcome {
        self.call(
            &format!("/databases/{}/entailment", encode(database)),
            Method::PUT,
            Some(media_types::TEXT_PLAIN),
            RequestBody::Text(regime.to_owned()),
        )
        .await
    }

    // Privileges

    pub async fn database_privileges(&self, database: &str) -> Outcome {
        self.call(
            &format!("/databases/{}/privileges", encode(database)),
            Method::GET,
            None,
            RequestBody::Empty,
        )
        .await
    }

    pub async fn grant(&self, database: &str, access: &str, user: &str) -> Outcome {
        self.call(
            &format!(
                "/databases/{}/privileges/grant?user={}&access={}",
                encode(database),
                encode(user),
                encode(access)
            ),
            Method::POST,
            None,
            RequestBody::Empty,
        )
        .await
    }

    pub async fn revoke(&self, database: &str, access: &str, user: &str) -> Outcome {
        self.call(
            &format!(
                "/databases/{}/privileges/revoke?user={}&access={}",
                encode(database),
                encode(user),
                encode(access)
            ),
            Method::POST,
            None,
            RequestBody::Empty,
        )
        .await
    }

    // Inference rules

    pub async fn rules(&self, database: &str) -> Outcome {
        self.call(
            &format!("/databases/{}/rules", encode(database)),
            Method::GET,
            None,
            RequestBody::Empty,
        )
        .await
    }

    pub async fn rule(&self, database: &str, rule: &str) -> Outcome {
        self.call(
            &format!("/databases/{}/rules/{}", encode(database), encode(rule)),
            Method::GET,
            None,
            RequestBody::Empty,
        )
        .await
    }

    pub async fn add_rule(&self, database: &str, definition: &str) -> Outcome {
        self.call(
            &format!("/databases/{}/rules", encode(database)),
            Method::PUT,
            Some(media_types::RULE),
            RequestBody::Text(definition.to_owned()),
        )
        .await
    }

    pub async fn remove_rule(&self, database: &str, rule: &str) -> Outcome {
        self.call(
            &format!("/databases/{}/rules/{}", encode(database), encode(rule)),
            Method::DELETE,
            None,
            RequestBody::Empty,
        )
        .await
    }

    pub async fn activate_rule(&self, database: &str, rule: &str) -> Outcome {
        self.call(
            &format!(
                "/databases/{}/rules/{}/activate",
                encode(database),
                encode(rule)
            ),
            Method::POST,
            None,
            RequestBody::Empty,
        )
        .await
    }

    pub async fn deactivate_rule(&self, database: &str, rule: &str) -> Outcome {
        self.call(
            &format!(
                "/databases/{}/rules/{}/deactivate",
                encode(database),
                encode(rule)
            ),
            Method::POST,
            None,
            RequestBody::Empty,
        )
        .await
    }

    pub async fn rule_status(&self, database: &str, rule: &str) -> Outcome {
        self.call(
            &format!(
                "/databases/{}/rules/{}/status",
                encode(database),
                encode(rule)
            ),
            Method::GET,
            None,
            RequestBody::Empty,
        )
        .await
    }

    // Stored procedures

    pub async fn procedures(&self, database: &str) -> Outcome {
        self.call(
            &format!("/databases/{}/procedures", encode(database)),
            Method::GET,
            None,
            RequestBody::Empty,
        )
        .await
    }

    pub async fn procedure(&self, database: &str, name: &str) -> Outcome {
        self.call(
            &format!(
                "/databases/{}/procedures/{}",
                encode(database),
                encode(name)
            ),
            Method::GET,
            None,
            RequestBody::Empty,
        )
        .await
    }

    pub async fn add_procedure(&self, database: &str, procedure: &StoredProcedure) -> Outcome {
        let body = serde_json::json!({
            "name": procedure.name,
            "definition": procedure.definition,
            "parameters": procedure.parameters,
        });
        self.call(
            &format!(
                "/databases/{}/procedures/{}",
                encode(database),
                encode(&procedure.name)
            ),
            Method::PUT,
            Some(media_types::JSON),
            RequestBody::Json(body),
        )
        .await
    }

    pub async fn remove_procedure(&self, database: &str, name: &str) -> Outcome {
        self.call(
            &format!(
                "/databases/{}/procedures/{}",
                encode(database),
                encode(name)
            ),
            Method::DELETE,
            None,
            RequestBody::Empty,
        )
        .await
    }

    /// Executes a stored procedure with the given execution context.
    pub async fn execute_procedure(&self, database: &str, name: &str, context: Value) -> Outcome {
        self.call(
            &format!(
                "/databases/{}/procedures/{}",
                encode(database),
                encode(name)
            ),
            Method::POST,
            Some(media_types::JSON),
            RequestBody::Json(context),
        )
        .await
    }

    // User management

    pub async fn users(&self) -> Outcome {
        self.call("/users", Method::GET, None, RequestBody::Empty).await
    }

    pub async fn create_user(&self, login: &str, password: &str) -> Outcome {
        self.call(
            &format!("/users/{}", encode(login)),
            Method::PUT,
            Some(media_types::TEXT_PLAIN),
            RequestBody::Text(password.to_owned()),
        )
        .await
    }

    pub async fn delete_user(&self, login: &str) -> Outcome {
        self.call(
            &format!("/users/{}", encode(login)),
            Method::DELETE,
            None,
            RequestBody::Empty,
        )
        .await
    }

    pub async fn update_password(&self, login: &str, password: &str) -> Outcome {
        self.call(
            &format!("/users/{}", encode(login)),
            Method::POST,
            Some(media_types::TEXT_PLAIN),
            RequestBody::Text(password.to_owned()),
        )
        .await
    }

    pub async fn user_privileges(&self, login: &str) -> Outcome {
        self.call(
            &format!("/users/{}/privileges", encode(login)),
            Method::GET,
            None,
            RequestBody::Empty,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::STATUS_UNAUTHENTICATED;

    #[tokio::test]
    async fn monitoring_operations_fail_fast_without_a_session() {
        // The endpoint is not routable; reaching the network would hang or yield
        // the unreachable sentinel instead of a clean 401.
        let client = ApiClient::new("http://192.0.2.1/api/v1").unwrap();
        let statuses = [
            client.database_metric("db1").await.status,
            client.database_statistics("db1").await.status,
            client.server_product_dependencies().await.status,
        ];
        assert_eq!(statuses, [STATUS_UNAUTHENTICATED; 3]);
    }

    #[test]
    fn privilege_reads_both_listing_shapes() {
        let user_centric: Privilege =
            serde_json::from_str(r#"{"database": "db1", "isAdmin": true, "canRead": true}"#)
                .unwrap();
        assert_eq!(user_centric.database.as_deref(), Some("db1"));
        assert!(user_centric.is_admin);
        assert!(!user_centric.can_write);

        let database_centric: Privilege =
            serde_json::from_str(r#"{"user": "alice", "canWrite": true}"#).unwrap();
        assert_eq!(database_centric.user.as_deref(), Some("alice"));
        assert!(database_centric.can_write);
    }

    #[test]
    fn stored_procedure_round_trips() {
        let procedure = StoredProcedure {
            name: "lookup".to_owned(),
            definition: "SELECT * WHERE { ?s ?p ?o }".to_owned(),
            parameters: vec!["s".to_owned()],
        };
        let encoded = serde_json::to_string(&procedure).unwrap();
        let decoded: StoredProcedure = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, procedure);
    }
}
