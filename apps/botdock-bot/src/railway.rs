use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const RAILWAY_API: &str = "https://backboard.railway.app/graphql/v2";

const UPSERT_VARIABLE_MUTATION: &str = "
    mutation UpsertVariable($input: VariableUpsertInput!) {
        variableUpsert(input: $input) {
            id
            name
            value
        }
    }
";

const SERVICE_CREATE_MUTATION: &str = "
    mutation ServiceInstanceCreate($input: ServiceInstanceCreateInput!) {
        serviceInstanceCreate(input: $input) {
            id
            name
            createdAt
        }
    }
";

/// Thin client for the two Railway mutations the bot needs: storing a user's
/// bot token as a project variable and spinning up a service that references
/// it. No retries, no polling; the caller records failure and moves on.
#[derive(Clone)]
pub struct RailwayClient {
    client: Client,
    token: String,
    project_id: String,
    service_image: String,
}

impl RailwayClient {
    pub fn new(token: String, project_id: String, service_image: String) -> Self {
        Self {
            client: Client::new(),
            token,
            project_id,
            service_image,
        }
    }

    /// Stores the user's bot token as a project variable named `BOT_{user_id}`.
    pub async fn upsert_variable(&self, user_id: i64, bot_token: &str) -> Result<()> {
        let body = GraphQlRequest {
            query: UPSERT_VARIABLE_MUTATION,
            variables: VariableUpsertVars {
                input: VariableUpsertInput {
                    project_id: self.project_id.clone(),
                    name: format!("BOT_{}", user_id),
                    value: bot_token.to_string(),
                },
            },
        };

        let response = self
            .client
            .post(RAILWAY_API)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        // The mutation just echoes the variable back, nothing to keep.
        let parsed: GraphQlResponse<serde_json::Value> = response.json().await?;
        graphql_data(parsed)?;
        Ok(())
    }

    /// Creates the per-user service. The service reads its token through the
    /// `${BOT_<id>}` project variable stored by [`Self::upsert_variable`].
    pub async fn create_service(&self, service_name: &str, user_id: i64) -> Result<CreatedService> {
        let body = GraphQlRequest {
            query: SERVICE_CREATE_MUTATION,
            variables: ServiceCreateVars {
                input: ServiceInstanceCreateInput {
                    project_id: self.project_id.clone(),
                    name: service_name.to_string(),
                    source: ServiceSource {
                        image: self.service_image.clone(),
                    },
                    variables: vec![
                        ServiceVariable {
                            name: "BOT_TOKEN".to_string(),
                            value: format!("${{BOT_{}}}", user_id),
                        },
                        ServiceVariable {
                            name: "OWNER_ID".to_string(),
                            value: user_id.to_string(),
                        },
                    ],
                },
            },
        };

        let response = self
            .client
            .post(RAILWAY_API)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: GraphQlResponse<ServiceCreateData> = response.json().await?;
        Ok(graphql_data(parsed)?.service_instance_create)
    }

    pub fn service_url(&self, service_id: &str) -> String {
        format!(
            "https://railway.app/project/{}/service/{}",
            self.project_id, service_id
        )
    }
}

pub fn service_slug(bot_name: &str, user_id: i64) -> String {
    format!("{}-{}", bot_name, user_id)
        .to_lowercase()
        .replace(' ', "-")
}

fn graphql_data<T>(response: GraphQlResponse<T>) -> Result<T> {
    if let Some(errors) = &response.errors {
        if let Some(first) = errors.first() {
            anyhow::bail!("Railway API error: {}", first.message);
        }
    }
    response.data.context("Railway API returned no data")
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<V> {
    query: &'static str,
    variables: V,
}

#[derive(Debug, Serialize)]
struct VariableUpsertVars {
    input: VariableUpsertInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VariableUpsertInput {
    project_id: String,
    name: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct ServiceCreateVars {
    input: ServiceInstanceCreateInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceInstanceCreateInput {
    project_id: String,
    name: String,
    source: ServiceSource,
    variables: Vec<ServiceVariable>,
}

#[derive(Debug, Serialize)]
struct ServiceSource {
    image: String,
}

#[derive(Debug, Serialize)]
struct ServiceVariable {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ServiceCreateData {
    #[serde(rename = "serviceInstanceCreate")]
    service_instance_create: CreatedService,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedService {
    pub id: String,
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_slug() {
        assert_eq!(service_slug("MyBot", 123456), "mybot-123456");
        assert_eq!(service_slug("My Shop Bot", 42), "my-shop-bot-42");
    }

    #[test]
    fn test_variable_upsert_payload_shape() {
        let input = VariableUpsertInput {
            project_id: "proj-1".to_string(),
            name: "BOT_42".to_string(),
            value: "123:abc".to_string(),
        };
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(
            value,
            json!({"projectId": "proj-1", "name": "BOT_42", "value": "123:abc"})
        );
    }

    #[test]
    fn test_service_create_payload_shape() {
        let input = ServiceInstanceCreateInput {
            project_id: "proj-1".to_string(),
            name: "mybot-42".to_string(),
            source: ServiceSource {
                image: "botdock/userbot:latest".to_string(),
            },
            variables: vec![
                ServiceVariable {
                    name: "BOT_TOKEN".to_string(),
                    value: format!("${{BOT_{}}}", 42),
                },
                ServiceVariable {
                    name: "OWNER_ID".to_string(),
                    value: "42".to_string(),
                },
            ],
        };
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(
            value,
            json!({
                "projectId": "proj-1",
                "name": "mybot-42",
                "source": {"image": "botdock/userbot:latest"},
                "variables": [
                    {"name": "BOT_TOKEN", "value": "${BOT_42}"},
                    {"name": "OWNER_ID", "value": "42"}
                ]
            })
        );
    }

    #[test]
    fn test_graphql_error_wins_over_data() {
        let response: GraphQlResponse<i32> = GraphQlResponse {
            data: Some(1),
            errors: Some(vec![GraphQlError {
                message: "Not Authorized".to_string(),
            }]),
        };
        let err = graphql_data(response).unwrap_err();
        assert!(err.to_string().contains("Not Authorized"));
    }
}
