//! OpenAI-compatible Assistants API client (threads + runs, v2)

use crate::client::{AssistantClient, AssistantError, AssistantResult};
use crate::types::{RunId, RunRequest, RunSnapshot, ThreadId, ThreadMessage, ToolOutput};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use teaserbot_core::Role;
use tracing::{debug, error};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const ASSISTANTS_BETA: &str = "assistants=v2";

pub struct OpenAiAssistantsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiAssistantsClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", ASSISTANTS_BETA)
            .header("content-type", "application/json")
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> AssistantResult<T> {
        let response = self.authorized(builder).send().await?;
        let status = response.status();

        if !status.is_success() {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1000))
                .unwrap_or(60_000);
            let error_text = response.text().await.unwrap_or_default();
            error!("Assistants API error {}: {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => AssistantError::AuthFailed(error_text),
                404 => AssistantError::NotFound(error_text),
                429 => AssistantError::RateLimited { retry_after_ms },
                _ => AssistantError::RequestFailed(format!("{}: {}", status, error_text)),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| AssistantError::InvalidResponse(format!("{}: {}", e, body)))
    }
}

#[async_trait::async_trait]
impl AssistantClient for OpenAiAssistantsClient {
    fn name(&self) -> &str {
        "openai-assistants"
    }

    async fn create_thread(&self) -> AssistantResult<ThreadId> {
        let created: IdObject = self
            .send(self.client.post(self.url("/threads")).json(&serde_json::json!({})))
            .await?;
        debug!("Created thread {}", created.id);
        Ok(ThreadId::new(created.id))
    }

    async fn append_message(
        &self,
        thread: &ThreadId,
        role: Role,
        content: &str,
    ) -> AssistantResult<()> {
        let body = CreateMessage {
            role: role.as_str(),
            content,
        };
        let _: IdObject = self
            .send(
                self.client
                    .post(self.url(&format!("/threads/{}/messages", thread)))
                    .json(&body),
            )
            .await?;
        Ok(())
    }

    async fn submit_run(&self, thread: &ThreadId, request: RunRequest) -> AssistantResult<RunId> {
        let run: IdObject = self
            .send(
                self.client
                    .post(self.url(&format!("/threads/{}/runs", thread)))
                    .json(&request),
            )
            .await?;
        debug!("Submitted run {} on thread {}", run.id, thread);
        Ok(RunId::new(run.id))
    }

    async fn get_run(&self, thread: &ThreadId, run: &RunId) -> AssistantResult<RunSnapshot> {
        self.send(
            self.client
                .get(self.url(&format!("/threads/{}/runs/{}", thread, run))),
        )
        .await
    }

    async fn submit_tool_outputs(
        &self,
        thread: &ThreadId,
        run: &RunId,
        outputs: Vec<ToolOutput>,
    ) -> AssistantResult<()> {
        let body = SubmitToolOutputsBody {
            tool_outputs: outputs,
        };
        let _: IdObject = self
            .send(
                self.client
                    .post(self.url(&format!(
                        "/threads/{}/runs/{}/submit_tool_outputs",
                        thread, run
                    )))
                    .json(&body),
            )
            .await?;
        Ok(())
    }

    async fn latest_message(&self, thread: &ThreadId) -> AssistantResult<Option<ThreadMessage>> {
        let page: MessageList = self
            .send(
                self.client
                    .get(self.url(&format!("/threads/{}/messages", thread)))
                    .query(&[("limit", "1"), ("order", "desc")]),
            )
            .await?;
        Ok(page.data.into_iter().next())
    }
}

#[derive(Deserialize)]
struct IdObject {
    id: String,
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct SubmitToolOutputsBody {
    tool_outputs: Vec<ToolOutput>,
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}
