//! Scripted provider shared by runtime tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};

/// One scripted reply.
pub(crate) enum Reply {
    Text(String),
    Fail(ProviderError),
    /// Never answers within any reasonable timeout
    Hang,
}

/// Returns scripted replies in order and records every request.
pub(crate) struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Reply::Text(t.to_string())).collect())
    }

    pub(crate) fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.lock().unwrap().push(messages);
        let reply = self.replies.lock().unwrap().pop_front();

        match reply {
            Some(Reply::Text(content)) => Ok(CompletionResponse {
                content,
                usage: TokenUsage {
                    prompt_tokens: 100,
                    completion_tokens: 10,
                },
                model: format!("scripted:{}", config.model),
                stop_reason: Some("end_turn".to_string()),
            }),
            Some(Reply::Fail(err)) => Err(err),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(ProviderError::HttpError("woke up".to_string()))
            }
            None => panic!("scripted provider ran out of replies"),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A well-formed report citing lines 1-2.
pub(crate) const VALID_OUTPUT: &str = r#"{
  "issues": [
    {
      "id": "ISSUE-0001",
      "severity": "WARN",
      "category": "AMBIGUOUS_BEHAVIOR",
      "title": "Retry count is unspecified",
      "description": "The spec says retry but not how often.",
      "evidence": [{"path": "SPEC.md", "line_start": 1, "line_end": 2, "quote": "retry on failure"}],
      "impact": "Implementations diverge.",
      "recommendation": "State the retry count.",
      "blocking": false,
      "tags": []
    },
    {
      "id": "ISSUE-0002",
      "severity": "INFO",
      "category": "TERMINOLOGY_INCONSISTENT",
      "title": "Client and caller both used",
      "description": "",
      "evidence": [{"path": "SPEC.md", "line_start": 3, "line_end": 3, "quote": "caller"}],
      "impact": "",
      "recommendation": "",
      "blocking": false,
      "tags": []
    }
  ],
  "questions": [],
  "patches": [
    {"issue_id": "ISSUE-0001", "before": "retry on failure", "after": "retry up to 3 times on failure"}
  ]
}"#;

/// Cites line 50; invalid for any short document.
pub(crate) const OUT_OF_RANGE_OUTPUT: &str = r#"{
  "issues": [
    {
      "id": "ISSUE-0001",
      "severity": "CRITICAL",
      "category": "CONTRADICTION",
      "title": "MODEL-SUPPLIED-TITLE",
      "evidence": [{"path": "SPEC.md", "line_start": 50, "line_end": 50, "quote": "nothing"}]
    }
  ]
}"#;
