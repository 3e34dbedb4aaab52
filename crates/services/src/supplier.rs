//! Remote question supplier: fetches question sets and judges answers.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use quiz_core::model::{AnswerSubmission, Question, TopicId, Verdict};

use crate::config::SupplierConfig;
use crate::error::{ConfigError, SubmitError, SupplyError};

/// Source of questions and authority on answer correctness.
#[async_trait]
pub trait QuestionSupplier: Send + Sync {
    /// Fetch the full, ordered question set for a topic in one round-trip.
    ///
    /// # Errors
    ///
    /// Returns `SupplyError` on transport failures, non-success statuses or
    /// undecodable bodies.
    async fn fetch_questions(&self, topic: &TopicId) -> Result<Vec<Question>, SupplyError>;

    /// Ask for the verdict on one answer.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError` on transport failures, non-success statuses or
    /// undecodable bodies.
    async fn submit_answer(
        &self,
        topic: &TopicId,
        submission: &AnswerSubmission,
    ) -> Result<Verdict, SubmitError>;
}

/// `QuestionSupplier` backed by the quiz HTTP API.
///
/// - `GET  {base}/api/questoes/{topic}`
/// - `POST {base}/api/resposta/{topic}`
#[derive(Clone)]
pub struct HttpQuestionSupplier {
    client: Client,
    config: SupplierConfig,
}

impl HttpQuestionSupplier {
    /// # Errors
    ///
    /// Returns `ConfigError::Client` if the HTTP client cannot be built.
    pub fn new(config: SupplierConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: config.http_client()?,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SupplierConfig {
        &self.config
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

#[async_trait]
impl QuestionSupplier for HttpQuestionSupplier {
    #[instrument(skip(self), fields(topic = %topic))]
    async fn fetch_questions(&self, topic: &TopicId) -> Result<Vec<Question>, SupplyError> {
        let url = self.config.endpoint(&["api", "questoes", topic.as_str()]);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SupplyError::Network(describe(&e)))?;

        if !response.status().is_success() {
            return Err(SupplyError::HttpStatus(response.status()));
        }

        let questions: Vec<Question> = response
            .json()
            .await
            .map_err(|e| SupplyError::Decode(e.to_string()))?;
        for question in &questions {
            question.validate()?;
        }

        debug!(count = questions.len(), "question set fetched");
        Ok(questions)
    }

    #[instrument(skip(self, submission), fields(topic = %topic, question = %submission.question_id))]
    async fn submit_answer(
        &self,
        topic: &TopicId,
        submission: &AnswerSubmission,
    ) -> Result<Verdict, SubmitError> {
        let url = self.config.endpoint(&["api", "resposta", topic.as_str()]);
        let response = self
            .client
            .post(url)
            .json(submission)
            .send()
            .await
            .map_err(|e| SubmitError::Network(describe(&e)))?;

        if !response.status().is_success() {
            return Err(SubmitError::HttpStatus(response.status()));
        }

        let verdict: Verdict = response
            .json()
            .await
            .map_err(|e| SubmitError::Decode(e.to_string()))?;
        debug!(correct = verdict.correct, "verdict received");
        Ok(verdict)
    }
}
