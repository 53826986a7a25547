use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use classroom_core::model::{AnswerRecord, ClassId, LessonId, RosterEntry, ThemeId};

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::transport::{AnswerSource, LessonControl, RosterSource};

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins `segments` onto the base path, keeping any prefix the base carries.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        let mut path = url.path().trim_end_matches('/').to_string();
        for segment in segments {
            path.push('/');
            path.push_str(segment);
        }
        url.set_path(&path);
        url
    }

    pub(crate) fn answers_url(&self, lesson_id: LessonId) -> Url {
        // the backend routes this collection with a trailing slash
        let mut url = self.endpoint(&["api", "answers", ""]);
        url.query_pairs_mut()
            .append_pair("lesson_id", &lesson_id.to_string());
        url
    }

    pub(crate) fn roster_url(&self, class_id: ClassId) -> Url {
        self.endpoint(&["classes", &class_id.to_string(), "students"])
    }

    pub(crate) fn generate_answer_data_url(&self, lesson_id: LessonId, theme_id: ThemeId) -> Url {
        self.endpoint(&[
            "api",
            "answer-data-bulk",
            "lessons",
            &lesson_id.to_string(),
            "themes",
            &theme_id.to_string(),
            "generate-answer-data",
        ])
    }

    pub(crate) fn exercise_url(&self, lesson_id: LessonId, action: &str) -> Url {
        self.endpoint(&["lessons", &lesson_id.to_string(), action])
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = check_status(self.client.get(url).send().await?)?;
        Ok(response.json().await?)
    }
}

fn check_status(response: Response) -> Result<Response, ApiError> {
    match response.status() {
        StatusCode::NOT_FOUND => Err(ApiError::NotFound),
        status if status.is_success() => Ok(response),
        status => Err(ApiError::HttpStatus(status)),
    }
}

#[async_trait]
impl AnswerSource for ApiClient {
    async fn fetch_answers(&self, lesson_id: LessonId) -> Result<Vec<AnswerRecord>, ApiError> {
        self.get_json(self.answers_url(lesson_id)).await
    }
}

#[async_trait]
impl RosterSource for ApiClient {
    async fn fetch_roster(&self, class_id: ClassId) -> Result<Vec<RosterEntry>, ApiError> {
        self.get_json(self.roster_url(class_id)).await
    }
}

#[async_trait]
impl LessonControl for ApiClient {
    async fn generate_answer_data(
        &self,
        lesson_id: LessonId,
        theme_id: ThemeId,
    ) -> Result<(), ApiError> {
        let url = self.generate_answer_data_url(lesson_id, theme_id);
        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }

    async fn start_exercise(&self, lesson_id: LessonId) -> Result<(), ApiError> {
        let response = self
            .client
            .put(self.exercise_url(lesson_id, "start_exercise"))
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }

    async fn end_exercise(&self, lesson_id: LessonId) -> Result<(), ApiError> {
        let response = self
            .client
            .put(self.exercise_url(lesson_id, "end_exercise"))
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }
}
