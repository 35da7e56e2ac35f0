pub mod dto;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AppError;
use crate::models::{Course, Exercise, ExerciseUserInfo, FileComments, FileInfo, NewCourseRequest, User};
use crate::session::SessionStore;

/// REST surface of the course-management server used by this client.
#[async_trait]
pub trait TeachingApi: Send + Sync {
    /// Requests a fresh anti-forgery token.
    async fn get_csrf_token(&self) -> Result<String, AppError>;
    /// Returns the auth token for the given credentials.
    async fn login(&self, username: &str, password: &str) -> Result<String, AppError>;
    async fn get_user_info(&self) -> Result<User, AppError>;
    async fn fetch_exercises(&self, course_id: i64) -> Result<Vec<Exercise>, AppError>;
    async fn fetch_archive(&self, exercise_id: i64) -> Result<Vec<u8>, AppError>;
    /// Every student's submission, one top-level directory per student.
    async fn fetch_student_archives(&self, exercise_id: i64) -> Result<Vec<u8>, AppError>;
    async fn fetch_template(&self, exercise_id: i64) -> Result<Vec<u8>, AppError>;
    async fn upload_archive(&self, exercise_id: i64, archive: Vec<u8>) -> Result<(), AppError>;
    async fn fetch_exercise_user_info(&self, exercise_id: i64) -> Result<ExerciseUserInfo, AppError>;
    async fn fetch_files_info(&self, username: &str, exercise_id: i64) -> Result<Vec<FileInfo>, AppError>;
    async fn fetch_comments(&self, exercise_id: i64, username: &str) -> Result<Vec<FileComments>, AppError>;
    async fn post_comment(&self, file_id: i64, line: u32, line_text: &str, author: &str, body: &str) -> Result<(), AppError>;
    async fn add_course(&self, name: &str) -> Result<Course, AppError>;
    async fn delete_course(&self, course_id: i64) -> Result<(), AppError>;
}

pub struct HttpTeachingClient {
    client: Client,
    session: Arc<SessionStore>,
}

impl HttpTeachingClient {
    pub fn new(session: Arc<SessionStore>) -> Result<Self, AppError> {
        let user_agent = format!("v4t-client/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, session })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.session.base_url().trim_end_matches('/'), path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let session = self.session.session();
        let mut builder = builder;
        if let Some(jwt) = &session.jwt_token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", jwt));
        }
        if !session.xsrf_token.is_empty() {
            builder = builder
                .header("X-XSRF-TOKEN", session.xsrf_token.as_str())
                .header(COOKIE, format!("XSRF-TOKEN={}", session.xsrf_token));
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, AppError> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| AppError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::from_status(status.as_u16(), body));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let response = self.send(self.client.get(self.url(path))).await?;
        let body_text = response
            .text()
            .await
            .map_err(|e| AppError::Connect(e.to_string()))?;
        serde_json::from_str::<T>(&body_text).map_err(|e| {
            tracing::error!("Failed to parse response of {}: {}", path, e);
            AppError::Json(e)
        })
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, AppError> {
        let response = self.send(self.client.get(self.url(path))).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Connect(e.to_string()))?;
        debug!("Downloaded {} bytes from {}", bytes.len(), path);
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl TeachingApi for HttpTeachingClient {
    async fn get_csrf_token(&self) -> Result<String, AppError> {
        let response = self.send(self.client.get(self.url("/api/csrf"))).await?;
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(dto::xsrf_from_cookie)
            .ok_or_else(|| AppError::Status {
                status: response.status().as_u16(),
                body: "Server did not send an anti-forgery token".to_string(),
            })
    }

    async fn login(&self, username: &str, password: &str) -> Result<String, AppError> {
        let request = self
            .client
            .post(self.url("/api/login"))
            .json(&dto::LoginRequest { username, password });
        let body_text = self
            .send(request)
            .await?
            .text()
            .await
            .map_err(|e| AppError::Connect(e.to_string()))?;
        let parsed: dto::LoginResponse = serde_json::from_str(&body_text)?;
        Ok(parsed.jwt_token)
    }

    async fn get_user_info(&self) -> Result<User, AppError> {
        self.get_json("/api/currentuser").await
    }

    async fn fetch_exercises(&self, course_id: i64) -> Result<Vec<Exercise>, AppError> {
        self.get_json(&format!("/api/courses/{}/exercises", course_id)).await
    }

    async fn fetch_archive(&self, exercise_id: i64) -> Result<Vec<u8>, AppError> {
        self.get_bytes(&format!("/api/exercises/{}/files", exercise_id)).await
    }

    async fn fetch_student_archives(&self, exercise_id: i64) -> Result<Vec<u8>, AppError> {
        self.get_bytes(&format!("/api/exercises/{}/teachers/files", exercise_id)).await
    }

    async fn fetch_template(&self, exercise_id: i64) -> Result<Vec<u8>, AppError> {
        self.get_bytes(&format!("/api/exercises/{}/teachers/files/template", exercise_id)).await
    }

    async fn upload_archive(&self, exercise_id: i64, archive: Vec<u8>) -> Result<(), AppError> {
        let part = Part::bytes(archive)
            .file_name(format!("{}.zip", exercise_id))
            .mime_str("application/zip")
            .map_err(|e| AppError::Config(format!("Invalid upload mime type: {}", e)))?;
        let form = Form::new().part("file", part);
        let request = self
            .client
            .post(self.url(&format!("/api/exercises/{}/files", exercise_id)))
            .multipart(form);
        self.send(request).await?;
        Ok(())
    }

    async fn fetch_exercise_user_info(&self, exercise_id: i64) -> Result<ExerciseUserInfo, AppError> {
        self.get_json(&format!("/api/exercises/{}/info", exercise_id)).await
    }

    async fn fetch_files_info(&self, username: &str, exercise_id: i64) -> Result<Vec<FileInfo>, AppError> {
        self.get_json(&format!("/api/users/{}/exercises/{}/files", username, exercise_id)).await
    }

    async fn fetch_comments(&self, exercise_id: i64, username: &str) -> Result<Vec<FileComments>, AppError> {
        self.get_json(&format!("/api/exercises/{}/comments/{}", exercise_id, username)).await
    }

    async fn post_comment(&self, file_id: i64, line: u32, line_text: &str, author: &str, body: &str) -> Result<(), AppError> {
        let request_body = dto::NewCommentRequest {
            line,
            line_text,
            comments: vec![dto::CommentBody { author, body }],
        };
        let request = self
            .client
            .post(self.url(&format!("/api/files/{}/comments", file_id)))
            .json(&request_body);
        self.send(request).await?;
        Ok(())
    }

    async fn add_course(&self, name: &str) -> Result<Course, AppError> {
        let request = self
            .client
            .post(self.url("/api/courses"))
            .json(&NewCourseRequest { name: name.to_string() });
        let body_text = self
            .send(request)
            .await?
            .text()
            .await
            .map_err(|e| AppError::Connect(e.to_string()))?;
        Ok(serde_json::from_str(&body_text)?)
    }

    async fn delete_course(&self, course_id: i64) -> Result<(), AppError> {
        self.send(self.client.delete(self.url(&format!("/api/courses/{}", course_id))))
            .await?;
        Ok(())
    }
}
