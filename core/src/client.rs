//! Stateless HTTP request builder and response parser for the AfyaLink API.
//!
//! # Design
//! `AfyaClient` holds only a `base_url` and carries no mutable state between
//! calls. Each backend operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. The session token is an explicit argument to every
//! authenticated `build_*`; the client never stores it.

use serde::Serialize;

use crate::envelope;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    Client, ClientId, ClientSearch, ClientUpdate, Credentials, Enrollment, LoginSession,
    NewClient, NewEnrollment, NewProgram, Program, ProgramId, ProgramUpdate, Signup,
    UserIdentity,
};

/// Synchronous, stateless client for the AfyaLink API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Debug, Clone)]
pub struct AfyaClient {
    base_url: String,
}

impl AfyaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(
        &self,
        method: HttpMethod,
        path: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> HttpRequest {
        let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
        if let Some(token) = token {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers,
            body,
        }
    }

    /// Build a request that requires a session token. Fails before any
    /// network call when the token is empty.
    fn authed(
        &self,
        method: HttpMethod,
        path: &str,
        token: &str,
        body: Option<String>,
    ) -> Result<HttpRequest, ApiError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ApiError::MissingToken);
        }
        Ok(self.request(method, path, Some(token), body))
    }

    // --- auth ---

    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        let body = to_json(credentials)?;
        Ok(self.request(HttpMethod::Post, "/doctors/login", None, Some(body)))
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<LoginSession, ApiError> {
        envelope::login(&response)
    }

    pub fn build_signup(&self, input: &Signup) -> Result<HttpRequest, ApiError> {
        let body = to_json(input)?;
        Ok(self.request(HttpMethod::Post, "/doctors", None, Some(body)))
    }

    pub fn parse_signup(&self, response: HttpResponse) -> Result<UserIdentity, ApiError> {
        envelope::data(&response)
    }

    pub fn build_logout(&self, token: &str) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Post, "/doctors/logout", token, None)
    }

    pub fn parse_logout(&self, response: HttpResponse) -> Result<(), ApiError> {
        envelope::unit(&response)
    }

    // --- clients ---

    pub fn build_list_clients(&self, token: &str) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Get, "/clients", token, None)
    }

    pub fn parse_list_clients(&self, response: HttpResponse) -> Result<Vec<Client>, ApiError> {
        envelope::list(&response)
    }

    pub fn build_search_clients(
        &self,
        search: &ClientSearch,
        token: &str,
    ) -> Result<HttpRequest, ApiError> {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(term) = &search.query {
            query.append_pair("query", term);
        }
        if let Some(page) = search.page {
            query.append_pair("page", &page.to_string());
        }
        if let Some(per_page) = search.per_page {
            query.append_pair("per_page", &per_page.to_string());
        }
        let query = query.finish();
        let path = if query.is_empty() {
            "/clients/search".to_string()
        } else {
            format!("/clients/search?{query}")
        };
        self.authed(HttpMethod::Get, &path, token, None)
    }

    pub fn parse_search_clients(&self, response: HttpResponse) -> Result<Vec<Client>, ApiError> {
        envelope::list(&response)
    }

    pub fn build_get_client(&self, id: ClientId, token: &str) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Get, &format!("/clients/{id}"), token, None)
    }

    pub fn parse_get_client(&self, response: HttpResponse) -> Result<Client, ApiError> {
        envelope::data(&response)
    }

    pub fn build_create_client(
        &self,
        input: &NewClient,
        token: &str,
    ) -> Result<HttpRequest, ApiError> {
        let body = to_json(input)?;
        self.authed(HttpMethod::Post, "/clients", token, Some(body))
    }

    pub fn parse_create_client(&self, response: HttpResponse) -> Result<Client, ApiError> {
        envelope::data(&response)
    }

    pub fn build_update_client(
        &self,
        id: ClientId,
        input: &ClientUpdate,
        token: &str,
    ) -> Result<HttpRequest, ApiError> {
        let body = to_json(input)?;
        self.authed(HttpMethod::Put, &format!("/clients/{id}"), token, Some(body))
    }

    pub fn parse_update_client(&self, response: HttpResponse) -> Result<Client, ApiError> {
        envelope::data(&response)
    }

    pub fn build_delete_client(&self, id: ClientId, token: &str) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Delete, &format!("/clients/{id}"), token, None)
    }

    pub fn parse_delete_client(&self, response: HttpResponse) -> Result<(), ApiError> {
        envelope::unit(&response)
    }

    // --- programs ---

    pub fn build_list_programs(&self, token: &str) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Get, "/programs", token, None)
    }

    pub fn parse_list_programs(&self, response: HttpResponse) -> Result<Vec<Program>, ApiError> {
        envelope::list(&response)
    }

    pub fn build_get_program(&self, id: ProgramId, token: &str) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Get, &format!("/programs/{id}"), token, None)
    }

    pub fn parse_get_program(&self, response: HttpResponse) -> Result<Program, ApiError> {
        envelope::data(&response)
    }

    pub fn build_create_program(
        &self,
        input: &NewProgram,
        token: &str,
    ) -> Result<HttpRequest, ApiError> {
        let body = to_json(input)?;
        self.authed(HttpMethod::Post, "/programs", token, Some(body))
    }

    pub fn parse_create_program(&self, response: HttpResponse) -> Result<Program, ApiError> {
        envelope::data(&response)
    }

    pub fn build_update_program(
        &self,
        id: ProgramId,
        input: &ProgramUpdate,
        token: &str,
    ) -> Result<HttpRequest, ApiError> {
        let body = to_json(input)?;
        self.authed(HttpMethod::Put, &format!("/programs/{id}"), token, Some(body))
    }

    pub fn parse_update_program(&self, response: HttpResponse) -> Result<Program, ApiError> {
        envelope::data(&response)
    }

    pub fn build_delete_program(
        &self,
        id: ProgramId,
        token: &str,
    ) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Delete, &format!("/programs/{id}"), token, None)
    }

    pub fn parse_delete_program(&self, response: HttpResponse) -> Result<(), ApiError> {
        envelope::unit(&response)
    }

    // --- enrollments ---

    pub fn build_list_enrollments(&self, token: &str) -> Result<HttpRequest, ApiError> {
        self.authed(HttpMethod::Get, "/enrollments", token, None)
    }

    pub fn parse_list_enrollments(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<Enrollment>, ApiError> {
        envelope::list(&response)
    }

    pub fn build_create_enrollment(
        &self,
        input: &NewEnrollment,
        token: &str,
    ) -> Result<HttpRequest, ApiError> {
        let body = to_json(input)?;
        self.authed(HttpMethod::Post, "/enrollments", token, Some(body))
    }

    pub fn parse_create_enrollment(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<Enrollment>, ApiError> {
        envelope::list(&response)
    }

    pub fn build_delete_enrollment(
        &self,
        client_id: ClientId,
        program_id: ProgramId,
        token: &str,
    ) -> Result<HttpRequest, ApiError> {
        self.authed(
            HttpMethod::Delete,
            &format!("/enrollments/{client_id}/{program_id}"),
            token,
            None,
        )
    }

    /// Same remote operation as [`AfyaClient::build_delete_enrollment`].
    pub fn build_unenroll_client(
        &self,
        client_id: ClientId,
        program_id: ProgramId,
        token: &str,
    ) -> Result<HttpRequest, ApiError> {
        self.build_delete_enrollment(client_id, program_id, token)
    }

    pub fn parse_delete_enrollment(&self, response: HttpResponse) -> Result<(), ApiError> {
        envelope::unit(&response)
    }
}

fn to_json<T: Serialize>(input: &T) -> Result<String, ApiError> {
    serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))
}
