//! Async facade joining `AfyaClient` and a `Transport`.
//!
//! # Design
//! Each method builds its request, hands the blocking round-trip to tokio's
//! blocking pool and parses the response, so a caller can `join!` several
//! operations without any of them blocking the others. The service shares no
//! mutable state between calls; cloning it is cheap. Methods must be awaited
//! inside a tokio runtime.

use std::sync::Arc;

use crate::client::AfyaClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    Client, ClientId, ClientSearch, ClientUpdate, Credentials, Enrollment, LoginSession,
    NewClient, NewEnrollment, NewProgram, Program, ProgramId, ProgramUpdate, Signup,
    UserIdentity,
};

pub struct ApiService<T> {
    client: AfyaClient,
    transport: Arc<T>,
}

impl<T> Clone for ApiService<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl ApiService<UreqTransport> {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(AfyaClient::new(&config.base_url), UreqTransport::new(config))
    }
}

impl<T: Transport + 'static> ApiService<T> {
    pub fn new(client: AfyaClient, transport: T) -> Self {
        Self {
            client,
            transport: Arc::new(transport),
        }
    }

    pub fn client(&self) -> &AfyaClient {
        &self.client
    }

    async fn send<R>(
        &self,
        request: Result<HttpRequest, ApiError>,
        parse: impl FnOnce(&AfyaClient, HttpResponse) -> Result<R, ApiError>,
    ) -> Result<R, ApiError> {
        let request = request?;
        let transport = Arc::clone(&self.transport);
        let response = tokio::task::spawn_blocking(move || transport.execute(&request))
            .await
            .map_err(|e| ApiError::Transport {
                message: format!("Request task failed: {e}"),
                timed_out: false,
            })??;
        parse(&self.client, response)
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<LoginSession, ApiError> {
        self.send(self.client.build_login(credentials), AfyaClient::parse_login)
            .await
    }

    pub async fn signup(&self, input: &Signup) -> Result<UserIdentity, ApiError> {
        self.send(self.client.build_signup(input), AfyaClient::parse_signup)
            .await
    }

    pub async fn logout(&self, token: &str) -> Result<(), ApiError> {
        self.send(self.client.build_logout(token), AfyaClient::parse_logout)
            .await
    }

    pub async fn get_clients(&self, token: &str) -> Result<Vec<Client>, ApiError> {
        self.send(
            self.client.build_list_clients(token),
            AfyaClient::parse_list_clients,
        )
        .await
    }

    pub async fn search_clients(
        &self,
        search: &ClientSearch,
        token: &str,
    ) -> Result<Vec<Client>, ApiError> {
        self.send(
            self.client.build_search_clients(search, token),
            AfyaClient::parse_search_clients,
        )
        .await
    }

    pub async fn get_client_by_id(&self, id: ClientId, token: &str) -> Result<Client, ApiError> {
        self.send(
            self.client.build_get_client(id, token),
            AfyaClient::parse_get_client,
        )
        .await
    }

    pub async fn create_client(&self, input: &NewClient, token: &str) -> Result<Client, ApiError> {
        self.send(
            self.client.build_create_client(input, token),
            AfyaClient::parse_create_client,
        )
        .await
    }

    pub async fn update_client(
        &self,
        id: ClientId,
        input: &ClientUpdate,
        token: &str,
    ) -> Result<Client, ApiError> {
        self.send(
            self.client.build_update_client(id, input, token),
            AfyaClient::parse_update_client,
        )
        .await
    }

    pub async fn delete_client(&self, id: ClientId, token: &str) -> Result<(), ApiError> {
        self.send(
            self.client.build_delete_client(id, token),
            AfyaClient::parse_delete_client,
        )
        .await
    }

    pub async fn get_programs(&self, token: &str) -> Result<Vec<Program>, ApiError> {
        self.send(
            self.client.build_list_programs(token),
            AfyaClient::parse_list_programs,
        )
        .await
    }

    pub async fn get_program_by_id(
        &self,
        id: ProgramId,
        token: &str,
    ) -> Result<Program, ApiError> {
        self.send(
            self.client.build_get_program(id, token),
            AfyaClient::parse_get_program,
        )
        .await
    }

    pub async fn create_program(
        &self,
        input: &NewProgram,
        token: &str,
    ) -> Result<Program, ApiError> {
        self.send(
            self.client.build_create_program(input, token),
            AfyaClient::parse_create_program,
        )
        .await
    }

    pub async fn update_program(
        &self,
        id: ProgramId,
        input: &ProgramUpdate,
        token: &str,
    ) -> Result<Program, ApiError> {
        self.send(
            self.client.build_update_program(id, input, token),
            AfyaClient::parse_update_program,
        )
        .await
    }

    pub async fn delete_program(&self, id: ProgramId, token: &str) -> Result<(), ApiError> {
        self.send(
            self.client.build_delete_program(id, token),
            AfyaClient::parse_delete_program,
        )
        .await
    }

    pub async fn get_enrollments(&self, token: &str) -> Result<Vec<Enrollment>, ApiError> {
        self.send(
            self.client.build_list_enrollments(token),
            AfyaClient::parse_list_enrollments,
        )
        .await
    }

    pub async fn create_enrollment(
        &self,
        input: &NewEnrollment,
        token: &str,
    ) -> Result<Vec<Enrollment>, ApiError> {
        self.send(
            self.client.build_create_enrollment(input, token),
            AfyaClient::parse_create_enrollment,
        )
        .await
    }

    pub async fn delete_enrollment(
        &self,
        client_id: ClientId,
        program_id: ProgramId,
        token: &str,
    ) -> Result<(), ApiError> {
        self.send(
            self.client.build_delete_enrollment(client_id, program_id, token),
            AfyaClient::parse_delete_enrollment,
        )
        .await
    }

    /// Alias of [`ApiService::delete_enrollment`].
    pub async fn unenroll_client(
        &self,
        client_id: ClientId,
        program_id: ProgramId,
        token: &str,
    ) -> Result<(), ApiError> {
        self.delete_enrollment(client_id, program_id, token).await
    }
}
