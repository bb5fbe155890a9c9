//! API client core for the AfyaLink health records service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). A `Transport` performs the
//! round-trip; `ApiService` joins the two behind one async method per backend
//! operation.
//!
//! # Design
//! - `AfyaClient` is stateless; it holds only `base_url`.
//! - The session token is an explicit argument on every authenticated call.
//!   Storing it is the caller's business.
//! - Backend envelopes (`{data}`, `{error}`, `{message}`, top-level `{token}`)
//!   are decoded once in `envelope` into a single success/failure contract.
//! - Every failure is an `ApiError`: transport, protocol (non-2xx) or
//!   contract (unusable 2xx, missing token). Nothing is retried.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod service;
pub mod transport;
pub mod types;

pub use client::AfyaClient;
pub use config::ClientConfig;
pub use envelope::LOGIN_SUCCESS_MARKER;
pub use error::{ApiError, ErrorKind};
pub use crate::http::{HttpMethod, HttpRequest, HttpResponse};
pub use service::ApiService;
pub use transport::{Transport, UreqTransport};
pub use types::{
    Client, ClientId, ClientSearch, ClientUpdate, Credentials, Enrollment, LoginSession,
    NewClient, NewEnrollment, NewProgram, Program, ProgramId, ProgramUpdate, Signup,
    UserIdentity,
};
