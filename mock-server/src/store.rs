//! In-memory data store behind the mock AfyaLink backend.
//!
//! All validation and relational rules live here so they can be tested
//! without HTTP; handlers only translate between JSON and these calls.

use std::collections::{BTreeMap, HashMap};

use axum::http::StatusCode;
use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

pub type Id = u64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("client_id and program_ids are required")]
    MissingEnrollmentFields,
    #[error("Invalid date format. Use YYYY-MM-DD")]
    InvalidDate,
    #[error("duration must be a positive whole number")]
    InvalidDuration,
    #[error("Username already exists")]
    DuplicateUsername,
    #[error("Email already exists")]
    DuplicateEmail,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Client not found")]
    ClientNotFound,
    #[error("Program not found")]
    ProgramNotFound,
    #[error("Program with ID {0} not found")]
    EnrollmentProgramNotFound(Id),
    #[error("Program with this name already exists")]
    DuplicateProgram,
    #[error("Client is already enrolled in one or more of these programs")]
    AlreadyEnrolled,
    #[error("Enrollment not found")]
    EnrollmentNotFound,
}

impl StoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            StoreError::MissingField(_)
            | StoreError::MissingEnrollmentFields
            | StoreError::InvalidDate
            | StoreError::InvalidDuration
            | StoreError::DuplicateUsername
            | StoreError::DuplicateEmail => StatusCode::BAD_REQUEST,
            StoreError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            StoreError::ClientNotFound
            | StoreError::ProgramNotFound
            | StoreError::EnrollmentProgramNotFound(_)
            | StoreError::EnrollmentNotFound => StatusCode::NOT_FOUND,
            StoreError::DuplicateProgram | StoreError::AlreadyEnrolled => StatusCode::CONFLICT,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DoctorProfile {
    pub username: String,
    pub email: String,
    pub role: String,
}

#[derive(Clone, Debug)]
struct DoctorRecord {
    profile: DoctorProfile,
    salt: String,
    password_hash: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Client {
    pub id: Id,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: String,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub programs: Vec<Program>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Program {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Enrollment {
    pub id: Id,
    pub client_id: Id,
    pub program_id: Id,
    pub enrollment_date: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClientPage {
    pub items: Vec<Client>,
    pub total: usize,
    pub pages: usize,
    pub current_page: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct SignupInput {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginInput {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Client fields for both create and update; create enforces the required ones.
#[derive(Debug, Default, Deserialize)]
pub struct ClientInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProgramInput {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub duration: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EnrollmentInput {
    pub client_id: Option<Id>,
    pub program_ids: Option<Vec<Id>>,
}

#[derive(Debug, Default)]
pub struct Store {
    doctors: BTreeMap<Id, DoctorRecord>,
    sessions: HashMap<String, Id>,
    clients: BTreeMap<Id, Client>,
    programs: BTreeMap<Id, Program>,
    enrollments: Vec<Enrollment>,
    last_doctor_id: Id,
    last_client_id: Id,
    last_program_id: Id,
    last_enrollment_id: Id,
}

fn next_id(counter: &mut Id) -> Id {
    *counter += 1;
    *counter
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn required(value: Option<String>, field: &'static str) -> StoreResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(StoreError::MissingField(field))
}

fn valid_date(value: String) -> StoreResult<String> {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .map(|date| date.format("%Y-%m-%d").to_string())
        .map_err(|_| StoreError::InvalidDate)
}

fn duration(value: Option<Value>) -> StoreResult<Option<u32>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| StoreError::InvalidDuration),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or(StoreError::InvalidDuration),
        Some(_) => Err(StoreError::InvalidDuration),
    }
}

impl Store {
    // --- doctors ---

    pub fn signup(&mut self, input: SignupInput) -> StoreResult<DoctorProfile> {
        let username = required(input.username, "username")?;
        let password = input
            .password
            .filter(|p| !p.is_empty())
            .ok_or(StoreError::MissingField("password"))?;
        let email = required(input.email, "email")?;
        let role = input
            .role
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "doctor".to_string());

        if self.doctors.values().any(|d| d.profile.username == username) {
            return Err(StoreError::DuplicateUsername);
        }
        if self.doctors.values().any(|d| d.profile.email == email) {
            return Err(StoreError::DuplicateEmail);
        }

        let salt = Uuid::new_v4().simple().to_string();
        let record = DoctorRecord {
            password_hash: hash_password(&salt, &password),
            salt,
            profile: DoctorProfile {
                username,
                email,
                role,
            },
        };
        let profile = record.profile.clone();
        let id = next_id(&mut self.last_doctor_id);
        self.doctors.insert(id, record);
        Ok(profile)
    }

    /// Verify credentials and issue a fresh session token.
    pub fn login(&mut self, input: LoginInput) -> StoreResult<(String, DoctorProfile)> {
        let username = required(input.username, "username")?;
        let password = input
            .password
            .filter(|p| !p.is_empty())
            .ok_or(StoreError::MissingField("password"))?;

        let (id, record) = self
            .doctors
            .iter()
            .find(|(_, d)| d.profile.username == username)
            .ok_or(StoreError::InvalidCredentials)?;
        if hash_password(&record.salt, &password) != record.password_hash {
            return Err(StoreError::InvalidCredentials);
        }

        let token = Uuid::new_v4().simple().to_string();
        let profile = record.profile.clone();
        self.sessions.insert(token.clone(), *id);
        Ok((token, profile))
    }

    pub fn logout(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    pub fn doctor_for_token(&self, token: &str) -> Option<&DoctorProfile> {
        let id = self.sessions.get(token)?;
        self.doctors.get(id).map(|d| &d.profile)
    }

    // --- clients ---

    pub fn list_clients(&self) -> Vec<Client> {
        self.clients.values().cloned().collect()
    }

    /// Case-insensitive substring match on first or last name, 1-based pages.
    pub fn search_clients(&self, query: &str, page: u32, per_page: u32) -> ClientPage {
        let needle = query.trim().to_lowercase();
        let matches: Vec<&Client> = self
            .clients
            .values()
            .filter(|c| {
                c.first_name.to_lowercase().contains(&needle)
                    || c.last_name.to_lowercase().contains(&needle)
            })
            .collect();

        let page = page.max(1);
        let per_page = per_page.max(1) as usize;
        let total = matches.len();
        let items = matches
            .into_iter()
            .skip((page as usize - 1) * per_page)
            .take(per_page)
            .cloned()
            .collect();
        ClientPage {
            items,
            total,
            pages: total.div_ceil(per_page),
            current_page: page,
        }
    }

    /// Client profile including the programs it is enrolled in.
    pub fn get_client(&self, id: Id) -> StoreResult<Client> {
        let mut client = self.clients.get(&id).cloned().ok_or(StoreError::ClientNotFound)?;
        client.programs = self
            .enrollments
            .iter()
            .filter(|e| e.client_id == id)
            .filter_map(|e| self.programs.get(&e.program_id).cloned())
            .collect();
        Ok(client)
    }

    pub fn create_client(&mut self, input: ClientInput) -> StoreResult<Client> {
        let first_name = required(input.first_name, "first_name")?;
        let last_name = required(input.last_name, "last_name")?;
        let date_of_birth = valid_date(required(input.date_of_birth, "date_of_birth")?)?;
        let gender = required(input.gender, "gender")?;

        let client = Client {
            id: next_id(&mut self.last_client_id),
            first_name,
            last_name,
            date_of_birth,
            gender,
            contact_number: input.contact_number,
            email: input.email,
            address: input.address,
            created_at: now(),
            programs: Vec::new(),
        };
        self.clients.insert(client.id, client.clone());
        Ok(client)
    }

    /// Apply the fields present in `input`; omitted fields stay unchanged.
    pub fn update_client(&mut self, id: Id, input: ClientInput) -> StoreResult<Client> {
        let date_of_birth = input.date_of_birth.map(valid_date).transpose()?;
        let client = self.clients.get_mut(&id).ok_or(StoreError::ClientNotFound)?;
        if let Some(first_name) = input.first_name {
            client.first_name = first_name;
        }
        if let Some(last_name) = input.last_name {
            client.last_name = last_name;
        }
        if let Some(date_of_birth) = date_of_birth {
            client.date_of_birth = date_of_birth;
        }
        if let Some(gender) = input.gender {
            client.gender = gender;
        }
        if input.contact_number.is_some() {
            client.contact_number = input.contact_number;
        }
        if input.email.is_some() {
            client.email = input.email;
        }
        if input.address.is_some() {
            client.address = input.address;
        }
        Ok(client.clone())
    }

    /// Remove a client together with its enrollments.
    pub fn delete_client(&mut self, id: Id) -> StoreResult<()> {
        self.clients.remove(&id).ok_or(StoreError::ClientNotFound)?;
        self.enrollments.retain(|e| e.client_id != id);
        Ok(())
    }

    // --- programs ---

    pub fn list_programs(&self) -> Vec<Program> {
        self.programs.values().cloned().collect()
    }

    pub fn get_program(&self, id: Id) -> StoreResult<Program> {
        self.programs.get(&id).cloned().ok_or(StoreError::ProgramNotFound)
    }

    fn name_taken(&self, name: &str, except: Option<Id>) -> bool {
        self.programs
            .values()
            .any(|p| p.name == name && Some(p.id) != except)
    }

    pub fn create_program(&mut self, input: ProgramInput) -> StoreResult<Program> {
        let name = required(input.name, "name")?;
        let duration = duration(input.duration)?;
        if self.name_taken(&name, None) {
            return Err(StoreError::DuplicateProgram);
        }
        let program = Program {
            id: next_id(&mut self.last_program_id),
            name,
            description: input.description.unwrap_or_default(),
            duration,
            created_at: now(),
        };
        self.programs.insert(program.id, program.clone());
        Ok(program)
    }

    pub fn update_program(&mut self, id: Id, input: ProgramInput) -> StoreResult<Program> {
        if !self.programs.contains_key(&id) {
            return Err(StoreError::ProgramNotFound);
        }
        let name = input.name.map(|n| required(Some(n), "name")).transpose()?;
        let duration = match input.duration {
            Some(value) => Some(duration(Some(value))?),
            None => None,
        };
        if let Some(name) = &name {
            if self.name_taken(name, Some(id)) {
                return Err(StoreError::DuplicateProgram);
            }
        }

        let program = self.programs.get_mut(&id).ok_or(StoreError::ProgramNotFound)?;
        if let Some(name) = name {
            program.name = name;
        }
        if let Some(description) = input.description {
            program.description = description;
        }
        if let Some(duration) = duration {
            program.duration = duration;
        }
        Ok(program.clone())
    }

    /// Remove a program together with its enrollments.
    pub fn delete_program(&mut self, id: Id) -> StoreResult<()> {
        self.programs.remove(&id).ok_or(StoreError::ProgramNotFound)?;
        self.enrollments.retain(|e| e.program_id != id);
        Ok(())
    }

    // --- enrollments ---

    pub fn list_enrollments(&self) -> Vec<Enrollment> {
        self.enrollments.clone()
    }

    /// Enroll a client in every listed program, or in none of them.
    pub fn enroll(&mut self, input: EnrollmentInput) -> StoreResult<Vec<Enrollment>> {
        let (Some(client_id), Some(program_ids)) = (input.client_id, input.program_ids) else {
            return Err(StoreError::MissingEnrollmentFields);
        };
        if !self.clients.contains_key(&client_id) {
            return Err(StoreError::ClientNotFound);
        }
        for (i, program_id) in program_ids.iter().enumerate() {
            if !self.programs.contains_key(program_id) {
                return Err(StoreError::EnrollmentProgramNotFound(*program_id));
            }
            let enrolled = self
                .enrollments
                .iter()
                .any(|e| e.client_id == client_id && e.program_id == *program_id);
            if enrolled || program_ids[..i].contains(program_id) {
                return Err(StoreError::AlreadyEnrolled);
            }
        }

        let enrollment_date = now();
        let created: Vec<Enrollment> = program_ids
            .into_iter()
            .map(|program_id| Enrollment {
                id: next_id(&mut self.last_enrollment_id),
                client_id,
                program_id,
                enrollment_date: enrollment_date.clone(),
                status: "active".to_string(),
            })
            .collect();
        self.enrollments.extend(created.iter().cloned());
        Ok(created)
    }

    pub fn unenroll(&mut self, client_id: Id, program_id: Id) -> StoreResult<()> {
        let before = self.enrollments.len();
        self.enrollments
            .retain(|e| !(e.client_id == client_id && e.program_id == program_id));
        if self.enrollments.len() == before {
            return Err(StoreError::EnrollmentNotFound);
        }
        Ok(())
    }

    /// Preload a demo doctor (`doc1` / `password123`) and two programs.
    pub fn seed_demo(&mut self) -> StoreResult<()> {
        self.signup(SignupInput {
            username: Some("doc1".to_string()),
            password: Some("password123".to_string()),
            email: Some("doc1@afyalink.test".to_string()),
            role: None,
        })?;
        for (name, description, months) in [
            ("HIV Care", "Antiretroviral therapy follow-up", 12),
            ("Maternal Health", "Antenatal and postnatal visits", 9),
        ] {
            self.create_program(ProgramInput {
                name: Some(name.to_string()),
                description: Some(description.to_string()),
                duration: Some(Value::from(months)),
            })?;
        }
        Ok(())
    }
}
