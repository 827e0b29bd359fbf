//! Request and response bodies.

use khata_core::models::auth::{Principal, User, UserType};
use khata_core::tax::aggregate::{GroupBy, LineItem};
use serde::{Deserialize, Serialize};

fn default_device() -> String {
    "web".into()
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Phone dial code such as `+91`; decides the tax jurisdiction.
    #[serde(default)]
    pub dial_code: String,
    #[serde(default = "default_device")]
    pub device_type: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default = "default_device")]
    pub device_type: String,
}

/// Returned by every call that (re)issues cookies.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user_id: String,
    pub user_type: UserType,
    pub device_type: String,
    pub current_company_id: Option<String>,
    pub token_version: i32,
}

impl From<&Principal> for SessionResponse {
    fn from(p: &Principal) -> Self {
        Self {
            user_id: p.user_id.clone(),
            user_type: p.user_type,
            device_type: p.device_type.clone(),
            current_company_id: p.current_company_id.clone(),
            token_version: p.token_version,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: User,
    pub session: SessionResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RevokeDeviceRequest {
    pub device_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct PartyDetails {
    #[serde(default)]
    pub mailing_state: String,
}

#[derive(Debug, Deserialize)]
pub struct CompanyDetails {
    #[serde(default)]
    pub state: String,
}

/// Invoice lines plus the two states that decide intra/inter-state.
#[derive(Debug, Deserialize)]
pub struct TaxSummaryRequest {
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub party_details: Option<PartyDetails>,
    #[serde(default)]
    pub company: Option<CompanyDetails>,
}

impl TaxSummaryRequest {
    pub fn party_state(&self) -> &str {
        self.party_details
            .as_ref()
            .map_or("", |p| p.mailing_state.as_str())
    }

    pub fn company_state(&self) -> &str {
        self.company.as_ref().map_or("", |c| c.state.as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TaxSummaryQuery {
    #[serde(default)]
    pub group_by: GroupBy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store_connected: bool,
}
