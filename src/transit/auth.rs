use reqwest::StatusCode;
use url::Url;

use super::entities::{LoginFailure, LoginRequest, LoginResponse};
use super::error::{AuthError, AuthResult};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub totp_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Tokens {
        access: String,
        refresh: Option<String>,
    },
    /// The account has MFA enabled and no (or a wrong) one-time code was sent
    MfaRequired,
}

pub async fn login(api_base: &Url, credentials: &Credentials) -> AuthResult<LoginOutcome> {
    let url = api_base.join("api/auth/login/")?;
    log::debug!("Logging in as {} at {}", credentials.email, url);

    let response = reqwest::Client::new()
        .post(url)
        .json(&LoginRequest {
            email: &credentials.email,
            password: &credentials.password,
            totp_code: credentials.totp_code.as_deref(),
        })
        .send()
        .await?;

    let status = response.status();
    let data_str = response.text().await?;

    if status.is_success() {
        let LoginResponse { access, refresh } = serde_json::from_str::<LoginResponse>(&data_str)
            .map_err(|e| AuthError::Client(e.into()))?;
        return Ok(LoginOutcome::Tokens { access, refresh });
    }

    let failure = serde_json::from_str::<LoginFailure>(&data_str).unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED && failure.mfa_required {
        return Ok(LoginOutcome::MfaRequired);
    }

    Err(AuthError::Rejected(
        failure.error.unwrap_or_else(|| "Login failed".to_string()),
    ))
}
