use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::models::{Acknowledgement, ProfileUpdate, RegisterRequest, Registration, User};
use crate::error::{ExplorerError, ValidationErrors};
use crate::http::{PendingRequest, RequestPipeline};
use crate::session::{AuthSession, AuthState};
use crate::token::TokenPair;

const PASSWORD_MISMATCH: &str = "Password fields didn't match.";

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Serialize)]
struct ResetRequest<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct ResetConfirm<'a> {
    token: &'a str,
    password: &'a str,
    password2: &'a str,
}

/// Account endpoints: registration, login, profile and password reset.
#[derive(Debug, Clone)]
pub struct AuthApi {
    pipeline: Arc<RequestPipeline>,
    session: Arc<AuthSession>,
}

impl AuthApi {
    pub(crate) const fn new(pipeline: Arc<RequestPipeline>, session: Arc<AuthSession>) -> Self {
        Self { pipeline, session }
    }

    /// Creates an account. Does not sign in.
    ///
    /// # Errors
    ///
    /// Returns [`ExplorerError::Validation`] without contacting the server when
    /// the two passwords differ, or when the server rejects the form.
    pub async fn register(&self, form: &RegisterRequest) -> Result<Registration, ExplorerError> {
        if form.password != form.password2 {
            return Err(ExplorerError::Validation(ValidationErrors::single(
                "password",
                PASSWORD_MISMATCH,
            )));
        }

        let request = PendingRequest::post("/auth/register/")
            .anonymous()
            .json(form)?;
        self.pipeline.execute_checked(request).await?.json()
    }

    /// Signs in and stores the returned token pair. Returns the user when the
    /// server includes it next to the tokens.
    ///
    /// Login is sent without credentials, so a rejected password never
    /// touches an existing stored session. The session only moves to
    /// [`AuthState::Authenticated`] once the host has called
    /// [`AuthSession::start`].
    ///
    /// # Errors
    ///
    /// Returns [`ExplorerError::Validation`] for rejected credentials, or a
    /// network/storage error.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<User>, ExplorerError> {
        let request = PendingRequest::post("/auth/login/")
            .anonymous()
            .json(&Credentials { email, password })?;
        let response = self.pipeline.execute(request).await?;
        if response.status() == 401 {
            return Err(ExplorerError::Validation(ValidationErrors::single(
                "non_field_errors",
                &response.message(),
            )));
        }

        let login: LoginResponse = response.error_for_status()?.json()?;
        self.pipeline
            .tokens()
            .save(&TokenPair::new(login.access, login.refresh))?;
        self.session.logged_in()?;
        match &login.user {
            Some(user) => log::info!("signed in as user {}", user.id),
            None => log::info!("signed in"),
        }
        Ok(login.user)
    }

    /// Registers, then signs in with the same credentials.
    ///
    /// # Errors
    ///
    /// See [`Self::register`] and [`Self::login`].
    pub async fn register_and_login(&self, form: &RegisterRequest) -> Result<User, ExplorerError> {
        let registration = self.register(form).await?;
        let user = self.login(&form.email, &form.password).await?;
        Ok(user.unwrap_or(registration.user))
    }

    /// Forgets the stored tokens. No server call is made.
    ///
    /// # Errors
    ///
    /// Returns an error if the token store cannot be cleared.
    pub fn logout(&self) -> Result<AuthState, ExplorerError> {
        self.pipeline.tokens().clear()?;
        Ok(self.session.logged_out())
    }

    /// The signed-in user.
    ///
    /// # Errors
    ///
    /// Returns a network or session error.
    pub async fn profile(&self) -> Result<User, ExplorerError> {
        self.pipeline
            .execute_checked(PendingRequest::get("/auth/profile/"))
            .await?
            .json()
    }

    /// Updates the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns a validation, network or session error.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ExplorerError> {
        let request = PendingRequest::patch("/auth/profile/").json(update)?;
        self.pipeline.execute_checked(request).await?.json()
    }

    /// Asks the server to email a reset link.
    ///
    /// # Errors
    ///
    /// Returns a validation or network error.
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<Acknowledgement, ExplorerError> {
        let request = PendingRequest::post("/auth/password-reset/")
            .anonymous()
            .json(&ResetRequest { email })?;
        self.pipeline.execute_checked(request).await?.json()
    }

    /// Sets a new password with a reset token.
    ///
    /// # Errors
    ///
    /// Returns [`ExplorerError::Validation`] for an invalid or expired token.
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        password: &str,
    ) -> Result<Acknowledgement, ExplorerError> {
        let request = PendingRequest::post("/auth/password-reset-confirm/")
            .anonymous()
            .json(&ResetConfirm {
                token,
                password,
                password2: password,
            })?;
        self.pipeline.execute_checked(request).await?.json()
    }
}
