use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use sikap_data_management::DataManager;

use crate::SikapError;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn is_signed_in(&self) -> bool;

    fn username(&self) -> Option<String>;

    /// Runs the sign in flow and returns the signed in username.
    async fn present_sign_in(&self) -> Result<String, SikapError>;
}

/// An identity with a fixed user, for the command line and tests.
pub struct StaticIdentity {
    current: RwLock<Option<String>>,
    on_sign_in: Option<String>,
}

impl StaticIdentity {
    pub fn signed_in(username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            current: RwLock::new(Some(username.clone())),
            on_sign_in: Some(username),
        }
    }

    /// Not signed in yet, signing in succeeds as `username`.
    pub fn awaiting(username: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(None),
            on_sign_in: Some(username.into()),
        }
    }

    /// Signing in always fails.
    pub fn anonymous() -> Self {
        Self {
            current: RwLock::new(None),
            on_sign_in: None,
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    fn is_signed_in(&self) -> bool {
        self.username().is_some()
    }

    fn username(&self) -> Option<String> {
        self.current.read().ok().and_then(|current| current.clone())
    }

    async fn present_sign_in(&self) -> Result<String, SikapError> {
        let Some(username) = self.on_sign_in.clone() else {
            return Err(SikapError::SignIn("Sign in was cancelled".into()));
        };

        let mut current = self.current.write()
            .map_err(|_| SikapError::SignIn("Identity state is poisoned".into()))?;
        *current = Some(username.clone());
        Ok(username)
    }
}

/// Who is using the app and where their data goes. Built once at startup and
/// handed to the app.
#[derive(Clone)]
pub struct SessionContext {
    identity: Arc<dyn IdentityProvider>,
    data_manager: DataManager,
}

impl SessionContext {
    pub fn new(identity: Arc<dyn IdentityProvider>, data_manager: DataManager) -> Self {
        Self { identity, data_manager }
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    pub fn data_manager(&self) -> &DataManager {
        &self.data_manager
    }

    pub fn username(&self) -> Result<String, SikapError> {
        self.identity.username().ok_or(SikapError::NotSignedIn)
    }

    /// Returns the current user, asking them to sign in when there is none.
    pub async fn ensure_signed_in(&self) -> Result<String, SikapError> {
        match self.identity.username() {
            Some(username) => Ok(username),
            None => self.identity.present_sign_in().await,
        }
    }
}
