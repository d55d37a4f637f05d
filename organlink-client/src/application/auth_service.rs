use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::application::validation::DonorProfileForm;
use crate::data::identity::{Identity, IdentityProvider};
use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::domain::user::{UserAccount, UserDataPatch};
use crate::infrastructure::session::SessionFile;

/// Session state and account operations for the signed-in user.
pub struct AuthService<I, R>
where
    I: IdentityProvider + 'static,
    R: UserRepository + 'static,
{
    identity: Arc<I>,
    users: Arc<R>,
    session_file: Option<SessionFile>,
    user_data: watch::Sender<Option<UserAccount>>,
}

impl<I, R> AuthService<I, R>
where
    I: IdentityProvider + 'static,
    R: UserRepository + 'static,
{
    pub fn new(identity: Arc<I>, users: Arc<R>, session_file: Option<SessionFile>) -> Self {
        let (user_data, _) = watch::channel(None);
        Self {
            identity,
            users,
            session_file,
            user_data,
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity.current()
    }

    pub fn current_user(&self) -> Option<UserAccount> {
        self.user_data.borrow().clone()
    }

    /// Emits the signed-in account on every login, logout and profile change.
    pub fn observe(&self) -> watch::Receiver<Option<UserAccount>> {
        self.user_data.subscribe()
    }

    fn remember(&self, identity: &Identity) {
        if let Some(file) = &self.session_file {
            if let Err(e) = file.save(&identity.token) {
                warn!(path = %file.path().display(), "failed to persist session: {}", e);
            }
        }
    }

    fn forget(&self) {
        if let Some(file) = &self.session_file {
            if let Err(e) = file.clear() {
                warn!(path = %file.path().display(), "failed to clear session: {}", e);
            }
        }
    }

    /// Picks up a session persisted by an earlier run. A stale or invalid
    /// token is discarded and the service stays signed out.
    pub async fn restore(&self) -> Result<Option<UserAccount>, DomainError> {
        let Some(file) = &self.session_file else {
            return Ok(None);
        };
        let token = file
            .load()
            .map_err(|e| DomainError::Internal(format!("failed to read session: {e}")))?;
        let Some(token) = token else {
            return Ok(None);
        };

        let identity = match self.identity.restore(&token).await {
            Ok(identity) => identity,
            Err(e) => {
                warn!("discarding persisted session: {}", e);
                self.forget();
                return Ok(None);
            }
        };

        let account = self.users.find_by_id(&identity.uid).await?;
        self.user_data.send_replace(account.clone());
        Ok(account)
    }

    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<UserAccount, DomainError> {
        let identity = self.identity.create_user(email, password).await?;
        let account = UserAccount::new(
            identity.uid.clone(),
            identity.email.clone(),
            full_name.trim().to_string(),
        );
        let account = self.users.create(account).await?;

        self.remember(&identity);
        self.user_data.send_replace(Some(account.clone()));
        info!(user_id = %account.id, "user registered");
        Ok(account)
    }

    /// Signs in and loads the account document. The account is `None` when
    /// the identity exists but its document does not.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<UserAccount>, DomainError> {
        let identity = self.identity.sign_in(email, password).await?;
        let account = self.users.find_by_id(&identity.uid).await?;

        self.remember(&identity);
        self.user_data.send_replace(account.clone());
        info!(user_id = %identity.uid, "user logged in");
        Ok(account)
    }

    pub async fn logout(&self) -> Result<(), DomainError> {
        self.identity.sign_out().await?;
        self.forget();
        self.user_data.send_replace(None);
        Ok(())
    }

    /// Merge-sets fields on the signed-in user's account and returns the
    /// stored result.
    #[instrument(skip(self))]
    pub async fn update_user_data(&self, patch: UserDataPatch) -> Result<UserAccount, DomainError> {
        let identity = self.identity.current().ok_or(DomainError::NotSignedIn)?;
        let account = self
            .users
            .merge_user_data(&identity.uid, &identity.email, &patch)
            .await?;
        self.user_data.send_replace(Some(account.clone()));
        Ok(account)
    }

    /// Turns the signed-in user into a donor: account fields first, then the
    /// donor fields with the donation count reset.
    #[instrument(skip(self, form))]
    pub async fn become_donor(&self, form: &DonorProfileForm) -> Result<UserAccount, DomainError> {
        form.validate()?;
        let account = self.update_user_data(form.account_patch()).await?;
        self.users.update_donor(&account.id, &form.donor_patch()).await?;
        info!(user_id = %account.id, "donor profile saved");
        Ok(account)
    }
}
