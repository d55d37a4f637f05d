use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::data::document_store::{DocumentStore, StoreError, to_document_data};
use crate::infrastructure::security::{JwtKeys, hash_password, verify_password};

const CREDENTIALS: &str = "credentials";
const MIN_PASSWORD_LEN: usize = 6;

/// Opaque handle for a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("email already in use: {0}")]
    EmailAlreadyInUse(String),
    #[error("invalid email: {0}")]
    InvalidEmail(String),
    #[error("password should be at least 6 characters")]
    WeakPassword,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("session expired or invalid")]
    InvalidSession,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("identity provider error: {0}")]
    Internal(String),
}

/// User accounts and sessions.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_user(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;
    async fn sign_out(&self) -> Result<(), IdentityError>;
    /// Re-establishes a session from a previously issued token.
    async fn restore(&self, token: &str) -> Result<Identity, IdentityError>;
    fn current(&self) -> Option<Identity>;
    /// Emits on every sign-in and sign-out.
    fn observe(&self) -> watch::Receiver<Option<Identity>>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Credential {
    uid: String,
    email: String,
    password_hash: String,
}

/// Identity provider backed by a `credentials` collection of a document
/// store. Stands in for the managed service in local runs and tests.
pub struct LocalIdentityProvider<S: DocumentStore + 'static> {
    store: Arc<S>,
    keys: JwtKeys,
    session: watch::Sender<Option<Identity>>,
}

impl<S> LocalIdentityProvider<S>
where
    S: DocumentStore + 'static,
{
    pub fn new(store: Arc<S>, keys: JwtKeys) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            store,
            keys,
            session,
        }
    }

    fn issue(&self, uid: String, email: String) -> Result<Identity, IdentityError> {
        let token = self
            .keys
            .generate_token(&uid, &email)
            .map_err(|e| IdentityError::Internal(e.to_string()))?;
        let identity = Identity { uid, email, token };
        self.session.send_replace(Some(identity.clone()));
        Ok(identity)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl<S> IdentityProvider for LocalIdentityProvider<S>
where
    S: DocumentStore + 'static,
{
    #[instrument(skip(self, password))]
    async fn create_user(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(IdentityError::InvalidEmail(email));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword);
        }
        let credential = Credential {
            uid: Uuid::new_v4().simple().to_string(),
            email: email.clone(),
            password_hash: hash_password(password)
                .map_err(|e| IdentityError::Internal(e.to_string()))?,
        };
        self.store
            .create(CREDENTIALS, &email, to_document_data(&credential)?)
            .await
            .map_err(|e| match e {
                StoreError::AlreadyExists { .. } => IdentityError::EmailAlreadyInUse(email.clone()),
                other => IdentityError::from(other),
            })?;

        info!(uid = %credential.uid, email = %email, "identity created");
        self.issue(credential.uid, credential.email)
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let email = normalize_email(email);
        let credential: Credential = self
            .store
            .get(CREDENTIALS, &email)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?
            .decode()?;

        let valid = verify_password(password, &credential.password_hash)
            .map_err(|_| IdentityError::InvalidCredentials)?;
        if !valid {
            warn!(email = %email, "rejected sign-in");
            return Err(IdentityError::InvalidCredentials);
        }

        info!(uid = %credential.uid, "signed in");
        self.issue(credential.uid, credential.email)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        if let Some(identity) = self.session.send_replace(None) {
            info!(uid = %identity.uid, "signed out");
        }
        Ok(())
    }

    async fn restore(&self, token: &str) -> Result<Identity, IdentityError> {
        let claims = self
            .keys
            .verify_token(token)
            .map_err(|_| IdentityError::InvalidSession)?;
        if self.store.get(CREDENTIALS, &claims.email).await?.is_none() {
            return Err(IdentityError::InvalidSession);
        }

        let identity = Identity {
            uid: claims.sub,
            email: claims.email,
            token: token.to_string(),
        };
        self.session.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    fn current(&self) -> Option<Identity> {
        self.session.borrow().clone()
    }

    fn observe(&self) -> watch::Receiver<Option<Identity>> {
        self.session.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory_store::InMemoryDocumentStore;
    use chrono::Duration;
    use rstest::{fixture, rstest};

    #[fixture]
    fn provider() -> LocalIdentityProvider<InMemoryDocumentStore> {
        LocalIdentityProvider::new(
            Arc::new(InMemoryDocumentStore::new()),
            JwtKeys::new("test-secret".into(), Duration::hours(1)),
        )
    }

    #[rstest]
    #[tokio::test]
    async fn create_user_signs_in_and_notifies_observers(
        provider: LocalIdentityProvider<InMemoryDocumentStore>,
    ) {
        let mut observer = provider.observe();
        let identity = provider
            .create_user("Ana@Example.com", "secret1")
            .await
            .unwrap();

        assert_eq!(identity.email, "ana@example.com");
        assert!(observer.has_changed().unwrap());
        assert_eq!(observer.borrow_and_update().as_ref(), Some(&identity));
        assert_eq!(provider.current(), Some(identity));
    }

    #[rstest]
    #[case("no-at-sign", "secret1")]
    #[case("ana@example.com", "12345")]
    #[tokio::test]
    async fn create_user_rejects_bad_input(
        provider: LocalIdentityProvider<InMemoryDocumentStore>,
        #[case] email: &str,
        #[case] password: &str,
    ) {
        let err = provider.create_user(email, password).await.unwrap_err();
        assert!(matches!(
            err,
            IdentityError::InvalidEmail(_) | IdentityError::WeakPassword
        ));
        assert!(provider.current().is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_email_is_rejected(provider: LocalIdentityProvider<InMemoryDocumentStore>) {
        provider.create_user("ana@example.com", "secret1").await.unwrap();
        let err = provider
            .create_user("ANA@example.com", "secret2")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::EmailAlreadyInUse(_)));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn racing_registrations_keep_the_first_credential(
        provider: LocalIdentityProvider<InMemoryDocumentStore>,
    ) {
        let provider = Arc::new(provider);
        let attempts: Vec<_> = ["secret-a", "secret-b"]
            .into_iter()
            .map(|password| {
                let provider = Arc::clone(&provider);
                tokio::spawn(async move {
                    provider
                        .create_user("ana@example.com", password)
                        .await
                        .map(|identity| (identity, password))
                })
            })
            .collect();

        let mut winners = Vec::new();
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(won) => winners.push(won),
                Err(err) => assert!(matches!(err, IdentityError::EmailAlreadyInUse(_))),
            }
        }
        assert_eq!(winners.len(), 1);

        let (identity, password) = winners.remove(0);
        let signed_in = provider.sign_in("ana@example.com", password).await.unwrap();
        assert_eq!(signed_in.uid, identity.uid);
    }

    #[rstest]
    #[tokio::test]
    async fn sign_in_checks_password(provider: LocalIdentityProvider<InMemoryDocumentStore>) {
        let created = provider.create_user("ana@example.com", "secret1").await.unwrap();
        provider.sign_out().await.unwrap();
        assert!(provider.current().is_none());

        let err = provider.sign_in("ana@example.com", "wrong!").await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials));

        let identity = provider.sign_in("ana@example.com", "secret1").await.unwrap();
        assert_eq!(identity.uid, created.uid);
    }

    #[rstest]
    #[tokio::test]
    async fn restore_accepts_issued_token_only(
        provider: LocalIdentityProvider<InMemoryDocumentStore>,
    ) {
        let created = provider.create_user("ana@example.com", "secret1").await.unwrap();
        provider.sign_out().await.unwrap();

        let restored = provider.restore(&created.token).await.unwrap();
        assert_eq!(restored.uid, created.uid);

        let err = provider.restore("garbage").await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidSession));
    }
}
