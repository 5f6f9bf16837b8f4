use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::session::errors::IdentityError;
use crate::session::errors::SessionError;
use crate::session::models::AuthSession;
use crate::session::models::IdentitySession;
use crate::session::models::IdentityUser;
use crate::session::models::RegisterCommand;
use crate::session::models::SessionUser;
use crate::session::ports::IdentityProvider;
use crate::session::ports::SessionEngine;
use crate::user::models::EmailAddress;
use crate::user::models::EmailDomainPolicy;
use crate::user::models::Role;
use crate::user::models::User;
use crate::user::models::UserId;
use crate::user::ports::RoleStore;
use crate::user::ports::UserStore;

/// Settings for the delegated session engine.
#[derive(Debug, Clone)]
pub struct DelegatedSessionSettings {
    pub eligibility: EmailDomainPolicy,
    /// Environment-dependent target the provider redirects to after a
    /// password reset
    pub reset_redirect_url: String,
}

/// Session engine variant delegating credentials and token issuance to an
/// external identity provider.
///
/// The provider is the system of record; this engine keeps the local user
/// table synchronized with it and never touches a local token table.
pub struct DelegatedSessionEngine<IP, US, RS>
where
    IP: IdentityProvider,
    US: UserStore,
    RS: RoleStore,
{
    identity: Arc<IP>,
    users: Arc<US>,
    roles: Arc<RS>,
    settings: DelegatedSessionSettings,
}

impl<IP, US, RS> DelegatedSessionEngine<IP, US, RS>
where
    IP: IdentityProvider,
    US: UserStore,
    RS: RoleStore,
{
    /// Create a new delegated session engine with injected collaborators.
    pub fn new(
        identity: Arc<IP>,
        users: Arc<US>,
        roles: Arc<RS>,
        settings: DelegatedSessionSettings,
    ) -> Self {
        Self {
            identity,
            users,
            roles,
            settings,
        }
    }

    fn assemble(session: IdentitySession, user: SessionUser) -> AuthSession {
        AuthSession {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            expires_in: session.expires_in,
            user,
        }
    }

    /// Best-effort role resolution for response payloads.
    ///
    /// A lookup failure omits the role rather than failing an otherwise
    /// valid session, and never swaps in a different one.
    async fn resolve_role(&self, user: &User) -> Option<Role> {
        let role_id = user.role_id?;

        match self.roles.find_by_id(role_id).await {
            Ok(Some(role)) => Some(role),
            Ok(None) => {
                tracing::warn!("Role {} missing for user {}", role_id, user.id);
                None
            }
            Err(e) => {
                tracing::warn!("Role lookup failed for user {}: {}", user.id, e);
                None
            }
        }
    }

    /// Create the missing local row for an account the provider just
    /// authenticated (first login after external-only signup, or drift).
    async fn sync_local_user(
        &self,
        email: &EmailAddress,
        session: &IdentitySession,
    ) -> Result<User, SessionError> {
        let role_name = self
            .settings
            .eligibility
            .role_for(email)
            .ok_or_else(|| SessionError::Internal(format!("No role mapping for {}", email)))?;

        let role = self
            .roles
            .find_by_name(role_name)
            .await?
            .ok_or_else(|| SessionError::Internal(format!("Role {} not configured", role_name)))?;

        let name = session
            .user
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| email.as_str().to_string());

        let user = User {
            id: UserId::new(),
            external_id: Some(session.user.id.clone()),
            email: email.clone(),
            name,
            password_hash: None,
            role_id: Some(role.id),
            active: true,
            created_at: Utc::now(),
        };

        Ok(self.users.create(user).await?)
    }

    /// Ask the delegate to start a password-reset flow for this email.
    ///
    /// The redirect target is environment-dependent and comes from
    /// configuration.
    ///
    /// # Errors
    /// * `Internal` - Provider failure
    pub async fn request_password_reset(&self, email: &EmailAddress) -> Result<(), SessionError> {
        self.identity
            .request_password_reset(email, &self.settings.reset_redirect_url)
            .await
            .map_err(|e| SessionError::Internal(e.to_string()))
    }

    /// Administrative delete, cascading to the external provider.
    ///
    /// The provider identity goes first; a provider failure aborts the
    /// local delete so no live external identity is left unreferenced.
    ///
    /// # Errors
    /// * `UserNotFound` - No local row for this id
    /// * `Internal` - Provider or store failure
    pub async fn delete_account(&self, id: &UserId) -> Result<(), SessionError> {
        let user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| SessionError::UserNotFound(id.to_string()))?;

        if let Some(external_id) = &user.external_id {
            self.identity
                .delete_user(external_id)
                .await
                .map_err(|e| SessionError::Internal(e.to_string()))?;
        }

        Ok(self.users.delete(id).await?)
    }

    /// Validate a provider-issued access token (for inbound middleware).
    ///
    /// # Errors
    /// * `InvalidCredentials` - Token does not validate
    /// * `Internal` - Provider failure
    pub async fn authenticate_token(
        &self,
        access_token: &str,
    ) -> Result<IdentityUser, SessionError> {
        self.identity
            .verify_token(access_token)
            .await
            .map_err(|e| match e {
                IdentityError::InvalidToken | IdentityError::InvalidCredentials => {
                    SessionError::InvalidCredentials
                }
                other => SessionError::Internal(other.to_string()),
            })
    }
}

#[async_trait]
impl<IP, US, RS> SessionEngine for DelegatedSessionEngine<IP, US, RS>
where
    IP: IdentityProvider,
    US: UserStore,
    RS: RoleStore,
{
    async fn register(&self, command: RegisterCommand) -> Result<AuthSession, SessionError> {
        let RegisterCommand {
            name,
            email,
            password,
        } = command;

        let role_name = self
            .settings
            .eligibility
            .role_for(&email)
            .ok_or_else(|| SessionError::InvalidEmailDomain(email.domain().to_string()))?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(SessionError::EmailAlreadyRegistered(
                email.as_str().to_string(),
            ));
        }

        let role = self
            .roles
            .find_by_name(role_name)
            .await?
            .ok_or_else(|| SessionError::RoleNotConfigured(role_name.to_string()))?;

        let session = self
            .identity
            .register(&name, &email, &password)
            .await
            .map_err(|e| match e {
                IdentityError::EmailTaken => SessionError::EmailAlreadyRegisteredUpstream,
                other => SessionError::Internal(other.to_string()),
            })?;

        let user = User {
            id: UserId::new(),
            external_id: Some(session.user.id.clone()),
            email: email.clone(),
            name,
            password_hash: None,
            role_id: Some(role.id),
            active: true,
            created_at: Utc::now(),
        };

        let user = match self.users.upsert(user).await {
            Ok(user) => user,
            Err(e) => {
                // Compensate so no orphaned external identity remains; the
                // local failure is surfaced either way.
                if let Err(del) = self.identity.delete_user(&session.user.id).await {
                    tracing::error!(
                        "Failed to delete external identity {} after local persistence failure: {}",
                        session.user.id,
                        del
                    );
                }
                return Err(SessionError::Internal(e.to_string()));
            }
        };

        let profile = SessionUser::new(&user, Some(role));
        Ok(Self::assemble(session, profile))
    }

    async fn login(
        &self,
        email: &EmailAddress,
        password: &str,
    ) -> Result<AuthSession, SessionError> {
        // Credential checks are fully delegated; every provider-side
        // rejection reads as the same invalid-credentials response.
        let session = self
            .identity
            .login(email, password)
            .await
            .map_err(|_| SessionError::InvalidCredentials)?;

        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => self.sync_local_user(email, &session).await?,
        };

        // Tokens were already minted by the delegate call above; an
        // inactive account is blocked at usage, not issuance.
        if !user.active {
            return Err(SessionError::AccountNotActivated);
        }

        let role = self.resolve_role(&user).await;

        let profile = SessionUser::new(&user, role);
        Ok(Self::assemble(session, profile))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, SessionError> {
        // Rotation happens inside the delegate; no local token table is
        // touched.
        let session = self
            .identity
            .refresh(refresh_token)
            .await
            .map_err(|e| match e {
                IdentityError::InvalidToken => SessionError::InvalidRefreshToken,
                other => SessionError::Internal(other.to_string()),
            })?;

        // Profile enrichment is best-effort; the rotated session stands on
        // its own.
        let profile = match self.users.find_by_external_id(&session.user.id).await {
            Ok(Some(user)) => {
                let role = self.resolve_role(&user).await;
                SessionUser::new(&user, role)
            }
            Ok(None) => SessionUser {
                id: session.user.id.clone(),
                email: session.user.email.clone(),
                name: session
                    .user
                    .name
                    .clone()
                    .unwrap_or_else(|| session.user.email.clone()),
                role: None,
            },
            Err(e) => {
                tracing::warn!("Local lookup failed for external {}: {}", session.user.id, e);
                SessionUser {
                    id: session.user.id.clone(),
                    email: session.user.email.clone(),
                    name: session
                        .user
                        .name
                        .clone()
                        .unwrap_or_else(|| session.user.email.clone()),
                    role: None,
                }
            }
        };

        Ok(Self::assemble(session, profile))
    }

    async fn logout(&self, access_token: &str) -> Result<(), SessionError> {
        self.identity
            .logout(access_token)
            .await
            .map_err(|e| SessionError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use mockall::mock;
    use mockall::predicate::*;

    use super::*;
    use crate::user::errors::StoreError;
    use crate::user::models::DomainRule;
    use crate::user::models::RoleId;

    mock! {
        pub Identity {}

        #[async_trait]
        impl IdentityProvider for Identity {
            async fn register(
                &self,
                name: &str,
                email: &EmailAddress,
                password: &str,
            ) -> Result<IdentitySession, IdentityError>;
            async fn login(
                &self,
                email: &EmailAddress,
                password: &str,
            ) -> Result<IdentitySession, IdentityError>;
            async fn refresh(&self, refresh_token: &str) -> Result<IdentitySession, IdentityError>;
            async fn logout(&self, access_token: &str) -> Result<(), IdentityError>;
            async fn request_password_reset(
                &self,
                email: &EmailAddress,
                redirect_url: &str,
            ) -> Result<(), IdentityError>;
            async fn delete_user(&self, external_id: &str) -> Result<(), IdentityError>;
            async fn verify_token(&self, access_token: &str) -> Result<IdentityUser, IdentityError>;
        }
    }

    mock! {
        pub Users {}

        #[async_trait]
        impl UserStore for Users {
            async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, StoreError>;
            async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, StoreError>;
            async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, StoreError>;
            async fn create(&self, user: User) -> Result<User, StoreError>;
            async fn upsert(&self, user: User) -> Result<User, StoreError>;
            async fn update_password(
                &self,
                email: &EmailAddress,
                password_hash: &str,
            ) -> Result<bool, StoreError>;
            async fn delete(&self, id: &UserId) -> Result<(), StoreError>;
        }
    }

    mock! {
        pub Roles {}

        #[async_trait]
        impl RoleStore for Roles {
            async fn find_by_name(&self, name: &str) -> Result<Option<Role>, StoreError>;
            async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, StoreError>;
        }
    }

    fn settings() -> DelegatedSessionSettings {
        DelegatedSessionSettings {
            eligibility: EmailDomainPolicy::new(vec![DomainRule {
                suffix: "student.example.edu".to_string(),
                role: "mahasiswa".to_string(),
            }]),
            reset_redirect_url: "https://app.example.edu/reset-password".to_string(),
        }
    }

    fn engine(
        identity: MockIdentity,
        users: MockUsers,
        roles: MockRoles,
    ) -> DelegatedSessionEngine<MockIdentity, MockUsers, MockRoles> {
        DelegatedSessionEngine::new(
            Arc::new(identity),
            Arc::new(users),
            Arc::new(roles),
            settings(),
        )
    }

    fn email(raw: &str) -> EmailAddress {
        EmailAddress::new(raw.to_string()).unwrap()
    }

    fn student_email() -> EmailAddress {
        email("new@student.example.edu")
    }

    fn provider_session(name: Option<&str>) -> IdentitySession {
        IdentitySession {
            access_token: "provider-access".to_string(),
            refresh_token: "provider-refresh".to_string(),
            expires_in: 3600,
            user: IdentityUser {
                id: "ext-1".to_string(),
                email: "new@student.example.edu".to_string(),
                name: name.map(str::to_string),
            },
        }
    }

    fn mahasiswa() -> Role {
        Role {
            id: RoleId(1),
            name: "mahasiswa".to_string(),
        }
    }

    fn local_user(active: bool) -> User {
        User {
            id: UserId::new(),
            external_id: Some("ext-1".to_string()),
            email: student_email(),
            name: "Budi".to_string(),
            password_hash: None,
            role_id: Some(RoleId(1)),
            active,
            created_at: Utc::now(),
        }
    }

    fn register_command() -> RegisterCommand {
        RegisterCommand {
            name: "Budi".to_string(),
            email: student_email(),
            password: "password123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_creates_external_then_local() {
        let mut identity = MockIdentity::new();
        let mut users = MockUsers::new();
        let mut roles = MockRoles::new();

        users
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(None));

        roles
            .expect_find_by_name()
            .with(eq("mahasiswa"))
            .times(1)
            .returning(|_| Ok(Some(mahasiswa())));

        identity
            .expect_register()
            .withf(|name, email, password| {
                name == "Budi"
                    && email.as_str() == "new@student.example.edu"
                    && password == "password123"
            })
            .times(1)
            .returning(|_, _, _| Ok(provider_session(Some("Budi"))));

        users
            .expect_upsert()
            .withf(|user| {
                user.external_id.as_deref() == Some("ext-1")
                    && user.role_id == Some(RoleId(1))
                    && user.password_hash.is_none()
                    && user.active
            })
            .times(1)
            .returning(|user| Ok(user));

        let engine = engine(identity, users, roles);

        let session = engine.register(register_command()).await.unwrap();

        assert_eq!(session.access_token, "provider-access");
        assert_eq!(session.refresh_token, "provider-refresh");
        assert_eq!(session.expires_in, 3600);
        assert_eq!(session.user.role, Some(mahasiswa()));
    }

    #[tokio::test]
    async fn test_register_rejects_foreign_domain() {
        let engine = engine(MockIdentity::new(), MockUsers::new(), MockRoles::new());

        let command = RegisterCommand {
            name: "Budi".to_string(),
            email: email("someone@gmail.com"),
            password: "password123".to_string(),
        };

        let result = engine.register(command).await;
        assert!(matches!(result, Err(SessionError::InvalidEmailDomain(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_existing_local_account() {
        let mut identity = MockIdentity::new();
        let mut users = MockUsers::new();

        users
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(Some(local_user(true))));
        identity.expect_register().times(0);

        let engine = engine(identity, users, MockRoles::new());

        let result = engine.register(register_command()).await;
        assert!(matches!(
            result,
            Err(SessionError::EmailAlreadyRegistered(_))
        ));
    }

    #[tokio::test]
    async fn test_register_requires_configured_role() {
        let mut identity = MockIdentity::new();
        let mut users = MockUsers::new();
        let mut roles = MockRoles::new();

        users
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(None));
        roles
            .expect_find_by_name()
            .times(1)
            .returning(|_| Ok(None));
        identity.expect_register().times(0);

        let engine = engine(identity, users, roles);

        let result = engine.register(register_command()).await;
        assert!(matches!(result, Err(SessionError::RoleNotConfigured(_))));
    }

    #[tokio::test]
    async fn test_register_maps_upstream_duplicate() {
        let mut identity = MockIdentity::new();
        let mut users = MockUsers::new();
        let mut roles = MockRoles::new();

        users
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(None));
        roles
            .expect_find_by_name()
            .times(1)
            .returning(|_| Ok(Some(mahasiswa())));
        identity
            .expect_register()
            .times(1)
            .returning(|_, _, _| Err(IdentityError::EmailTaken));
        users.expect_upsert().times(0);

        let engine = engine(identity, users, roles);

        let result = engine.register(register_command()).await;
        assert!(matches!(
            result,
            Err(SessionError::EmailAlreadyRegisteredUpstream)
        ));
    }

    #[tokio::test]
    async fn test_register_compensates_when_local_persistence_fails() {
        let mut identity = MockIdentity::new();
        let mut users = MockUsers::new();
        let mut roles = MockRoles::new();

        users
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(None));
        roles
            .expect_find_by_name()
            .times(1)
            .returning(|_| Ok(Some(mahasiswa())));
        identity
            .expect_register()
            .times(1)
            .returning(|_, _, _| Ok(provider_session(Some("Budi"))));

        users
            .expect_upsert()
            .times(1)
            .returning(|_| Err(StoreError::Database("disk full".to_string())));

        // The just-created external identity is deleted again
        identity
            .expect_delete_user()
            .with(eq("ext-1"))
            .times(1)
            .returning(|_| Ok(()));

        let engine = engine(identity, users, roles);

        let result = engine.register(register_command()).await;
        assert!(matches!(result, Err(SessionError::Internal(_))));
    }

    #[tokio::test]
    async fn test_register_reports_local_failure_even_if_compensation_fails() {
        let mut identity = MockIdentity::new();
        let mut users = MockUsers::new();
        let mut roles = MockRoles::new();

        users
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(None));
        roles
            .expect_find_by_name()
            .times(1)
            .returning(|_| Ok(Some(mahasiswa())));
        identity
            .expect_register()
            .times(1)
            .returning(|_, _, _| Ok(provider_session(Some("Budi"))));
        users
            .expect_upsert()
            .times(1)
            .returning(|_| Err(StoreError::Database("disk full".to_string())));
        identity
            .expect_delete_user()
            .times(1)
            .returning(|_| Err(IdentityError::Provider("unreachable".to_string())));

        let engine = engine(identity, users, roles);

        let result = engine.register(register_command()).await;
        assert!(matches!(result, Err(SessionError::Internal(_))));
    }

    #[tokio::test]
    async fn test_login_returns_session_for_existing_user() {
        let mut identity = MockIdentity::new();
        let mut users = MockUsers::new();
        let mut roles = MockRoles::new();

        identity
            .expect_login()
            .times(1)
            .returning(|_, _| Ok(provider_session(Some("Budi"))));
        users
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(Some(local_user(true))));
        roles
            .expect_find_by_id()
            .with(eq(RoleId(1)))
            .times(1)
            .returning(|_| Ok(Some(mahasiswa())));

        let engine = engine(identity, users, roles);

        let session = engine
            .login(&student_email(), "password123")
            .await
            .unwrap();

        assert_eq!(session.access_token, "provider-access");
        assert_eq!(session.user.name, "Budi");
        assert_eq!(session.user.role, Some(mahasiswa()));
    }

    #[tokio::test]
    async fn test_login_maps_provider_failure_to_invalid_credentials() {
        let mut identity = MockIdentity::new();

        identity
            .expect_login()
            .times(1)
            .returning(|_, _| Err(IdentityError::Provider("bad gateway".to_string())));

        let engine = engine(identity, MockUsers::new(), MockRoles::new());

        let result = engine.login(&student_email(), "password123").await;
        assert!(matches!(result, Err(SessionError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_auto_creates_missing_local_user() {
        let mut identity = MockIdentity::new();
        let mut users = MockUsers::new();
        let mut roles = MockRoles::new();

        // Provider supplies an empty display name
        identity
            .expect_login()
            .times(1)
            .returning(|_, _| Ok(provider_session(Some(""))));
        users
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(None));
        roles
            .expect_find_by_name()
            .with(eq("mahasiswa"))
            .times(1)
            .returning(|_| Ok(Some(mahasiswa())));

        users
            .expect_create()
            .withf(|user| {
                // Name falls back to the email string
                user.name == "new@student.example.edu"
                    && user.external_id.as_deref() == Some("ext-1")
                    && user.role_id == Some(RoleId(1))
                    && user.active
            })
            .times(1)
            .returning(|user| Ok(user));

        roles
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(Some(mahasiswa())));

        let engine = engine(identity, users, roles);

        let session = engine
            .login(&student_email(), "password123")
            .await
            .unwrap();
        assert_eq!(session.user.name, "new@student.example.edu");
    }

    #[tokio::test]
    async fn test_login_auto_sync_failure_is_internal() {
        let mut identity = MockIdentity::new();
        let mut users = MockUsers::new();
        let mut roles = MockRoles::new();

        identity
            .expect_login()
            .times(1)
            .returning(|_, _| Ok(provider_session(Some("Budi"))));
        users
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(None));
        roles
            .expect_find_by_name()
            .times(1)
            .returning(|_| Ok(None));

        let engine = engine(identity, users, roles);

        let result = engine.login(&student_email(), "password123").await;
        assert!(matches!(result, Err(SessionError::Internal(_))));
    }

    #[tokio::test]
    async fn test_login_blocks_inactive_account_after_issuance() {
        let mut identity = MockIdentity::new();
        let mut users = MockUsers::new();

        // The delegate call still happens; usage is blocked, not issuance
        identity
            .expect_login()
            .times(1)
            .returning(|_, _| Ok(provider_session(Some("Budi"))));
        users
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(Some(local_user(false))));

        let engine = engine(identity, users, MockRoles::new());

        let result = engine.login(&student_email(), "password123").await;
        assert!(matches!(result, Err(SessionError::AccountNotActivated)));
    }

    #[tokio::test]
    async fn test_login_role_lookup_failure_omits_role() {
        let mut identity = MockIdentity::new();
        let mut users = MockUsers::new();
        let mut roles = MockRoles::new();

        identity
            .expect_login()
            .times(1)
            .returning(|_, _| Ok(provider_session(Some("Budi"))));
        users
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(Some(local_user(true))));
        roles
            .expect_find_by_id()
            .times(1)
            .returning(|_| Err(StoreError::Database("timeout".to_string())));

        let engine = engine(identity, users, roles);

        let session = engine
            .login(&student_email(), "password123")
            .await
            .unwrap();

        // Never a different role in its place
        assert_eq!(session.user.role, None);
    }

    #[tokio::test]
    async fn test_refresh_delegates_rotation() {
        let mut identity = MockIdentity::new();
        let mut users = MockUsers::new();
        let mut roles = MockRoles::new();

        identity
            .expect_refresh()
            .with(eq("old-refresh"))
            .times(1)
            .returning(|_| Ok(provider_session(Some("Budi"))));
        users
            .expect_find_by_external_id()
            .with(eq("ext-1"))
            .times(1)
            .returning(|_| Ok(Some(local_user(true))));
        roles
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(Some(mahasiswa())));

        let engine = engine(identity, users, roles);

        let session = engine.refresh("old-refresh").await.unwrap();
        assert_eq!(session.refresh_token, "provider-refresh");
    }

    #[tokio::test]
    async fn test_refresh_maps_invalid_token() {
        let mut identity = MockIdentity::new();

        identity
            .expect_refresh()
            .times(1)
            .returning(|_| Err(IdentityError::InvalidToken));

        let engine = engine(identity, MockUsers::new(), MockRoles::new());

        let result = engine.refresh("stale-refresh").await;
        assert!(matches!(result, Err(SessionError::InvalidRefreshToken)));
    }

    #[tokio::test]
    async fn test_refresh_without_local_row_uses_provider_profile() {
        let mut identity = MockIdentity::new();
        let mut users = MockUsers::new();

        identity
            .expect_refresh()
            .times(1)
            .returning(|_| Ok(provider_session(None)));
        users
            .expect_find_by_external_id()
            .times(1)
            .returning(|_| Ok(None));

        let engine = engine(identity, users, MockRoles::new());

        let session = engine.refresh("old-refresh").await.unwrap();
        assert_eq!(session.user.id, "ext-1");
        assert_eq!(session.user.name, "new@student.example.edu");
        assert_eq!(session.user.role, None);
    }

    #[tokio::test]
    async fn test_logout_delegates() {
        let mut identity = MockIdentity::new();

        identity
            .expect_logout()
            .with(eq("access-token"))
            .times(1)
            .returning(|_| Ok(()));

        let engine = engine(identity, MockUsers::new(), MockRoles::new());

        assert!(engine.logout("access-token").await.is_ok());
    }

    #[tokio::test]
    async fn test_request_password_reset_passes_redirect_target() {
        let mut identity = MockIdentity::new();

        identity
            .expect_request_password_reset()
            .withf(|email, redirect| {
                email.as_str() == "new@student.example.edu"
                    && redirect == "https://app.example.edu/reset-password"
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let engine = engine(identity, MockUsers::new(), MockRoles::new());

        assert!(engine
            .request_password_reset(&student_email())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_delete_account_cascades_to_provider_first() {
        let mut identity = MockIdentity::new();
        let mut users = MockUsers::new();

        let user = local_user(true);
        let user_id = user.id;

        users
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        identity
            .expect_delete_user()
            .with(eq("ext-1"))
            .times(1)
            .returning(|_| Ok(()));
        users.expect_delete().times(1).returning(|_| Ok(()));

        let engine = engine(identity, users, MockRoles::new());

        assert!(engine.delete_account(&user_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_account_aborts_local_delete_on_provider_failure() {
        let mut identity = MockIdentity::new();
        let mut users = MockUsers::new();

        let user = local_user(true);
        let user_id = user.id;

        users
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        identity
            .expect_delete_user()
            .times(1)
            .returning(|_| Err(IdentityError::Provider("unreachable".to_string())));
        users.expect_delete().times(0);

        let engine = engine(identity, users, MockRoles::new());

        let result = engine.delete_account(&user_id).await;
        assert!(matches!(result, Err(SessionError::Internal(_))));
    }

    #[tokio::test]
    async fn test_authenticate_token_maps_invalid_token() {
        let mut identity = MockIdentity::new();

        identity
            .expect_verify_token()
            .times(1)
            .returning(|_| Err(IdentityError::InvalidToken));

        let engine = engine(identity, MockUsers::new(), MockRoles::new());

        let result = engine.authenticate_token("forged").await;
        assert!(matches!(result, Err(SessionError::InvalidCredentials)));
    }
}
