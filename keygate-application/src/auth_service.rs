use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, Secret};
use uuid::Uuid;

use keygate_core::{
    AuthClaims, AuthError, Clock, CreateOutcome, Hasher, IdProvider, Salter, Session, TokenIssuer,
    UnitOfWork, UnitOfWorkStarter, UpdateOutcome, User,
};

use crate::requests::{
    ChangeNameRequest, ChangePasswordRequest, CheckAccessTokenRequest, DeleteSessionRequest,
    DeleteUserRequest, LoginRequest, RefreshTokensRequest, RegisterRequest,
};
use crate::responses::{
    ChangeNameResponse, ChangePasswordResponse, CheckAccessTokenResponse, DeleteSessionResponse,
    DeleteUserResponse, LoginResponse, RefreshTokensResponse, RegisterResponse,
};

// One message for every credential failure: callers cannot tell a bad
// password from an unknown name, a taken name, or a foreign session.
const INVALID_CREDENTIALS: &str = "name or password is invalid";
const REFRESH_TOKEN_FORMAT: &str = "refresh token format is invalid";
const REFRESH_TOKEN_MISSING: &str = "refresh token does not exist";
const REFRESH_TOKEN_EXPIRED: &str = "refresh token expired";
const USER_NOT_FOUND: &str = "user not found";

/// Process-wide token lifetimes, injected once at construction.
#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

/// The authentication/session orchestrator.
///
/// Every operation runs its reads and writes inside a single unit of work
/// and closes it exactly once: commit on the success path, rollback on any
/// failure. The only exception is refresh-token rotation, where an expired
/// session's deletion is committed even though the request fails.
pub struct AuthService {
    lifetimes: TokenLifetimes,
    uow_starter: Arc<dyn UnitOfWorkStarter>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdProvider>,
    hasher: Arc<dyn Hasher>,
    salter: Arc<dyn Salter>,
    token_issuer: Arc<dyn TokenIssuer>,
}

enum RefreshOutcome {
    Rotated(RefreshTokensResponse),
    Expired,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lifetimes: TokenLifetimes,
        uow_starter: Arc<dyn UnitOfWorkStarter>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdProvider>,
        hasher: Arc<dyn Hasher>,
        salter: Arc<dyn Salter>,
        token_issuer: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            lifetimes,
            uow_starter,
            clock,
            ids,
            hasher,
            salter,
            token_issuer,
        }
    }

    #[tracing::instrument(name = "Register user", skip_all)]
    pub async fn register(&self, request: RegisterRequest) -> Result<RegisterResponse, AuthError> {
        let mut uow = self.uow_starter.start().await?;
        let outcome = self.register_in(uow.as_mut(), &request).await;
        finish(uow, outcome).await
    }

    async fn register_in(
        &self,
        uow: &mut dyn UnitOfWork,
        request: &RegisterRequest,
    ) -> Result<RegisterResponse, AuthError> {
        let user_id = self.ids.random();
        let created_at = self.clock.now();
        let password_hash =
            self.derive_hash(user_id, created_at, &request.name, &request.password);
        let user = User::new(user_id, created_at, request.name.clone(), password_hash);

        match uow.users().try_create(&user).await? {
            CreateOutcome::Created => Ok(RegisterResponse {
                message: "user created".into(),
            }),
            CreateOutcome::Conflict => Err(AuthError::invariant(INVALID_CREDENTIALS)),
        }
    }

    #[tracing::instrument(name = "Login", skip_all)]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        let mut uow = self.uow_starter.start().await?;
        let outcome = self.login_in(uow.as_mut(), &request).await;
        finish(uow, outcome).await
    }

    async fn login_in(
        &self,
        uow: &mut dyn UnitOfWork,
        request: &LoginRequest,
    ) -> Result<LoginResponse, AuthError> {
        let user = self
            .authenticate(uow, &request.name, &request.password)
            .await?;

        let now = self.clock.now();
        let (refresh_token, access_token) = self.issue_pair(uow, user.id, now).await?;

        Ok(LoginResponse {
            refresh_token: refresh_token.to_string(),
            access_token,
        })
    }

    #[tracing::instrument(name = "Refresh tokens", skip_all)]
    pub async fn refresh_tokens(
        &self,
        request: RefreshTokensRequest,
    ) -> Result<RefreshTokensResponse, AuthError> {
        let refresh_token = parse_refresh_token(&request.refresh_token)?;

        let mut uow = self.uow_starter.start().await?;
        match self.refresh_tokens_in(uow.as_mut(), refresh_token).await {
            Ok(RefreshOutcome::Rotated(response)) => {
                uow.commit().await?;
                Ok(response)
            }
            // The presented session was already deleted inside the unit of
            // work; committing keeps it consumed, so the expired token
            // cannot be presented a second time.
            Ok(RefreshOutcome::Expired) => {
                uow.commit().await?;
                Err(AuthError::invariant(REFRESH_TOKEN_EXPIRED))
            }
            Err(err) => {
                rollback_quietly(uow).await;
                Err(err)
            }
        }
    }

    async fn refresh_tokens_in(
        &self,
        uow: &mut dyn UnitOfWork,
        refresh_token: Uuid,
    ) -> Result<RefreshOutcome, AuthError> {
        let Some(session) = uow
            .sessions()
            .try_get_by_refresh_token(refresh_token)
            .await?
        else {
            return Err(AuthError::invariant(REFRESH_TOKEN_MISSING));
        };

        // Consume the presented token before looking at its expiry;
        // rotation is strictly one-time-use.
        uow.sessions().delete(refresh_token).await?;

        let now = self.clock.now();
        if session.expires_at < now {
            return Ok(RefreshOutcome::Expired);
        }

        let (refresh_token, access_token) = self.issue_pair(uow, session.user_id, now).await?;

        Ok(RefreshOutcome::Rotated(RefreshTokensResponse {
            refresh_token: refresh_token.to_string(),
            access_token,
        }))
    }

    #[tracing::instrument(name = "Change name", skip_all)]
    pub async fn change_name(
        &self,
        request: ChangeNameRequest,
    ) -> Result<ChangeNameResponse, AuthError> {
        let mut uow = self.uow_starter.start().await?;
        let outcome = self.change_name_in(uow.as_mut(), &request).await;
        finish(uow, outcome).await
    }

    async fn change_name_in(
        &self,
        uow: &mut dyn UnitOfWork,
        request: &ChangeNameRequest,
    ) -> Result<ChangeNameResponse, AuthError> {
        let mut user = self
            .authenticate(uow, &request.name, &request.password)
            .await?;

        // The salt binds the hash to the name, so the hash is recomputed
        // from the plaintext supplied in this same call.
        user.name = request.new_name.clone();
        user.password_hash =
            self.derive_hash(user.id, user.created_at, &user.name, &request.password);

        match uow.users().try_update(&user).await? {
            UpdateOutcome::Updated => Ok(ChangeNameResponse {
                message: "name updated".into(),
            }),
            UpdateOutcome::Conflict => Err(AuthError::invariant(INVALID_CREDENTIALS)),
        }
    }

    #[tracing::instrument(name = "Change password", skip_all)]
    pub async fn change_password(
        &self,
        request: ChangePasswordRequest,
    ) -> Result<ChangePasswordResponse, AuthError> {
        let mut uow = self.uow_starter.start().await?;
        let outcome = self.change_password_in(uow.as_mut(), &request).await;
        finish(uow, outcome).await
    }

    async fn change_password_in(
        &self,
        uow: &mut dyn UnitOfWork,
        request: &ChangePasswordRequest,
    ) -> Result<ChangePasswordResponse, AuthError> {
        let mut user = self
            .authenticate(uow, &request.name, &request.password)
            .await?;

        user.password_hash =
            self.derive_hash(user.id, user.created_at, &user.name, &request.new_password);

        // The name is unchanged, so this update cannot hit the uniqueness
        // constraint.
        let _ = uow.users().try_update(&user).await?;

        Ok(ChangePasswordResponse {
            message: "password updated".into(),
        })
    }

    #[tracing::instrument(name = "Delete user", skip_all)]
    pub async fn delete_user(
        &self,
        request: DeleteUserRequest,
    ) -> Result<DeleteUserResponse, AuthError> {
        let mut uow = self.uow_starter.start().await?;
        let outcome = self.delete_user_in(uow.as_mut(), &request).await;
        finish(uow, outcome).await
    }

    async fn delete_user_in(
        &self,
        uow: &mut dyn UnitOfWork,
        request: &DeleteUserRequest,
    ) -> Result<DeleteUserResponse, AuthError> {
        let user = self
            .authenticate(uow, &request.name, &request.password)
            .await?;

        if !uow.users().try_delete(user.id).await? {
            return Err(AuthError::invariant(USER_NOT_FOUND));
        }

        Ok(DeleteUserResponse {
            message: "user deleted".into(),
        })
    }

    #[tracing::instrument(name = "Delete session", skip_all)]
    pub async fn delete_session(
        &self,
        request: DeleteSessionRequest,
    ) -> Result<DeleteSessionResponse, AuthError> {
        let refresh_token = parse_refresh_token(&request.refresh_token)?;

        let mut uow = self.uow_starter.start().await?;
        let outcome = self
            .delete_session_in(uow.as_mut(), &request, refresh_token)
            .await;
        finish(uow, outcome).await
    }

    async fn delete_session_in(
        &self,
        uow: &mut dyn UnitOfWork,
        request: &DeleteSessionRequest,
        refresh_token: Uuid,
    ) -> Result<DeleteSessionResponse, AuthError> {
        let Some(session) = uow
            .sessions()
            .try_get_by_refresh_token(refresh_token)
            .await?
        else {
            return Err(AuthError::invariant(REFRESH_TOKEN_MISSING));
        };

        let user = self
            .authenticate(uow, &request.name, &request.password)
            .await?;

        // An ownership mismatch reads exactly like a bad password.
        if session.user_id != user.id {
            return Err(AuthError::invariant(INVALID_CREDENTIALS));
        }

        uow.sessions().delete(refresh_token).await?;

        Ok(DeleteSessionResponse {
            message: "session deleted".into(),
        })
    }

    #[tracing::instrument(name = "Check access token", skip_all)]
    pub async fn check_access_token(
        &self,
        request: CheckAccessTokenRequest,
    ) -> Result<CheckAccessTokenResponse, AuthError> {
        // Tokens that fail on their own terms are settled without a
        // transaction.
        let Some(claims) = self.token_issuer.try_parse(&request.access_token) else {
            return Ok(CheckAccessTokenResponse { is_active: false });
        };
        if claims.expires_at < self.clock.now() {
            return Ok(CheckAccessTokenResponse { is_active: false });
        }

        let mut uow = self.uow_starter.start().await?;
        let outcome = self.check_user_exists(uow.as_mut(), claims.user_id).await;
        finish(uow, outcome).await
    }

    async fn check_user_exists(
        &self,
        uow: &mut dyn UnitOfWork,
        user_id: Uuid,
    ) -> Result<CheckAccessTokenResponse, AuthError> {
        if uow.users().exists(user_id).await? {
            Ok(CheckAccessTokenResponse { is_active: true })
        } else {
            Err(AuthError::invariant(USER_NOT_FOUND))
        }
    }

    /// Re-authentication shared by Login, ChangeName, ChangePassword,
    /// DeleteUser and DeleteSession: fetch by name under a row lock,
    /// re-derive the hash with the supplied password, compare.
    async fn authenticate(
        &self,
        uow: &mut dyn UnitOfWork,
        name: &str,
        password: &Secret<String>,
    ) -> Result<User, AuthError> {
        let Some(user) = uow.users().try_get_by_name(name).await? else {
            return Err(AuthError::invariant(INVALID_CREDENTIALS));
        };

        let supplied_hash = self.derive_hash(user.id, user.created_at, &user.name, password);
        if !constant_result_eq(&supplied_hash, &user.password_hash) {
            return Err(AuthError::invariant(INVALID_CREDENTIALS));
        }

        Ok(user)
    }

    fn derive_hash(
        &self,
        user_id: Uuid,
        created_at: DateTime<Utc>,
        name: &str,
        password: &Secret<String>,
    ) -> String {
        let salted = self
            .salter
            .salt(user_id, created_at, name, password.expose_secret());
        self.hasher.hash(&salted)
    }

    /// Mints a fresh access token and session row for `user_id`.
    async fn issue_pair(
        &self,
        uow: &mut dyn UnitOfWork,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(Uuid, String), AuthError> {
        let claims = AuthClaims {
            user_id,
            expires_at: now + self.lifetimes.access,
        };
        let access_token = self.token_issuer.issue(&claims)?;

        let refresh_token = self.ids.random();
        let session = Session::new(refresh_token, user_id, now + self.lifetimes.refresh);
        uow.sessions().create(&session).await?;

        Ok((refresh_token, access_token))
    }
}

fn parse_refresh_token(raw: &str) -> Result<Uuid, AuthError> {
    Uuid::parse_str(raw).map_err(|_| AuthError::invariant(REFRESH_TOKEN_FORMAT))
}

// Digest comparison must not short-circuit on the first differing byte.
fn constant_result_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Closes the unit of work exactly once: commit when the operation
/// succeeded, rollback otherwise.
async fn finish<T>(uow: Box<dyn UnitOfWork>, outcome: Result<T, AuthError>) -> Result<T, AuthError> {
    match outcome {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(err) => {
            rollback_quietly(uow).await;
            Err(err)
        }
    }
}

async fn rollback_quietly(uow: Box<dyn UnitOfWork>) {
    if let Err(rollback_err) = uow.rollback().await {
        tracing::warn!(error = %rollback_err, "rollback after failed operation also failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    };

    use async_trait::async_trait;
    use chrono::TimeZone;
    use keygate_core::{SessionRepository, StoreError, TokenSignError, UserRepository};

    // Scripted unit of work: canned repository answers plus a journal of
    // calls, so tests can assert both outcomes and write ordering.

    #[derive(Default)]
    struct Script {
        user_by_name: Option<User>,
        create_outcome: Option<CreateOutcome>,
        update_outcome: Option<UpdateOutcome>,
        delete_user_result: bool,
        user_exists: bool,
        session: Option<Session>,
    }

    #[derive(Clone, Default)]
    struct Journal {
        calls: Arc<Mutex<Vec<String>>>,
        committed: Arc<AtomicBool>,
        rolled_back: Arc<AtomicBool>,
    }

    impl Journal {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn committed(&self) -> bool {
            self.committed.load(Ordering::SeqCst)
        }

        fn rolled_back(&self) -> bool {
            self.rolled_back.load(Ordering::SeqCst)
        }
    }

    struct ScriptedUow {
        script: Script,
        journal: Journal,
    }

    #[async_trait]
    impl UserRepository for ScriptedUow {
        async fn try_create(&mut self, user: &User) -> Result<CreateOutcome, StoreError> {
            self.journal
                .record(format!("try_create:{}:{}", user.name, user.password_hash));
            Ok(self.script.create_outcome.expect("unscripted try_create"))
        }

        async fn try_get_by_name(&mut self, name: &str) -> Result<Option<User>, StoreError> {
            self.journal.record(format!("try_get_by_name:{name}"));
            Ok(self.script.user_by_name.clone())
        }

        async fn try_update(&mut self, user: &User) -> Result<UpdateOutcome, StoreError> {
            self.journal
                .record(format!("try_update:{}:{}", user.name, user.password_hash));
            Ok(self.script.update_outcome.expect("unscripted try_update"))
        }

        async fn try_delete(&mut self, user_id: Uuid) -> Result<bool, StoreError> {
            self.journal.record(format!("try_delete:{user_id}"));
            Ok(self.script.delete_user_result)
        }

        async fn exists(&mut self, user_id: Uuid) -> Result<bool, StoreError> {
            self.journal.record(format!("exists:{user_id}"));
            Ok(self.script.user_exists)
        }
    }

    #[async_trait]
    impl SessionRepository for ScriptedUow {
        async fn create(&mut self, session: &Session) -> Result<(), StoreError> {
            self.journal
                .record(format!("create_session:{}", session.refresh_token));
            Ok(())
        }

        async fn try_get_by_refresh_token(
            &mut self,
            refresh_token: Uuid,
        ) -> Result<Option<Session>, StoreError> {
            self.journal.record(format!("get_session:{refresh_token}"));
            Ok(self.script.session.clone())
        }

        async fn delete(&mut self, refresh_token: Uuid) -> Result<(), StoreError> {
            self.journal
                .record(format!("delete_session:{refresh_token}"));
            Ok(())
        }
    }

    #[async_trait]
    impl UnitOfWork for ScriptedUow {
        async fn commit(self: Box<Self>) -> Result<(), StoreError> {
            self.journal.committed.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
            self.journal.rolled_back.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct ScriptedStarter {
        script: Mutex<Option<Script>>,
        journal: Journal,
    }

    impl ScriptedStarter {
        fn new(script: Script) -> (Arc<Self>, Journal) {
            let journal = Journal::default();
            let starter = Arc::new(Self {
                script: Mutex::new(Some(script)),
                journal: journal.clone(),
            });
            (starter, journal)
        }
    }

    #[async_trait]
    impl UnitOfWorkStarter for ScriptedStarter {
        async fn start(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
            let script = self
                .script
                .lock()
                .unwrap()
                .take()
                .expect("unit of work started more than once");
            Ok(Box::new(ScriptedUow {
                script,
                journal: self.journal.clone(),
            }))
        }
    }

    /// For paths that must never touch the store.
    struct RefusingStarter;

    #[async_trait]
    impl UnitOfWorkStarter for RefusingStarter {
        async fn start(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
            panic!("this path must not open a transaction");
        }
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    struct FixedIds(Uuid);

    impl IdProvider for FixedIds {
        fn random(&self) -> Uuid {
            self.0
        }
    }

    struct TaggingHasher;

    impl Hasher for TaggingHasher {
        fn hash(&self, salted: &str) -> String {
            format!("{salted}#hash")
        }
    }

    struct JoiningSalter;

    impl Salter for JoiningSalter {
        fn salt(
            &self,
            id: Uuid,
            created_at: DateTime<Utc>,
            name: &str,
            password: &str,
        ) -> String {
            format!("{id}|{created_at}|{name}|{password}")
        }
    }

    struct FakeIssuer {
        parsed: Option<AuthClaims>,
    }

    impl TokenIssuer for FakeIssuer {
        fn issue(&self, claims: &AuthClaims) -> Result<String, TokenSignError> {
            Ok(format!("access-for-{}", claims.user_id))
        }

        fn try_parse(&self, _token: &str) -> Option<AuthClaims> {
            self.parsed.clone()
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 8, 14, 39, 0).unwrap()
    }

    fn fixed_id() -> Uuid {
        Uuid::from_u128(7)
    }

    fn lifetimes() -> TokenLifetimes {
        TokenLifetimes {
            access: Duration::minutes(15),
            refresh: Duration::days(30),
        }
    }

    fn service(
        starter: Arc<dyn UnitOfWorkStarter>,
        parsed_claims: Option<AuthClaims>,
    ) -> AuthService {
        AuthService::new(
            lifetimes(),
            starter,
            Arc::new(FixedClock(fixed_now())),
            Arc::new(FixedIds(fixed_id())),
            Arc::new(TaggingHasher),
            Arc::new(JoiningSalter),
            Arc::new(FakeIssuer {
                parsed: parsed_claims,
            }),
        )
    }

    fn stored_hash(id: Uuid, created_at: DateTime<Utc>, name: &str, password: &str) -> String {
        format!("{id}|{created_at}|{name}|{password}#hash")
    }

    fn existing_user(name: &str, password: &str) -> User {
        let id = Uuid::from_u128(42);
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        User::new(
            id,
            created_at,
            name.into(),
            stored_hash(id, created_at, name, password),
        )
    }

    fn invariant_message(err: AuthError) -> String {
        match err {
            AuthError::InvariantViolation(message) => message,
            other => panic!("expected invariant violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_derives_hash_from_id_created_at_name_and_password() {
        let (starter, journal) = ScriptedStarter::new(Script {
            create_outcome: Some(CreateOutcome::Created),
            ..Script::default()
        });
        let service = service(starter, None);

        let response = service
            .register(RegisterRequest {
                name: "alice".into(),
                password: Secret::new("pw1".into()),
            })
            .await
            .unwrap();

        assert_eq!(response.message, "user created");
        let expected_hash = stored_hash(fixed_id(), fixed_now(), "alice", "pw1");
        assert_eq!(
            journal.calls(),
            vec![format!("try_create:alice:{expected_hash}")]
        );
        assert!(journal.committed());
        assert!(!journal.rolled_back());
    }

    #[tokio::test]
    async fn register_name_collision_rolls_back_with_generic_message() {
        let (starter, journal) = ScriptedStarter::new(Script {
            create_outcome: Some(CreateOutcome::Conflict),
            ..Script::default()
        });
        let service = service(starter, None);

        let err = service
            .register(RegisterRequest {
                name: "alice".into(),
                password: Secret::new("pw1".into()),
            })
            .await
            .unwrap_err();

        assert_eq!(invariant_message(err), INVALID_CREDENTIALS);
        assert!(journal.rolled_back());
        assert!(!journal.committed());
    }

    #[tokio::test]
    async fn login_mints_session_and_access_token() {
        let user = existing_user("alice", "pw1");
        let user_id = user.id;
        let (starter, journal) = ScriptedStarter::new(Script {
            user_by_name: Some(user),
            ..Script::default()
        });
        let service = service(starter, None);

        let response = service
            .login(LoginRequest {
                name: "alice".into(),
                password: Secret::new("pw1".into()),
            })
            .await
            .unwrap();

        assert_eq!(response.refresh_token, fixed_id().to_string());
        assert_eq!(response.access_token, format!("access-for-{user_id}"));
        assert_eq!(
            journal.calls(),
            vec![
                "try_get_by_name:alice".to_string(),
                format!("create_session:{}", fixed_id()),
            ]
        );
        assert!(journal.committed());
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (missing_starter, missing_journal) = ScriptedStarter::new(Script::default());
        let missing_user_err = service(missing_starter, None)
            .login(LoginRequest {
                name: "nobody".into(),
                password: Secret::new("pw1".into()),
            })
            .await
            .unwrap_err();

        let (wrong_starter, wrong_journal) = ScriptedStarter::new(Script {
            user_by_name: Some(existing_user("alice", "pw1")),
            ..Script::default()
        });
        let wrong_password_err = service(wrong_starter, None)
            .login(LoginRequest {
                name: "alice".into(),
                password: Secret::new("wrong".into()),
            })
            .await
            .unwrap_err();

        assert_eq!(
            invariant_message(missing_user_err),
            invariant_message(wrong_password_err)
        );
        assert!(missing_journal.rolled_back());
        assert!(wrong_journal.rolled_back());
    }

    #[tokio::test]
    async fn refresh_rotates_the_session_delete_before_create() {
        let presented = Uuid::from_u128(99);
        let user_id = Uuid::from_u128(42);
        let (starter, journal) = ScriptedStarter::new(Script {
            session: Some(Session::new(
                presented,
                user_id,
                fixed_now() + Duration::days(1),
            )),
            ..Script::default()
        });
        let service = service(starter, None);

        let response = service
            .refresh_tokens(RefreshTokensRequest {
                refresh_token: presented.to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.refresh_token, fixed_id().to_string());
        assert_ne!(response.refresh_token, presented.to_string());
        assert_eq!(
            journal.calls(),
            vec![
                format!("get_session:{presented}"),
                format!("delete_session:{presented}"),
                format!("create_session:{}", fixed_id()),
            ]
        );
        assert!(journal.committed());
    }

    #[tokio::test]
    async fn refresh_with_expired_session_consumes_it_and_commits() {
        let presented = Uuid::from_u128(99);
        let (starter, journal) = ScriptedStarter::new(Script {
            session: Some(Session::new(
                presented,
                Uuid::from_u128(42),
                fixed_now() - Duration::seconds(1),
            )),
            ..Script::default()
        });
        let service = service(starter, None);

        let err = service
            .refresh_tokens(RefreshTokensRequest {
                refresh_token: presented.to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(invariant_message(err), REFRESH_TOKEN_EXPIRED);
        // The delete happened and was committed; no replacement was issued.
        assert_eq!(
            journal.calls(),
            vec![
                format!("get_session:{presented}"),
                format!("delete_session:{presented}"),
            ]
        );
        assert!(journal.committed());
        assert!(!journal.rolled_back());
    }

    #[tokio::test]
    async fn refresh_with_unknown_session_rolls_back() {
        let (starter, journal) = ScriptedStarter::new(Script::default());
        let service = service(starter, None);

        let err = service
            .refresh_tokens(RefreshTokensRequest {
                refresh_token: Uuid::from_u128(99).to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(invariant_message(err), REFRESH_TOKEN_MISSING);
        assert!(journal.rolled_back());
    }

    #[tokio::test]
    async fn refresh_with_malformed_token_never_opens_a_transaction() {
        let service = service(Arc::new(RefusingStarter), None);

        let err = service
            .refresh_tokens(RefreshTokensRequest {
                refresh_token: "not-a-uuid".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(invariant_message(err), REFRESH_TOKEN_FORMAT);
    }

    #[tokio::test]
    async fn change_name_rehashes_with_new_name_and_same_password() {
        let user = existing_user("alice", "pw1");
        let (id, created_at) = (user.id, user.created_at);
        let (starter, journal) = ScriptedStarter::new(Script {
            user_by_name: Some(user),
            update_outcome: Some(UpdateOutcome::Updated),
            ..Script::default()
        });
        let service = service(starter, None);

        let response = service
            .change_name(ChangeNameRequest {
                name: "alice".into(),
                password: Secret::new("pw1".into()),
                new_name: "alice2".into(),
            })
            .await
            .unwrap();

        assert_eq!(response.message, "name updated");
        let rehashed = stored_hash(id, created_at, "alice2", "pw1");
        assert_eq!(
            journal.calls(),
            vec![
                "try_get_by_name:alice".to_string(),
                format!("try_update:alice2:{rehashed}"),
            ]
        );
        assert!(journal.committed());
    }

    #[tokio::test]
    async fn change_name_conflict_rolls_back_with_generic_message() {
        let (starter, journal) = ScriptedStarter::new(Script {
            user_by_name: Some(existing_user("alice", "pw1")),
            update_outcome: Some(UpdateOutcome::Conflict),
            ..Script::default()
        });
        let service = service(starter, None);

        let err = service
            .change_name(ChangeNameRequest {
                name: "alice".into(),
                password: Secret::new("pw1".into()),
                new_name: "taken".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(invariant_message(err), INVALID_CREDENTIALS);
        assert!(journal.rolled_back());
    }

    #[tokio::test]
    async fn change_password_rehashes_with_unchanged_name() {
        let user = existing_user("alice", "pw1");
        let (id, created_at) = (user.id, user.created_at);
        let (starter, journal) = ScriptedStarter::new(Script {
            user_by_name: Some(user),
            update_outcome: Some(UpdateOutcome::Updated),
            ..Script::default()
        });
        let service = service(starter, None);

        service
            .change_password(ChangePasswordRequest {
                name: "alice".into(),
                password: Secret::new("pw1".into()),
                new_password: Secret::new("pw2".into()),
            })
            .await
            .unwrap();

        let rehashed = stored_hash(id, created_at, "alice", "pw2");
        assert_eq!(
            journal.calls(),
            vec![
                "try_get_by_name:alice".to_string(),
                format!("try_update:alice:{rehashed}"),
            ]
        );
        assert!(journal.committed());
    }

    #[tokio::test]
    async fn delete_user_with_zero_rows_affected_rolls_back() {
        let (starter, journal) = ScriptedStarter::new(Script {
            user_by_name: Some(existing_user("alice", "pw1")),
            delete_user_result: false,
            ..Script::default()
        });
        let service = service(starter, None);

        let err = service
            .delete_user(DeleteUserRequest {
                name: "alice".into(),
                password: Secret::new("pw1".into()),
            })
            .await
            .unwrap_err();

        assert_eq!(invariant_message(err), USER_NOT_FOUND);
        assert!(journal.rolled_back());
    }

    #[tokio::test]
    async fn delete_session_owned_by_someone_else_reads_like_bad_password() {
        let presented = Uuid::from_u128(99);
        let (starter, journal) = ScriptedStarter::new(Script {
            user_by_name: Some(existing_user("alice", "pw1")),
            session: Some(Session::new(
                presented,
                Uuid::from_u128(1000),
                fixed_now() + Duration::days(1),
            )),
            ..Script::default()
        });
        let service = service(starter, None);

        let err = service
            .delete_session(DeleteSessionRequest {
                name: "alice".into(),
                password: Secret::new("pw1".into()),
                refresh_token: presented.to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(invariant_message(err), INVALID_CREDENTIALS);
        assert!(journal.rolled_back());
    }

    #[tokio::test]
    async fn delete_session_removes_the_owned_session() {
        let user = existing_user("alice", "pw1");
        let user_id = user.id;
        let presented = Uuid::from_u128(99);
        let (starter, journal) = ScriptedStarter::new(Script {
            user_by_name: Some(user),
            session: Some(Session::new(
                presented,
                user_id,
                fixed_now() + Duration::days(1),
            )),
            ..Script::default()
        });
        let service = service(starter, None);

        let response = service
            .delete_session(DeleteSessionRequest {
                name: "alice".into(),
                password: Secret::new("pw1".into()),
                refresh_token: presented.to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.message, "session deleted");
        assert!(journal.calls().contains(&format!("delete_session:{presented}")));
        assert!(journal.committed());
    }

    #[tokio::test]
    async fn check_access_token_settles_malformed_tokens_without_the_store() {
        let service = service(Arc::new(RefusingStarter), None);

        let response = service
            .check_access_token(CheckAccessTokenRequest {
                access_token: "garbage".into(),
            })
            .await
            .unwrap();

        assert!(!response.is_active);
    }

    #[tokio::test]
    async fn check_access_token_settles_expired_tokens_without_the_store() {
        let claims = AuthClaims {
            user_id: Uuid::from_u128(42),
            expires_at: fixed_now() - Duration::seconds(1),
        };
        let service = service(Arc::new(RefusingStarter), Some(claims));

        let response = service
            .check_access_token(CheckAccessTokenRequest {
                access_token: "signed-but-expired".into(),
            })
            .await
            .unwrap();

        assert!(!response.is_active);
    }

    #[tokio::test]
    async fn check_access_token_requires_the_user_to_still_exist() {
        let user_id = Uuid::from_u128(42);
        let claims = AuthClaims {
            user_id,
            expires_at: fixed_now() + Duration::minutes(5),
        };

        let (active_starter, active_journal) = ScriptedStarter::new(Script {
            user_exists: true,
            ..Script::default()
        });
        let response = service(active_starter, Some(claims.clone()))
            .check_access_token(CheckAccessTokenRequest {
                access_token: "signed".into(),
            })
            .await
            .unwrap();
        assert!(response.is_active);
        assert!(active_journal.committed());

        let (vanished_starter, vanished_journal) = ScriptedStarter::new(Script::default());
        let err = service(vanished_starter, Some(claims))
            .check_access_token(CheckAccessTokenRequest {
                access_token: "signed".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(invariant_message(err), USER_NOT_FOUND);
        assert!(vanished_journal.rolled_back());
    }
}
