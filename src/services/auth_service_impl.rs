//! `CredentialStore`-backed implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::db::{CredentialConnection, CredentialStore};
use crate::services::auth_service::{AuthError, AuthService, GmLogin, UserLogin};
use crate::services::password;

pub struct CredentialAuthService {
    store: Arc<dyn CredentialStore>,
}

impl CredentialAuthService {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuthService for CredentialAuthService {
    async fn user_login(&self, username: &str, password: &str) -> Result<UserLogin, AuthError> {
        let result = match self.store.acquire().await {
            Ok(mut conn) => {
                let result = authenticate_user(conn.as_mut(), username, password).await;
                release(conn).await;
                result
            }
            Err(e) => Err(e.into()),
        };

        record_attempt("user", &result);
        result
    }

    async fn gm_login(&self, username: &str, password: &str) -> Result<GmLogin, AuthError> {
        let result = match self.store.acquire().await {
            Ok(mut conn) => {
                let result = authenticate_gm(conn.as_mut(), username, password).await;
                release(conn).await;
                result
            }
            Err(e) => Err(e.into()),
        };

        record_attempt("gm", &result);
        result
    }
}

async fn authenticate_user(
    conn: &mut dyn CredentialConnection,
    username: &str,
    password: &str,
) -> Result<UserLogin, AuthError> {
    let Some(user) = conn.find_user(username).await? else {
        debug!(username, "Login rejected: unknown user");
        return Err(AuthError::InvalidCredentials);
    };

    if !password::verify_password(password, &user.password_hash).await? {
        debug!(username, "Login rejected: password mismatch");
        return Err(AuthError::InvalidCredentials);
    }

    Ok(UserLogin {
        username: username.to_string(),
    })
}

async fn authenticate_gm(
    conn: &mut dyn CredentialConnection,
    username: &str,
    password: &str,
) -> Result<GmLogin, AuthError> {
    let Some(gm) = conn.find_gm(username).await? else {
        debug!(username, "GM login rejected: unknown account");
        return Err(AuthError::InvalidGmCredentials);
    };

    if !gm.is_active {
        debug!(username, "GM login rejected: account deactivated");
        return Err(AuthError::AccountDeactivated);
    }

    if !password::verify_password(password, &gm.password_hash).await? {
        debug!(username, "GM login rejected: password mismatch");
        return Err(AuthError::InvalidGmCredentials);
    }

    if let Err(e) = conn.stamp_gm_login(username, Utc::now()).await {
        warn!(username, error = %e, "Failed to update GM last login");
    }

    Ok(GmLogin {
        username: username.to_string(),
        gm_level: gm.gm_level.unwrap_or(0),
        permissions: gm.permissions.unwrap_or_default(),
        last_login: gm.last_login,
    })
}

/// Hand the connection back. A failing release never changes the response.
async fn release(conn: Box<dyn CredentialConnection>) {
    if let Err(e) = conn.close().await {
        warn!(error = %e, kind = e.kind(), "Error closing database connection");
    }
}

fn record_attempt<T>(kind: &'static str, result: &Result<T, AuthError>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) => e.outcome(),
    };

    metrics::counter!("auth_login_attempts_total", "kind" => kind, "outcome" => outcome)
        .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{GmCredential, StoreError, UserCredential};
    use chrono::DateTime;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::Mutex;

    const PASSWORD: &str = "LeviathanValkyrae";

    #[derive(Default)]
    struct Calls {
        acquired: usize,
        closed: usize,
        stamped: Vec<String>,
    }

    #[derive(Clone, Copy, Default)]
    enum Failure {
        #[default]
        None,
        Connection,
        Timeout,
        Query,
    }

    impl Failure {
        fn error(self) -> Option<StoreError> {
            match self {
                Self::None => None,
                Self::Connection => Some(StoreError::Connection("refused".into())),
                Self::Timeout => Some(StoreError::Timeout("pool timed out".into())),
                Self::Query => Some(StoreError::Query("syntax".into())),
            }
        }
    }

    #[derive(Default)]
    struct FakeStore {
        users: Vec<UserCredential>,
        gms: Vec<GmCredential>,
        acquire_failure: Failure,
        lookup_failure: Failure,
        stamp_fails: bool,
        close_fails: bool,
        calls: Arc<Mutex<Calls>>,
    }

    struct FakeConnection {
        users: Vec<UserCredential>,
        gms: Vec<GmCredential>,
        lookup_failure: Failure,
        stamp_fails: bool,
        close_fails: bool,
        calls: Arc<Mutex<Calls>>,
    }

    #[async_trait]
    impl CredentialStore for FakeStore {
        async fn acquire(&self) -> Result<Box<dyn CredentialConnection>, StoreError> {
            if let Some(err) = self.acquire_failure.error() {
                return Err(err);
            }
            self.calls.lock().unwrap().acquired += 1;
            Ok(Box::new(FakeConnection {
                users: self.users.clone(),
                gms: self.gms.clone(),
                lookup_failure: self.lookup_failure,
                stamp_fails: self.stamp_fails,
                close_fails: self.close_fails,
                calls: self.calls.clone(),
            }))
        }
    }

    #[async_trait]
    impl CredentialConnection for FakeConnection {
        async fn find_user(
            &mut self,
            username: &str,
        ) -> Result<Option<UserCredential>, StoreError> {
            if let Some(err) = self.lookup_failure.error() {
                return Err(err);
            }
            Ok(self.users.iter().find(|u| u.username == username).cloned())
        }

        async fn find_gm(&mut self, username: &str) -> Result<Option<GmCredential>, StoreError> {
            if let Some(err) = self.lookup_failure.error() {
                return Err(err);
            }
            Ok(self.gms.iter().find(|g| g.username == username).cloned())
        }

        async fn stamp_gm_login(
            &mut self,
            username: &str,
            _at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            if self.stamp_fails {
                return Err(StoreError::PermissionDenied("read-only".into()));
            }
            self.calls.lock().unwrap().stamped.push(username.to_string());
            Ok(())
        }

        async fn close(self: Box<Self>) -> Result<(), StoreError> {
            self.calls.lock().unwrap().closed += 1;
            if self.close_fails {
                return Err(StoreError::Connection("socket gone".into()));
            }
            Ok(())
        }
    }

    fn hash(password: &str) -> String {
        bcrypt::hash(password, 4).unwrap()
    }

    fn user(username: &str) -> UserCredential {
        UserCredential {
            username: username.to_string(),
            password_hash: hash(PASSWORD),
        }
    }

    fn gm(username: &str, is_active: bool) -> GmCredential {
        GmCredential {
            username: username.to_string(),
            password_hash: hash(PASSWORD),
            gm_level: Some(3),
            permissions: Some(r#"["bounties","events"]"#.to_string()),
            is_active,
            last_login: Some("2025-01-01T00:00:00+00:00".to_string()),
        }
    }

    fn service(store: FakeStore) -> (CredentialAuthService, Arc<Mutex<Calls>>) {
        let calls = store.calls.clone();
        (CredentialAuthService::new(Arc::new(store)), calls)
    }

    #[tokio::test]
    async fn test_user_login_success() {
        let (service, calls) = service(FakeStore {
            users: vec![user("Plaguedoc")],
            ..FakeStore::default()
        });

        let login = service.user_login("Plaguedoc", PASSWORD).await.unwrap();
        assert_eq!(login.username, "Plaguedoc");

        let calls = calls.lock().unwrap();
        assert_eq!(calls.acquired, 1);
        assert_eq!(calls.closed, 1);
    }

    #[tokio::test]
    async fn test_unknown_user_and_wrong_password_look_the_same() {
        let (service, calls) = service(FakeStore {
            users: vec![user("Plaguedoc")],
            ..FakeStore::default()
        });

        let unknown = service.user_login("Nobody", PASSWORD).await.unwrap_err();
        let wrong = service.user_login("Plaguedoc", "not-the-password").await.unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(calls.lock().unwrap().closed, 2);
    }

    #[tokio::test]
    async fn test_lookup_failure_still_releases() {
        for failure in [Failure::Connection, Failure::Timeout, Failure::Query] {
            let (service, calls) = service(FakeStore {
                lookup_failure: failure,
                ..FakeStore::default()
            });

            let err = service.user_login("Plaguedoc", PASSWORD).await.unwrap_err();
            assert!(matches!(err, AuthError::Store(_)));
            assert_eq!(calls.lock().unwrap().closed, 1);
        }
    }

    #[tokio::test]
    async fn test_close_failure_is_swallowed_on_success() {
        let (service, calls) = service(FakeStore {
            users: vec![user("Plaguedoc")],
            close_fails: true,
            ..FakeStore::default()
        });

        assert!(service.user_login("Plaguedoc", PASSWORD).await.is_ok());
        assert_eq!(calls.lock().unwrap().closed, 1);
    }

    #[tokio::test]
    async fn test_close_failure_keeps_lookup_error() {
        let (service, calls) = service(FakeStore {
            lookup_failure: Failure::Timeout,
            close_fails: true,
            ..FakeStore::default()
        });

        let err = service.user_login("Plaguedoc", PASSWORD).await.unwrap_err();
        assert!(matches!(err, AuthError::Store(StoreError::Timeout(_))));
        assert_eq!(calls.lock().unwrap().closed, 1);
    }

    #[tokio::test]
    async fn test_acquire_failure_is_classified() {
        let (service, calls) = service(FakeStore {
            acquire_failure: Failure::Connection,
            ..FakeStore::default()
        });

        let err = service.gm_login("admin", PASSWORD).await.unwrap_err();
        assert!(matches!(err, AuthError::Store(StoreError::Connection(_))));
        assert_eq!(calls.lock().unwrap().closed, 0);
    }

    #[tokio::test]
    async fn test_acquire_failure_is_counted() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = metrics::set_default_local_recorder(&recorder);

        let (service, _) = service(FakeStore {
            acquire_failure: Failure::Timeout,
            ..FakeStore::default()
        });
        assert!(service.user_login("Plaguedoc", PASSWORD).await.is_err());
        assert!(service.gm_login("admin_1", PASSWORD).await.is_err());

        let rendered = handle.render();
        for kind in ["user", "gm"] {
            let counted = rendered.lines().any(|line| {
                line.starts_with("auth_login_attempts_total{")
                    && line.contains(&format!(r#"kind="{kind}""#))
                    && line.contains(r#"outcome="error""#)
                    && line.ends_with(" 1")
            });
            assert!(counted, "no error attempt for {kind} in:\n{rendered}");
        }
    }

    #[tokio::test]
    async fn test_corrupt_hash_is_internal_error() {
        let (service, calls) = service(FakeStore {
            users: vec![UserCredential {
                username: "Plaguedoc".to_string(),
                password_hash: "not-a-hash".to_string(),
            }],
            ..FakeStore::default()
        });

        let err = service.user_login("Plaguedoc", PASSWORD).await.unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
        assert_eq!(calls.lock().unwrap().closed, 1);
    }

    #[tokio::test]
    async fn test_gm_login_success_stamps_last_login() {
        let (service, calls) = service(FakeStore {
            gms: vec![gm("admin_1", true)],
            ..FakeStore::default()
        });

        let login = service.gm_login("admin_1", PASSWORD).await.unwrap();
        assert_eq!(login.gm_level, 3);
        assert_eq!(login.permissions, r#"["bounties","events"]"#);
        assert_eq!(
            login.last_login.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );

        let calls = calls.lock().unwrap();
        assert_eq!(calls.stamped, vec!["admin_1".to_string()]);
        assert_eq!(calls.closed, 1);
    }

    #[tokio::test]
    async fn test_inactive_gm_is_refused_even_with_correct_password() {
        let (service, calls) = service(FakeStore {
            gms: vec![gm("admin_1", false)],
            ..FakeStore::default()
        });

        let err = service.gm_login("admin_1", PASSWORD).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountDeactivated));
        assert_eq!(err.to_string(), "GM account is deactivated.");

        let calls = calls.lock().unwrap();
        assert!(calls.stamped.is_empty());
        assert_eq!(calls.closed, 1);
    }

    #[tokio::test]
    async fn test_inactive_gm_skips_password_check() {
        let mut account = gm("admin_1", false);
        account.password_hash = "corrupt".to_string();
        let (service, _) = service(FakeStore {
            gms: vec![account],
            ..FakeStore::default()
        });

        // A corrupt hash would surface as Internal if it were compared.
        let err = service.gm_login("admin_1", PASSWORD).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountDeactivated));
    }

    #[tokio::test]
    async fn test_gm_defaults_for_null_columns() {
        let mut account = gm("admin_1", true);
        account.gm_level = None;
        account.permissions = None;
        account.last_login = None;
        let (service, _) = service(FakeStore {
            gms: vec![account],
            ..FakeStore::default()
        });

        let login = service.gm_login("admin_1", PASSWORD).await.unwrap();
        assert_eq!(login.gm_level, 0);
        assert_eq!(login.permissions, "");
        assert!(login.last_login.is_none());
    }

    #[tokio::test]
    async fn test_failed_stamp_does_not_fail_login() {
        let (service, calls) = service(FakeStore {
            gms: vec![gm("admin_1", true)],
            stamp_fails: true,
            ..FakeStore::default()
        });

        assert!(service.gm_login("admin_1", PASSWORD).await.is_ok());
        assert_eq!(calls.lock().unwrap().closed, 1);
    }

    #[tokio::test]
    async fn test_gm_wrong_password() {
        let (service, calls) = service(FakeStore {
            gms: vec![gm("admin_1", true)],
            ..FakeStore::default()
        });

        let err = service.gm_login("admin_1", "wrong-password").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidGmCredentials));
        assert!(calls.lock().unwrap().stamped.is_empty());
    }
}
