use super::*;
use crate::events::event_bus;
use storage::SessionStore;

struct Harness {
    accounts: Accounts,
    local: Arc<SessionStore>,
    session: Arc<SessionStore>,
    events: EventBus,
}

fn harness() -> Harness {
    let local = Arc::new(SessionStore::default());
    let session = Arc::new(SessionStore::default());
    let events = event_bus();
    Harness {
        accounts: Accounts::new(local.clone(), session.clone(), events.clone()),
        local,
        session,
        events,
    }
}

fn form(name: &str, email: &str, password: &str, confirm: &str) -> SignupForm {
    SignupForm {
        name: name.into(),
        email: email.into(),
        password: password.into(),
        confirm_password: confirm.into(),
    }
}

#[tokio::test]
async fn signup_reports_every_missing_field_in_form_order() {
    let h = harness();
    let err = h
        .accounts
        .signup(&form("  ", "", "secret1", ""))
        .await
        .expect_err("missing fields");
    match err {
        AccountError::MissingFields(fields) => assert_eq!(
            fields,
            vec![FormField::Name, FormField::Email, FormField::ConfirmPassword]
        ),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn signup_checks_match_before_length() {
    let h = harness();
    assert!(matches!(
        h.accounts.signup(&form("Ana", "ana@pczone.my", "abc", "abd")).await,
        Err(AccountError::PasswordMismatch)
    ));
    let err = h
        .accounts
        .signup(&form("Ana", "ana@pczone.my", "abc", "abc"))
        .await
        .expect_err("too short");
    assert!(matches!(err, AccountError::PasswordTooShort { min: 6 }));
    assert_eq!(err.notice().message, "Password must be at least 6 characters.");
}

#[tokio::test]
async fn signup_stores_account_and_starts_session() {
    let h = harness();
    let mut rx = h.events.subscribe();

    let user = h
        .accounts
        .signup(&form(" Ana ", "ana@pczone.my", "secret1", "secret1"))
        .await
        .expect("signup");

    assert_eq!(user.name, "Ana");
    assert!(user.signup_time.is_some());
    assert!(!user.remember_me);
    let stored: Vec<StoredAccount> = read_json(h.local.as_ref(), USERS_KEY)
        .await
        .expect("read")
        .expect("accounts");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].email, "ana@pczone.my");
    assert!(h.session.get_item(USER_KEY).await.expect("read").is_some());
    assert!(h.local.get_item(USER_KEY).await.expect("read").is_none());
    assert_eq!(
        rx.recv().await.expect("event"),
        StoreEvent::LoginStatusChanged {
            logged_in: true,
            display_name: "Ana".into(),
        }
    );
}

#[tokio::test]
async fn duplicate_email_is_rejected_ignoring_case() {
    let h = harness();
    h.accounts
        .signup(&form("Ana", "ana@pczone.my", "secret1", "secret1"))
        .await
        .expect("first signup");

    let err = h
        .accounts
        .signup(&form("Other", "ANA@pczone.my", "secret2", "secret2"))
        .await
        .expect_err("duplicate");
    assert!(matches!(err, AccountError::EmailTaken));
}

#[tokio::test]
async fn duplicate_email_is_rejected_across_accented_case() {
    let h = harness();
    h.accounts
        .signup(&form("Élodie", "É@x.my", "secret1", "secret1"))
        .await
        .expect("first signup");

    let err = h
        .accounts
        .signup(&form("Other", "é@x.my", "secret2", "secret2"))
        .await
        .expect_err("duplicate");
    assert!(matches!(err, AccountError::EmailTaken));
}

#[tokio::test]
async fn login_validates_credentials() {
    let h = harness();
    h.accounts
        .signup(&form("Ana", "ana@pczone.my", "secret1", "secret1"))
        .await
        .expect("signup");

    assert!(matches!(
        h.accounts.login("", "secret1", false).await,
        Err(AccountError::MissingCredentials)
    ));
    assert!(matches!(
        h.accounts.login("ana@pczone.my", "wrong!", false).await,
        Err(AccountError::InvalidCredentials)
    ));
    assert!(matches!(
        h.accounts.login("nobody@pczone.my", "secret1", false).await,
        Err(AccountError::InvalidCredentials)
    ));

    let user = h
        .accounts
        .login(" Ana@PCZone.my ", "secret1", false)
        .await
        .expect("login");
    assert_eq!(user.email, "ana@pczone.my");
    assert!(user.login_time.is_some());
}

#[tokio::test]
async fn remember_me_persists_the_user_locally() {
    let h = harness();
    h.accounts
        .signup(&form("Ana", "ana@pczone.my", "secret1", "secret1"))
        .await
        .expect("signup");

    h.accounts
        .login("ana@pczone.my", "secret1", true)
        .await
        .expect("remembered login");
    let remembered: SessionUser = read_json(h.local.as_ref(), USER_KEY)
        .await
        .expect("read")
        .expect("remembered user");
    assert!(remembered.remember_me);

    h.accounts
        .login("ana@pczone.my", "secret1", false)
        .await
        .expect("plain login");
    assert!(h.local.get_item(USER_KEY).await.expect("read").is_none());
    assert!(h.accounts.is_logged_in().await.expect("status"));
}

#[tokio::test]
async fn logout_clears_both_stores() {
    let h = harness();
    h.accounts
        .signup(&form("Ana", "ana@pczone.my", "secret1", "secret1"))
        .await
        .expect("signup");
    h.accounts
        .login("ana@pczone.my", "secret1", true)
        .await
        .expect("login");

    h.accounts.logout().await.expect("logout");

    assert!(!h.accounts.is_logged_in().await.expect("status"));
    assert_eq!(h.accounts.display_name().await.expect("name"), "Guest");
}

#[tokio::test]
async fn display_name_falls_back_to_email_then_user() {
    let h = harness();
    h.session
        .set_item(USER_KEY, r#"{"email":"ana@pczone.my"}"#)
        .await
        .expect("seed");
    assert_eq!(h.accounts.display_name().await.expect("name"), "ana@pczone.my");

    h.session.set_item(USER_KEY, "{}").await.expect("seed");
    assert_eq!(h.accounts.display_name().await.expect("name"), "User");

    h.session.set_item(USER_KEY, "not json").await.expect("seed");
    assert_eq!(h.accounts.display_name().await.expect("name"), "User");
}

#[tokio::test]
async fn remembered_user_wins_over_session_user() {
    let h = harness();
    h.session
        .set_item(USER_KEY, r#"{"name":"Session"}"#)
        .await
        .expect("seed");
    h.local
        .set_item(USER_KEY, r#"{"name":"Remembered"}"#)
        .await
        .expect("seed");
    assert_eq!(h.accounts.display_name().await.expect("name"), "Remembered");
}

#[tokio::test]
async fn legacy_user_is_migrated_once() {
    let h = harness();
    h.local
        .set_item(
            LEGACY_USER_KEY,
            r#"{"name":"Old Timer","email":"old@pczone.my"}"#,
        )
        .await
        .expect("seed");

    assert!(h.accounts.migrate_legacy_user().await.expect("migrate"));
    assert!(!h.accounts.migrate_legacy_user().await.expect("second run"));

    let stored: Vec<StoredAccount> = read_json(h.local.as_ref(), USERS_KEY)
        .await
        .expect("read")
        .expect("accounts");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "Old Timer");
    assert_eq!(stored[0].password, LEGACY_PASSWORD);
    assert!(h.local.get_item(LEGACY_USER_KEY).await.expect("read").is_none());
}

#[tokio::test]
async fn legacy_user_matching_an_account_is_dropped() {
    let h = harness();
    h.accounts
        .signup(&form("Ana", "ana@pczone.my", "secret1", "secret1"))
        .await
        .expect("signup");
    h.local
        .set_item(LEGACY_USER_KEY, r#"{"email":"ANA@pczone.my"}"#)
        .await
        .expect("seed");

    assert!(!h.accounts.migrate_legacy_user().await.expect("migrate"));
    assert!(h.local.get_item(LEGACY_USER_KEY).await.expect("read").is_none());
}

#[test]
fn password_score_counts_character_classes() {
    assert_eq!(password_score(""), 0);
    assert_eq!(password_score("abc"), 1);
    assert_eq!(password_score("abcdef"), 2);
    assert_eq!(password_score("Abcdef"), 3);
    assert_eq!(password_score("Abcde1"), 4);
    assert_eq!(password_score("Abcd1!"), 5);
}

#[test]
fn strength_buckets_drive_the_meter() {
    assert_eq!(PasswordStrength::of("abcdef"), PasswordStrength::Weak);
    assert_eq!(PasswordStrength::of("Abcdef"), PasswordStrength::Fair);
    assert_eq!(PasswordStrength::of("Abcde1"), PasswordStrength::Good);
    let strong = PasswordStrength::of("Abcd1!");
    assert_eq!(strong, PasswordStrength::Strong);
    assert_eq!(strong.meter_width(), 100);
    assert_eq!(PasswordStrength::Weak.label(), "Weak password");
}
