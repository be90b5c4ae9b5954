use std::sync::Arc;
use std::time::Duration;
use storefront_session::storage::SESSION_KEY;
use storefront_session::{AppState, RegistrationProfile, Session, SessionStore, Settings};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

fn profile(email: &str) -> RegistrationProfile {
    RegistrationProfile {
        name: "Tab User".to_string(),
        email: email.to_string(),
        phone: None,
        address: None,
        password: "password123".to_string(),
    }
}

async fn wait_until(store: &SessionStore, expected: impl Fn(&Option<Session>) -> bool) {
    let mut rx = store.subscribe_session();
    timeout(WAIT, rx.wait_for(|s| expected(s)))
        .await
        .expect("timed out waiting for cross-tab update")
        .expect("session channel closed");
}

async fn two_tabs() -> (AppState, Arc<SessionStore>, Arc<SessionStore>) {
    let state = AppState::new(Settings::for_test()).unwrap();
    let first = state.open_tab().await.unwrap();
    let second = state.open_tab().await.unwrap();
    (state, first, second)
}

#[test_log::test(tokio::test)]
async fn test_login_in_one_tab_reaches_the_other() {
    let (_state, first, second) = two_tabs().await;
    assert!(!second.is_authenticated());

    assert!(first.register(&profile("tabs@x.com")).await);
    let expected = first.current_session();

    wait_until(&second, |s| s.is_some()).await;
    assert_eq!(second.current_session(), expected);
}

#[tokio::test]
async fn test_logout_in_one_tab_clears_the_other() {
    let (_state, first, second) = two_tabs().await;
    assert!(first.register(&profile("tabs@x.com")).await);
    wait_until(&second, |s| s.is_some()).await;

    first.logout().await;
    wait_until(&second, |s| s.is_none()).await;
    assert!(!second.is_authenticated());
}

#[tokio::test]
async fn test_malformed_external_write_is_ignored() {
    let (state, first, second) = two_tabs().await;
    assert!(first.register(&profile("tabs@x.com")).await);
    wait_until(&second, |s| s.is_some()).await;
    let before = second.current_session();

    let rogue = state.profile.open_tab();
    rogue.set(SESSION_KEY, "{\"id\":").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(second.current_session(), before);
}

#[tokio::test]
async fn test_profile_clear_signs_out_every_tab() {
    let (state, first, second) = two_tabs().await;
    assert!(first.register(&profile("tabs@x.com")).await);
    wait_until(&second, |s| s.is_some()).await;

    state.profile.open_tab().clear().await.unwrap();

    wait_until(&first, |s| s.is_none()).await;
    wait_until(&second, |s| s.is_none()).await;
}

#[tokio::test]
async fn test_same_email_from_two_tabs_registers_once() {
    let (_state, first, second) = two_tabs().await;

    let mine = profile("race@x.com");
    let theirs = profile("race@x.com");
    let (a, b) = tokio::join!(first.register(&mine), second.register(&theirs));
    assert!(a ^ b, "exactly one tab may register the email");
}
