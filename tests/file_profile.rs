use storefront_session::config::StorageBackendKind;
use storefront_session::{AppState, RegistrationProfile, Settings};

fn file_settings(dir: &std::path::Path) -> Settings {
    let mut settings = Settings::for_test();
    settings.storage.backend = StorageBackendKind::File;
    settings.storage.directory = dir.to_path_buf();
    settings
}

#[tokio::test]
async fn test_session_and_directory_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let first_run = AppState::new(file_settings(dir.path())).unwrap();
    let tab = first_run.open_tab().await.unwrap();
    let profile = RegistrationProfile {
        name: "Eve".to_string(),
        email: "eve@x.com".to_string(),
        phone: Some("7".to_string()),
        address: Some("Elm St".to_string()),
        password: "password1".to_string(),
    };
    assert!(tab.register(&profile).await);
    let session = tab.current_session();
    drop(tab);
    drop(first_run);

    assert!(dir.path().join("user.json").exists());
    assert!(dir.path().join("users.json").exists());
    assert!(dir.path().join("authStats.json").exists());

    let second_run = AppState::new(file_settings(dir.path())).unwrap();
    let tab = second_run.open_tab().await.unwrap();
    assert_eq!(tab.current_session(), session);
    assert_eq!(tab.stats_summary().await.total_registrations, 1);

    tab.logout().await;
    assert!(!dir.path().join("user.json").exists());
    assert!(tab.login("eve@x.com", "password1").await);
}

#[tokio::test]
async fn test_corrupt_session_file_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("user.json"), "{ truncated").unwrap();

    let state = AppState::new(file_settings(dir.path())).unwrap();
    let tab = state.open_tab().await.unwrap();

    assert!(!tab.is_authenticated());
    assert!(!tab.is_loading());
    assert!(!dir.path().join("user.json").exists());
}
