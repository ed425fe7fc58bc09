use std::fs;
use std::path::PathBuf;

use matchvision_terminal::api::{AuthResponse, AuthUser, VideoRecord};
use matchvision_terminal::session::{Session, SessionStore};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("matchvision_session_{}_{name}", std::process::id()))
        .join("session.json")
}

fn logged_in() -> Session {
    let mut session = Session::default();
    session.login(&AuthResponse {
        user: AuthUser {
            name: "Jo March".to_string(),
            email: "jo@club.test".to_string(),
        },
        token: "tok-1".to_string(),
    });
    session.remember_record(&VideoRecord {
        id: 42,
        status: "processing".to_string(),
        ..VideoRecord::default()
    });
    session
}

#[test]
fn save_then_load_keeps_every_key() {
    let path = temp_path("roundtrip");
    let store = SessionStore::at(&path);
    let session = logged_in();
    store.save(&session).unwrap();

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"videoId\": 42"));
    assert!(raw.contains("\"token\": \"tok-1\""));

    let loaded = store.load();
    assert_eq!(loaded, session);
    assert_eq!(loaded.video_id(), Some(42));
    assert_eq!(loaded.user().map(|u| u.last_name.as_str()), Some("March"));

    store.clear().unwrap();
    assert!(!path.exists());
    store.clear().unwrap();
    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn session_file_is_owner_only() {
    let path = temp_path("perms");
    let store = SessionStore::at(&path);
    assert_eq!(store.path(), Some(path.as_path()));
    store.save(&logged_in()).unwrap();
    // Overwriting keeps the mode.
    store.save(&logged_in()).unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
    assert!(!path.with_extension("json.tmp").exists());
    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn unreadable_keys_degrade_individually() {
    let path = temp_path("lenient");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        &path,
        r#"{"token": "tok-2", "user": "not an object", "videoId": "forty-two", "videoData": null}"#,
    )
    .unwrap();

    let loaded = SessionStore::at(&path).load();
    assert_eq!(loaded.token(), Some("tok-2"));
    assert!(loaded.user().is_none());
    assert_eq!(loaded.video_id(), None);
    assert!(loaded.video_data().is_none());
    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn missing_or_corrupt_file_is_an_empty_session() {
    let path = temp_path("corrupt");
    let store = SessionStore::at(&path);
    assert_eq!(store.load(), Session::default());

    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "{{{").unwrap();
    assert!(!store.load().is_authenticated());
    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn credentials_cleared_but_job_kept() {
    let mut session = logged_in();
    session.clear_credentials();
    assert!(!session.is_authenticated());
    assert_eq!(session.video_id(), Some(42));

    session.logout();
    assert_eq!(session, Session::default());
}

#[test]
fn switching_jobs_drops_the_stale_record() {
    let mut session = logged_in();
    session.set_job(42);
    assert!(session.video_data().is_some());
    session.set_job(43);
    assert_eq!(session.video_id(), Some(43));
    assert!(session.video_data().is_none());
}
