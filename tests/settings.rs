mod common;

use kramnytsia::services::settings;
use kramnytsia::services::uploads;

use common::setup_db;

#[tokio::test]
async fn unset_keys_fall_back_to_the_default() {
    let db = setup_db().await;

    let value = settings::get_setting(&db, settings::TELEGRAM_ENABLED, "false")
        .await
        .unwrap();
    assert_eq!(value, "false");
}

#[tokio::test]
async fn set_setting_upserts() {
    let db = setup_db().await;

    settings::set_setting(&db, settings::TELEGRAM_CHAT_ID, "-100123")
        .await
        .unwrap();
    assert_eq!(
        settings::get_setting(&db, settings::TELEGRAM_CHAT_ID, "").await.unwrap(),
        "-100123"
    );

    settings::set_setting(&db, settings::TELEGRAM_CHAT_ID, "-100456")
        .await
        .unwrap();
    assert_eq!(
        settings::get_setting(&db, settings::TELEGRAM_CHAT_ID, "").await.unwrap(),
        "-100456"
    );
}

#[test]
fn only_image_extensions_are_allowed() {
    assert!(uploads::allowed_file("photo.png"));
    assert!(uploads::allowed_file("photo.JPG"));
    assert!(uploads::allowed_file("photo.webp"));
    assert!(!uploads::allowed_file("script.sh"));
    assert!(!uploads::allowed_file("noextension"));
}

#[test]
fn file_names_are_flattened_and_sanitized() {
    assert_eq!(uploads::sanitize_file_name("photo.png"), "photo.png");
    assert_eq!(uploads::sanitize_file_name("../../etc/passwd"), "passwd");
    assert_eq!(
        uploads::sanitize_file_name("weird name (1).png"),
        "weird_name_1_.png"
    );
    assert_eq!(uploads::sanitize_file_name("C:\\temp\\pic.jpg"), "pic.jpg");
}
