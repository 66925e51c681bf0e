// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

use wassrs::domain::repositories::storage_repository::StorageRepository;
use wassrs::domain::services::session_storage_service::SessionStorageService;
use wassrs::infrastructure::storage::InMemoryStorage;

fn temp_root() -> PathBuf {
    std::env::temp_dir().join(format!("wassrs-storage-{}", Uuid::new_v4()))
}

async fn write_tree(root: &PathBuf) {
    fs::create_dir_all(root.join("Default/Local Storage")).await.unwrap();
    fs::write(root.join("Default/Cookies"), b"cookie-bytes").await.unwrap();
    fs::write(
        root.join("Default/Local Storage/leveldb.log"),
        b"leveldb-contents",
    )
    .await
    .unwrap();
    fs::write(root.join("DevToolsActivePort"), b"9222").await.unwrap();
}

/// 备份再恢复得到字节一致的目录树
#[tokio::test]
async fn test_backup_restore_round_trip() {
    let auth_root = temp_root();
    let storage = Arc::new(InMemoryStorage::new());
    let service = SessionStorageService::new(storage.clone(), auth_root.clone());

    let session_dir = service.auth_path("sess-rt");
    write_tree(&session_dir).await;

    let uploaded = service.backup("sess-rt").await.unwrap();
    assert_eq!(uploaded, 3);

    // 对象键挂在会话前缀下
    let keys = storage.list("sess-rt").await.unwrap();
    assert_eq!(keys.len(), 3);
    assert!(keys.iter().all(|k| k.starts_with("sess-rt/")));

    // 清掉本地目录后恢复
    service.delete_local("sess-rt").await.unwrap();
    assert!(!session_dir.exists());
    let restored = service.restore("sess-rt").await.unwrap();
    assert_eq!(restored, 3);

    assert_eq!(
        fs::read(session_dir.join("Default/Cookies")).await.unwrap(),
        b"cookie-bytes"
    );
    assert_eq!(
        fs::read(session_dir.join("Default/Local Storage/leveldb.log"))
            .await
            .unwrap(),
        b"leveldb-contents"
    );
    assert_eq!(
        fs::read(session_dir.join("DevToolsActivePort")).await.unwrap(),
        b"9222"
    );

    fs::remove_dir_all(&auth_root).await.ok();
}

/// 对象存储中没有产物时恢复不是错误
#[tokio::test]
async fn test_restore_missing_session_is_not_an_error() {
    let storage = Arc::new(InMemoryStorage::new());
    let service = SessionStorageService::new(storage, temp_root());
    let restored = service.restore("never-seen").await.unwrap();
    assert_eq!(restored, 0);
}

#[tokio::test]
async fn test_delete_remote_clears_prefix_only() {
    let auth_root = temp_root();
    let storage = Arc::new(InMemoryStorage::new());
    let service = SessionStorageService::new(storage.clone(), auth_root.clone());

    write_tree(&service.auth_path("sess-a")).await;
    write_tree(&service.auth_path("sess-b")).await;
    service.backup("sess-a").await.unwrap();
    service.backup("sess-b").await.unwrap();

    service.delete_remote("sess-a").await.unwrap();
    assert!(storage.list("sess-a").await.unwrap().is_empty());
    assert_eq!(storage.list("sess-b").await.unwrap().len(), 3);

    fs::remove_dir_all(&auth_root).await.ok();
}

/// 超出10MiB的单文件被拒绝
#[tokio::test]
async fn test_oversized_file_rejected() {
    let storage = InMemoryStorage::new();
    let oversized = vec![0u8; 10 * 1024 * 1024 + 1];
    let err = storage.save("big/file", &oversized).await.unwrap_err();
    assert!(matches!(
        err,
        wassrs::domain::repositories::storage_repository::StorageError::FileTooLarge { .. }
    ));
}
