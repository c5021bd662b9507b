//! End-to-end behavior of the object store over a real catalog file and
//! byte store directory.

use std::sync::Arc;

use tempfile::TempDir;

use object_store::{ErrorKind, ObjectStore, ObjectStoreConfig, RangeError, StoreError};

async fn setup_store() -> (TempDir, ObjectStore) {
    setup_store_with_max(object_store::DEFAULT_MAX_CHUNK_SIZE).await
}

async fn setup_store_with_max(max_chunk_size: u64) -> (TempDir, ObjectStore) {
    let temp_dir = TempDir::new().unwrap();
    let config = ObjectStoreConfig::new(
        temp_dir.path().join("blobs"),
        Some(temp_dir.path().join("metadata.sqlite")),
    )
    .with_max_chunk_size(max_chunk_size);
    let store = ObjectStore::new(config).await.unwrap();
    (temp_dir, store)
}

#[tokio::test]
async fn test_readme_scenario() {
    let (_dir, store) = setup_store().await;

    store.create_bucket("b1").await.unwrap();
    let blob = store.create_blob("b1", "f").await.unwrap();
    assert_eq!(blob.size, 0);

    assert_eq!(store.append_blob("b1", "f", b"hello").await.unwrap(), 5);
    assert_eq!(store.get_blob("b1", "f").await.unwrap().size, 5);

    let grant = store.create_grant("b1", "f").await.unwrap();
    assert_eq!(grant.bucket_id, "b1");
    assert_eq!(grant.blob_id, "f");

    let full = store.download(&grant.key, None).await.unwrap();
    assert_eq!(&full.data[..], b"hello");
    assert!(full.range.is_none());

    let part = store.download(&grant.key, Some("bytes=1-3")).await.unwrap();
    assert_eq!(&part.data[..], b"ell");
    assert_eq!(part.range.unwrap().content_range(), "bytes 1-3/5");

    store.delete_blob("b1", "f").await.unwrap();
    let err = store.download(&grant.key, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_size_tracks_appended_bytes() {
    let (_dir, store) = setup_store().await;
    store.create_bucket("b1").await.unwrap();
    store.create_blob("b1", "f").await.unwrap();

    let chunks: [&[u8]; 4] = [b"abc", b"", b"defgh", &[0u8; 4096]];
    let mut expected = 0u64;
    for chunk in chunks {
        expected += chunk.len() as u64;
        assert_eq!(store.append_blob("b1", "f", chunk).await.unwrap(), expected);
    }

    let blob = store.get_blob("b1", "f").await.unwrap();
    assert_eq!(blob.size, expected);

    let grant = store.create_grant("b1", "f").await.unwrap();
    let full = store.download(&grant.key, None).await.unwrap();
    assert_eq!(full.data.len() as u64, blob.size);
    assert_eq!(&full.data[..8], b"abcdefgh");
}

#[tokio::test]
async fn test_concurrent_appends_keep_size_consistent() {
    let (_dir, store) = setup_store().await;
    let store = Arc::new(store);
    store.create_bucket("b1").await.unwrap();
    store.create_blob("b1", "f").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..16u8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.append_blob("b1", "f", &[i; 100]).await.unwrap()
        }));
    }

    let mut sizes = Vec::new();
    for handle in handles {
        sizes.push(handle.await.unwrap());
    }

    // Each append observed a distinct running total
    sizes.sort_unstable();
    let expected: Vec<u64> = (1..=16).map(|n| n * 100).collect();
    assert_eq!(sizes, expected);

    let blob = store.get_blob("b1", "f").await.unwrap();
    assert_eq!(blob.size, 1600);

    // Chunks were never interleaved with each other
    let grant = store.create_grant("b1", "f").await.unwrap();
    let data = store.download(&grant.key, None).await.unwrap().data;
    assert_eq!(data.len(), 1600);
    for chunk in data.chunks(100) {
        assert!(chunk.iter().all(|b| *b == chunk[0]));
    }
}

#[tokio::test]
async fn test_grant_requires_existing_blob() {
    let (_dir, store) = setup_store().await;
    store.create_bucket("b1").await.unwrap();

    let err = store.create_grant("b1", "ghost").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = store.create_grant("nope", "ghost").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_bucket_delete_cascades() {
    let (dir, store) = setup_store().await;
    store.create_bucket("b1").await.unwrap();
    store.create_blob("b1", "x").await.unwrap();
    store.append_blob("b1", "x", b"payload").await.unwrap();
    let grant = store.create_grant("b1", "x").await.unwrap();

    store.delete_bucket("b1").await.unwrap();

    assert_eq!(
        store.get_blob("b1", "x").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        store.download(&grant.key, None).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert!(!dir.path().join("blobs").join("b1").exists());
}

#[tokio::test]
async fn test_deleting_missing_entities_is_not_found() {
    let (_dir, store) = setup_store().await;

    assert_eq!(
        store.delete_bucket("nope").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );

    store.create_bucket("b1").await.unwrap();
    assert_eq!(
        store.delete_blob("b1", "nope").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        store.delete_grant("01ARZ3NDEKTSV4RRFFQ69G5FAV").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn test_bucket_and_blob_conflicts() {
    let (_dir, store) = setup_store().await;
    store.create_bucket("b1").await.unwrap();
    assert_eq!(
        store.create_bucket("b1").await.unwrap_err().kind(),
        ErrorKind::Conflict
    );

    store.create_blob("b1", "f").await.unwrap();
    assert_eq!(
        store.create_blob("b1", "f").await.unwrap_err().kind(),
        ErrorKind::Conflict
    );
    assert_eq!(
        store.create_blob("missing", "f").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn test_listing() {
    let (_dir, store) = setup_store().await;
    store.create_bucket("b1").await.unwrap();
    store.create_bucket("b2").await.unwrap();
    store.create_blob("b1", "x").await.unwrap();
    store.create_blob("b1", "y").await.unwrap();
    store.append_blob("b1", "y", b"12").await.unwrap();

    let buckets = store.list_buckets().await.unwrap();
    assert_eq!(buckets.len(), 2);
    let b1 = buckets.iter().find(|b| b.id == "b1").unwrap();
    assert_eq!(b1.blobs.len(), 2);

    let blobs = store.list_blobs("b1").await.unwrap();
    let y = blobs.iter().find(|b| b.id == "y").unwrap();
    assert_eq!(y.size, 2);

    assert!(store.list_blobs("b2").await.unwrap().is_empty());
    assert_eq!(
        store.list_blobs("b3").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );

    let bucket = store.get_bucket("b1").await.unwrap();
    assert_eq!(bucket.blobs, blobs);
}

#[tokio::test]
async fn test_range_over_ten_bytes() {
    let (_dir, store) = setup_store().await;
    store.create_bucket("b1").await.unwrap();
    store.create_blob("b1", "digits").await.unwrap();
    let bytes: Vec<u8> = (0..10).collect();
    store.append_blob("b1", "digits", &bytes).await.unwrap();
    let grant = store.create_grant("b1", "digits").await.unwrap();

    let part = store.download(&grant.key, Some("bytes=2-4")).await.unwrap();
    assert_eq!(&part.data[..], &[2, 3, 4]);
    assert_eq!(part.range.unwrap().content_range(), "bytes 2-4/10");

    let err = store
        .download(&grant.key, Some("bytes=0-1,4-5"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRange);
    assert!(matches!(err, StoreError::Range(RangeError::MultipleRanges)));

    let err = store
        .download(&grant.key, Some("bytes=10-"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRange);

    // Whitespace-only range means no range at all
    let full = store.download(&grant.key, Some("  ")).await.unwrap();
    assert_eq!(full.data.len(), 10);
}

#[tokio::test]
async fn test_range_larger_than_max_chunk() {
    let (_dir, store) = setup_store_with_max(4).await;
    store.create_bucket("b1").await.unwrap();
    store.create_blob("b1", "f").await.unwrap();
    store.append_blob("b1", "f", b"0123456789").await.unwrap();
    let grant = store.create_grant("b1", "f").await.unwrap();

    let err = store
        .download(&grant.key, Some("bytes=0-4"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RangeTooLarge);

    let ok = store.download(&grant.key, Some("bytes=6-9")).await.unwrap();
    assert_eq!(&ok.data[..], b"6789");
}

#[tokio::test]
async fn test_never_written_blob() {
    let (_dir, store) = setup_store().await;
    store.create_bucket("b1").await.unwrap();
    store.create_blob("b1", "empty").await.unwrap();
    let grant = store.create_grant("b1", "empty").await.unwrap();

    // No backing file yet: a storage fault, not an empty success
    let err = store.download(&grant.key, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageIO);
    let err = store
        .byte_store()
        .read_range("b1", "empty", 0, 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageIO);

    // Any range against zero bytes is unsatisfiable
    let err = store
        .download(&grant.key, Some("bytes=0-"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRange);

    // Deleting it is still fine
    store.delete_blob("b1", "empty").await.unwrap();
}

#[tokio::test]
async fn test_interrupted_blob_delete_can_be_retried() {
    let (_dir, store) = setup_store().await;
    store.create_bucket("b1").await.unwrap();
    store.create_blob("b1", "f").await.unwrap();
    store.append_blob("b1", "f", b"data").await.unwrap();

    // Simulate a crash after the file went but before the row did
    store.byte_store().delete_file("b1", "f").await.unwrap();

    store.delete_blob("b1", "f").await.unwrap();
    assert!(!store.catalog().blob_exists("b1", "f").await.unwrap());
}

#[tokio::test]
async fn test_revoked_grant() {
    let (_dir, store) = setup_store().await;
    store.create_bucket("b1").await.unwrap();
    store.create_blob("b1", "f").await.unwrap();
    store.append_blob("b1", "f", b"data").await.unwrap();

    let keep = store.create_grant("b1", "f").await.unwrap();
    let revoked = store.create_grant("b1", "f").await.unwrap();
    assert!(revoked.key > keep.key);
    assert_eq!(store.list_grants("b1", "f").await.unwrap().len(), 2);

    store.delete_grant(&revoked.key).await.unwrap();
    assert_eq!(
        store.download(&revoked.key, None).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(&store.download(&keep.key, None).await.unwrap().data[..], b"data");
    assert_eq!(store.list_grants("b1", "f").await.unwrap(), vec![keep]);
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let config = ObjectStoreConfig::new(
        temp_dir.path().join("blobs"),
        Some(temp_dir.path().join("metadata.sqlite")),
    );

    let key = {
        let store = ObjectStore::new(config.clone()).await.unwrap();
        store.create_bucket("b1").await.unwrap();
        store.create_blob("b1", "f").await.unwrap();
        store.append_blob("b1", "f", b"persist").await.unwrap();
        store.create_grant("b1", "f").await.unwrap().key
    };

    let store = ObjectStore::new(config).await.unwrap();
    assert_eq!(store.get_blob("b1", "f").await.unwrap().size, 7);
    assert_eq!(
        &store.download(&key, None).await.unwrap().data[..],
        b"persist"
    );
}

#[tokio::test]
async fn test_records_serialize_camel_case() {
    let (_dir, store) = setup_store().await;
    store.create_bucket("b1").await.unwrap();
    store.create_blob("b1", "f").await.unwrap();
    let grant = store.create_grant("b1", "f").await.unwrap();

    let bucket = serde_json::to_value(store.get_bucket("b1").await.unwrap()).unwrap();
    assert!(bucket.get("createdAt").is_some());
    assert_eq!(bucket["blobs"][0]["bucketId"], "b1");
    assert_eq!(bucket["blobs"][0]["size"], 0);

    let grant = serde_json::to_value(grant).unwrap();
    assert_eq!(grant["blobId"], "f");
    assert!(grant["key"].is_string());
}
