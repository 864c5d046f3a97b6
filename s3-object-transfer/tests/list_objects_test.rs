/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use s3_object_transfer::config::RetryConfig;
use s3_object_transfer::error::{Error, ErrorKind};
use s3_object_transfer::store::{
    GetObjectResponse, ListEntry, ListObjectsPage, ListObjectsRequest, ObjectMetadata,
    ObjectRequest, ObjectStore, PutObjectAclRequest, PutObjectRequest,
};
use s3_object_transfer::{Client, Config};
use test_utils::{client, config, setup_tracing, Fault, InMemoryStore, Op, BUCKET};
use tokio::time::Instant;


fn keys(objects: &[s3_object_transfer::TransferObject]) -> Vec<String> {
    objects.iter().map(|o| o.key.clone()).collect()
}

#[tokio::test]
async fn test_list_all_objects() {
    setup_tracing();
    let store = InMemoryStore::with_objects(10, 16);
    let client = client(&store);

    let objects = client.list().await.unwrap();

    let expected: Vec<String> = (0..10).map(|i| format!("key-{i:03}")).collect();
    assert_eq!(expected, keys(&objects));
    let unique: HashSet<_> = objects.iter().map(|o| &o.key).collect();
    assert_eq!(10, unique.len());

    // ceil(10 / 3) pages
    assert_eq!(4, store.calls(Op::ListObjects));
    let markers: Vec<Option<String>> = store
        .list_requests()
        .into_iter()
        .map(|r| r.marker)
        .collect();
    assert_eq!(
        vec![
            None,
            Some("key-002".to_owned()),
            Some("key-005".to_owned()),
            Some("key-008".to_owned())
        ],
        markers
    );

    let first = &objects[0];
    assert_eq!(Some(true), first.is_latest);
    assert_eq!(Some(16), first.content_length);
    assert!(first.e_tag.is_some());
    assert!(first.last_modified.is_some());
    assert!(first.body.is_none());

    assert_eq!(10, client.metrics().objects_listed());
    assert_eq!(4, client.metrics().pages_listed());
}

#[tokio::test]
async fn test_list_exact_multiple_of_page_size() {
    let store = InMemoryStore::with_objects(6, 1);
    let objects = client(&store).list().await.unwrap();
    assert_eq!(6, objects.len());
    assert_eq!(2, store.calls(Op::ListObjects));
}

#[tokio::test]
async fn test_list_empty_bucket() {
    let store = InMemoryStore::new();
    let objects = client(&store).list().await.unwrap();
    assert!(objects.is_empty());
    assert_eq!(1, store.calls(Op::ListObjects));
}

#[tokio::test]
async fn test_list_with_prefix() {
    let store = InMemoryStore::new();
    for key in ["logs/a", "logs/b", "data/c", "logs/d", "other"] {
        store.insert(key, "x");
    }
    let client = Client::new(config(&store).prefix("logs/").build().unwrap());

    let objects = client.list().await.unwrap();

    assert_eq!(vec!["logs/a", "logs/b", "logs/d"], keys(&objects));
    assert!(store
        .list_requests()
        .iter()
        .all(|r| r.prefix.as_deref() == Some("logs/") && r.bucket == BUCKET && r.max_keys == 3));
}

#[tokio::test]
async fn test_list_decodes_keys() {
    let store = InMemoryStore::new();
    let raw_keys = [
        "a/b.txt",
        "hello world",
        "c++/notes.md",
        "percent%20literal",
        "ünïcode/文件.txt",
    ];
    for key in raw_keys {
        store.insert(key, "x");
    }

    let objects = client(&store).list().await.unwrap();

    let mut expected: Vec<String> = raw_keys.iter().map(|k| k.to_string()).collect();
    expected.sort();
    assert_eq!(expected, keys(&objects));
}

#[tokio::test]
async fn test_list_resumes_after_last_key_without_marker() {
    let store = InMemoryStore::new();
    for key in ["dir/a b", "dir/c", "dir/d+e", "dir/f", "dir/g"] {
        store.insert(key, "x");
    }
    store.omit_next_marker();

    let objects = client(&store).list().await.unwrap();

    assert_eq!(
        vec!["dir/a b", "dir/c", "dir/d+e", "dir/f", "dir/g"],
        keys(&objects)
    );
    // marker is the decoded last key of the previous page
    assert_eq!(
        Some("dir/d+e".to_owned()),
        store.list_requests()[1].marker
    );
}

#[tokio::test(start_paused = true)]
async fn test_list_retries_failed_page_with_same_marker() {
    let store = InMemoryStore::with_objects(10, 1);
    store.fail_calls(Op::ListObjects, [2, 3], Fault::Error);
    let client = client(&store);

    let start = Instant::now();
    let objects = client.list().await.unwrap();

    assert_eq!(10, objects.len());
    assert_eq!(6, store.calls(Op::ListObjects));
    assert_eq!(Duration::from_secs(6), start.elapsed());
    assert_eq!(2, client.metrics().retries());

    let requests = store.list_requests();
    assert_eq!(requests[1].marker, requests[2].marker);
    assert_eq!(requests[1].marker, requests[3].marker);
}

#[tokio::test(start_paused = true)]
async fn test_list_retry_budget_shared_across_pages() {
    let store = InMemoryStore::with_objects(10, 1);
    // two failures on the second page and two more on the third: four in total
    store.fail_calls(Op::ListObjects, [2, 3, 5, 6], Fault::Error);
    let client = client(&store);

    let err = client.list().await.unwrap_err();

    assert_eq!(&ErrorKind::RetriesExhausted, err.kind());
    assert_eq!(6, err.objects().len());
    assert_eq!(6, store.calls(Op::ListObjects));
    assert_eq!(1, client.metrics().failed_operations());

    let (objects, source) = err.into_parts();
    assert_eq!("key-005", objects[5].key);
    assert_eq!(&ErrorKind::RetriesExhausted, source.kind());
}

#[tokio::test(start_paused = true)]
async fn test_list_cancelled_returns_partial_results() {
    let store = InMemoryStore::with_objects(10, 1);
    store.fail_calls(Op::ListObjects, [2], Fault::Hang);
    let client = client(&store);

    let canceller = {
        let client = client.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            client.cancel();
        })
    };

    let start = Instant::now();
    let err = client.list().await.unwrap_err();

    assert_eq!(&ErrorKind::OperationCancelled, err.kind());
    assert!(err.error().is_cancellation());
    assert_eq!(3, err.objects().len());
    assert_eq!(Duration::from_secs(1), start.elapsed());
    assert_eq!(2, store.calls(Op::ListObjects));
    canceller.await.unwrap();

    // a cancelled client fails every later operation without calling the store
    let err = client.list().await.unwrap_err();
    assert_eq!(&ErrorKind::OperationCancelled, err.kind());
    assert_eq!(2, store.calls(Op::ListObjects));
}

#[tokio::test(start_paused = true)]
async fn test_list_operation_timeout() {
    let store = InMemoryStore::with_objects(10, 1);
    store.fail_calls(Op::ListObjects, 2..=10, Fault::Error);
    let client = Client::new(
        config(&store)
            .operation_timeout(Duration::from_secs(5))
            .build()
            .unwrap(),
    );

    let start = Instant::now();
    let err = client.list().await.unwrap_err();

    assert_eq!(&ErrorKind::OperationCancelled, err.kind());
    assert_eq!(3, err.objects().len());
    assert_eq!(Duration::from_secs(5), start.elapsed());
    // attempts at 0s (page one), 0s and 3s (page two)
    assert_eq!(3, store.calls(Op::ListObjects));
}

#[tokio::test]
async fn test_list_to_bounded_channel() {
    let store = InMemoryStore::with_objects(25, 1);
    let client = client(&store);
    let (tx, rx) = async_channel::bounded(2);

    let producer = async {
        let result = client.list_to(&tx).await;
        tx.close();
        result
    };
    let consumer = async {
        let mut received = Vec::new();
        while let Ok(object) = rx.recv().await {
            received.push(object.key);
        }
        received
    };

    let (sent, received) = futures_util::future::join(producer, consumer).await;

    assert_eq!(25, sent.unwrap());
    assert_eq!(25, received.len());
    assert_eq!("key-000", received[0]);
    assert_eq!("key-024", received[24]);
}

#[tokio::test]
async fn test_list_to_stops_when_receivers_dropped() {
    let store = InMemoryStore::with_objects(25, 1);
    let client = client(&store);
    let (tx, rx) = async_channel::bounded(1);

    let producer = {
        let client = client.clone();
        tokio::spawn(async move { client.list_to(&tx).await })
    };

    for _ in 0..2 {
        rx.recv().await.unwrap();
    }
    drop(rx);

    let delivered = producer.await.unwrap().unwrap();
    assert!((2..=3).contains(&delivered), "delivered {delivered}");
    assert!(store.calls(Op::ListObjects) < 9);
}

#[tokio::test(start_paused = true)]
async fn test_list_to_cancelled_while_channel_full() {
    let store = InMemoryStore::with_objects(25, 1);
    let client = client(&store);
    let (tx, _rx) = async_channel::bounded(1);

    let canceller = {
        let client = client.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            client.cancel();
        })
    };

    let err = client.list_to(&tx).await.unwrap_err();
    assert_eq!(&ErrorKind::OperationCancelled, err.kind());
    canceller.await.unwrap();
}

#[tokio::test]
async fn test_list_stream() {
    let store = InMemoryStore::with_objects(7, 1);
    let client = client(&store);
    let mut stream = client.list_stream();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!("key-000", first.key);
    // pages are fetched lazily
    assert_eq!(1, store.calls(Op::ListObjects));

    let mut count = 1;
    while let Some(object) = stream.next().await {
        object.unwrap();
        count += 1;
    }
    assert_eq!(7, count);
    assert_eq!(3, store.calls(Op::ListObjects));
    assert!(stream.next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_list_stream_ends_after_error() {
    let store = InMemoryStore::with_objects(7, 1);
    store.fail_calls(Op::ListObjects, 2..=5, Fault::Error);
    let client = Client::new(
        config(&store)
            .retry_config(RetryConfig::new(1, Duration::from_millis(100)))
            .build()
            .unwrap(),
    );
    let mut stream = client.list_stream();

    for _ in 0..3 {
        stream.next().await.unwrap().unwrap();
    }
    let err = stream.next().await.unwrap().unwrap_err();
    assert_eq!(&ErrorKind::RetriesExhausted, err.kind());
    assert!(stream.next().await.is_none());
    assert_eq!(3, store.calls(Op::ListObjects));
}

/// Store replaying a fixed sequence of listing pages
#[derive(Debug)]
struct ScriptedPages {
    pages: Vec<ListObjectsPage>,
    calls: Arc<AtomicU32>,
}

impl ScriptedPages {
    fn new(pages: Vec<ListObjectsPage>) -> (Self, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let store = Self {
            pages,
            calls: calls.clone(),
        };
        (store, calls)
    }
}

fn page(keys: &[&str], next_marker: Option<&str>, is_last_page: bool) -> ListObjectsPage {
    ListObjectsPage {
        entries: keys
            .iter()
            .map(|key| ListEntry {
                key: key.to_string(),
                ..Default::default()
            })
            .collect(),
        next_marker: next_marker.map(str::to_owned),
        is_last_page,
    }
}

#[async_trait]
impl ObjectStore for ScriptedPages {
    async fn list_objects(&self, _request: ListObjectsRequest) -> Result<ListObjectsPage, Error> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
        Ok(self.pages[call].clone())
    }

    async fn head_object(&self, _request: ObjectRequest) -> Result<ObjectMetadata, Error> {
        unimplemented!()
    }

    async fn get_object(&self, _request: ObjectRequest) -> Result<GetObjectResponse, Error> {
        unimplemented!()
    }

    async fn put_object(&self, _request: PutObjectRequest) -> Result<(), Error> {
        unimplemented!()
    }

    async fn put_object_acl(&self, _request: PutObjectAclRequest) -> Result<(), Error> {
        unimplemented!()
    }
}

fn scripted_client(store: ScriptedPages) -> Client {
    let config = Config::builder()
        .bucket(BUCKET)
        .store(store)
        .build()
        .unwrap();
    Client::new(config)
}

#[tokio::test]
async fn test_list_keeps_polling_empty_pages() {
    let (store, calls) = ScriptedPages::new(vec![
        page(&["a"], Some("a"), false),
        page(&[], Some("m"), false),
        page(&[], Some("t"), false),
        page(&["x", "y%2Fz"], None, true),
    ]);

    let objects = scripted_client(store).list().await.unwrap();

    assert_eq!(vec!["a", "x", "y/z"], keys(&objects));
    assert_eq!(4, calls.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_list_empty_truncated_page_without_marker_fails() {
    let (store, calls) = ScriptedPages::new(vec![
        page(&["a", "b"], Some("b"), false),
        page(&[], None, false),
    ]);

    let err = scripted_client(store).list().await.unwrap_err();

    assert_eq!(&ErrorKind::RuntimeError, err.kind());
    assert_eq!(vec!["a", "b"], keys(err.objects()));
    assert_eq!(2, calls.load(Ordering::SeqCst));
}
