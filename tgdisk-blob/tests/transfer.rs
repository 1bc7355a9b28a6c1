use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use rand::Rng;

use tgdisk_blob::prelude::*;
use tgdisk_blob::{Manifest, StoreTarget, MANIFEST_NAME};

const KIB: usize = 1024;
const MIB: usize = 1024 * 1024;

/// Test factory functions
fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn body_of(data: &[u8], read_size: usize) -> ByteStream {
    let reads: Vec<Result<Bytes, std::io::Error>> = data
        .chunks(read_size.max(1))
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    Box::pin(stream::iter(reads))
}

fn config(chunk: usize, workers: usize) -> TransferConfig {
    TransferConfig::new()
        .with_chunk_size(chunk as u64)
        .with_workers(workers)
}

async fn round_trip(
    adapter: &TransferAdapter,
    data: &[u8],
    declared: Option<u64>,
) -> UploadReceipt {
    let receipt = adapter
        .upload("payload.bin", body_of(data, 7 * KIB + 3), declared)
        .await
        .unwrap();
    let opened = adapter.download(&receipt.reference).await.unwrap();
    assert_eq!(opened.filename, "payload.bin");
    let restored = opened.into_bytes().await.unwrap();
    assert_eq!(restored.len(), data.len());
    assert!(restored == data, "content differs after round trip");
    receipt
}

fn piece_sizes(store: &MemoryBlobStore, manifest: &Handle) -> Vec<usize> {
    let raw = store.get(manifest).unwrap().data;
    let manifest = Manifest::decode(&raw).unwrap();
    manifest
        .handles()
        .iter()
        .map(|h| store.get(h).unwrap().data.len())
        .collect()
}

/// Delays fetches so that later pieces finish first
#[derive(Clone, Default)]
struct ReversedFetchStore {
    inner: MemoryBlobStore,
    indices: Arc<Mutex<HashMap<Handle, usize>>>,
}

#[async_trait]
impl BlobStore for ReversedFetchStore {
    async fn store(&self, put: BlobPut, body: Bytes) -> BlobResult<Handle> {
        let index = match put.kind {
            BlobKind::Piece { index } => Some(index),
            _ => None,
        };
        let handle = self.inner.store(put, body).await?;
        if let Some(index) = index {
            self.indices.lock().insert(handle.clone(), index);
        }
        Ok(handle)
    }

    async fn fetch(&self, handle: &Handle) -> BlobResult<Bytes> {
        let index = self.indices.lock().get(handle).copied();
        if let Some(index) = index {
            let wait = 10u64.saturating_sub(index as u64) * 8;
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }
        self.inner.fetch(handle).await
    }

    fn capabilities(&self) -> StoreCapabilities {
        self.inner.capabilities()
    }
}

/// Fails any store of the given kind; counts attempts
#[derive(Clone)]
struct FailingStore {
    inner: MemoryBlobStore,
    fail_on: BlobKind,
    attempts: Arc<AtomicUsize>,
    delay: Duration,
}

impl FailingStore {
    fn new(fail_on: BlobKind) -> Self {
        Self {
            inner: MemoryBlobStore::new(),
            fail_on,
            attempts: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl BlobStore for FailingStore {
    async fn store(&self, put: BlobPut, body: Bytes) -> BlobResult<Handle> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if put.kind == self.fail_on {
            return Err(BlobError::rejected(format!("refusing {}", put.name)));
        }
        tokio::time::sleep(self.delay).await;
        self.inner.store(put, body).await
    }

    async fn fetch(&self, handle: &Handle) -> BlobResult<Bytes> {
        self.inner.fetch(handle).await
    }

    fn capabilities(&self) -> StoreCapabilities {
        self.inner.capabilities()
    }
}

/// Counts operations in flight and remembers the peak
#[derive(Clone, Default)]
struct InFlightStore {
    inner: MemoryBlobStore,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl InFlightStore {
    async fn observe<F, T>(&self, operation: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let jitter = rand::thread_rng().gen_range(1..6);
        tokio::time::sleep(Duration::from_millis(jitter)).await;
        let result = operation.await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn take_peak(&self) -> usize {
        self.peak.swap(0, Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for InFlightStore {
    async fn store(&self, put: BlobPut, body: Bytes) -> BlobResult<Handle> {
        self.observe(self.inner.store(put, body)).await
    }

    async fn fetch(&self, handle: &Handle) -> BlobResult<Bytes> {
        self.observe(self.inner.fetch(handle)).await
    }

    fn capabilities(&self) -> StoreCapabilities {
        self.inner.capabilities()
    }
}

/// R1. Sizes around the chunk boundary survive a round trip
#[tokio::test]
async fn test_round_trip_around_chunk_boundary() {
    let chunk = 64 * KIB;
    let store = MemoryBlobStore::new();
    let adapter = TransferAdapter::new(store, config(chunk, 3)).unwrap();

    let cases = [(chunk - 1, 1), (chunk, 1), (chunk + 1, 2), (2 * chunk, 2), (0, 1)];
    for (len, chunked_pieces) in cases {
        let data = patterned(len);

        // declared size: small files go direct
        let receipt = round_trip(&adapter, &data, Some(len as u64)).await;
        if len > 0 && len <= chunk {
            assert!(!receipt.reference.is_manifest(), "len {len}");
            assert_eq!(receipt.pieces, 1);
        } else {
            assert!(receipt.reference.is_manifest(), "len {len}");
            assert_eq!(receipt.pieces, chunked_pieces, "len {len}");
        }

        // unknown size: always through a manifest
        let receipt = round_trip(&adapter, &data, None).await;
        assert!(receipt.reference.is_manifest());
        assert_eq!(receipt.pieces, chunked_pieces, "len {len}");
        assert_eq!(receipt.size_bytes, len as u64);
    }
}

/// R2. Piece sizes are C except the last, never a trailing empty piece
#[tokio::test]
async fn test_piece_sizes_follow_chunk_size() {
    let chunk = 1000;
    let store = MemoryBlobStore::new();
    let adapter = TransferAdapter::new(store.clone(), config(chunk, 2)).unwrap();

    for (len, expected) in [
        (2500, vec![1000, 1000, 500]),
        (3000, vec![1000, 1000, 1000]),
        (1, vec![1]),
        (0, vec![0]),
    ] {
        let receipt = adapter
            .upload("sizes.bin", body_of(&patterned(len), 333), None)
            .await
            .unwrap();
        assert_eq!(piece_sizes(&store, receipt.reference.handle()), expected, "len {len}");
    }
}

/// R3. 45 "MiB" at C = 20 "MiB", scaled down to KiB
#[tokio::test]
async fn test_forty_five_scaled() {
    let store = MemoryBlobStore::new();
    let adapter = TransferAdapter::new(store.clone(), config(20 * KIB, 4)).unwrap();
    let data = patterned(45 * KIB);

    let receipt = round_trip(&adapter, &data, Some(data.len() as u64)).await;

    assert_eq!(receipt.pieces, 3);
    assert_eq!(
        piece_sizes(&store, receipt.reference.handle()),
        vec![20 * KIB, 20 * KIB, 5 * KIB]
    );
    assert_eq!(store.len(), 4);
    assert_eq!(store.count_where(|b| b.kind == BlobKind::Manifest), 1);
}

/// R4. The same shape at full size with the default configuration
#[tokio::test]
async fn test_forty_five_mib_full_size() {
    let store = MemoryBlobStore::new().with_max_item_bytes(20 * MIB as u64);
    let adapter = TransferAdapter::new(store.clone(), TransferConfig::default()).unwrap();
    let data = patterned(45 * MIB);

    let receipt = adapter
        .upload("big.mkv", body_of(&data, 256 * KIB), Some(data.len() as u64))
        .await
        .unwrap();

    assert!(receipt.reference.is_manifest());
    assert_eq!(
        piece_sizes(&store, receipt.reference.handle()),
        vec![20 * MIB, 20 * MIB, 5 * MIB]
    );
    assert_eq!(store.len(), 4);

    let restored = adapter
        .download(&receipt.reference)
        .await
        .unwrap()
        .into_bytes()
        .await
        .unwrap();
    assert!(restored == data[..]);
}

/// R5. Manifest blob carries the filename and handles in order
#[tokio::test]
async fn test_manifest_blob_contents() {
    let store = MemoryBlobStore::new();
    let adapter = TransferAdapter::new(store.clone(), config(10, 2)).unwrap();

    let receipt = adapter
        .upload("holiday video.mp4", body_of(&patterned(35), 4), None)
        .await
        .unwrap();

    let stored = store.get(receipt.reference.handle()).unwrap();
    assert_eq!(stored.name, MANIFEST_NAME);
    let manifest = Manifest::decode(&stored.data).unwrap();
    assert_eq!(manifest.filename(), "holiday video.mp4");
    assert_eq!(manifest.len(), 4);
    for (i, handle) in manifest.handles().iter().enumerate() {
        assert_eq!(store.get(handle).unwrap().kind, BlobKind::Piece { index: i });
    }
}

/// O1. Output order follows the manifest when fetches finish in reverse
#[tokio::test]
async fn test_reassembly_order_with_reversed_completion() {
    let store = ReversedFetchStore::default();
    let adapter = TransferAdapter::new(store, config(100, 4)).unwrap();
    let data = patterned(950);

    let receipt = round_trip(&adapter, &data, None).await;
    assert_eq!(receipt.pieces, 10);
}

/// F1. Piece 2 of 5 failing aborts the upload without a manifest
#[tokio::test]
async fn test_failed_piece_aborts_upload() {
    let store = FailingStore::new(BlobKind::Piece { index: 2 });
    let adapter = TransferAdapter::new(store.clone(), config(16, 2)).unwrap();

    let err = adapter
        .upload("five.bin", body_of(&patterned(80), 16), None)
        .await
        .unwrap_err();

    assert_eq!(err.failed_piece(), Some(2));
    assert!(matches!(
        err,
        TransferError::StoreFailure { target: StoreTarget::Piece(2), .. }
    ));
    assert_eq!(store.inner.count_where(|b| b.kind == BlobKind::Manifest), 0);
}

/// F2. Nothing new is submitted once a store has failed
#[tokio::test]
async fn test_no_submissions_after_failure() {
    let store =
        FailingStore::new(BlobKind::Piece { index: 0 }).with_delay(Duration::from_millis(5));
    let adapter = TransferAdapter::new(store.clone(), config(4, 1)).unwrap();

    let err = adapter
        .upload("many.bin", body_of(&patterned(80), 4), None)
        .await
        .unwrap_err();

    assert_eq!(err.failed_piece(), Some(0));
    assert!(store.attempts.load(Ordering::SeqCst) < 20);
    assert!(store.inner.is_empty());
}

/// F3. Manifest store failure is reported as such
#[tokio::test]
async fn test_manifest_store_failure() {
    let store = FailingStore::new(BlobKind::Manifest);
    let adapter = TransferAdapter::new(store.clone(), config(8, 2)).unwrap();

    let err = adapter
        .upload("a.bin", body_of(&patterned(20), 8), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransferError::StoreFailure { target: StoreTarget::Manifest, .. }
    ));
    assert_eq!(store.inner.len(), 3);
}

/// F4. A read error from the client stream is an input error
#[tokio::test]
async fn test_broken_upload_stream() {
    let store = MemoryBlobStore::new();
    let adapter = TransferAdapter::new(store.clone(), config(8, 2)).unwrap();
    let body: ByteStream = Box::pin(stream::iter(vec![
        Ok(Bytes::from(patterned(20))),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionAborted, "client hung up")),
    ]));

    let err = adapter.upload("cut.bin", body, None).await.unwrap_err();

    assert!(matches!(err, TransferError::Input { .. }));
    assert_eq!(store.count_where(|b| b.kind == BlobKind::Manifest), 0);
}

/// C1. W = 4 never has more than 4 operations in flight
#[tokio::test]
async fn test_in_flight_limit() {
    let store = InFlightStore::default();
    let adapter = TransferAdapter::new(store.clone(), config(10, 4)).unwrap();
    let data = patterned(100);

    let receipt = adapter
        .upload("inflight.bin", body_of(&data, 10), None)
        .await
        .unwrap();
    assert_eq!(receipt.pieces, 10);
    let upload_peak = store.take_peak();
    assert!(upload_peak <= 4, "upload peak {upload_peak}");
    assert!(upload_peak > 1, "uploads ran one at a time");

    let restored = adapter
        .download(&receipt.reference)
        .await
        .unwrap()
        .into_bytes()
        .await
        .unwrap();
    assert!(restored == data[..]);
    let download_peak = store.take_peak();
    assert!(download_peak <= 4, "download peak {download_peak}");
}

/// Counts fetches started and finished, each finishing after `delay`
#[derive(Clone, Default)]
struct CountingFetchStore {
    inner: MemoryBlobStore,
    started: Arc<AtomicUsize>,
    finished: Arc<AtomicUsize>,
    delay: Duration,
}

#[async_trait]
impl BlobStore for CountingFetchStore {
    async fn store(&self, put: BlobPut, body: Bytes) -> BlobResult<Handle> {
        self.inner.store(put, body).await
    }

    async fn fetch(&self, handle: &Handle) -> BlobResult<Bytes> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let data = self.inner.fetch(handle).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        data
    }

    fn capabilities(&self) -> StoreCapabilities {
        self.inner.capabilities()
    }
}

/// C2. Piece i + W is not fetched before piece i has been emitted
#[tokio::test]
async fn test_reorder_window_bounds_fetches() {
    let store = CountingFetchStore::default();
    let adapter = TransferAdapter::new(store.clone(), config(10, 2)).unwrap();
    let receipt = adapter
        .upload("window.bin", body_of(&patterned(50), 10), None)
        .await
        .unwrap();
    assert_eq!(receipt.pieces, 5);

    let mut body = adapter.download(&receipt.reference).await.unwrap().body;
    let manifest_fetches = store.started.load(Ordering::SeqCst);
    assert_eq!(manifest_fetches, 1);

    let first = body.next().await.unwrap().unwrap();
    assert_eq!(first.len(), 10);
    tokio::time::sleep(Duration::from_millis(20)).await;
    let piece_fetches = store.started.load(Ordering::SeqCst) - manifest_fetches;
    assert!(piece_fetches <= 2, "{piece_fetches} pieces fetched after one was emitted");

    let mut rest = 0;
    while let Some(chunk) = body.next().await {
        rest += chunk.unwrap().len();
    }
    assert_eq!(rest, 40);
}

/// C3. Dropping a download mid-stream abandons its outstanding fetches
#[tokio::test]
async fn test_dropped_download_aborts_fetches() {
    let store = CountingFetchStore {
        delay: Duration::from_millis(200),
        ..Default::default()
    };
    let seed = TransferAdapter::new(store.inner.clone(), config(10, 4)).unwrap();
    let receipt = seed
        .upload("slow.bin", body_of(&patterned(50), 10), None)
        .await
        .unwrap();

    let adapter = TransferAdapter::new(store.clone(), config(10, 4)).unwrap();
    let mut opened = adapter.download(&receipt.reference).await.unwrap();
    assert_eq!(store.finished.load(Ordering::SeqCst), 1);

    let pending = tokio::time::timeout(Duration::from_millis(50), opened.body.next()).await;
    assert!(pending.is_err(), "first piece arrived before its fetch delay");
    assert!(store.started.load(Ordering::SeqCst) > 1);
    drop(opened);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(store.finished.load(Ordering::SeqCst), 1);
}

/// C4. Store ceilings are enforced when building the adapter
#[tokio::test]
async fn test_config_checked_against_store() {
    let store = MemoryBlobStore::new().with_max_item_bytes(1024);
    let err = TransferAdapter::new(store, config(2048, 4)).err().unwrap();
    assert!(matches!(err, TransferError::Config { .. }));
}
