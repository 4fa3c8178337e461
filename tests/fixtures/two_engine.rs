//! Two-engine test fixture for integration testing
//!
//! Connects a sender and a receiver engine over a loopback channel, each
//! with its own on-disk namespaces under one temporary directory.
//!
//! # Example
//!
//! ```no_run
//! use tether_core::Namespace;
//! use tether_integration_tests::fixtures::TwoEngineFixture;
//!
//! #[tokio::test]
//! async fn test_basic_transfer() {
//!     let fixture = TwoEngineFixture::new();
//!     fixture.put_sender_file(Namespace::Data, "a.txt", b"hello");
//!
//!     let inbox = fixture.receiver.get_inbox();
//!     fixture.sender.enqueue_outbound("data://a.txt", None).await.unwrap();
//!     assert!(inbox.get_next_file().is_some());
//! }
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use tether_core::{LoopbackChannel, Namespace, TransferConfig, TransferEngine};
use tether_files::DirStorage;

/// Sender and receiver engines joined by a loopback channel
pub struct TwoEngineFixture {
    /// Engine that enqueues files
    pub sender: TransferEngine,
    /// Engine that receives files
    pub receiver: TransferEngine,
    /// Sender's end of the channel, for raw requests and closing
    pub sender_channel: LoopbackChannel,
    sender_storage: DirStorage,
    receiver_storage: DirStorage,
    _dir: TempDir,
}

impl TwoEngineFixture {
    /// Create a fixture with the default configuration
    pub fn new() -> Self {
        Self::with_config(TransferConfig::default())
    }

    /// Create a fixture whose engines share `config`
    pub fn with_config(config: TransferConfig) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let sender_storage = storage_under(dir.path().join("sender"));
        let receiver_storage = storage_under(dir.path().join("receiver"));

        let (near, far) = LoopbackChannel::pair();
        let sender = TransferEngine::new_with_config(
            Arc::new(near.clone()),
            Arc::new(sender_storage.clone()),
            config.clone(),
        )
        .expect("sender engine");
        let receiver = TransferEngine::new_with_config(
            Arc::new(far),
            Arc::new(receiver_storage.clone()),
            config,
        )
        .expect("receiver engine");

        Self {
            sender,
            receiver,
            sender_channel: near,
            sender_storage,
            receiver_storage,
            _dir: dir,
        }
    }

    /// Place a file in the sender's storage, bypassing the read-only check
    pub fn put_sender_file(&self, namespace: Namespace, path: &str, content: &[u8]) {
        put(&self.sender_storage, namespace, path, content);
    }

    /// Place a file in the receiver's storage, bypassing the read-only check
    pub fn put_receiver_file(&self, namespace: Namespace, path: &str, content: &[u8]) {
        put(&self.receiver_storage, namespace, path, content);
    }

    /// Content of a file in the receiver's storage
    pub fn receiver_file(&self, namespace: Namespace, path: &str) -> Option<Vec<u8>> {
        fs::read(self.receiver_storage.root(namespace).join(path)).ok()
    }

    /// Root directory of one of the receiver's namespaces
    pub fn receiver_root(&self, namespace: Namespace) -> PathBuf {
        self.receiver_storage.root(namespace).to_path_buf()
    }
}

impl Default for TwoEngineFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn storage_under(base: PathBuf) -> DirStorage {
    let storage = DirStorage::new(base.join("assets"), base.join("data"));
    for namespace in [Namespace::Assets, Namespace::Data] {
        fs::create_dir_all(storage.root(namespace)).expect("create namespace root");
    }
    storage
}

fn put(storage: &DirStorage, namespace: Namespace, path: &str, content: &[u8]) {
    let file = storage.root(namespace).join(path);
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(file, content).expect("write fixture file");
}
