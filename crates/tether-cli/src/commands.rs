//! Subcommand implementations.
//!
//! Each command returns data for `main` to print, so the work itself can be
//! tested without capturing stdout.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;
use tether_core::{
    Envelope, EnvelopeHeader, InboxEvent, LoopbackChannel, ReadyState, Storage, TransferEngine,
    TransferRecord, resolve,
};
use tether_files::DirStorage;

use crate::config::Config;

/// Parse a `--params` argument as JSON
pub fn parse_params(raw: Option<&str>) -> anyhow::Result<Option<Value>> {
    raw.map(|text| serde_json::from_str::<Value>(text).context("--params is not valid JSON"))
        .transpose()
}

/// Storage over the configured namespace roots
pub fn config_storage(config: &Config) -> DirStorage {
    DirStorage::new(
        config.storage.assets_dir.clone(),
        config.storage.data_dir.clone(),
    )
}

/// Encode a stored file into an envelope and write it to `output`
pub fn pack(
    storage: &DirStorage,
    path: &str,
    params: Option<Value>,
    session_id: i32,
    output: &Path,
) -> anyhow::Result<Envelope> {
    let resolved = resolve(path)?;
    let content = storage
        .read_all(&resolved)
        .with_context(|| format!("failed to read {resolved}"))?;
    let file_size = u32::try_from(content.len())
        .map_err(|_| anyhow::anyhow!("{resolved} is too large for an envelope"))?;

    let envelope = Envelope {
        session_id,
        file_size,
        file_name: resolved.file_name().to_string(),
        file_path: resolved.qualified(),
        params,
        content,
    };
    let bytes = envelope.encode()?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, &bytes).with_context(|| format!("failed to write {}", output.display()))?;

    tracing::debug!(bytes = bytes.len(), output = %output.display(), "Packed envelope");
    Ok(envelope)
}

/// Read and decode an envelope file
pub fn inspect(input: &Path) -> anyhow::Result<(EnvelopeHeader, Envelope)> {
    let bytes = fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let header = EnvelopeHeader::parse(&bytes)?;
    let envelope = Envelope::decode(&bytes)?;
    Ok((header, envelope))
}

/// Send a stored file between two in-process engines
///
/// The sender reads from the configured namespaces; the receiver writes its
/// `data://` namespace under `output`. Returns the received record.
pub async fn loopback(
    config: &Config,
    path: &str,
    params: Option<Value>,
    output: &Path,
) -> anyhow::Result<TransferRecord> {
    let (near, far) = LoopbackChannel::pair();

    let sender = TransferEngine::new_with_config(
        Arc::new(near),
        Arc::new(config_storage(config)),
        config.transfer.clone(),
    )?;
    let receiver = TransferEngine::new_with_config(
        Arc::new(far),
        Arc::new(DirStorage::new(config.storage.assets_dir.clone(), output)),
        config.transfer.clone(),
    )?;

    let inbox = receiver.get_inbox();
    inbox.on(InboxEvent::NewFile, |record| {
        tracing::info!(
            session_id = record.session_id(),
            file_path = record.file_path(),
            "Incoming file"
        );
    });

    let record = sender.get_outbox().queue_file(path, params)?;
    record.on_change(|event| {
        tracing::info!(state = %event.data.ready_state, "Outbound transfer changed state");
    });
    sender.try_send_files().await?;

    if record.ready_state() != ReadyState::Transferred {
        anyhow::bail!(
            "transfer of {} ended in state {}",
            record.file_path(),
            record.ready_state()
        );
    }

    inbox
        .get_next_file()
        .ok_or_else(|| anyhow::anyhow!("receiver did not queue {}", record.file_path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.assets_dir = dir.path().join("assets");
        config.storage.data_dir = dir.path().join("data");
        fs::create_dir_all(&config.storage.assets_dir).unwrap();
        fs::create_dir_all(&config.storage.data_dir).unwrap();
        fs::write(config.storage.data_dir.join("note.txt"), b"0123456789").unwrap();
        (dir, config)
    }

    #[test]
    fn test_parse_params() {
        assert_eq!(parse_params(None).unwrap(), None);
        assert_eq!(
            parse_params(Some(r#"{"a": [1, 2]}"#)).unwrap(),
            Some(json!({"a": [1, 2]}))
        );
        assert!(parse_params(Some("{not json")).is_err());
    }

    #[test]
    fn test_pack_then_inspect() {
        let (dir, config) = setup();
        let output = dir.path().join("out/note.env");

        let packed = pack(&config_storage(&config), "data://note.txt", None, 7, &output).unwrap();
        assert_eq!(fs::metadata(&output).unwrap().len(), 76);

        let (header, envelope) = inspect(&output).unwrap();
        assert_eq!(header.session_id, 7);
        assert_eq!(header.file_name_len, 16);
        assert_eq!(header.file_path_len, 30);
        assert_eq!(header.params_len, 0);
        assert_eq!(envelope, packed);
    }

    #[test]
    fn test_pack_rejects_bad_paths() {
        let (dir, config) = setup();
        let storage = config_storage(&config);
        let output = dir.path().join("x.env");

        assert!(pack(&storage, "ftp://note.txt", None, 1, &output).is_err());
        assert!(pack(&storage, "data://missing.txt", None, 1, &output).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_inspect_truncated_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("short.env");
        fs::write(&input, [0u8; 12]).unwrap();

        assert!(inspect(&input).is_err());
    }

    #[tokio::test]
    async fn test_loopback_writes_into_output() {
        let (dir, config) = setup();
        let output = dir.path().join("received");

        let received = loopback(&config, "data://note.txt", Some(json!({"via": "cli"})), &output)
            .await
            .unwrap();

        assert_eq!(received.ready_state(), ReadyState::Transferred);
        assert_eq!(received.decoded_params(), Some(json!({"via": "cli"})));
        assert_eq!(fs::read(output.join("note.txt")).unwrap(), b"0123456789");
    }

    #[tokio::test]
    async fn test_loopback_missing_file() {
        let (dir, config) = setup();
        let result = loopback(&config, "data://nope.txt", None, &dir.path().join("r")).await;
        assert!(result.is_err());
    }
}
