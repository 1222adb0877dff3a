//! Record-level snapshot decoding and the hand-off into the live store.

use super::reader::ByteReader;
use super::{op_code, value_type, SnapshotError, FILE_START_KEY, MAX_VERSION, SIGNATURE};
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Flat view of a snapshot: metadata, auxiliary fields and one rendered
/// entry per database section.
pub type SnapshotResult = BTreeMap<String, String>;

/// Absolute expiry attached to a snapshot key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotExpiry {
    /// Unix time in milliseconds (opcode `0xFC`)
    Milliseconds(u64),
    /// Unix time in seconds (opcode `0xFD`)
    Seconds(u32),
}

impl SnapshotExpiry {
    /// The expiry as wall-clock time, or `None` if it does not fit in a `SystemTime`.
    pub fn deadline(&self) -> Option<SystemTime> {
        let since_epoch = match *self {
            SnapshotExpiry::Milliseconds(ms) => Duration::from_millis(ms),
            SnapshotExpiry::Seconds(secs) => Duration::from_secs(secs.into()),
        };
        UNIX_EPOCH.checked_add(since_epoch)
    }
}

/// One string key/value record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub key: Bytes,
    pub value: Bytes,
    pub expiry: Option<SnapshotExpiry>,
}

/// One database section, introduced by a select-db opcode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Database {
    pub index: u8,
    pub hash_table_size: Option<usize>,
    pub expiry_table_size: Option<usize>,
    pub entries: Vec<SnapshotEntry>,
}

impl Database {
    fn new(index: u8) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    /// Renders the section as `map[k:v ...]` with keys in sorted order.
    ///
    /// The size hints share the namespace with stored keys and take
    /// precedence: a key named `databaseHashTableSize` or
    /// `databaseExpiryHashTableSize` is left out of the rendering when the
    /// matching hint is present. It is still available in [`Database::entries`].
    fn render(&self) -> String {
        let mut fields = BTreeMap::new();
        for entry in &self.entries {
            fields.insert(
                String::from_utf8_lossy(&entry.key).into_owned(),
                String::from_utf8_lossy(&entry.value).into_owned(),
            );
        }
        if let Some(size) = self.hash_table_size {
            fields.insert("databaseHashTableSize".to_string(), size.to_string());
        }
        if let Some(size) = self.expiry_table_size {
            fields.insert("databaseExpiryHashTableSize".to_string(), size.to_string());
        }

        let body: Vec<String> = fields
            .into_iter()
            .map(|(key, value)| format!("{}:{}", key, value))
            .collect();
        format!("map[{}]", body.join(" "))
    }
}

/// A decoded snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// `rdbFileStart` plus every auxiliary field, later fields winning.
    pub metadata: BTreeMap<String, String>,
    /// Database sections in file order.
    pub databases: Vec<Database>,
}

impl Snapshot {
    /// Flattens the snapshot into a single string mapping.
    ///
    /// Each database becomes one `dbNumbers<index>` entry. Expiry times are
    /// not part of the rendered values; they are available on
    /// [`SnapshotEntry::expiry`].
    pub fn to_map(&self) -> SnapshotResult {
        let mut result = self.metadata.clone();
        for db in &self.databases {
            result.insert(format!("dbNumbers{}", db.index), db.render());
        }
        result
    }

    /// Number of key/value records across all databases.
    pub fn key_count(&self) -> usize {
        self.databases.iter().map(|db| db.entries.len()).sum()
    }

    /// Installs every record into `engine`.
    ///
    /// Records whose expiry has already passed are skipped; the others keep
    /// the time they have left as their TTL. Returns the number installed.
    pub fn restore_into(&self, engine: &StorageEngine) -> usize {
        let now = SystemTime::now();
        let mut restored = 0;

        for entry in self.databases.iter().flat_map(|db| db.entries.iter()) {
            let ttl = match entry.expiry.map(|e| e.deadline()) {
                None | Some(None) => None,
                Some(Some(deadline)) => match deadline.duration_since(now) {
                    Ok(left) if !left.is_zero() => Some(left),
                    _ => {
                        debug!(key = ?entry.key, "Skipping expired snapshot key");
                        continue;
                    }
                },
            };

            engine.set(entry.key.clone(), entry.value.clone(), ttl);
            restored += 1;
        }

        restored
    }
}

/// Decodes a complete snapshot buffer.
pub fn decode(buf: &[u8]) -> Result<Snapshot, SnapshotError> {
    let mut reader = ByteReader::new(buf);
    let mut snapshot = Snapshot::default();

    let signature = reader.read_exact(SIGNATURE.len())?;
    if signature != SIGNATURE {
        return Err(SnapshotError::BadSignature(
            String::from_utf8_lossy(signature).into_owned(),
        ));
    }

    let version_bytes = reader.read_exact(4)?;
    let version_text = String::from_utf8_lossy(version_bytes).into_owned();
    match version_text.parse::<i64>() {
        Ok(version) if (0..=i64::from(MAX_VERSION)).contains(&version) => {}
        _ => return Err(SnapshotError::UnsupportedVersion(version_text)),
    }

    snapshot.metadata.insert(
        FILE_START_KEY.to_string(),
        format!("{}{}", String::from_utf8_lossy(SIGNATURE), version_text),
    );

    loop {
        match reader.read_u8()? {
            op_code::AUX => {
                let key = reader.read_length_encoded()?;
                let value = reader.read_length_encoded()?;
                snapshot.metadata.insert(key.to_text(), value.to_text());
            }
            op_code::SELECTDB => {
                let index = reader.read_u8()?;
                let (db, at_eof) = decode_database(&mut reader, index)?;
                snapshot.databases.push(db);
                if at_eof {
                    return Ok(snapshot);
                }
            }
            op_code::EOF => return Ok(snapshot),
            other => return Err(SnapshotError::InvalidOpcode(other)),
        }
    }
}

/// Decodes one database section.
///
/// Returns the section and whether the end-of-file opcode was reached.
fn decode_database(
    reader: &mut ByteReader<'_>,
    index: u8,
) -> Result<(Database, bool), SnapshotError> {
    let mut db = Database::new(index);

    loop {
        match reader.read_u8()? {
            op_code::RESIZEDB => {
                db.hash_table_size = Some(reader.read_length()?);
                db.expiry_table_size = Some(reader.read_length()?);
            }
            op_code::EXPIRETIME_MS => {
                let expiry = SnapshotExpiry::Milliseconds(reader.read_u64_be()?);
                let kind = reader.read_u8()?;
                db.entries.push(read_entry(reader, kind, Some(expiry))?);
            }
            op_code::EXPIRETIME => {
                let expiry = SnapshotExpiry::Seconds(reader.read_u32_be()?);
                let kind = reader.read_u8()?;
                db.entries.push(read_entry(reader, kind, Some(expiry))?);
            }
            op_code::SELECTDB => {
                // Next section starts here; leave the opcode for the outer loop
                reader.unread();
                return Ok((db, false));
            }
            op_code::EOF => return Ok((db, true)),
            kind => db.entries.push(read_entry(reader, kind, None)?),
        }
    }
}

fn read_entry(
    reader: &mut ByteReader<'_>,
    kind: u8,
    expiry: Option<SnapshotExpiry>,
) -> Result<SnapshotEntry, SnapshotError> {
    if kind != value_type::STRING {
        return Err(SnapshotError::UnsupportedValueType(kind));
    }

    let key = reader.read_length_encoded()?.into_bytes();
    let value = reader.read_length_encoded()?.into_bytes();

    Ok(SnapshotEntry { key, value, expiry })
}

/// Reads and decodes the snapshot at `path`.
///
/// Returns `Ok(None)` if the file does not exist.
pub async fn load_file(path: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    let buf = match tokio::fs::read(path).await {
        Ok(buf) => buf,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    debug!(path = %path.display(), bytes = buf.len(), "Read snapshot file");
    decode(&buf).map(Some)
}
