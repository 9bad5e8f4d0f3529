//! JSON file note store
//!
//! One file per deck under a root directory:
//!
//! ```json
//! { "deckId": "...", "notes": [ { "id": "...", "title": "...", "content": [...] } ], "tree": "[...]" }
//! ```
//!
//! Note content is stored as its JSON document. The sidebar tree is a separate
//! JSON-encoded string field so it never mixes with note records. With a
//! [`Cipher`] configured, each note's `title` and `content` and the tree
//! string are encrypted with [`encrypt_value`]; ids and timestamps stay plain.
//! Those fields always go through [`escape_plaintext`] first, so a title that
//! starts with the ciphertext sentinel is stored as text, not mistaken for it.
//!
//! Every write is a read-modify-write of the whole file, serialized by a lock
//! and committed by renaming a temporary file over the old one.

use super::encryption::{
    decrypt_value, encrypt_value, escape_plaintext, is_encrypted, unescape_plaintext, Cipher,
};
use super::error::DatabaseError;
use super::events::DomainEvent;
use super::note_store::NoteStore;
use crate::models::{DeckSession, DeckSnapshot, Note, NoteCollection, NoteTree, NoteUpdate};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Note fields that are encrypted at rest
const SEALED_FIELDS: [&str; 2] = ["title", "content"];

/// On-disk shape of a deck file
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeckFile {
    deck_id: String,
    #[serde(default)]
    notes: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tree: Option<Value>,
}

/// Decoded deck contents
#[derive(Debug, Default)]
struct DeckContents {
    notes: NoteCollection,
    tree: NoteTree,
}

pub struct JsonFileStore {
    root: PathBuf,
    cipher: Option<Arc<dyn Cipher>>,
    write_lock: Mutex<()>,
    event_tx: broadcast::Sender<DomainEvent>,
}

impl JsonFileStore {
    /// Store deck files under `root`; the directory is created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            root: root.into(),
            cipher: None,
            write_lock: Mutex::new(()),
            event_tx,
        }
    }

    /// Encrypt note titles, content and the tree at rest
    pub fn with_cipher(mut self, cipher: Arc<dyn Cipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }

    /// Path of the file backing `deck_id`
    pub fn deck_path(&self, deck_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", deck_file_stem(deck_id)))
    }

    async fn read_deck(&self, deck_id: &str) -> Result<DeckContents, DatabaseError> {
        let path = self.deck_path(deck_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(DeckContents::default());
            }
            Err(e) => return Err(DatabaseError::io(path, e)),
        };
        let file: DeckFile = serde_json::from_slice(&bytes)?;
        self.decode(file)
    }

    async fn write_deck(&self, deck_id: &str, contents: &DeckContents) -> Result<(), DatabaseError> {
        let file = self.encode(deck_id, contents)?;
        let bytes = serde_json::to_vec_pretty(&file)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| DatabaseError::io(&self.root, e))?;
        let path = self.deck_path(deck_id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| DatabaseError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| DatabaseError::io(&path, e))?;
        Ok(())
    }

    /// Load, mutate and write back a deck under the write lock
    async fn modify<F>(&self, deck_id: &str, mutate: F) -> Result<(), DatabaseError>
    where
        F: FnOnce(&mut DeckContents) -> Result<(), DatabaseError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut contents = self.read_deck(deck_id).await?;
        mutate(&mut contents)?;
        self.write_deck(deck_id, &contents).await
    }

    fn encode(&self, deck_id: &str, contents: &DeckContents) -> Result<DeckFile, DatabaseError> {
        let notes = contents
            .notes
            .sorted_ids()
            .into_iter()
            .filter_map(|id| contents.notes.get(id))
            .map(|note| self.encode_note(note))
            .collect::<Result<Vec<_>, _>>()?;

        let tree = Value::String(serde_json::to_string(&contents.tree)?);
        let tree = self.seal(&tree)?;

        Ok(DeckFile {
            deck_id: deck_id.to_string(),
            notes,
            tree: Some(tree),
        })
    }

    fn encode_note(&self, note: &Note) -> Result<Value, DatabaseError> {
        let mut record = serde_json::to_value(note)?;
        if let Value::Object(fields) = &mut record {
            for field in SEALED_FIELDS {
                if let Some(value) = fields.get_mut(field) {
                    *value = self.seal(value)?;
                }
            }
        }
        Ok(record)
    }

    fn decode(&self, file: DeckFile) -> Result<DeckContents, DatabaseError> {
        let notes = file
            .notes
            .into_iter()
            .map(|record| self.decode_note(record))
            .collect::<Result<NoteCollection, _>>()?;

        let tree = match file.tree {
            None => NoteTree::default(),
            Some(value) => {
                let value = self.open(&value)?;
                match value {
                    Value::String(json) => serde_json::from_str(&json)?,
                    // Tree written inline rather than as a string
                    other => serde_json::from_value(other)?,
                }
            }
        };

        Ok(DeckContents { notes, tree })
    }

    fn decode_note(&self, mut record: Value) -> Result<Note, DatabaseError> {
        if let Value::Object(fields) = &mut record {
            for field in SEALED_FIELDS {
                if let Some(value) = fields.get_mut(field) {
                    *value = self.open(value)?;
                }
            }
        }
        Ok(serde_json::from_value(record)?)
    }

    /// Escape sentinel-looking text, then encrypt when a cipher is configured
    fn seal(&self, value: &Value) -> Result<Value, DatabaseError> {
        let escaped = escape_plaintext(value);
        match &self.cipher {
            Some(cipher) => encrypt_value(&escaped, cipher.as_ref()),
            None => Ok(escaped),
        }
    }

    /// Inverse of [`seal`](Self::seal)
    fn open(&self, value: &Value) -> Result<Value, DatabaseError> {
        let opened = match &self.cipher {
            Some(cipher) => decrypt_value(value, cipher.as_ref())?,
            None if is_encrypted(value) => {
                return Err(DatabaseError::encryption(
                    "deck file is encrypted but no cipher is configured",
                ))
            }
            None => value.clone(),
        };
        Ok(unescape_plaintext(&opened))
    }

    fn emit(&self, event: DomainEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// File stem for a deck id.
///
/// Ids made only of ASCII alphanumerics and `-` are used as is; any other id
/// becomes `_` followed by the hex of its bytes. Plain stems never contain
/// `_`, so two distinct ids never share a file and none escapes the root.
fn deck_file_stem(deck_id: &str) -> String {
    let plain = !deck_id.is_empty()
        && deck_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if plain {
        deck_id.to_string()
    } else {
        format!("_{}", hex::encode(deck_id.as_bytes()))
    }
}

#[async_trait]
impl NoteStore for JsonFileStore {
    async fn load_deck(&self, session: &DeckSession) -> Result<DeckSnapshot> {
        let contents = self
            .read_deck(&session.deck_id)
            .await
            .with_context(|| format!("Failed to load deck '{}'", session.deck_id))?;
        let notes = contents
            .notes
            .sorted_ids()
            .into_iter()
            .filter_map(|id| contents.notes.get(id).cloned())
            .collect();
        Ok(DeckSnapshot {
            notes,
            tree: contents.tree,
        })
    }

    async fn add_note(&self, session: &DeckSession, note: &Note) -> Result<()> {
        self.modify(&session.deck_id, |deck| {
            if deck.notes.contains(&note.id) {
                return Err(DatabaseError::duplicate_note(&note.id));
            }
            deck.notes.insert(note.clone());
            Ok(())
        })
        .await?;

        self.emit(DomainEvent::NoteCreated {
            deck_id: session.deck_id.clone(),
            note: note.clone(),
        });
        Ok(())
    }

    async fn update_note(&self, session: &DeckSession, update: &NoteUpdate) -> Result<()> {
        self.modify(&session.deck_id, |deck| {
            if deck.notes.apply_update(update) {
                Ok(())
            } else {
                Err(DatabaseError::note_not_found(&update.id))
            }
        })
        .await?;

        self.emit(DomainEvent::NoteUpdated {
            deck_id: session.deck_id.clone(),
            update: update.clone(),
        });
        Ok(())
    }

    async fn delete_note(&self, session: &DeckSession, id: &str) -> Result<()> {
        self.modify(&session.deck_id, |deck| match deck.notes.remove(id) {
            Some(_) => Ok(()),
            None => Err(DatabaseError::note_not_found(id)),
        })
        .await?;

        self.emit(DomainEvent::NoteDeleted {
            deck_id: session.deck_id.clone(),
            id: id.to_string(),
        });
        Ok(())
    }

    async fn save_note_tree(&self, session: &DeckSession, tree: &NoteTree) -> Result<()> {
        self.modify(&session.deck_id, |deck| {
            deck.tree = tree.clone();
            Ok(())
        })
        .await?;

        self.emit(DomainEvent::TreeSaved {
            deck_id: session.deck_id.clone(),
        });
        Ok(())
    }
}
