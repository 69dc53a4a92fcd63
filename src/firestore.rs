use std::cell::RefCell;

use js_sys::{Array, Function};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use crate::config::FirebaseConfig;
use crate::error::{js_message, PresaleError, Result};
use crate::feed::{BatchListener, SharedFeed, Subscription, TransactionFeed};
use crate::model::TransactionRecord;

pub const TRANSACTIONS_COLLECTION: &str = "transactions";
pub const ORDER_FIELD: &str = "timestamp";

#[wasm_bindgen(module = "/js/firestore.js")]
extern "C" {
    #[wasm_bindgen(js_name = openFirestore, catch)]
    fn open_firestore(options: &JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(js_name = watchCollection, catch)]
    fn watch_collection(
        db: &JsValue,
        name: &str,
        field: &str,
        on_docs: &Closure<dyn FnMut(Array)>,
        on_error: &Closure<dyn FnMut(JsValue)>,
    ) -> std::result::Result<Function, JsValue>;
}

/// Live transaction list for the page: one Firestore listener shared by
/// every subscriber.
pub type FirestoreFeed = SharedFeed<FirestoreSource>;

impl SharedFeed<FirestoreSource> {
    pub fn firestore(config: &FirebaseConfig) -> Self {
        SharedFeed::new(FirestoreSource::new(config))
    }
}

/// Snapshot listener on the `transactions` collection, newest first.
/// Every subscription opens its own listener; `FirestoreFeed` shares one.
pub struct FirestoreSource {
    options: Value,
    db: RefCell<Option<JsValue>>,
}

impl FirestoreSource {
    pub fn new(config: &FirebaseConfig) -> Self {
        Self {
            options: app_options(config),
            db: RefCell::new(None),
        }
    }

    fn database(&self) -> Result<JsValue> {
        if let Some(db) = self.db.borrow().as_ref() {
            return Ok(db.clone());
        }
        let options = js_sys::JSON::parse(&self.options.to_string())
            .map_err(|e| PresaleError::Feed(js_message(&e)))?;
        let db = open_firestore(&options).map_err(|e| PresaleError::Feed(js_message(&e)))?;
        *self.db.borrow_mut() = Some(db.clone());
        Ok(db)
    }
}

impl TransactionFeed for FirestoreSource {
    fn subscribe(&self, on_batch: BatchListener) -> Subscription {
        let db = match self.database() {
            Ok(db) => db,
            Err(e) => {
                warn!(error = %e, "firestore unavailable");
                return Subscription::new(|| {});
            }
        };

        let on_docs = Closure::<dyn FnMut(Array)>::new(move |docs: Array| {
            let docs: Vec<(String, String)> = docs
                .iter()
                .filter_map(|entry| {
                    let pair = Array::from(&entry);
                    Some((pair.get(0).as_string()?, pair.get(1).as_string()?))
                })
                .collect();
            debug!(count = docs.len(), "transaction snapshot");
            on_batch(decode_documents(&docs));
        });
        let on_error = Closure::<dyn FnMut(JsValue)>::new(|err: JsValue| {
            warn!(error = %js_message(&err), "transaction listener failed");
        });

        match watch_collection(&db, TRANSACTIONS_COLLECTION, ORDER_FIELD, &on_docs, &on_error) {
            Ok(unsubscribe) => Subscription::new(move || {
                if let Err(e) = unsubscribe.call0(&JsValue::NULL) {
                    warn!(error = %js_message(&e), "transaction listener did not unsubscribe");
                }
                // No callbacks arrive once unsubscribed.
                drop(on_docs);
                drop(on_error);
            }),
            Err(e) => {
                warn!(error = %js_message(&e), "could not watch transactions");
                Subscription::new(|| {})
            }
        }
    }
}

/// Options object for `initializeApp`, leaving out keys that are not set.
pub fn app_options(config: &FirebaseConfig) -> Value {
    let mut options = Map::new();
    options.insert("apiKey".into(), json!(config.api_key));
    options.insert("projectId".into(), json!(config.project_id));
    let optional = [
        ("authDomain", &config.auth_domain),
        ("storageBucket", &config.storage_bucket),
        ("messagingSenderId", &config.sender_id),
        ("appId", &config.app_id),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            options.insert(key.into(), json!(value));
        }
    }
    Value::Object(options)
}

#[derive(Deserialize)]
struct RawTransaction {
    user: String,
    sol: f64,
    tokens: f64,
}

/// Decodes `(document id, JSON data)` pairs, keeping their order. Documents
/// lacking a usable `user`, `sol` or `tokens` field are skipped.
pub fn decode_documents(docs: &[(String, String)]) -> Vec<TransactionRecord> {
    docs.iter()
        .filter_map(|(id, data)| match decode_document(data) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(document = %id, error = %e, "skipping malformed transaction document");
                None
            }
        })
        .collect()
}

fn decode_document(data: &str) -> Result<TransactionRecord> {
    let raw: RawTransaction =
        serde_json::from_str(data).map_err(|e| PresaleError::Decode(e.to_string()))?;
    if !(raw.tokens >= 0.0 && raw.tokens.fract() == 0.0 && raw.tokens <= u64::MAX as f64) {
        return Err(PresaleError::Decode(format!("tokens is not a whole count: {}", raw.tokens)));
    }
    Ok(TransactionRecord {
        user: raw.user,
        sol: raw.sol,
        tokens: raw.tokens as u64,
    })
}
