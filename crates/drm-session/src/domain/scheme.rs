//! Protection scheme data extracted from container metadata

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::{uuid, Uuid};

/// Widevine scheme id.
pub const WIDEVINE_UUID: Uuid = uuid!("edef8ba9-79d6-4ace-a3c8-27dcd51d21ed");

/// PlayReady scheme id.
pub const PLAYREADY_UUID: Uuid = uuid!("9a04f079-9840-4286-ab92-e65be0885f95");

/// W3C ClearKey scheme id.
pub const CLEARKEY_UUID: Uuid = uuid!("e2719d58-a985-b3c9-781a-b030af78d30e");

/// Initialization payload for one protection scheme.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeData {
    /// Scheme the payload belongs to
    pub scheme_id: Uuid,
    /// Mime type of the protected content
    pub mime_type: String,
    /// Opaque initialization bytes (e.g. a PSSH box)
    pub data: Vec<u8>,
}

impl SchemeData {
    pub fn new(scheme_id: Uuid, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            scheme_id,
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// Scheme data for every scheme present in a piece of content.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrmInitData {
    schemes: HashMap<Uuid, SchemeData>,
}

impl DrmInitData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry for `scheme_data.scheme_id`.
    pub fn insert(&mut self, scheme_data: SchemeData) {
        self.schemes.insert(scheme_data.scheme_id, scheme_data);
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with(mut self, scheme_data: SchemeData) -> Self {
        self.insert(scheme_data);
        self
    }

    pub fn get(&self, scheme_id: &Uuid) -> Option<&SchemeData> {
        self.schemes.get(scheme_id)
    }

    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }
}

impl FromIterator<SchemeData> for DrmInitData {
    fn from_iter<T: IntoIterator<Item = SchemeData>>(iter: T) -> Self {
        let mut init_data = Self::new();
        for scheme_data in iter {
            init_data.insert(scheme_data);
        }
        init_data
    }
}
