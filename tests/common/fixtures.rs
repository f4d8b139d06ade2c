//! Job messages and GraphQL pages used across the integration tests

use serde_json::{Value, json};

/// Request id carried by every fixture message
pub const MOCK_REQUEST_ID: &str = "MOCK_REQUEST_ID";

/// CSV produced from [`collection_items`] with [`collection_columns`]
pub const EXPECTED_COLLECTIONS_CSV: &str = "Data Provider,Short Name,Version,Entry Title,Processing Level,Platform,Start Time,End Time\r\n\
,,,Test collection,,platform,,\r\n\
,,,Test collection 1,,platform,,\r\n";

/// The eight collection columns of the search UI
pub fn collection_columns() -> Value {
    json!([
        { "name": "Data Provider", "path": "provider" },
        { "name": "Short Name", "path": "shortName" },
        { "name": "Version", "path": "versionId" },
        { "name": "Entry Title", "path": "title" },
        { "name": "Processing Level", "path": "processingLevelId" },
        { "name": "Platform", "path": "platforms.shortName" },
        { "name": "Start Time", "path": "timeStart" },
        { "name": "End Time", "path": "timeEnd" }
    ])
}

/// Two collections as returned by the search API
pub fn collection_items() -> Vec<Value> {
    vec![
        json!({
            "conceptId": "C100000-EDSC",
            "title": "Test collection",
            "platforms": [{ "shortName": "platform" }]
        }),
        json!({
            "conceptId": "C100001-EDSC",
            "title": "Test collection 1",
            "platforms": [{ "shortName": "platform" }]
        }),
    ]
}

/// A GraphQL response envelope for one page of collections
pub fn collections_page(cursor: Option<&str>, items: Vec<Value>) -> Value {
    let mut collections = json!({ "count": 2, "items": items });
    if let Some(cursor) = cursor {
        collections["cursor"] = json!(cursor);
    }
    json!({ "data": { "collections": collections } })
}

/// Builder for queue message bodies
#[derive(Clone, Debug)]
pub struct JobMessageBuilder {
    message: Value,
}

impl JobMessageBuilder {
    /// A collections export in `format` written to `key`
    pub fn new(format: &str, key: &str) -> Self {
        Self {
            message: json!({
                "params": {
                    "columns": collection_columns(),
                    "cursorpath": "collections.cursor",
                    "format": format,
                    "itempath": "collections.items",
                    "query": {},
                    "variables": {}
                },
                "extra": {
                    "earthdataEnvironment": "dev",
                    "filename": "test-export-search-results-12345",
                    "key": key,
                    "requestId": MOCK_REQUEST_ID
                }
            }),
        }
    }

    /// Override a `params` field
    pub fn param(mut self, name: &str, value: Value) -> Self {
        self.message["params"][name] = value;
        self
    }

    /// Override an `extra` field
    pub fn extra(mut self, name: &str, value: Value) -> Self {
        self.message["extra"][name] = value;
        self
    }

    /// Remove a `params` field
    pub fn without_param(mut self, name: &str) -> Self {
        if let Some(params) = self.message["params"].as_object_mut() {
            params.remove(name);
        }
        self
    }

    /// Serialized message body
    pub fn build(&self) -> String {
        self.message.to_string()
    }
}
