//! Scripted remote fakes for unit tests

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::types::{PostRecord, RecordRef, RecordWriter, RemoteAccount, RemoteError};

/// Writer that fails or succeeds according to a script
///
/// `false` entries fail with a 502, `true` entries succeed. Once the script
/// is exhausted every call succeeds.
pub struct ScriptedWriter {
    account: RemoteAccount,
    script: Mutex<VecDeque<bool>>,
    calls: Mutex<u32>,
    created: Mutex<Vec<PostRecord>>,
}

impl ScriptedWriter {
    pub fn new(script: &[bool]) -> Self {
        Self {
            account: RemoteAccount {
                did: "did:plc:test".to_string(),
                handle: "test.bsky.social".to_string(),
            },
            script: Mutex::new(script.iter().copied().collect()),
            calls: Mutex::new(0),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn always_ok() -> Self {
        Self::new(&[])
    }

    pub fn always_failing() -> Self {
        Self::new(&[false; 64])
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }

    pub fn created(&self) -> Vec<PostRecord> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RecordWriter for ScriptedWriter {
    fn account(&self) -> &RemoteAccount {
        &self.account
    }

    async fn create_record(
        &self,
        collection: &str,
        record: &PostRecord,
    ) -> Result<RecordRef, RemoteError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        let succeed = self.script.lock().unwrap().pop_front().unwrap_or(true);

        if succeed {
            self.created.lock().unwrap().push(record.clone());
            Ok(RecordRef {
                uri: format!("at://{}/{}/{}", self.account.did, collection, call),
                cid: format!("cid{}", call),
            })
        } else {
            Err(RemoteError::Api {
                status: 502,
                error: "UpstreamFailure".to_string(),
                message: "scripted failure".to_string(),
            })
        }
    }
}
