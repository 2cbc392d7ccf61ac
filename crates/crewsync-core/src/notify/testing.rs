//! Recording notifier for escalation tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{Notifier, NotifyError, NotifyResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushCall {
    pub tokens: Vec<String>,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsCall {
    pub phones: Vec<String>,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub push_calls: Mutex<Vec<PushCall>>,
    pub sms_calls: Mutex<Vec<SmsCall>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn push_count(&self) -> usize {
        self.push_calls.lock().unwrap().len()
    }

    pub fn sms_count(&self) -> usize {
        self.sms_calls.lock().unwrap().len()
    }

    fn outcome(&self) -> NotifyResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(NotifyError::Api("gateway down".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Notifier for RecordingNotifier {
    async fn send_push(&self, tokens: &[String], title: &str, body: &str) -> NotifyResult<()> {
        self.push_calls.lock().unwrap().push(PushCall {
            tokens: tokens.to_vec(),
            title: title.to_string(),
            body: body.to_string(),
        });
        self.outcome()
    }

    async fn send_sms(&self, phones: &[String], body: &str) -> NotifyResult<()> {
        self.sms_calls.lock().unwrap().push(SmsCall {
            phones: phones.to_vec(),
            body: body.to_string(),
        });
        self.outcome()
    }
}
