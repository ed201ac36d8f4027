//! Outbound mail seam. The production binary wires in [`LogMailer`]; a real
//! SMTP relay can slot in behind the same trait.

use std::sync::Mutex;

use tracing::info;

pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str);
}

/// Logs outbound mail instead of delivering it.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, to: &str, subject: &str, body: &str) {
        info!("Mail to {}: {} ({} bytes)", to, subject, body.len());
    }
}

/// Test double that records every send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// (recipient, subject) pairs in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, to: &str, subject: &str, _body: &str) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((to.to_string(), subject.to_string()));
        }
    }
}

// -- Templates --

pub fn signup_confirmation(username: &str, key: &str) -> (String, String) {
    (
        "Welcome to Banter — confirm your account".to_string(),
        format!(
            "Hello {username},\n\nConfirm your new account by visiting:\n\
             /confirm/{key}\n\nThe link is valid for 72 hours.\n"
        ),
    )
}

pub fn password_reset(username: &str, key: &str) -> (String, String) {
    (
        "Banter password reset".to_string(),
        format!(
            "Hello {username},\n\nReset your password by visiting:\n\
             /reset-password/{key}\n\nThe link is valid for one hour. If you did not \
             request this, ignore this mail.\n"
        ),
    )
}

pub fn report_acknowledgement(post_id: i64) -> (String, String) {
    (
        "Your report has been received".to_string(),
        format!(
            "Thank you for your report on post {post_id}. The moderation team will \
             review it shortly.\n"
        ),
    )
}
