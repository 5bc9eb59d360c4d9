//! Recording environment for unit tests.

use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::environment::{Alert, Environment};

#[derive(Default)]
struct State {
    foreground: bool,
    supported: bool,
    permission: bool,
    grant_on_request: bool,
    fail_alerts: bool,
    token: Option<String>,
    alerts: Vec<Alert>,
    dismissed: Vec<String>,
    focus_count: usize,
    permission_requests: usize,
}

#[derive(Default)]
pub(crate) struct RecordingEnvironment {
    state: Mutex<State>,
}

impl RecordingEnvironment {
    /// Hidden application, alerts supported and permitted.
    pub fn background_with_permission() -> Self {
        Self {
            state: Mutex::new(State {
                supported: true,
                permission: true,
                ..State::default()
            }),
        }
    }

    pub fn set_foreground(&self, value: bool) {
        self.state.lock().foreground = value;
    }

    pub fn set_permission(&self, value: bool) {
        self.state.lock().permission = value;
    }

    pub fn set_grant_on_request(&self, value: bool) {
        self.state.lock().grant_on_request = value;
    }

    pub fn set_fail_alerts(&self, value: bool) {
        self.state.lock().fail_alerts = value;
    }

    pub fn set_token(&self, token: &str) {
        self.state.lock().token = Some(token.to_string());
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.state.lock().alerts.clone()
    }

    pub fn dismissed(&self) -> Vec<String> {
        self.state.lock().dismissed.clone()
    }

    pub fn focus_count(&self) -> usize {
        self.state.lock().focus_count
    }

    pub fn permission_requests(&self) -> usize {
        self.state.lock().permission_requests
    }
}

impl Environment for RecordingEnvironment {
    fn is_foreground(&self) -> bool {
        self.state.lock().foreground
    }

    fn alerts_supported(&self) -> bool {
        self.state.lock().supported
    }

    fn has_alert_permission(&self) -> bool {
        self.state.lock().permission
    }

    fn request_alert_permission(&self) -> bool {
        let mut state = self.state.lock();
        state.permission_requests += 1;
        state.permission = state.grant_on_request;
        state.permission
    }

    fn persisted_token(&self) -> Option<String> {
        self.state.lock().token.clone()
    }

    fn show_alert(&self, alert: &Alert) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_alerts {
            return Err(Error::alert("display refused"));
        }
        state.alerts.push(alert.clone());
        Ok(())
    }

    fn dismiss_alert(&self, tag: &str) {
        self.state.lock().dismissed.push(tag.to_string());
    }

    fn focus_application(&self) {
        self.state.lock().focus_count += 1;
    }
}
