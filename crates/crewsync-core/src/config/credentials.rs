use std::collections::HashMap;
use std::env;
use std::fmt;

use crate::util::normalize_text_option;

pub const SALESFORCE_TOKEN_VAR: &str = "CREWSYNC_SALESFORCE_TOKEN";
pub const TWILIO_AUTH_TOKEN_VAR: &str = "CREWSYNC_TWILIO_AUTH_TOKEN";
pub const EXPO_ACCESS_TOKEN_VAR: &str = "CREWSYNC_EXPO_ACCESS_TOKEN";

/// Secrets for the remote endpoints, read from the environment.
///
/// All values are optional; a client whose secret is missing is simply not
/// configured.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub salesforce_token: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub expo_access_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("salesforce_token", &redacted(self.salesforce_token.as_ref()))
            .field("twilio_auth_token", &redacted(self.twilio_auth_token.as_ref()))
            .field("expo_access_token", &redacted(self.expo_access_token.as_ref()))
            .finish()
    }
}

const fn redacted(value: Option<&String>) -> Option<&'static str> {
    match value {
        Some(_) => Some("[REDACTED]"),
        None => None,
    }
}

impl Credentials {
    pub fn from_env() -> Self {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            salesforce_token: normalize_text_option(lookup(SALESFORCE_TOKEN_VAR)),
            twilio_auth_token: normalize_text_option(lookup(TWILIO_AUTH_TOKEN_VAR)),
            expo_access_token: normalize_text_option(lookup(EXPO_ACCESS_TOKEN_VAR)),
        }
    }
}
