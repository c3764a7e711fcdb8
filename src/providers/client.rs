use std::sync::Mutex;
use std::time::Duration;

use reqwest::Client;

use crate::errors::ProviderResult;

/// A reqwest handle cached against the credential it was built for.
///
/// Providers resolve their credential on every call and go through this
/// collaborator; the handle is only rebuilt when the credential value
/// changes, so key rotation takes effect without reconstructing the
/// provider. The pure compile/parse core never touches this state.
#[derive(Default)]
pub struct CredentialedClient {
    cached: Mutex<Option<(String, Client)>>,
}

impl CredentialedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// The client for the given credential, reusing the cached handle when
    /// the credential is unchanged since the last call.
    pub fn for_credential(&self, credential: &str) -> ProviderResult<Client> {
        let mut cached = self.cached.lock().unwrap();
        if let Some((last_seen, client)) = cached.as_ref() {
            if last_seen == credential {
                return Ok(client.clone());
            }
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;
        *cached = Some((credential.to_string(), client.clone()));
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuses_handle_for_same_credential() {
        let cache = CredentialedClient::new();
        cache.for_credential("key-a").unwrap();
        {
            let guard = cache.cached.lock().unwrap();
            assert_eq!(guard.as_ref().unwrap().0, "key-a");
        }

        // Same credential keeps the cached entry; a new one replaces it
        cache.for_credential("key-a").unwrap();
        cache.for_credential("key-b").unwrap();
        let guard = cache.cached.lock().unwrap();
        assert_eq!(guard.as_ref().unwrap().0, "key-b");
    }
}
