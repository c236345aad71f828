use leptos::prelude::*;
use leptos::server;
use timeline_core::ClientSettings;

/// Fetch tuning from the server's environment (`RESERVATIONS_FETCH_STRATEGY`,
/// `RESERVATIONS_MAX_CATALOG_PAGES`). Lives under `/rpc` so it stays clear of
/// the `/api` proxy.
#[server(name = GetClientSettings, prefix = "/rpc")]
pub async fn client_settings() -> Result<ClientSettings, ServerFnError> {
    use timeline_core::ClientConfig;

    match ClientConfig::from_env() {
        Ok(config) => Ok(config.settings()),
        Err(e) => Err(ServerFnError::new(format!("Configuration error: {}", e))),
    }
}
