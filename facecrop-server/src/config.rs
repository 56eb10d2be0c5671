use facecrop_utils::config::ServerSettings;

/// Environment variable consulted for the listen address.
pub const LISTEN_ADDR_ENV: &str = "FACECROP_LISTEN_ADDR";

/// Pick the listen address: command line, then environment, then settings.
///
/// Blank values are skipped. The settings default is `0.0.0.0:1323`.
pub fn resolve_listen_addr(
    cli: Option<&str>,
    env: Option<&str>,
    settings: &ServerSettings,
) -> String {
    [cli, env]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|addr| !addr.is_empty())
        .unwrap_or(settings.listen_addr.as_str())
        .to_string()
}
