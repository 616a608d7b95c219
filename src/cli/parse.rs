use cife_core::config::Provider;

/// Parse judge provider from string
pub fn parse_provider(s: &str) -> std::result::Result<Provider, String> {
    s.parse::<Provider>().map_err(|e| e.to_string())
}
