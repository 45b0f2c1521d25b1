use crate::config::types::{Config, ConsentConfig, CrawlerConfig, OutputConfig, UserAgentConfig};
use crate::worker::collector_ids;
use crate::ConfigError;
use url::Url;

/// Upper bound on concurrent page visits
const MAX_CRAWLERS: u32 = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_consent_config(&config.consent)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.number_of_crawlers < 1 || config.number_of_crawlers > MAX_CRAWLERS {
        return Err(ConfigError::Validation(format!(
            "number_of_crawlers must be between 1 and {}, got {}",
            MAX_CRAWLERS, config.number_of_crawlers
        )));
    }

    if config.page_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "page_timeout_ms must be greater than 0".to_string(),
        ));
    }

    let known = collector_ids();
    for id in &config.data_collectors {
        if !known.contains(&id.as_str()) {
            return Err(ConfigError::UnknownCollector {
                id: id.clone(),
                valid: known.join(", "),
            });
        }
    }

    if let Some(region) = &config.region_code {
        if region.len() != 2 || !region.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Validation(format!(
                "region_code must be a 2 letter code, got '{}'",
                region
            )));
        }
    }

    if let Some(proxy) = &config.proxy_host {
        if proxy.trim().is_empty() {
            return Err(ConfigError::Validation(
                "proxy_host cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates consent handshake timing
fn validate_consent_config(config: &ConsentConfig) -> Result<(), ConfigError> {
    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "consent poll_interval_ms must be greater than 0".to_string(),
        ));
    }

    if config.max_wait_ms < config.poll_interval_ms {
        return Err(ConfigError::Validation(format!(
            "consent max_wait_ms ({}) must be >= poll_interval_ms ({})",
            config.max_wait_ms, config.poll_interval_ms
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}
