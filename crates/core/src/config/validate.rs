use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Bot token is non-empty
/// - Size ceilings and media group cap are not 0
/// - Indicator interval is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.bot.token.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "bot.token cannot be empty".to_string(),
        ));
    }

    if config.downloader.max_file_size_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "downloader.max_file_size_bytes cannot be 0".to_string(),
        ));
    }

    if config.delivery.upload_limit_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "delivery.upload_limit_bytes cannot be 0".to_string(),
        ));
    }

    if config.delivery.media_group_cap == 0 {
        return Err(ConfigError::ValidationError(
            "delivery.media_group_cap cannot be 0".to_string(),
        ));
    }

    if config.pipeline.indicator_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.indicator_interval_ms cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        BotConfig, DeliveryConfig, DownloaderConfig, PipelineConfig, TranscodeConfig,
    };

    fn valid_config() -> Config {
        Config {
            bot: BotConfig {
                token: "123:abc".to_string(),
                target_group_id: None,
                poll_timeout_secs: 30,
            },
            downloader: DownloaderConfig::default(),
            transcode: TranscodeConfig::default(),
            delivery: DeliveryConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_empty_token_fails() {
        let mut config = valid_config();
        config.bot.token = "  ".to_string();
        let result = validate_config(&config);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_zero_upload_limit_fails() {
        let mut config = valid_config();
        config.delivery.upload_limit_bytes = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_group_cap_fails() {
        let mut config = valid_config();
        config.delivery.media_group_cap = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_indicator_interval_fails() {
        let mut config = valid_config();
        config.pipeline.indicator_interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }
}
