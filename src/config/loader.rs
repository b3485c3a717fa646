//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{CpeConfig, Environment};
use super::secret::secret_string;
use crate::domain::errors::CpeError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Prefix of environment variable overrides
pub const ENV_PREFIX: &str = "SUNAT_CPE";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into CpeConfig
/// 4. Applies environment variable overrides (SUNAT_CPE_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`CpeError::Configuration`] if the file cannot be read or parsed,
/// a referenced variable is unset, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use sunat_cpe::config::loader::load_config;
///
/// let config = load_config("sunat-cpe.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<CpeConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CpeError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        CpeError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses, overrides and validates configuration held in a string
pub fn parse_config(contents: &str) -> Result<CpeConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: CpeConfig = toml::from_str(&contents)
        .map_err(|e| CpeError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        CpeError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = placeholder_pattern();
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(CpeError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env(key: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}_{key}")).ok()
}

/// Applies environment variable overrides using the SUNAT_CPE_* prefix
///
/// Variables follow the pattern `SUNAT_CPE_<SECTION>_<KEY>`, for example
/// `SUNAT_CPE_SUNAT_ENDPOINT` or `SUNAT_CPE_APPLICATION_DRY_RUN`. Values that
/// fail to parse leave the file setting in place.
fn apply_env_overrides(config: &mut CpeConfig) {
    // Application overrides
    if let Some(val) = env("APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = env("APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(config.application.dry_run);
    }
    if let Some(val) = env("ENVIRONMENT") {
        match val.to_lowercase().as_str() {
            "development" => config.environment = Environment::Development,
            "staging" => config.environment = Environment::Staging,
            "production" => config.environment = Environment::Production,
            _ => {}
        }
    }

    // Billing service overrides
    if let Some(val) = env("SUNAT_ENDPOINT") {
        config.sunat.endpoint = val;
    }
    if let Some(val) = env("SUNAT_USERNAME") {
        config.sunat.username = val;
    }
    if let Some(val) = env("SUNAT_PASSWORD") {
        config.sunat.password = secret_string(val);
    }
    if let Some(val) = env("SUNAT_TIMEOUT_SECONDS") {
        if let Ok(timeout) = val.parse() {
            config.sunat.timeout_seconds = timeout;
        }
    }
    if let Some(val) = env("SUNAT_TLS_VERIFY") {
        config.sunat.tls_verify = val.parse().unwrap_or(true);
    }
    if let Some(val) = env("SUNAT_RETRY_MAX_RETRIES") {
        if let Ok(retries) = val.parse() {
            config.sunat.retry.max_retries = retries;
        }
    }

    // Signing overrides
    if let Some(val) = env("SIGNING_PRIVATE_KEY_PATH") {
        config.signing.private_key_path = val.into();
    }
    if let Some(val) = env("SIGNING_CERTIFICATE_PATH") {
        config.signing.certificate_path = val.into();
    }

    // Output overrides
    if let Some(val) = env("OUTPUT_DIRECTORY") {
        config.output.directory = val.into();
    }
    if let Some(val) = env("OUTPUT_RECEIPTS_DIRECTORY") {
        config.output.receipts_directory = val.into();
    }
    if let Some(val) = env("OUTPUT_WRITE_ARTIFACTS") {
        config.output.write_artifacts = val.parse().unwrap_or(config.output.write_artifacts);
    }

    // Receipt overrides
    if let Some(val) = env("RECEIPT_CODE_COMPARISON") {
        if let Ok(comparison) = val.parse() {
            config.receipt.code_comparison = comparison;
        }
    }

    // Logging overrides
    if let Some(val) = env("LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(config.logging.local_enabled);
    }
    if let Some(val) = env("LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[sunat]
username = "MODDATOS"
password = "moddatos"

[signing]
private_key_path = "keys/private.pem"
certificate_path = "keys/cert.pem"
"#;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("SUBSTITUTE_TEST_VAR", "test_value");
        let input = "password = \"${SUBSTITUTE_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "password = \"test_value\"\n");
        std::env::remove_var("SUBSTITUTE_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("SUBSTITUTE_MISSING_VAR");
        let input = "password = \"${SUBSTITUTE_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("SUBSTITUTE_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_skips_comments() {
        let input = "# password = \"${SUBSTITUTE_COMMENTED_VAR}\"";
        assert_eq!(substitute_env_vars(input).unwrap(), format!("{input}\n"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("nonexistent.toml").unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION");
    }

    #[test]
    fn test_load_config_valid() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.sunat.username, "MODDATOS");
        assert_eq!(config.sunat.timeout_seconds, 60);
        assert_eq!(config.sunat.retry.max_retries, 0);
        assert_eq!(config.signing.signature_id, "SignatureSP");
        assert!(config.output.write_artifacts);
    }

    #[test]
    fn test_invalid_toml() {
        let err = parse_config("[sunat\nusername = ").unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML"));
    }

    #[test]
    fn test_validation_failure_is_reported() {
        let contents = MINIMAL.replace("[sunat]", "[sunat]\ntimeout_seconds = 0");
        let err = parse_config(&contents).unwrap_err();
        assert!(err.to_string().contains("timeout_seconds"));
    }
}
