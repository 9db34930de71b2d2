use loco_rs::prelude::*;
use std::env;

/// Looks up provider credentials and webhook signing secrets from the
/// environment. Values are never logged in full; use [`SecretService::mask_secret`]
/// wherever a secret needs to appear in a log line.
#[derive(Debug, Clone, Default)]
pub struct SecretService;

impl SecretService {
    pub fn new() -> Self {
        Self
    }

    pub fn get_secret(&self, key: &str) -> Result<String> {
        env::var(key).map_err(|_| Error::string(&format!("secret '{key}' not found")))
    }

    pub fn get_jwt_secret(&self) -> Result<String> {
        let secret = self.get_secret("JWT_SECRET")?;
        if secret.len() < 32 {
            return Err(Error::string("JWT secret must be at least 32 characters long"));
        }
        Ok(secret)
    }

    /// Webhook signing secret for a given provider, keyed `<PROVIDER>_WEBHOOK_SECRET`.
    pub fn get_webhook_secret(&self, provider: &str) -> Result<String> {
        self.get_secret(&format!("{}_WEBHOOK_SECRET", provider.to_uppercase()))
    }

    pub fn mask_secret(value: &str) -> String {
        if value.len() <= 8 {
            "*".repeat(value.len())
        } else {
            format!("{}***{}", &value[..4], &value[value.len() - 4..])
        }
    }
}

/// Environment-specific secret validation, run once at boot.
pub fn validate_environment_secrets(environment: &str) -> Result<()> {
    match environment {
        "production" | "staging" => {
            env::var("JWT_SECRET").map_err(|_| Error::string("JWT_SECRET must be set"))?;
            env::var("DATABASE_URL").map_err(|_| Error::string("DATABASE_URL must be set"))?;
        }
        "development" => {
            if env::var("JWT_SECRET").unwrap_or_default() == "development-secret-key-change-in-production" {
                tracing::warn!("using default JWT secret in development - change for production");
            }
        }
        _ => return Err(Error::string(&format!("unknown environment: {environment}"))),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_short_and_long_secrets() {
        assert_eq!(SecretService::mask_secret("short"), "*****");
        assert_eq!(SecretService::mask_secret("verylongsecretkey123"), "very***k123");
    }
}
