use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::currency::CurrencyTable;
use crate::error::{CoreError, CoreResult};
use crate::types::{GatewayCredentials, Mode, ModeCredentials, SignAlgorithm, TriState};

/// How the payment page sends the buyer back to the shop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReturnMode {
    Get,
    #[default]
    Post,
}

impl ReturnMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnMode::Get => "GET",
            ReturnMode::Post => "POST",
        }
    }
}

/// Automatic redirection at the end of the payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Seconds (0..=300) before redirecting after a successful payment.
    #[serde(default = "default_redirect_timeout")]
    pub success_timeout: u32,

    #[serde(default = "default_redirect_message")]
    pub success_message: String,

    /// Seconds (0..=300) before redirecting after a declined payment.
    #[serde(default = "default_redirect_timeout")]
    pub error_timeout: u32,

    #[serde(default = "default_redirect_message")]
    pub error_message: String,
}

fn default_redirect_timeout() -> u32 {
    5
}

fn default_redirect_message() -> String {
    "Redirection to shop in a few seconds...".to_string()
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            success_timeout: default_redirect_timeout(),
            success_message: default_redirect_message(),
            error_timeout: default_redirect_timeout(),
            error_message: default_redirect_message(),
        }
    }
}

/// Payment in installments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentConfig {
    /// Number of installments.
    pub count: u32,
    /// Days between installments.
    pub period: u32,
    /// First installment as a percentage of the total. Equal split when absent.
    #[serde(default)]
    pub first_percentage: Option<Decimal>,
}

/// Read-only provider configuration, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Code recorded on transactions created by this provider.
    #[serde(default = "default_provider_code")]
    pub provider_code: String,

    #[serde(default)]
    pub mode: Mode,

    /// Shop identifier assigned by the gateway.
    #[serde(default)]
    pub site_id: String,

    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    #[serde(default = "default_gateway_version")]
    pub version: String,

    #[serde(default = "default_contrib")]
    pub contrib: String,

    #[serde(default)]
    pub sign_algorithm: SignAlgorithm,

    #[serde(default)]
    pub credentials: ModeCredentials,

    /// Default payment page language. Empty lets the gateway choose.
    #[serde(default)]
    pub language: String,

    #[serde(default)]
    pub available_languages: Vec<String>,

    /// Card types offered. Empty uses the gateway configuration.
    #[serde(default)]
    pub payment_cards: Vec<String>,

    /// Days before bank capture.
    #[serde(default)]
    pub capture_delay: Option<u32>,

    /// Manual validation of payments.
    #[serde(default)]
    pub validation_mode: TriState,

    /// Order amounts below this may skip strong authentication.
    #[serde(default)]
    pub threeds_min_amount: Option<Decimal>,

    #[serde(default)]
    pub redirect: RedirectConfig,

    #[serde(default)]
    pub return_mode: ReturnMode,

    #[serde(default)]
    pub installments: Option<InstallmentConfig>,

    /// ISO codes accepted at checkout. Empty accepts the whole currency table.
    #[serde(default)]
    pub allowed_currencies: Vec<String>,
}

fn default_provider_code() -> String {
    "lyra".to_string()
}

fn default_gateway_url() -> String {
    "https://secure.micuentaweb.pe/vads-payment/".to_string()
}

fn default_gateway_version() -> String {
    "V2".to_string()
}

fn default_contrib() -> String {
    format!("lyra-gateway/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_code: default_provider_code(),
            mode: Mode::default(),
            site_id: String::new(),
            gateway_url: default_gateway_url(),
            version: default_gateway_version(),
            contrib: default_contrib(),
            sign_algorithm: SignAlgorithm::default(),
            credentials: ModeCredentials::default(),
            language: String::new(),
            available_languages: Vec::new(),
            payment_cards: Vec::new(),
            capture_delay: None,
            validation_mode: TriState::default(),
            threeds_min_amount: None,
            redirect: RedirectConfig::default(),
            return_mode: ReturnMode::default(),
            installments: None,
            allowed_currencies: Vec::new(),
        }
    }
}

impl ProviderConfig {
    /// Credentials for the configured mode.
    pub fn credentials(&self) -> &GatewayCredentials {
        self.credentials.for_mode(self.mode)
    }

    /// Currencies this provider can be offered for.
    pub fn currency_table(&self) -> CurrencyTable {
        CurrencyTable::restricted_to(&self.allowed_currencies)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> CoreResult<()> {
        if self.provider_code.trim().is_empty() {
            return Err(CoreError::Config("provider_code must not be empty".into()));
        }
        if !self.site_id.is_empty() && !self.site_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(CoreError::Config(format!(
                "site_id must be numeric, got '{}'",
                self.site_id
            )));
        }
        if !self.gateway_url.starts_with("https://") {
            return Err(CoreError::Config("gateway_url must use HTTPS".into()));
        }
        for (name, timeout) in [
            ("success_timeout", self.redirect.success_timeout),
            ("error_timeout", self.redirect.error_timeout),
        ] {
            if timeout > 300 {
                return Err(CoreError::Config(format!(
                    "redirect.{name} must be between 0 and 300, got {timeout}"
                )));
            }
        }
        if let Some(min) = self.threeds_min_amount {
            if min.is_sign_negative() {
                return Err(CoreError::Config(
                    "threeds_min_amount must not be negative".into(),
                ));
            }
        }
        if let Some(plan) = &self.installments {
            if plan.count < 2 {
                return Err(CoreError::Config(format!(
                    "installments.count must be at least 2, got {}",
                    plan.count
                )));
            }
            if plan.period == 0 {
                return Err(CoreError::Config("installments.period must be > 0".into()));
            }
            if let Some(pct) = plan.first_percentage {
                if pct <= Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
                    return Err(CoreError::Config(format!(
                        "installments.first_percentage must be in (0, 100], got {pct}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::CurrencyDirectory;

    #[test]
    fn test_default_provider_config() {
        let config = ProviderConfig::default();
        assert_eq!(config.provider_code, "lyra");
        assert_eq!(config.mode, Mode::Test);
        assert_eq!(config.version, "V2");
        assert_eq!(config.sign_algorithm, SignAlgorithm::HmacSha256);
        assert_eq!(config.return_mode, ReturnMode::Post);
        assert!(!config.redirect.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_credentials_follow_mode() {
        let mut config = ProviderConfig::default();
        config.credentials.test.legacy_key = "test-key".into();
        config.credentials.production.legacy_key = "prod-key".into();
        assert_eq!(config.credentials().legacy_key.expose(), "test-key");
        config.mode = Mode::Production;
        assert_eq!(config.credentials().legacy_key.expose(), "prod-key");
    }

    #[test]
    fn test_currency_table_uses_allow_list() {
        let mut config = ProviderConfig::default();
        assert!(config.currency_table().lookup("EUR").is_some());
        config.allowed_currencies = vec!["PEN".into()];
        assert!(config.currency_table().lookup("EUR").is_none());
        assert!(config.currency_table().lookup("PEN").is_some());
    }

    #[test]
    fn test_validate_rejects_non_numeric_site_id() {
        let config = ProviderConfig {
            site_id: "12ab".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_plain_http_gateway() {
        let config = ProviderConfig {
            gateway_url: "http://secure.micuentaweb.pe/vads-payment/".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_redirect_timeout_range() {
        let mut config = ProviderConfig::default();
        config.redirect.success_timeout = 301;
        assert!(config.validate().is_err());
        config.redirect.success_timeout = 300;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_installments() {
        let mut config = ProviderConfig {
            installments: Some(InstallmentConfig {
                count: 1,
                period: 30,
                first_percentage: None,
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.installments = Some(InstallmentConfig {
            count: 3,
            period: 30,
            first_percentage: Some(Decimal::new(150, 0)),
        });
        assert!(config.validate().is_err());

        config.installments = Some(InstallmentConfig {
            count: 3,
            period: 30,
            first_percentage: Some(Decimal::new(50, 0)),
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_provider_config_from_json() {
        let json = r#"{
            "mode": "production",
            "site_id": "12345678",
            "sign_algorithm": "SHA-1",
            "validation_mode": "enabled",
            "threeds_min_amount": "50.00",
            "return_mode": "GET",
            "credentials": { "production": { "legacy_key": "k" } }
        }"#;
        let config: ProviderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.mode, Mode::Production);
        assert_eq!(config.sign_algorithm, SignAlgorithm::Sha1);
        assert_eq!(config.validation_mode, TriState::Enabled);
        assert_eq!(config.threeds_min_amount, Some(Decimal::new(5000, 2)));
        assert_eq!(config.return_mode, ReturnMode::Get);
        assert_eq!(config.credentials().legacy_key.expose(), "k");
    }
}
