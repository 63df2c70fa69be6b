use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ---------------------------------------------------------------------------
// Wire field names
// ---------------------------------------------------------------------------

/// Prefix shared by every signed gateway field.
pub const VADS_PREFIX: &str = "vads_";

/// Name of the signature field in the redirect form and legacy notifications.
pub const SIGNATURE_FIELD: &str = "signature";

/// Marker added by the normalizer to field sets built from a REST envelope.
pub const IS_REST_FIELD: &str = "is_rest";

/// Canonical `vads_*` field names used across crates.
pub mod fields {
    pub const SITE_ID: &str = "vads_site_id";
    pub const AMOUNT: &str = "vads_amount";
    pub const CURRENCY: &str = "vads_currency";
    pub const TRANS_DATE: &str = "vads_trans_date";
    pub const TRANS_ID: &str = "vads_trans_id";
    pub const TRANS_UUID: &str = "vads_trans_uuid";
    pub const TRANS_STATUS: &str = "vads_trans_status";
    pub const CTX_MODE: &str = "vads_ctx_mode";
    pub const PAGE_ACTION: &str = "vads_page_action";
    pub const ACTION_MODE: &str = "vads_action_mode";
    pub const PAYMENT_CONFIG: &str = "vads_payment_config";
    pub const VERSION: &str = "vads_version";
    pub const URL_RETURN: &str = "vads_url_return";
    pub const ORDER_ID: &str = "vads_order_id";
    pub const ORDER_STATUS: &str = "vads_order_status";
    pub const ORDER_CYCLE: &str = "vads_order_cycle";
    pub const EXT_INFO_ORDER_REF: &str = "vads_ext_info_order_ref";
    pub const CONTRIB: &str = "vads_contrib";
    pub const LANGUAGE: &str = "vads_language";
    pub const AVAILABLE_LANGUAGES: &str = "vads_available_languages";
    pub const CAPTURE_DELAY: &str = "vads_capture_delay";
    pub const VALIDATION_MODE: &str = "vads_validation_mode";
    pub const PAYMENT_CARDS: &str = "vads_payment_cards";
    pub const RETURN_MODE: &str = "vads_return_mode";
    pub const THREEDS_MPI: &str = "vads_threeds_mpi";
    pub const REDIRECT_SUCCESS_TIMEOUT: &str = "vads_redirect_success_timeout";
    pub const REDIRECT_SUCCESS_MESSAGE: &str = "vads_redirect_success_message";
    pub const REDIRECT_ERROR_TIMEOUT: &str = "vads_redirect_error_timeout";
    pub const REDIRECT_ERROR_MESSAGE: &str = "vads_redirect_error_message";
    pub const RESULT: &str = "vads_result";
    pub const EXTRA_RESULT: &str = "vads_extra_result";
    pub const OPERATION_TYPE: &str = "vads_operation_type";
    pub const CARD_BRAND: &str = "vads_card_brand";
    pub const CARD_NUMBER: &str = "vads_card_number";
    pub const AUTH_NUMBER: &str = "vads_auth_number";
    pub const CUST_EMAIL: &str = "vads_cust_email";
}

// ---------------------------------------------------------------------------
// FieldSet: the `vads_*` parameters of one payment session
// ---------------------------------------------------------------------------

/// Key/value parameters of one payment session, kept in key order.
///
/// Values are plain strings: an absent value has no representation here, so
/// every producer coerces "null" to `""` before inserting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSet {
    entries: BTreeMap<String, String>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Value of `key`, or `""` when absent.
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The `vads_*` entries in lexicographic key order.
    pub fn signed_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(k, _)| k.starts_with(VADS_PREFIX))
    }

    /// Whether at least one `vads_*` key is present.
    pub fn has_signed_fields(&self) -> bool {
        self.signed_fields().next().is_some()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.entries
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<BTreeMap<String, String>> for FieldSet {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

impl From<std::collections::HashMap<String, String>> for FieldSet {
    fn from(map: std::collections::HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

// ---------------------------------------------------------------------------
// Mode: test vs production context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Test,
    Production,
}

impl Mode {
    /// Value of `vads_ctx_mode` for this mode.
    pub fn ctx_mode(&self) -> &'static str {
        match self {
            Mode::Test => "TEST",
            Mode::Production => "PRODUCTION",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ctx_mode())
    }
}

// ---------------------------------------------------------------------------
// SignAlgorithm: legacy form signature algorithm
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignAlgorithm {
    #[serde(rename = "SHA-1")]
    Sha1,
    #[default]
    #[serde(rename = "SHA-256")]
    HmacSha256,
}

impl fmt::Display for SignAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignAlgorithm::Sha1 => write!(f, "SHA-1"),
            SignAlgorithm::HmacSha256 => write!(f, "HMAC-SHA-256"),
        }
    }
}

// ---------------------------------------------------------------------------
// TriState: enabled / disabled / defer to the gateway back office
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriState {
    Disabled,
    Enabled,
    #[default]
    UseGatewayDefault,
}

impl TriState {
    /// Wire value: `"0"`, `"1"`, or `""` to let the back office decide.
    pub fn as_flag(&self) -> &'static str {
        match self {
            TriState::Disabled => "0",
            TriState::Enabled => "1",
            TriState::UseGatewayDefault => "",
        }
    }
}

// ---------------------------------------------------------------------------
// SecretString: key material with redacted Debug and zeroize on drop
// ---------------------------------------------------------------------------

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ---------------------------------------------------------------------------
// GatewayCredentials: per-mode secret values
// ---------------------------------------------------------------------------

/// Secrets for one operating mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayCredentials {
    /// Shared key for the redirect form signature.
    #[serde(default)]
    pub legacy_key: SecretString,
    /// REST API password, also the IPN hash key for REST notifications.
    #[serde(default)]
    pub rest_password: SecretString,
    /// Public key for the embedded form client.
    #[serde(default)]
    pub rest_public_key: SecretString,
    /// HMAC-SHA-256 key for REST browser returns.
    #[serde(default)]
    pub rest_sha256_key: SecretString,
}

/// Test and production credentials, selected by [`Mode`] at use time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeCredentials {
    #[serde(default)]
    pub test: GatewayCredentials,
    #[serde(default)]
    pub production: GatewayCredentials,
}

impl ModeCredentials {
    pub fn for_mode(&self, mode: Mode) -> &GatewayCredentials {
        match mode {
            Mode::Test => &self.test,
            Mode::Production => &self.production,
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction: host-side record of one payment attempt
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    Draft,
    Pending,
    Done,
    Cancelled,
    Error,
}

impl TransactionState {
    /// Whether a notification may move a transaction from `self` to `target`.
    ///
    /// Done and Cancelled are final. Error may still become Done when a later
    /// attempt in the same order cycle succeeds.
    pub fn can_transition_to(&self, target: TransactionState) -> bool {
        if *self == target {
            return false;
        }
        match self {
            TransactionState::Draft | TransactionState::Pending => {
                target != TransactionState::Draft
            }
            TransactionState::Error => target == TransactionState::Done,
            TransactionState::Done | TransactionState::Cancelled => false,
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionState::Draft => "draft",
            TransactionState::Pending => "pending",
            TransactionState::Done => "done",
            TransactionState::Cancelled => "cancelled",
            TransactionState::Error => "error",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Gateway order id (`vads_order_id`), the lookup key.
    pub reference: String,
    /// Reference as known by the host system, before sanitizing.
    pub host_reference: String,
    pub provider_code: String,
    pub amount_minor: u64,
    pub currency_numeric: String,
    pub state: TransactionState,
    #[serde(default)]
    pub gateway_trans_id: Option<String>,
    #[serde(default)]
    pub gateway_trans_uuid: Option<String>,
    /// Last `vads_trans_status` applied.
    #[serde(default)]
    pub last_status: Option<String>,
    /// Bumped by the store on every successful compare-and-swap.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// A fresh draft created at checkout time.
    pub fn draft(
        reference: impl Into<String>,
        host_reference: impl Into<String>,
        provider_code: impl Into<String>,
        amount_minor: u64,
        currency_numeric: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            host_reference: host_reference.into(),
            provider_code: provider_code.into(),
            amount_minor,
            currency_numeric: currency_numeric.into(),
            state: TransactionState::Draft,
            gateway_trans_id: None,
            gateway_trans_uuid: None,
            last_status: None,
            version: 0,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_set_signed_fields_sorted_and_filtered() {
        let fields: FieldSet = [
            ("vads_site_id", "1"),
            ("signature", "x"),
            ("vads_amount", "2"),
            ("is_rest", "1"),
        ]
        .into_iter()
        .collect();

        let keys: Vec<&str> = fields.signed_fields().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["vads_amount", "vads_site_id"]);
        assert!(fields.has_signed_fields());
    }

    #[test]
    fn test_field_set_get_or_empty() {
        let mut fields = FieldSet::new();
        fields.insert("vads_order_id", "S001");
        assert_eq!(fields.get_or_empty("vads_order_id"), "S001");
        assert_eq!(fields.get_or_empty("vads_missing"), "");
    }

    #[test]
    fn test_field_set_serde_is_flat_map() {
        let mut fields = FieldSet::new();
        fields.insert("vads_amount", "100");
        let json = serde_json::to_string(&fields).unwrap();
        assert_eq!(json, r#"{"vads_amount":"100"}"#);
        let back: FieldSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fields);
    }

    #[test]
    fn test_mode_ctx_values() {
        assert_eq!(Mode::Test.ctx_mode(), "TEST");
        assert_eq!(Mode::Production.ctx_mode(), "PRODUCTION");
    }

    #[test]
    fn test_sign_algorithm_serde_names() {
        let algo: SignAlgorithm = serde_json::from_str(r#""SHA-1""#).unwrap();
        assert_eq!(algo, SignAlgorithm::Sha1);
        let algo: SignAlgorithm = serde_json::from_str(r#""SHA-256""#).unwrap();
        assert_eq!(algo, SignAlgorithm::HmacSha256);
    }

    #[test]
    fn test_tristate_flags() {
        assert_eq!(TriState::Disabled.as_flag(), "0");
        assert_eq!(TriState::Enabled.as_flag(), "1");
        assert_eq!(TriState::UseGatewayDefault.as_flag(), "");
        assert_eq!(TriState::default(), TriState::UseGatewayDefault);
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = SecretString::new("1122334455667788");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("1122"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_credentials_for_mode() {
        let creds = ModeCredentials {
            test: GatewayCredentials {
                legacy_key: "test-key".into(),
                ..Default::default()
            },
            production: GatewayCredentials {
                legacy_key: "prod-key".into(),
                ..Default::default()
            },
        };
        assert_eq!(creds.for_mode(Mode::Test).legacy_key.expose(), "test-key");
        assert_eq!(
            creds.for_mode(Mode::Production).legacy_key.expose(),
            "prod-key"
        );
    }

    #[test]
    fn test_state_transitions() {
        use TransactionState::*;
        assert!(Draft.can_transition_to(Pending));
        assert!(Draft.can_transition_to(Done));
        assert!(Pending.can_transition_to(Done));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Error.can_transition_to(Done));
        assert!(!Error.can_transition_to(Cancelled));
        assert!(!Done.can_transition_to(Error));
        assert!(!Cancelled.can_transition_to(Done));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Draft));
    }

    #[test]
    fn test_draft_transaction() {
        let tx = Transaction::draft("S001", "S/001", "lyra", 1999, "978");
        assert_eq!(tx.state, TransactionState::Draft);
        assert_eq!(tx.version, 0);
        assert!(tx.gateway_trans_id.is_none());
    }
}
