use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use lyra_core::{
    fields, sign, CurrencyDirectory, CurrencyEntry, FieldSet, InstallmentConfig, Mode,
    ProviderConfig, SIGNATURE_FIELD,
};

use crate::customer::Customer;
use crate::error::{CheckoutError, CheckoutResult};
use crate::trans_id::TransIdGenerator;

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// A checkout request from the host system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutOrder {
    /// Host order reference, e.g. `S00042`.
    pub reference: String,
    /// Order total in major units.
    pub amount: Decimal,
    /// ISO 4217 alphabetic code.
    pub currency: String,
    /// Pay in installments with the configured plan.
    #[serde(default)]
    pub installments: bool,
    #[serde(default)]
    pub customer: Option<Customer>,
}

/// Unsigned field set for one payment session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub fields: FieldSet,
    /// Whether the gateway redirects automatically at the end of the payment.
    pub auto_redirect: bool,
    /// Sanitized gateway order id.
    pub order_id: String,
    pub amount_minor: u64,
    pub currency: CurrencyEntry,
    pub mode: Mode,
}

/// Signed form posted by the browser to the gateway payment page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentForm {
    pub action_url: String,
    pub fields: FieldSet,
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Convert a major-unit amount to minor units.
///
/// The amount is rounded to the currency precision first, then scaled and
/// rounded again, so `19.999` with two decimals gives `2000`.
pub fn to_minor_units(amount: Decimal, decimals: u32) -> CheckoutResult<u64> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(CheckoutError::InvalidAmount(format!(
            "amount must not be negative, got {amount}"
        )));
    }

    let scale = 10u64
        .checked_pow(decimals)
        .map(Decimal::from)
        .ok_or_else(|| CheckoutError::InvalidAmount(format!("unsupported precision {decimals}")))?;

    amount
        .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(scale)
        .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|scaled| scaled.to_u64())
        .ok_or_else(|| CheckoutError::InvalidAmount(format!("amount {amount} is out of range")))
}

/// Gateway order id: the reference with everything but ASCII letters,
/// digits, `_` and `-` removed.
pub fn sanitize_order_id(reference: &str) -> CheckoutResult<String> {
    let id: String = reference
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if id.is_empty() {
        return Err(CheckoutError::InvalidReference);
    }
    Ok(id)
}

/// `vads_payment_config` value for an installment payment.
///
/// The first installment is `first_percentage` of the total when configured,
/// otherwise an equal share. Both are floored to whole minor units.
pub fn installment_plan(amount_minor: u64, plan: &InstallmentConfig) -> String {
    let total = Decimal::from(amount_minor);
    let first = match plan.first_percentage {
        Some(pct) => pct / Decimal::ONE_HUNDRED * total,
        None => total / Decimal::from(plan.count.max(1)),
    };
    let first = first.floor().to_u64().unwrap_or(0);

    format!(
        "MULTI:first={first};count={};period={}",
        plan.count, plan.period
    )
}

fn join_codes(codes: &[String]) -> String {
    codes.iter().map(|code| format!("{code};")).collect()
}

// ---------------------------------------------------------------------------
// RequestBuilder
// ---------------------------------------------------------------------------

/// Assembles the outbound field set for a payment session. Does not sign.
pub struct RequestBuilder<'a> {
    config: &'a ProviderConfig,
    currencies: &'a dyn CurrencyDirectory,
    trans_ids: &'a TransIdGenerator,
    return_url: String,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(
        config: &'a ProviderConfig,
        currencies: &'a dyn CurrencyDirectory,
        trans_ids: &'a TransIdGenerator,
    ) -> Self {
        Self {
            config,
            currencies,
            trans_ids,
            return_url: String::new(),
        }
    }

    /// Absolute URL the gateway sends the buyer back to.
    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = url.into();
        self
    }

    pub fn build(&self, order: &CheckoutOrder, mode: Mode) -> CheckoutResult<PaymentRequest> {
        self.build_at(order, mode, Utc::now())
    }

    /// Build with an explicit transaction timestamp.
    pub fn build_at(
        &self,
        order: &CheckoutOrder,
        mode: Mode,
        now: DateTime<Utc>,
    ) -> CheckoutResult<PaymentRequest> {
        let currency = self
            .currencies
            .lookup(&order.currency)
            .ok_or_else(|| CheckoutError::UnsupportedCurrency(order.currency.clone()))?;

        let amount_minor = to_minor_units(order.amount, currency.decimals)?;
        let order_id = sanitize_order_id(&order.reference)?;

        let payment_config = if order.installments {
            let plan = self
                .config
                .installments
                .as_ref()
                .ok_or(CheckoutError::InstallmentsNotConfigured)?;
            installment_plan(amount_minor, plan)
        } else {
            "SINGLE".to_string()
        };

        let threeds_mpi = match self.config.threeds_min_amount {
            Some(min) if order.amount < min => "2",
            _ => "",
        };

        let config = self.config;
        let mut out = FieldSet::new();
        out.insert(fields::SITE_ID, config.site_id.as_str());
        out.insert(fields::AMOUNT, amount_minor.to_string());
        out.insert(fields::CURRENCY, currency.numeric);
        out.insert(fields::TRANS_DATE, now.format("%Y%m%d%H%M%S").to_string());
        out.insert(fields::TRANS_ID, self.trans_ids.next_id());
        out.insert(fields::CTX_MODE, mode.ctx_mode());
        out.insert(fields::PAGE_ACTION, "PAYMENT");
        out.insert(fields::ACTION_MODE, "INTERACTIVE");
        out.insert(fields::PAYMENT_CONFIG, payment_config);
        out.insert(fields::VERSION, config.version.as_str());
        out.insert(fields::URL_RETURN, self.return_url.as_str());
        out.insert(fields::ORDER_ID, order_id.as_str());
        out.insert(fields::EXT_INFO_ORDER_REF, order.reference.as_str());
        out.insert(fields::CONTRIB, config.contrib.as_str());
        out.insert(fields::LANGUAGE, config.language.as_str());
        out.insert(
            fields::AVAILABLE_LANGUAGES,
            join_codes(&config.available_languages),
        );
        out.insert(
            fields::CAPTURE_DELAY,
            config
                .capture_delay
                .map(|d| d.to_string())
                .unwrap_or_default(),
        );
        out.insert(fields::VALIDATION_MODE, config.validation_mode.as_flag());
        out.insert(fields::PAYMENT_CARDS, join_codes(&config.payment_cards));
        out.insert(fields::RETURN_MODE, config.return_mode.as_str());
        out.insert(fields::THREEDS_MPI, threeds_mpi);

        let auto_redirect = config.redirect.enabled;
        if auto_redirect {
            let redirect = &config.redirect;
            out.insert(
                fields::REDIRECT_SUCCESS_TIMEOUT,
                redirect.success_timeout.to_string(),
            );
            out.insert(
                fields::REDIRECT_SUCCESS_MESSAGE,
                redirect.success_message.as_str(),
            );
            out.insert(
                fields::REDIRECT_ERROR_TIMEOUT,
                redirect.error_timeout.to_string(),
            );
            out.insert(fields::REDIRECT_ERROR_MESSAGE, redirect.error_message.as_str());
        }

        if let Some(customer) = &order.customer {
            customer.apply(&mut out);
        }

        // The gateway treats a lone space as a value; send it as empty.
        let out: FieldSet = out
            .into_inner()
            .into_iter()
            .map(|(k, v)| if v == " " { (k, String::new()) } else { (k, v) })
            .collect();

        tracing::debug!(
            order_id = %order_id,
            amount_minor,
            currency = currency.alpha,
            mode = %mode,
            "payment request built"
        );

        Ok(PaymentRequest {
            fields: out,
            auto_redirect,
            order_id,
            amount_minor,
            currency,
            mode,
        })
    }
}

/// Add the `signature` field using the legacy key of the request's mode.
pub fn sign_payment_request(
    request: PaymentRequest,
    config: &ProviderConfig,
) -> CheckoutResult<PaymentForm> {
    let key = &config.credentials.for_mode(request.mode).legacy_key;
    if key.is_empty() {
        return Err(CheckoutError::MissingKey(request.mode));
    }

    let mut fields = request.fields;
    let signature = sign(&fields, config.sign_algorithm, key.expose())?;
    fields.insert(SIGNATURE_FIELD, signature);

    Ok(PaymentForm {
        action_url: config.gateway_url.clone(),
        fields,
    })
}
