use serde_json::json;

use crate::habitica::{ApiResult, HabiticaApi};
use crate::models::{CoreError, WorkflowKind};
use crate::persistence::{PersistenceResult, SettingsStore};
use crate::workflows::context::{MISSING_CREDENTIALS_MESSAGE, WorkflowContext, WorkflowServices};

pub const INVALID_RATE_MESSAGE: &str =
    "Invalid conversion rate. Please set a valid rate in the options.";
pub const NO_COINS_MESSAGE: &str = "You have no coins to convert.";
pub const CONVERSION_FAILED_MESSAGE: &str =
    "Failed to update coins on Habitica. Conversion cancelled.";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConversionSummary {
    pub coins: f64,
    pub minutes_added: f64,
    pub total_minutes: f64,
}

impl ConversionSummary {
    pub fn message(&self) -> String {
        format!(
            "Converted {:.2} coins to {:.2} minutes. You now have a total of {:.2} minutes.",
            self.coins, self.minutes_added, self.total_minutes
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConversionOutcome {
    InvalidRate,
    MissingCredentials,
    NoBalance,
    Converted(ConversionSummary),
    /// Nothing was withdrawn, or the withdrawal itself failed.
    Failed(CoreError),
    /// The remote balance was zeroed but the local credit could not be
    /// written. The withdrawn coins are lost.
    CreditFailed {
        coins: f64,
        minutes_added: f64,
        error: CoreError,
    },
}

/// Read phase of the conversion: the balance seen on the remote user record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObservedBalance {
    coins: f64,
}

impl ObservedBalance {
    pub fn observe(api: &HabiticaApi) -> ApiResult<Self> {
        let user = api.get_user()?;
        Ok(Self {
            coins: user.stats.gp,
        })
    }

    pub fn coins(&self) -> f64 {
        self.coins
    }

    pub fn has_coins(&self) -> bool {
        self.coins > 0.0
    }

    /// Write phase: sets the remote balance to zero.
    ///
    /// The API has no compare-and-swap, so coins earned or spent between
    /// [`ObservedBalance::observe`] and this call are overwritten.
    pub fn withdraw_all(self, api: &HabiticaApi) -> ApiResult<WithdrawnCoins> {
        api.update_user(json!({ "stats.gp": 0 }))?;
        Ok(WithdrawnCoins { coins: self.coins })
    }
}

/// Coins already removed from the remote balance and owed as local credit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WithdrawnCoins {
    coins: f64,
}

impl WithdrawnCoins {
    pub fn coins(&self) -> f64 {
        self.coins
    }

    pub fn minutes(&self, rate: f64) -> f64 {
        self.coins / rate
    }

    /// Adds the converted minutes to the local accumulator. Read and write are
    /// not atomic with respect to other invocations.
    pub fn credit(self, settings: &dyn SettingsStore, rate: f64) -> PersistenceResult<ConversionSummary> {
        let minutes_added = self.minutes(rate);
        let current = parse_accumulator(settings.vacation_time()?.as_deref());
        let total_minutes = current + minutes_added;
        settings.set_vacation_time(total_minutes)?;

        Ok(ConversionSummary {
            coins: self.coins,
            minutes_added,
            total_minutes,
        })
    }
}

/// Parses the stored coins-per-minute rate. Missing, non-numeric, non-finite
/// and non-positive values are rejected.
pub fn parse_conversion_rate(raw: Option<&str>) -> Option<f64> {
    raw.and_then(parse_number).filter(|rate| *rate > 0.0)
}

/// Parses the stored vacation minutes, reading anything unusable as zero.
pub fn parse_accumulator(raw: Option<&str>) -> f64 {
    raw.and_then(parse_number).unwrap_or(0.0)
}

/// Converts the whole coin balance into vacation minutes: read the balance,
/// zero it remotely, then credit `balance / rate` minutes locally.
pub fn sync_coins(services: &WorkflowServices, context: &WorkflowContext) -> ConversionOutcome {
    let Some(rate) = parse_conversion_rate(context.conversion_rate.as_deref()) else {
        tracing::warn!(raw_rate = ?context.conversion_rate, "invalid conversion rate");
        services.notify(INVALID_RATE_MESSAGE);
        return ConversionOutcome::InvalidRate;
    };

    let Some(credentials) = context.credentials.as_ref() else {
        services.notify(MISSING_CREDENTIALS_MESSAGE);
        return ConversionOutcome::MissingCredentials;
    };

    let api = services.api(credentials);
    let balance = match ObservedBalance::observe(&api) {
        Ok(balance) => balance,
        Err(error) => return conversion_failed(services, error),
    };

    if !balance.has_coins() {
        tracing::info!(balance = balance.coins(), "no coins to convert");
        services.notify(NO_COINS_MESSAGE);
        return ConversionOutcome::NoBalance;
    }

    let withdrawn = match balance.withdraw_all(&api) {
        Ok(withdrawn) => withdrawn,
        Err(error) => return conversion_failed(services, error),
    };
    tracing::info!(coins = withdrawn.coins(), "remote coin balance set to zero");

    let minutes_added = withdrawn.minutes(rate);
    match withdrawn.credit(services.state.settings.as_ref(), rate) {
        Ok(summary) => {
            tracing::info!(
                coins = summary.coins,
                minutes_added = summary.minutes_added,
                total_minutes = summary.total_minutes,
                "coins converted"
            );
            services.notify(&summary.message());
            ConversionOutcome::Converted(summary)
        }
        Err(error) => {
            tracing::error!(
                coins = withdrawn.coins(),
                minutes_added,
                kind = ?error.kind,
                message = %error.message,
                "coins withdrawn but local credit failed"
            );
            services.notify(&format!(
                "Your {:.2} coins were withdrawn from Habitica, but {:.2} minutes could not be saved locally.",
                withdrawn.coins(),
                minutes_added
            ));
            ConversionOutcome::CreditFailed {
                coins: withdrawn.coins(),
                minutes_added,
                error: error.in_workflow(WorkflowKind::CoinConversion),
            }
        }
    }
}

fn conversion_failed(services: &WorkflowServices, error: CoreError) -> ConversionOutcome {
    tracing::error!(
        kind = ?error.kind,
        operation = ?error.operation,
        message = %error.message,
        "coin conversion failed"
    );
    services.notify(CONVERSION_FAILED_MESSAGE);
    ConversionOutcome::Failed(error.in_workflow(WorkflowKind::CoinConversion))
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
