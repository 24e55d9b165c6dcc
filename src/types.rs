use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Mobile-money network operator. Each provider owns a distinct set of
/// phone-number prefixes; a number is only valid for the provider it was
/// issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "MTN")]
    Mtn,
    Airtel,
    Vodafone,
}

impl Provider {
    /// Valid number prefixes for this provider (local format, leading zero).
    pub fn prefixes(&self) -> &'static [&'static str] {
        match self {
            Provider::Mtn => &["024", "054", "055", "059"],
            Provider::Airtel => &["026", "056", "066"],
            Provider::Vodafone => &["020", "050", "057"],
        }
    }

    /// Check a mobile-money number against this provider's prefix set.
    /// Whitespace is stripped before validation; the number must be exactly
    /// ten digits.
    pub fn validates_number(&self, number: &str) -> bool {
        let clean: String = number.chars().filter(|c| !c.is_whitespace()).collect();
        if clean.len() != 10 || !clean.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        self.prefixes().iter().any(|p| clean.starts_with(p))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Mtn => "MTN",
            Provider::Airtel => "Airtel",
            Provider::Vodafone => "Vodafone",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of withdrawal destination. Mobile money is the only supported kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodType {
    MobileMoney,
}

/// A withdrawal destination registered by a doctor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutMethod {
    pub id: String,
    pub doctor_id: String,
    #[serde(rename = "type")]
    pub method_type: MethodType,
    pub provider: Provider,
    pub number: String,
    pub is_default: bool,
}

/// Value copy of the destination taken when a request is created. Later
/// edits or deletion of the originating method never change this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodSnapshot {
    pub provider: Provider,
    pub number: String,
}

/// Lifecycle status of a payout request.
///
/// Allowed transitions (terminal states marked *):
///
/// ```text
/// pending    -> processing, cancelled
/// processing -> completed*, failed
/// failed     -> pending (retry)
/// completed* / cancelled*
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl PayoutStatus {
    /// Whether a direct transition from `self` to `target` is in the table.
    pub fn can_transition_to(&self, target: PayoutStatus) -> bool {
        use PayoutStatus::*;
        matches!(
            (self, target),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Failed, Pending)
        )
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PayoutStatus::Completed | PayoutStatus::Cancelled)
    }

    /// Whether funds for a request in this status are still in flight.
    pub fn is_open(&self) -> bool {
        matches!(self, PayoutStatus::Pending | PayoutStatus::Processing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Processing => "processing",
            PayoutStatus::Completed => "completed",
            PayoutStatus::Failed => "failed",
            PayoutStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How long a freshly created (or retried) request is expected to take
/// before the rail settles it.
pub const ESTIMATED_COMPLETION_HOURS: i64 = 4;

/// A request to withdraw accumulated earnings. Lives in the ledger forever;
/// only its status and the associated timestamps ever change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRequest {
    pub id: String,
    pub doctor_id: String,
    /// Amount in currency minor units (pesewas for GHS).
    pub amount: u64,
    pub currency: String,
    pub status: PayoutStatus,
    pub reference: String,
    pub requested_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub method: MethodSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_completion: Option<DateTime<Utc>>,
}

impl PayoutRequest {
    /// Estimated completion time for a request entering `pending` at `now`.
    pub fn estimate_completion(now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::hours(ESTIMATED_COMPLETION_HOURS)
    }
}

/// Per-doctor summary over the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutStats {
    /// Count of all requests ever created for the doctor.
    pub total_requested: u64,
    /// Count of requests currently completed.
    pub total_completed: u64,
    /// Count of requests currently failed (a retry moves one back out).
    pub total_failed: u64,
    /// Sum of amounts with status pending or processing.
    pub pending_amount: u64,
    /// Sum of amounts with status completed.
    pub completed_amount: u64,
}
