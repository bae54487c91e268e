//! Wire models of the Expense Explorer API.
//!
//! Money amounts are sent by the server either as JSON numbers or as decimal
//! strings (`"12.50"`); both are accepted.

use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Currency a statement is recorded in.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum Currency {
    /// US Dollar
    #[default]
    Usd,
    /// Euro
    Eur,
    /// British Pound
    Gbp,
    /// Indian Rupee
    Inr,
    /// Japanese Yen
    Jpy,
    /// Chinese Yuan
    Cny,
    /// Australian Dollar
    Aud,
    /// Canadian Dollar
    Cad,
    /// Swiss Franc
    Chf,
    /// UAE Dirham
    Aed,
    /// Qatari Riyal
    Qar,
    /// Saudi Riyal
    Sar,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            Self::Number(n) => Ok(n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid amount {s:?}"))),
        }
    }
}

fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    RawAmount::deserialize(deserializer)?.into_f64()
}

fn optional_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Option::<RawAmount>::deserialize(deserializer)?
        .map(RawAmount::into_f64)
        .transpose()
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Server id.
    pub id: i64,
    /// Login email.
    pub email: String,
    /// Display handle.
    pub username: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Whether the email address was confirmed.
    #[serde(default)]
    pub email_verified: bool,
    /// Account creation timestamp (ISO 8601).
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Registration form.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    /// Login email.
    pub email: String,
    /// Display handle.
    pub username: String,
    /// Chosen password.
    pub password: String,
    /// Confirmation; must equal `password`.
    pub password2: String,
    /// Given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

/// Editable profile fields. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    /// New display handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// New given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// New family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Response of `POST /auth/register/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// The created user.
    pub user: User,
    /// Confirmation text.
    #[serde(default)]
    pub message: String,
}

/// Body of the server's plain acknowledgements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    /// Human-readable status.
    pub message: String,
}

/// Spending category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Server id.
    pub id: i64,
    /// Machine name (`FOOD`, `TRAVEL`, ...).
    pub name: String,
    /// Label shown to users.
    pub display_name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// An uploaded bank statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Server id.
    pub id: i64,
    /// Name of the uploaded file.
    pub file_name: String,
    /// `CSV` or `PDF`.
    pub file_type: String,
    /// Currency code the statement is recorded in.
    pub currency: String,
    /// Upload timestamp (ISO 8601).
    pub uploaded_at: String,
    /// Whether transactions were extracted.
    #[serde(default)]
    pub processed: bool,
    /// Number of extracted transactions, when the server annotates it.
    #[serde(default)]
    pub transaction_count: Option<u64>,
}

/// Response of a statement upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Server status text.
    pub message: String,
    /// Id of the created statement.
    pub statement_id: i64,
    /// Number of transactions extracted from the file.
    pub transaction_count: u64,
}

/// A single statement line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Server id.
    pub id: i64,
    /// Booking date (`YYYY-MM-DD`).
    pub date: String,
    /// Statement text.
    pub description: String,
    /// Signed amount.
    #[serde(deserialize_with = "amount")]
    pub amount: f64,
    /// Currency code.
    pub currency: String,
    /// Assigned category, if any.
    #[serde(default)]
    pub category_id: Option<i64>,
    /// Label of the assigned category.
    #[serde(default)]
    pub category_name: Option<String>,
    /// Creation timestamp (ISO 8601).
    #[serde(default)]
    pub created_at: Option<String>,
}

/// `GET /dashboard/summary/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Sum of all amounts in scope.
    #[serde(deserialize_with = "amount")]
    pub total_spending: f64,
    /// Distinct categories in scope.
    pub category_count: u64,
    /// Transactions in scope.
    pub transaction_count: u64,
    /// Currency of the totals.
    #[serde(default)]
    pub currency: String,
}

/// One row of `GET /dashboard/category-breakdown/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// Category id.
    pub id: i64,
    /// Machine name.
    pub name: String,
    /// Label shown to users.
    pub display_name: String,
    /// Sum of amounts.
    #[serde(deserialize_with = "amount")]
    pub total: f64,
    /// Number of transactions.
    pub count: u64,
}

/// A labelled total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedTotal {
    /// Category label.
    pub name: String,
    /// Sum of amounts.
    #[serde(deserialize_with = "amount")]
    pub total: f64,
}

/// `GET /dashboard/top-categories/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopCategories {
    /// Highest totals, descending.
    #[serde(rename = "top_5", default)]
    pub top: Vec<NamedTotal>,
    /// Lowest totals; empty unless more than five categories exist.
    #[serde(rename = "lowest_5", default)]
    pub lowest: Vec<NamedTotal>,
}

/// One row of `GET /dashboard/spending-trend/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    /// Month label, e.g. `Jan 2025`.
    pub month: String,
    /// Sum of amounts.
    #[serde(deserialize_with = "amount")]
    pub total: f64,
}

/// One row of `GET /dashboard/spending-by-weekday/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayTotal {
    /// Day name, `Monday` through `Sunday`.
    pub day: String,
    /// Sum of amounts.
    #[serde(deserialize_with = "amount")]
    pub total: f64,
}

/// A per-category budget hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSuggestion {
    /// Category label, or `Overall`.
    pub category: String,
    /// Hint text.
    pub suggestion: String,
}

/// `GET /dashboard/recommendations/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    /// Estimated monthly savings.
    #[serde(deserialize_with = "amount")]
    pub potential_savings: f64,
    /// Up to five hints.
    #[serde(default)]
    pub budget_optimization: Vec<BudgetSuggestion>,
    /// Narrative of the spending pattern.
    #[serde(default)]
    pub spending_pattern: String,
    /// Transactions considered; absent when there was no data.
    #[serde(default)]
    pub total_transactions: Option<u64>,
    /// Mean transaction amount; absent when there was no data.
    #[serde(default, deserialize_with = "optional_amount")]
    pub average_transaction: Option<f64>,
}
