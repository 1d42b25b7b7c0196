//! Bank account value object and the user link record that embeds it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Column widths of `user_bank_accounts`, in characters.
pub const MAX_BANK_CODE_LEN: usize = 32;
pub const MAX_ACCOUNT_NUMBER_LEN: usize = 64;
pub const MAX_ACCOUNT_NAME_LEN: usize = 255;

/// Account details as claimed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BankAccount {
    pub bank_code: String,
    pub account_number: String,
    /// Holder name supplied by the user, not the provider's name of record.
    pub account_name: String,
}

impl BankAccount {
    pub fn new(
        bank_code: impl Into<String>,
        account_number: impl Into<String>,
        account_name: impl Into<String>,
    ) -> Self {
        Self {
            bank_code: bank_code.into(),
            account_number: account_number.into(),
            account_name: account_name.into(),
        }
    }
}

/// A successful link between a user and a bank account. Never updated in place.
#[derive(Debug, Clone, FromRow)]
pub struct UserBankAccount {
    pub link_id: Uuid,
    pub user_id: Uuid,
    #[sqlx(flatten)]
    pub bank_account: BankAccount,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl UserBankAccount {
    pub fn new(user_id: Uuid, bank_account: BankAccount) -> Self {
        let now = Utc::now();
        Self {
            link_id: Uuid::new_v4(),
            user_id,
            bank_account,
            created_utc: now,
            updated_utc: now,
        }
    }

    /// Whether this link is for the given (bank code, account number) pair.
    pub fn is_for(&self, bank_code: &str, account_number: &str) -> bool {
        self.bank_account.bank_code == bank_code
            && self.bank_account.account_number == account_number
    }
}
