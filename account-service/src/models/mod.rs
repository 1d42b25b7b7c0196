pub mod bank_account;
pub mod user;

pub use bank_account::{
    BankAccount, UserBankAccount, MAX_ACCOUNT_NAME_LEN, MAX_ACCOUNT_NUMBER_LEN, MAX_BANK_CODE_LEN,
};
pub use user::{canonical_email, User, UserResponse, MAX_EMAIL_LEN, MAX_NAME_LEN};
