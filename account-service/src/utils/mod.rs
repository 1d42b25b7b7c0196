pub mod password;
pub mod validation;

pub use password::{hash_password, verify_password, Password, PasswordCredential};
pub use validation::{PathParam, ValidatedJson, ValidatedQuery};
