use rand::{rngs::OsRng, RngCore};
use scrypt::{scrypt, Params};
use secrecy::{ExposeSecret, Secret};
use std::fmt;
use subtle::ConstantTimeEq;

/// Length of the random salt, in bytes.
pub const SALT_LEN: usize = 32;

/// Length of the derived key, in bytes.
pub const HASH_LEN: usize = 64;

// N = 2^14 = 16384, r = 8, p = 1.
const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Newtype for password to prevent accidental logging
#[derive(Debug, Clone)]
pub struct Password(Secret<String>);

impl Password {
    pub fn new(password: String) -> Self {
        Self(Secret::new(password))
    }

    /// Password with surrounding whitespace removed, as it is hashed.
    fn normalized(&self) -> &str {
        self.0.expose_secret().trim()
    }

    pub fn is_blank(&self) -> bool {
        self.normalized().is_empty()
    }
}

/// Derived scrypt key plus the salt it was derived with.
///
/// Opaque once created; `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PasswordCredential {
    #[sqlx(rename = "password_hash")]
    pub hash: Vec<u8>,
    #[sqlx(rename = "password_salt")]
    pub salt: Vec<u8>,
}

impl fmt::Debug for PasswordCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCredential")
            .field("hash", &format_args!("[REDACTED; {} bytes]", self.hash.len()))
            .field("salt", &format_args!("[REDACTED; {} bytes]", self.salt.len()))
            .finish()
    }
}

fn derive_key(password: &Password, salt: &[u8]) -> Result<Vec<u8>, anyhow::Error> {
    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, HASH_LEN)
        .map_err(|e| anyhow::anyhow!("Invalid scrypt parameters: {}", e))?;

    let mut output = vec![0u8; HASH_LEN];
    scrypt(password.normalized().as_bytes(), salt, &params, &mut output)
        .map_err(|e| anyhow::anyhow!("Failed to derive password hash: {}", e))?;

    Ok(output)
}

fn generate_salt() -> Vec<u8> {
    let mut salt = vec![0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Hash a password using scrypt
///
/// Leading and trailing whitespace is stripped first. A fresh 32-byte salt is
/// drawn from the OS RNG on every call, so equal passwords never share a hash.
pub fn hash_password(password: &Password) -> Result<PasswordCredential, anyhow::Error> {
    let salt = generate_salt();
    let hash = derive_key(password, &salt)?;

    Ok(PasswordCredential { hash, salt })
}

/// Verify a password against a stored credential using constant-time comparison
///
/// Returns Ok(()) if password matches, Err otherwise.
pub fn verify_password(
    password: &Password,
    credential: &PasswordCredential,
) -> Result<(), anyhow::Error> {
    let candidate = derive_key(password, &credential.salt)?;

    if bool::from(candidate.ct_eq(&credential.hash)) {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Password verification failed"))
    }
}
