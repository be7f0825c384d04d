//! Per-file open passwords.

use rand::Rng;
use sha2::{Digest, Sha256};

use crate::conf::{C_PASSWORD_ALPHABET, N_LEN_PASSWORD};

/// Password for the workbook of `split_value`.
///
/// With `if_random` the password comes from the thread RNG. Otherwise it is
/// derived from SHA-256 of `"{project}|{split_value}"`, so re-running a batch
/// reproduces the same passwords.
pub fn create_password(project: &str, split_value: &str, if_random: bool) -> String {
    if if_random {
        return create_random_password();
    }
    create_derived_password(project, split_value)
}

pub fn create_random_password() -> String {
    let mut rng = rand::rng();
    (0..N_LEN_PASSWORD)
        .map(|_| C_PASSWORD_ALPHABET[rng.random_range(0..C_PASSWORD_ALPHABET.len())] as char)
        .collect()
}

pub fn create_derived_password(project: &str, split_value: &str) -> String {
    let v_digest = Sha256::digest(format!("{project}|{split_value}").as_bytes());
    v_digest
        .iter()
        .take(N_LEN_PASSWORD)
        .map(|byte| C_PASSWORD_ALPHABET[*byte as usize % C_PASSWORD_ALPHABET.len()] as char)
        .collect()
}
