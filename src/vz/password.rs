//! Root password generation
//!
//! Generated passwords draw from a fixed lowercase-and-digit alphabet so
//! they survive every quoting context they pass through (shell command
//! lines, config files, support tickets read over the phone).

use rand::Rng;
use zeroize::Zeroizing;

/// Characters a generated password may contain. Visually ambiguous letters
/// (`d`, `i`, `l`, `o`) are left out.
const ALPHABET: &[u8] = b"abchefghjkmnpqrstuvwxyz0123456789";

/// Default generated password length
pub const DEFAULT_LENGTH: usize = 8;

/// Generate a random password of `length` characters from the fixed
/// alphabet. The returned string is wiped from memory on drop.
pub fn generate(length: usize) -> Zeroizing<String> {
    let mut rng = rand::thread_rng();
    let mut password = String::with_capacity(length);
    for _ in 0..length {
        let index = rng.gen_range(0..ALPHABET.len());
        password.push(ALPHABET[index] as char);
    }
    Zeroizing::new(password)
}

/// Whether a caller-supplied password can be used as-is. Anything outside
/// ASCII alphanumerics forces regeneration.
pub fn is_acceptable(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_alphanumeric())
}
