// Registration PINs for the two-step signup flow
use async_trait::async_trait;
use bcrypt::BcryptError;
use rand::Rng;

use crate::db::models::User;

/// Returns `(plaintext_to_send, bcrypt_hash_to_store)`.
pub fn generate_pin(cost: u32) -> Result<(String, String), BcryptError> {
    let plaintext = rand::thread_rng().gen_range(100000..=999999).to_string();
    let hash = bcrypt::hash(&plaintext, cost)?;
    Ok((plaintext, hash))
}

pub fn verify_pin(plaintext: &str, hash: &str) -> bool {
    bcrypt::verify(plaintext.trim(), hash).unwrap_or(false)
}

/// Hands a freshly issued PIN to the user (email, SMS, ...).
#[async_trait]
pub trait PinDelivery: Send + Sync {
    async fn deliver(&self, user: &User, pin: &str) -> anyhow::Result<()>;
}

/// Writes the PIN to the log. Used when no mail transport is configured.
pub struct LogPinDelivery;

#[async_trait]
impl PinDelivery for LogPinDelivery {
    async fn deliver(&self, user: &User, pin: &str) -> anyhow::Result<()> {
        tracing::info!(
            user_id = %user.id,
            email = %user.email,
            pin,
            "Verification PIN issued"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_pin_is_six_digits() {
        let (pin, _) = generate_pin(4).unwrap();
        assert_eq!(pin.len(), 6);
        assert!(pin.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn pin_verifies_against_its_hash() {
        let (pin, hash) = generate_pin(4).unwrap();
        assert_ne!(pin, hash);
        assert!(verify_pin(&pin, &hash));
        assert!(verify_pin(&format!(" {} ", pin), &hash));
        assert!(!verify_pin("000000x", &hash));
    }
}
