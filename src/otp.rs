//! One-time-passcode verification against pending (phone, code) records.
//!
//! Consumed codes are not deleted inline: a successful match stamps the row
//! with a purge deadline 5-10 seconds out, lookups ignore rows past their
//! deadline, and each verification sweeps expired rows. A repeat verification
//! inside the window still succeeds; restarting the process loses nothing.

use crate::errors::{AppError, ResultExt};
use rand::Rng;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

pub const PURGE_DELAY_MIN_MS: u64 = 5_000;
pub const PURGE_DELAY_MAX_MS: u64 = 10_000;

/// Uniform sample from [5000, 10000) ms.
pub fn sample_purge_delay<R: Rng>(rng: &mut R) -> Duration {
    Duration::from_millis(rng.gen_range(PURGE_DELAY_MIN_MS..PURGE_DELAY_MAX_MS))
}

pub struct OtpVerifier {
    pool: PgPool,
}

impl OtpVerifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Validates a submitted passcode for a phone number.
    ///
    /// Errors: `BadRequest` when either input is missing, `Unauthorized` when
    /// the code is wrong or the phone has no pending code.
    pub async fn verify(&self, phone: &str, code: &str) -> Result<(), AppError> {
        if phone.trim().is_empty() || code.trim().is_empty() {
            return Err(AppError::BadRequest(
                "El número de teléfono y el código OTP son requeridos.".to_string(),
            ));
        }

        let matched = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM otp_codes \
             WHERE telefono = $1 AND code = $2 \
             AND (purge_after IS NULL OR purge_after > NOW()) \
             LIMIT 1",
        )
        .bind(phone)
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .context("failed to look up OTP record")?;

        let Some(id) = matched else {
            let phone_has_code = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM otp_codes \
                 WHERE telefono = $1 \
                 AND (purge_after IS NULL OR purge_after > NOW())",
            )
            .bind(phone)
            .fetch_one(&self.pool)
            .await
            .context("failed to look up OTP records for phone")?;

            return Err(if phone_has_code > 0 {
                AppError::Unauthorized("El código es incorrecto.".to_string())
            } else {
                AppError::Unauthorized(
                    "El número de teléfono no está registrado o no tiene un OTP válido."
                        .to_string(),
                )
            });
        };

        // Stamp the purge deadline only once so repeat verifications inside
        // the window don't extend it.
        let delay = sample_purge_delay(&mut rand::thread_rng());
        sqlx::query(
            "UPDATE otp_codes \
             SET purge_after = NOW() + make_interval(secs => $2) \
             WHERE id = $1 AND purge_after IS NULL",
        )
        .bind(id)
        .bind(delay.as_secs_f64())
        .execute(&self.pool)
        .await
        .context("failed to stamp OTP purge deadline")?;

        tracing::debug!(
            "OTP verified for {}, purge in {} ms",
            phone,
            delay.as_millis()
        );

        self.sweep_expired().await;
        Ok(())
    }

    /// Best-effort removal of codes whose purge window has passed.
    async fn sweep_expired(&self) {
        match sqlx::query("DELETE FROM otp_codes WHERE purge_after <= NOW()")
            .execute(&self.pool)
            .await
        {
            Ok(done) if done.rows_affected() > 0 => {
                tracing::debug!("Swept {} expired OTP codes", done.rows_affected());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("OTP sweep failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn purge_delay_stays_in_window() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let d = sample_purge_delay(&mut rng);
            assert!(d >= Duration::from_millis(PURGE_DELAY_MIN_MS));
            assert!(d < Duration::from_millis(PURGE_DELAY_MAX_MS));
        }
    }
}
