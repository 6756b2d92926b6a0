//! Merchant order ids: `<TAG>_<studentId>_<folderId>_<timestamp>[_<suffix>]`.
//!
//! The payment row is looked up by the whole id; the embedded student and folder only
//! serve as a consistency check against that row.

use rand::distr::Alphanumeric;
use rand::Rng;

use crate::models::payment::PaymentProvider;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderRefError {
    #[error("expected at least 4 underscore-separated segments, got {0}")]
    TooFewSegments(usize),
    #[error("expected provider tag {expected}, got {found:?}")]
    WrongTag {
        expected: &'static str,
        found: String,
    },
    #[error("segment {index} is not an integer: {value:?}")]
    NotAnInteger { index: usize, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRef {
    pub student_id: i64,
    pub folder_id: i64,
}

impl OrderRef {
    pub fn decode(
        provider: PaymentProvider,
        merchant_order_id: &str,
    ) -> Result<Self, OrderRefError> {
        let segments: Vec<&str> = merchant_order_id.split('_').collect();
        if segments.len() < 4 {
            return Err(OrderRefError::TooFewSegments(segments.len()));
        }

        let expected = provider.order_tag();
        if segments[0] != expected {
            return Err(OrderRefError::WrongTag {
                expected,
                found: segments[0].to_string(),
            });
        }

        let int_at = |index: usize| {
            segments[index]
                .parse::<i64>()
                .map_err(|_| OrderRefError::NotAnInteger {
                    index,
                    value: segments[index].to_string(),
                })
        };

        Ok(OrderRef {
            student_id: int_at(1)?,
            folder_id: int_at(2)?,
        })
    }

    /// Builds a fresh id for a checkout attempt, with a random suffix so two attempts
    /// in the same second never collide.
    pub fn encode(&self, provider: PaymentProvider, unix_timestamp: i64) -> String {
        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect();
        format!(
            "{}_{}_{}_{}_{}",
            provider.order_tag(),
            self.student_id,
            self.folder_id,
            unix_timestamp,
            suffix
        )
    }
}
