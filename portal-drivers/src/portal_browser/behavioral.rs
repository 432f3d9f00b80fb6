use crate::dom::PageDom;
use portal_common::Result;
use rand::rngs::OsRng;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone)]
/// Produces human-like delays and typing so reactive forms see realistic input.
pub struct BehavioralEngine {
    typing_min_ms: u64,
    typing_max_ms: u64,
}

impl Default for BehavioralEngine {
    fn default() -> Self {
        Self::new(30, 150)
    }
}

impl BehavioralEngine {
    pub fn new(typing_min_ms: u64, typing_max_ms: u64) -> Self {
        Self {
            typing_min_ms: typing_min_ms.min(typing_max_ms),
            typing_max_ms: typing_min_ms.max(typing_max_ms),
        }
    }

    /// No delays at all.
    pub fn instant() -> Self {
        Self::new(0, 0)
    }

    /// Sleep for a random duration between `min` and `max` milliseconds.
    pub async fn random_delay(&self, min: u64, max: u64) {
        let (lo, hi) = (min.min(max), min.max(max));
        if hi == 0 {
            return;
        }
        let ms = OsRng.gen_range(lo..=hi);
        sleep(Duration::from_millis(ms)).await;
    }

    /// Fixed wait for a reactive re-render to land.
    pub async fn settle(&self, delay: Duration) {
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }

    /// Type the provided text with small random delays between characters.
    pub async fn type_text_human_like<P: PageDom>(
        &self,
        page: &P,
        element: &P::Element,
        text: &str,
    ) -> Result<()> {
        for ch in text.chars() {
            page.send_keys(element, &ch.to_string()).await?;
            self.random_delay(self.typing_min_ms, self.typing_max_ms)
                .await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_normalised() {
        let engine = BehavioralEngine::new(120, 30);
        assert_eq!(engine.typing_min_ms, 30);
        assert_eq!(engine.typing_max_ms, 120);
    }

    #[tokio::test]
    async fn zero_delay_returns_immediately() {
        let start = std::time::Instant::now();
        BehavioralEngine::instant().random_delay(0, 0).await;
        BehavioralEngine::instant().settle(Duration::ZERO).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
