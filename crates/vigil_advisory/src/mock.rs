//! Mock advisor — deterministic advisories for testing without a backend.

use async_trait::async_trait;
use vigil_core::{AdvisoryContext, AdvisoryGenerator};

#[derive(Debug, Clone, Default)]
pub struct MockAdvisor;

impl MockAdvisor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AdvisoryGenerator for MockAdvisor {
    async fn generate(&self, ctx: &AdvisoryContext) -> anyhow::Result<String> {
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        Ok(format!(
            "Your variability is {:.1} ms with blood pressure {}/{}. \
             Sit down, breathe slowly, and re-check in a few minutes.",
            ctx.variability_ms, ctx.systolic, ctx.diastolic
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::RiskLevel;

    #[tokio::test]
    async fn mock_generates_deterministic_text() {
        let advisor = MockAdvisor::new();
        let ctx = AdvisoryContext {
            subject_id: "s1".into(),
            name: "Ada".into(),
            status: RiskLevel::Yellow,
            variability_ms: 30.0,
            systolic: 120,
            diastolic: 80,
            lifestyle_score: 60,
            medical_history: vec![],
        };
        let a = advisor.generate(&ctx).await.unwrap();
        let b = advisor.generate(&ctx).await.unwrap();
        assert_eq!(a, b);
        assert!(a.contains("30.0 ms"));
    }
}
