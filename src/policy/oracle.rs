//! 策略预言机：按规则文档评估订单变更
//!
//! 规则文档是一份 markdown（内置默认，可用文件覆盖），由 LLM 对照给出
//! allowed / conditional / denied 判定；输出解析失败时安全退到 denied + 转人工。

use std::path::PathBuf;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::llm::{LlmClient, Message};
use crate::oracle::parser;
use crate::policy::types::{ChangeType, PolicyDecision, PolicyEvaluationResult};
use crate::prompts::{self, PromptService};
use crate::store::OrderStatus;

/// 内置变更策略文档
const DEFAULT_POLICY_DOCUMENT: &str = include_str!("change-policies.md");

/// 策略预言机
pub struct PolicyOracle {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptService>,
    rules_path: Option<PathBuf>,
}

impl PolicyOracle {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompts: Arc<PromptService>,
        rules_path: Option<PathBuf>,
    ) -> Self {
        Self {
            llm,
            prompts,
            rules_path,
        }
    }

    /// 加载规则文档：文件覆盖优先，读不到时用内置文档
    pub fn policy_document(&self) -> String {
        if let Some(path) = &self.rules_path {
            match std::fs::read_to_string(path) {
                Ok(text) => return text,
                Err(e) => {
                    tracing::warn!("Failed to read policy document {:?}: {}", path, e);
                }
            }
        }
        DEFAULT_POLICY_DOCUMENT.to_string()
    }

    /// 评估一次变更请求；输出不可解析时退到 denied + escalate_to_support
    pub async fn evaluate_change(
        &self,
        order_status: OrderStatus,
        change_type: ChangeType,
        affected_amount: Decimal,
        order_total: Decimal,
    ) -> PolicyEvaluationResult {
        let status_str = order_status.as_str();
        let change_str = change_type.as_str();

        let prompt = self
            .prompts
            .load(prompts::POLICY_EVALUATION)
            .replace("{policy_document}", &self.policy_document())
            .replace("{order_status}", status_str)
            .replace("{change_type}", change_str)
            .replace("{affected_amount}", &format!("{:.2}", affected_amount))
            .replace("{order_total}", &format!("{:.2}", order_total));

        let messages = vec![
            Message::system(prompt),
            Message::user(format!(
                "Evaluate the {} request for an order in {} status.",
                change_str, status_str
            )),
        ];

        tracing::debug!(
            "Evaluating policy: status={}, change_type={}",
            status_str,
            change_str
        );

        let raw = match self.llm.complete(&messages).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Policy evaluation LLM error: {}", e);
                return Self::fail_safe(change_str, status_str);
            }
        };
        let content = parser::extract_json(&raw);

        match serde_json::from_str::<PolicyEvaluationResult>(&content) {
            Ok(result) => {
                tracing::info!(
                    "Policy evaluation: status={}, change={}, decision={:?}",
                    status_str,
                    change_str,
                    result.decision
                );
                result
            }
            Err(e) => {
                tracing::error!(
                    "Failed to parse policy evaluation response: {:?}, error: {}",
                    raw,
                    e
                );
                Self::fail_safe(change_str, status_str)
            }
        }
    }

    /// 安全默认：拒绝并转人工
    fn fail_safe(change_type: &str, order_status: &str) -> PolicyEvaluationResult {
        PolicyEvaluationResult {
            decision: PolicyDecision::Denied,
            change_type: change_type.to_string(),
            order_status: order_status.to_string(),
            cost_impact: None,
            cost_description: None,
            delivery_impact_days: None,
            delivery_description: None,
            denial_reason: Some("Unable to evaluate policy - please contact support".to_string()),
            requires_confirmation: false,
            escalate_to_support: true,
        }
    }

    /// 返回规则文档中对应订单状态的小节，供人工查看
    pub fn policy_summary(&self, order_status: OrderStatus) -> String {
        let document = self.policy_document();
        let status = order_status.as_str();
        let marker = format!("### {} State", status);

        if let Some(start) = document.find(&marker) {
            let rest = &document[start..];
            let end = rest[1..]
                .find("\n### ")
                .or_else(|| rest[1..].find("\n## "))
                .map(|i| i + 1)
                .unwrap_or(rest.len());
            return rest[..end].trim().to_string();
        }

        format!("No policy information found for {} orders.", status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;

    fn oracle_with(replies: &[&str]) -> PolicyOracle {
        PolicyOracle::new(
            Arc::new(ScriptedLlmClient::new(replies.iter().copied())),
            Arc::new(PromptService::new(None)),
            None,
        )
    }

    #[tokio::test]
    async fn test_parses_fenced_decision() {
        let reply = "```json\n{\"decision\": \"conditional\", \"change_type\": \"size_change\", \"order_status\": \"IN_PRODUCTION\", \"delivery_impact_days\": 3, \"requires_confirmation\": true}\n```";
        let oracle = oracle_with(&[reply]);
        let result = oracle
            .evaluate_change(
                OrderStatus::InProduction,
                ChangeType::SizeChange,
                Decimal::new(24950, 2),
                Decimal::new(49900, 2),
            )
            .await;
        assert_eq!(result.decision, PolicyDecision::Conditional);
        assert_eq!(result.delivery_impact_days, Some(3));
    }

    #[tokio::test]
    async fn test_unparseable_fails_safe_to_denied() {
        let oracle = oracle_with(&["the policy says it depends"]);
        let result = oracle
            .evaluate_change(
                OrderStatus::Created,
                ChangeType::QuantityIncrease,
                Decimal::ZERO,
                Decimal::ZERO,
            )
            .await;
        assert_eq!(result.decision, PolicyDecision::Denied);
        assert!(result.escalate_to_support);
    }

    #[test]
    fn test_policy_summary_finds_section() {
        let oracle = oracle_with(&[]);
        let summary = oracle.policy_summary(OrderStatus::InProduction);
        assert!(summary.contains("IN_PRODUCTION"));
        assert!(!summary.contains("READY_TO_SHIP State"));
    }
}
