//! 系统提示词加载
//!
//! 每个提示词先查 prompts_dir（默认 config/prompts）下的同名 .txt 文件，
//! 没有则用内置默认文本，与配置文件缺失时行为一致。

use std::path::PathBuf;

/// 意图分类
pub const INTENT_CLASSIFICATION: &str = "intent_classification";
/// 订单摘要
pub const ORDER_SUMMARY: &str = "order_summary";
/// 跑题应答
pub const OFF_TOPIC_RESPONSE: &str = "off_topic_response";
/// 修改请求抽取
pub const PARSE_MODIFICATION: &str = "parse_modification";
/// 复述确认问题生成
pub const CONFIRM_UNDERSTANDING: &str = "confirm_understanding";
/// 确认答复解释
pub const INTERPRET_CONFIRMATION: &str = "interpret_confirmation";
/// 策略评估
pub const POLICY_EVALUATION: &str = "policy_evaluation";
/// 策略条件说明
pub const POLICY_RESPONSE: &str = "policy_response";
/// 策略拒绝说明
pub const POLICY_DENIAL: &str = "policy_denial";

/// 提示词服务：文件覆盖 + 内置默认
pub struct PromptService {
    dir: Option<PathBuf>,
}

impl PromptService {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// 加载命名提示词；未知名字返回空串并告警
    pub fn load(&self, name: &str) -> String {
        let candidates = match &self.dir {
            Some(dir) => vec![dir.join(format!("{}.txt", name))],
            None => vec![
                PathBuf::from(format!("config/prompts/{}.txt", name)),
                PathBuf::from(format!("../config/prompts/{}.txt", name)),
            ],
        };
        if let Some(text) = candidates
            .into_iter()
            .find_map(|p| std::fs::read_to_string(p).ok())
        {
            return text;
        }
        match default_prompt(name) {
            Some(text) => text.to_string(),
            None => {
                tracing::warn!("Unknown prompt name: {}", name);
                String::new()
            }
        }
    }
}

fn default_prompt(name: &str) -> Option<&'static str> {
    Some(match name {
        INTENT_CLASSIFICATION => DEFAULT_INTENT_CLASSIFICATION,
        ORDER_SUMMARY => DEFAULT_ORDER_SUMMARY,
        OFF_TOPIC_RESPONSE => DEFAULT_OFF_TOPIC_RESPONSE,
        PARSE_MODIFICATION => DEFAULT_PARSE_MODIFICATION,
        CONFIRM_UNDERSTANDING => DEFAULT_CONFIRM_UNDERSTANDING,
        INTERPRET_CONFIRMATION => DEFAULT_INTERPRET_CONFIRMATION,
        POLICY_EVALUATION => DEFAULT_POLICY_EVALUATION,
        POLICY_RESPONSE => DEFAULT_POLICY_RESPONSE,
        POLICY_DENIAL => DEFAULT_POLICY_DENIAL,
        _ => return None,
    })
}

const DEFAULT_INTENT_CLASSIFICATION: &str = r#"You are an intent classifier for a B2B order support agent. Classify the user's message into exactly one intent.

Output ONLY one of these tokens (no explanation, no JSON unless asked):
- ORDER_INQUIRY: asking about order status, contents, delivery, or totals
- ORDER_CHANGE: requesting a change to a line item (quantity, size, color) or removal of an item
- CONFIRMATION: answering yes/no/with a correction to a question the agent just asked about a pending change
- POLICY_CONFIRMATION: accepting or declining extra cost or delay conditions the agent just described
- OFF_TOPIC: unrelated to this order
- UNCLEAR: cannot determine the intent

Output format: just the intent token, nothing else."#;

const DEFAULT_ORDER_SUMMARY: &str = r#"You are a friendly B2B order support agent. Using the order details provided, answer the customer's question about their order. Summarize status, line items (product, size, color, quantity, unit price) and total amount as relevant. Be concise and conversational. Do not invent information that is not in the order details."#;

const DEFAULT_OFF_TOPIC_RESPONSE: &str = r#"You are a B2B order support agent. The customer's message is not related to their order. Politely explain that you can only help with questions about this order or changes to its line items (quantity, size, color, removal), and invite them to ask about those. Keep it to one or two sentences."#;

const DEFAULT_PARSE_MODIFICATION: &str = r#"You extract a structured order modification from a customer request, given the order details.

Output ONLY a JSON object with these fields (no markdown, no commentary):
{
  "action": "modify" | "remove_item" | "unsupported",
  "line_item_id": string or null,
  "product_name": string,
  "size_name": string,
  "color_name": string,
  "current_quantity": integer or null,
  "new_quantity": integer or null,
  "new_size": string or null,
  "new_color": string or null,
  "reason": string or null
}

Rules:
- Identify the line item the customer means from the order details; fill product_name, size_name, color_name with its CURRENT values.
- For "modify", set only the new_* fields the customer asked to change.
- For "remove_item", set no new_* fields.
- If the customer asks for anything other than quantity/size/color changes or item removal (e.g. shipping address, artwork, delivery date), use action "unsupported" and explain in "reason"."#;

const DEFAULT_CONFIRM_UNDERSTANDING: &str = r#"You are a B2B order support agent. The customer requested a change to their order. Restate the change you understood in one short, friendly sentence and ask them to confirm with yes or no. Mention the product, its current size/color, and exactly what will change. Do not execute anything yet."#;

const DEFAULT_INTERPRET_CONFIRMATION: &str = r#"You interpret a customer's reply to a confirmation question about a pending order change.

Output ONLY a JSON object (no markdown, no commentary):
{
  "interpretation": "CONFIRMED" | "REJECTED" | "CORRECTION" | "UNCLEAR",
  "corrected_quantity": integer or null,
  "corrected_size": string or null,
  "corrected_color": string or null,
  "reasoning": string
}

Rules:
- CONFIRMED: the customer agrees to proceed as described.
- REJECTED: the customer does not want the change.
- CORRECTION: the customer agrees but adjusts a value (e.g. "yes but make it 80"); fill only the corrected fields.
- UNCLEAR: anything else, including ambiguous replies like "maybe"."#;

const DEFAULT_POLICY_EVALUATION: &str = r#"You evaluate an order change request against the change policy document below.

Policy document:
{policy_document}

Request:
- Order status: {order_status}
- Change type: {change_type}
- Affected line amount: {affected_amount}
- Order total: {order_total}

Output ONLY a JSON object (no markdown, no commentary):
{
  "decision": "allowed" | "conditional" | "denied",
  "change_type": string,
  "order_status": string,
  "cost_impact": number or null,
  "cost_description": string or null,
  "delivery_impact_days": integer or null,
  "delivery_description": string or null,
  "denial_reason": string or null,
  "requires_confirmation": boolean,
  "escalate_to_support": boolean
}

Apply the policy document exactly. When the decision is "conditional", fill the cost and/or delay fields from the policy and set requires_confirmation to true. When "denied", fill denial_reason."#;

const DEFAULT_POLICY_RESPONSE: &str = r#"You are a B2B order support agent. The requested change is allowed only under conditions (extra cost and/or delivery delay) described in the context. Explain the conditions in plain, friendly language and ask the customer whether they want to proceed. End with a clear yes/no question. Do not execute anything yet."#;

const DEFAULT_POLICY_DENIAL: &str = r#"You are a B2B order support agent. The requested change is not allowed for this order's current stage, per the policy evaluation in the context. Apologize briefly, explain why in plain language, and suggest contacting our customer service team at 888-888-8888 if they need further help. Do not offer to make the change anyway."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_prompts_nonempty() {
        let service = PromptService::new(None);
        for name in [
            INTENT_CLASSIFICATION,
            ORDER_SUMMARY,
            OFF_TOPIC_RESPONSE,
            PARSE_MODIFICATION,
            CONFIRM_UNDERSTANDING,
            INTERPRET_CONFIRMATION,
            POLICY_EVALUATION,
            POLICY_RESPONSE,
            POLICY_DENIAL,
        ] {
            assert!(!service.load(name).is_empty(), "prompt {} missing", name);
        }
    }

    #[test]
    fn test_unknown_prompt_empty() {
        let service = PromptService::new(None);
        assert!(service.load("no_such_prompt").is_empty());
    }
}
