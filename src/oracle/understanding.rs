//! 理解预言机：意图分类、修改请求抽取、确认答复解释
//!
//! 三个入口都遵守同一条恢复纪律：直接解析失败后恰好发起一次 JSON 修复请求，
//! 再失败就落到安全默认（UNCLEAR 意图 / 无修改 / UNCLEAR 解释），绝不向上抛错。

use std::sync::Arc;

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

use crate::llm::{LlmClient, Message};
use crate::oracle::outputs::{
    ConfirmationInterpretationOutput, Intent, IntentClassificationOutput, PendingModification,
};
use crate::oracle::parser;
use crate::prompts::{self, PromptService};

/// 目标类型的 JSON Schema 字符串，拼入修复提示词
fn schema_json<T: JsonSchema>() -> String {
    serde_json::to_string(&schema_for!(T)).unwrap_or_default()
}

/// 理解预言机：包装 LlmClient，对外只暴露已校验的结构化结果
pub struct UnderstandingOracle {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptService>,
}

impl UnderstandingOracle {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptService>) -> Self {
        Self { llm, prompts }
    }

    /// 意图分类；任何不解析进闭集的输出都映射为 Unclear，从不报错
    pub async fn classify_intent(&self, message: &str) -> Intent {
        let prompt = self.prompts.load(prompts::INTENT_CLASSIFICATION);
        let messages = vec![Message::system(prompt), Message::user(message)];

        let raw = match self.llm.complete(&messages).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Intent classification LLM error: {}", e);
                return Intent::Unclear;
            }
        };

        Self::parse_intent(&raw)
    }

    /// 裸 token 或 JSON `{"intent": ...}` 两种形式都接受
    fn parse_intent(raw: &str) -> Intent {
        let content = parser::strip_code_fences(raw);
        if let Some(intent) = Intent::from_token(content.trim()) {
            return intent;
        }
        match serde_json::from_str::<IntentClassificationOutput>(&content) {
            Ok(parsed) => parsed.intent,
            Err(_) => {
                tracing::warn!("Unclear intent classification output: {:?}", raw);
                Intent::Unclear
            }
        }
    }

    /// 从 (订单详情, 用户消息) 抽取待确认修改；失败一次后修复一次，再失败返回 None
    pub async fn extract_modification(
        &self,
        order_details: &str,
        message: &str,
    ) -> Option<PendingModification> {
        let prompt = self.prompts.load(prompts::PARSE_MODIFICATION);
        let messages = vec![
            Message::system(prompt),
            Message::user(format!(
                "Order Details: {}\n\nUser Request: {}",
                order_details, message
            )),
        ];

        let raw = match self.llm.complete(&messages).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Modification extraction LLM error: {}", e);
                return None;
            }
        };
        let content = parser::strip_code_fences(&raw);

        match Self::normalize_and_validate(&content) {
            Ok(modification) => Some(modification),
            Err(first_err) => {
                let repaired = self
                    .repair_json_once(
                        "PendingModification",
                        &schema_json::<PendingModification>(),
                        &content,
                    )
                    .await
                    .ok()?;
                match Self::normalize_and_validate(&repaired) {
                    Ok(modification) => Some(modification),
                    Err(second_err) => {
                        tracing::error!(
                            "Failed to parse/repair modification output: {:?} ({}; {})",
                            raw,
                            first_err,
                            second_err
                        );
                        None
                    }
                }
            }
        }
    }

    /// 归一化旧字段别名后解析并校验
    fn normalize_and_validate(content: &str) -> Result<PendingModification, String> {
        let parsed: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let Value::Object(mut obj) = parsed else {
            return Err("modification output is not a JSON object".to_string());
        };

        // 动作旧别名归一：modify_quantity / modify_size / modify_color → modify
        if let Some(action) = obj.get("action").and_then(Value::as_str) {
            if matches!(action, "modify_quantity" | "modify_size" | "modify_color") {
                obj.insert("action".to_string(), Value::String("modify".to_string()));
            }
        }

        // 字段别名：size → size_name，color → color_name
        for (canonical, alias) in [("size_name", "size"), ("color_name", "color")] {
            let missing = obj.get(canonical).map_or(true, Value::is_null);
            if missing {
                if let Some(v) = obj.get(alias).cloned() {
                    obj.insert(canonical.to_string(), v);
                }
            }
        }

        // 定位字段为 null 时按缺省空串处理，统一走构造期校验
        for key in ["product_name", "size_name", "color_name"] {
            if obj.get(key).map_or(false, Value::is_null) {
                obj.insert(key.to_string(), Value::String(String::new()));
            }
        }

        let modification: PendingModification =
            serde_json::from_value(Value::Object(obj)).map_err(|e| e.to_string())?;
        modification.validate()?;
        Ok(modification)
    }

    /// 解释用户对确认问题的自由文本答复；终端回退为 UNCLEAR
    pub async fn interpret_confirmation(
        &self,
        pending: &PendingModification,
        message: &str,
    ) -> ConfirmationInterpretationOutput {
        let prompt = self.prompts.load(prompts::INTERPRET_CONFIRMATION);
        let pending_json = serde_json::to_string(pending).unwrap_or_default();
        let messages = vec![
            Message::system(prompt),
            Message::user(format!(
                "Pending change: {}\n\nUser response: {}",
                pending_json, message
            )),
        ];

        let raw = match self.llm.complete(&messages).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Confirmation interpretation LLM error: {}", e);
                return ConfirmationInterpretationOutput::unclear("LLM call failed");
            }
        };
        let content = parser::strip_code_fences(&raw);

        match Self::parse_confirmation(&content) {
            Ok(output) => output,
            Err(_) => {
                let repaired = match self
                    .repair_json_once(
                        "ConfirmationInterpretationOutput",
                        &schema_json::<ConfirmationInterpretationOutput>(),
                        &content,
                    )
                    .await
                {
                    Ok(repaired) => repaired,
                    Err(_) => {
                        return ConfirmationInterpretationOutput::unclear(
                            "Failed to parse LLM response",
                        )
                    }
                };
                match Self::parse_confirmation(&repaired) {
                    Ok(output) => output,
                    Err(e) => {
                        tracing::error!(
                            "Failed to parse/repair confirmation interpretation: {:?} ({})",
                            content,
                            e
                        );
                        ConfirmationInterpretationOutput::unclear("Failed to parse LLM response")
                    }
                }
            }
        }
    }

    /// `interpretation` 与旧字段名 `type` 都接受
    fn parse_confirmation(content: &str) -> Result<ConfirmationInterpretationOutput, String> {
        let parsed: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let Value::Object(mut obj) = parsed else {
            return Err("confirmation output is not a JSON object".to_string());
        };
        if !obj.contains_key("interpretation") {
            if let Some(v) = obj.get("type").cloned() {
                obj.insert("interpretation".to_string(), v);
            }
        }
        serde_json::from_value(Value::Object(obj)).map_err(|e| e.to_string())
    }

    /// 恰好一次的 JSON 修复请求：把坏输出与目标 Schema 一起回呈给模型
    async fn repair_json_once(
        &self,
        schema_name: &str,
        schema: &str,
        bad_output: &str,
    ) -> Result<String, String> {
        let system = format!(
            "You are a JSON repair assistant. Produce ONLY valid JSON for schema '{}'. \
             Do not include markdown, explanations, or any surrounding text. Schema: {}",
            schema_name, schema
        );
        let messages = vec![
            Message::system(system),
            Message::user(format!("Malformed output:\n{}", bad_output)),
        ];
        let raw = self.llm.complete(&messages).await?;
        Ok(parser::strip_code_fences(&raw))
    }
}
