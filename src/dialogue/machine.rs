//! 多轮对话状态机（核心）
//!
//! 单入口 step：按持久化标志路由意图 → 抽取并复述确认 → 策略评估 →
//! （可选的）条件协商 → 恰好一次的执行。每个确认过的修改只会执行一次；
//! EXECUTED 后重发确认只会得到「已处理」应答，不触发任何库存变更。

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::dialogue::responses;
use crate::dialogue::state::{DialogueState, PendingModificationStatus, PolicyConfirmationStatus};
use crate::llm::{LlmClient, Message};
use crate::oracle::{
    ConfirmationInterpretation, Intent, ModificationAction, PendingModification,
    UnderstandingOracle,
};
use crate::policy::{ChangeType, PolicyDecision, PolicyEvaluationResult, PolicyOracle};
use crate::prompts::{self, PromptService};
use crate::store::{
    EnrichedOrder, LineItemSelector, ModifyLineItem, OrderError, OrderStore,
};

/// 对话状态机：持有存储、两个预言机与提示词服务
pub struct DialogueStateMachine {
    store: Arc<OrderStore>,
    llm: Arc<dyn LlmClient>,
    understanding: UnderstandingOracle,
    policy: PolicyOracle,
    prompts: Arc<PromptService>,
}

impl DialogueStateMachine {
    pub fn new(
        store: Arc<OrderStore>,
        llm: Arc<dyn LlmClient>,
        prompts: Arc<PromptService>,
        policy_rules_path: Option<std::path::PathBuf>,
    ) -> Self {
        let understanding = UnderstandingOracle::new(llm.clone(), prompts.clone());
        let policy = PolicyOracle::new(llm.clone(), prompts.clone(), policy_rules_path);
        Self {
            store,
            llm,
            understanding,
            policy,
            prompts,
        }
    }

    /// 处理一轮：一条消息进，一条应答出，状态就地更新
    pub async fn step(&self, state: &mut DialogueState, message: &str) -> String {
        state.last_message = message.to_string();

        // 上一轮留下的策略条件协商优先，跳过意图分类
        let intent = if state.policy_confirmation_status == Some(PolicyConfirmationStatus::Pending)
        {
            tracing::info!("Routing to policy condition confirmation (pending)");
            Intent::PolicyConfirmation
        } else {
            self.understanding.classify_intent(message).await
        };
        tracing::info!("Intent classified as: {:?}", intent);

        match intent {
            Intent::OrderInquiry => self.order_summary(state, message).await,
            Intent::OffTopic => self.off_topic_response(message).await,
            Intent::Unclear => responses::UNCLEAR_INTENT.to_string(),
            Intent::OrderChange => self.handle_change_request(state, message).await,
            Intent::Confirmation => self.handle_confirmation(state, message).await,
            Intent::PolicyConfirmation => self.handle_policy_confirmation(state, message).await,
        }
    }

    // --- 查询与跑题 ---

    async fn order_summary(&self, state: &mut DialogueState, message: &str) -> String {
        let order = match self.store.get_enriched_order(state.order_id) {
            Ok(order) => order,
            Err(e) => {
                tracing::error!("Order lookup failed: {}", e);
                return responses::ORDER_LOOKUP_FAILED.to_string();
            }
        };
        let order_json = serde_json::to_string(&order).unwrap_or_default();
        state.order_details = Some(order.clone());

        let prompt = self.prompts.load(prompts::ORDER_SUMMARY);
        let messages = vec![
            Message::system(prompt),
            Message::user(format!(
                "Order Details: {}\n\nUser Question: {}",
                order_json, message
            )),
        ];
        match self.llm.complete(&messages).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Order summary LLM error: {}", e);
                Self::basic_summary(&order)
            }
        }
    }

    /// LLM 不可用时的朴素订单摘要
    fn basic_summary(order: &EnrichedOrder) -> String {
        let mut lines = vec![format!(
            "Your order is currently {} with a total of ${:.2}.",
            order.status, order.total_amount
        )];
        for item in &order.line_items {
            lines.push(format!(
                "- {} x {} ({} / {}) at ${:.2} each",
                item.quantity, item.product_name, item.color, item.size, item.unit_price
            ));
        }
        lines.join("\n")
    }

    async fn off_topic_response(&self, message: &str) -> String {
        let prompt = self.prompts.load(prompts::OFF_TOPIC_RESPONSE);
        let messages = vec![Message::system(prompt), Message::user(message)];
        match self.llm.complete(&messages).await {
            Ok(text) => text,
            Err(_) => responses::UNCLEAR_INTENT.to_string(),
        }
    }

    // --- 变更请求：抽取 + 复述确认 ---

    async fn handle_change_request(&self, state: &mut DialogueState, message: &str) -> String {
        let order = match self.store.get_enriched_order(state.order_id) {
            Ok(order) => order,
            Err(e) => {
                tracing::error!("Order lookup failed: {}", e);
                return responses::ORDER_LOOKUP_FAILED.to_string();
            }
        };
        let order_json = serde_json::to_string(&order).unwrap_or_default();
        state.order_details = Some(order);

        let pending = self
            .understanding
            .extract_modification(&order_json, message)
            .await;

        let Some(pending) = pending else {
            state.pending_modification = None;
            state.pending_modification_id = None;
            state.pending_modification_status = None;
            return responses::EXTRACTION_FAILED.to_string();
        };

        if pending.action == ModificationAction::Unsupported {
            state.pending_modification = None;
            state.pending_modification_id = None;
            state.pending_modification_status = None;
            return responses::UNSUPPORTED_CHANGE.to_string();
        }

        state.pending_modification = Some(pending.clone());
        state.pending_modification_id = Some(Uuid::new_v4().simple().to_string());
        state.pending_modification_status = Some(PendingModificationStatus::Pending);

        let prompt = self.prompts.load(prompts::CONFIRM_UNDERSTANDING);
        let messages = vec![
            Message::system(prompt),
            Message::user(format!(
                "Order Details: {}\n\nUser Request: {}",
                order_json, message
            )),
        ];
        match self.llm.complete(&messages).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Confirmation question LLM error: {}", e);
                Self::fallback_confirmation(&pending)
            }
        }
    }

    /// LLM 不可用时的固定格式复述确认
    fn fallback_confirmation(pending: &PendingModification) -> String {
        let subject = format!(
            "the {} {} {}",
            pending.size_name, pending.color_name, pending.product_name
        );
        let wanted = match pending.action {
            ModificationAction::RemoveItem => format!("remove {}", subject),
            _ => {
                let mut parts = Vec::new();
                if let Some(q) = pending.new_quantity {
                    parts.push(format!("change the quantity to {}", q));
                }
                if let Some(size) = &pending.new_size {
                    parts.push(format!("change the size to {}", size));
                }
                if let Some(color) = &pending.new_color {
                    parts.push(format!("change the color to {}", color));
                }
                format!("{} for {}", parts.join(" and "), subject)
            }
        };
        format!(
            "Just to confirm: you'd like to {}. Is that right? (yes/no)",
            wanted
        )
    }

    // --- 确认 ---

    async fn handle_confirmation(&self, state: &mut DialogueState, message: &str) -> String {
        tracing::debug!("Processing confirmation response: {}", message);

        // 幂等重入：已执行/已取消的修改不再处理
        match state.pending_modification_status {
            Some(PendingModificationStatus::Executed) => {
                return responses::ALREADY_APPLIED.to_string()
            }
            Some(PendingModificationStatus::Cancelled) => {
                return responses::ALREADY_CANCELLED.to_string()
            }
            _ => {}
        }

        let Some(pending) = state.pending_modification.clone() else {
            return responses::NO_PENDING_CHANGE.to_string();
        };
        if state.pending_modification_status != Some(PendingModificationStatus::Pending) {
            return responses::NO_PENDING_CHANGE.to_string();
        }

        let interpretation = self
            .understanding
            .interpret_confirmation(&pending, message)
            .await;
        tracing::info!("Confirmation interpretation: {:?}", interpretation);

        match interpretation.interpretation {
            ConfirmationInterpretation::Confirmed => self.policy_then_execute(state).await,
            ConfirmationInterpretation::Correction => {
                let mut corrected = pending;
                if let Some(quantity) = interpretation.corrected_quantity {
                    corrected.new_quantity = Some(quantity);
                }
                if interpretation.corrected_size.is_some() {
                    corrected.new_size = interpretation.corrected_size.clone();
                }
                if interpretation.corrected_color.is_some() {
                    corrected.new_color = interpretation.corrected_color.clone();
                }
                if let Err(e) = corrected.validate() {
                    tracing::warn!("Correction produced invalid modification: {}", e);
                    return responses::CONFIRMATION_UNCLEAR.to_string();
                }
                tracing::info!("Applied corrections to pending modification: {:?}", corrected);
                state.pending_modification = Some(corrected);
                self.policy_then_execute(state).await
            }
            ConfirmationInterpretation::Rejected => {
                state.close_pending(PendingModificationStatus::Cancelled);
                responses::CHANGE_CANCELLED.to_string()
            }
            ConfirmationInterpretation::Unclear => responses::CONFIRMATION_UNCLEAR.to_string(),
        }
    }

    // --- 策略评估 ---

    async fn policy_then_execute(&self, state: &mut DialogueState) -> String {
        let Some(pending) = state.pending_modification.clone() else {
            return responses::NO_PENDING_CHANGE.to_string();
        };

        let order = match &state.order_details {
            Some(order) => order.clone(),
            None => match self.store.get_enriched_order(state.order_id) {
                Ok(order) => {
                    state.order_details = Some(order.clone());
                    order
                }
                Err(e) => {
                    tracing::error!("Order lookup failed: {}", e);
                    return responses::ORDER_LOOKUP_FAILED.to_string();
                }
            },
        };

        let change_type = Self::determine_change_type(&pending, &order);

        // 受影响行金额：匹配行的 数量 × 单价
        let affected_amount = order
            .find_item_by_names(
                &pending.product_name,
                &pending.size_name,
                &pending.color_name,
            )
            .map(|item| item.unit_price * Decimal::from(item.quantity))
            .unwrap_or(Decimal::ZERO);

        let evaluation = self
            .policy
            .evaluate_change(order.status, change_type, affected_amount, order.total_amount)
            .await;
        state.policy_evaluation = Some(evaluation.clone());

        match evaluation.decision {
            PolicyDecision::Denied => {
                let response = self.denial_response(&order, &pending, &evaluation).await;
                state.close_pending(PendingModificationStatus::Cancelled);
                response
            }
            PolicyDecision::Conditional => {
                state.policy_confirmation_status = Some(PolicyConfirmationStatus::Pending);
                self.condition_response(&order, &pending, &evaluation).await
            }
            PolicyDecision::Allowed => self.execute(state).await,
        }
    }

    /// 变更类型判定：REMOVE_ITEM 直给；改数量与当前行比对，缺数据/相等取
    /// 更保守的 quantity_decrease；数量不变时才看尺码/颜色
    fn determine_change_type(pending: &PendingModification, order: &EnrichedOrder) -> ChangeType {
        if pending.action == ModificationAction::RemoveItem {
            return ChangeType::RemoveItem;
        }

        if let Some(new_quantity) = pending.new_quantity {
            if let Some(item) = order.find_item_by_names(
                &pending.product_name,
                &pending.size_name,
                &pending.color_name,
            ) {
                if new_quantity > item.quantity {
                    return ChangeType::QuantityIncrease;
                }
                if new_quantity < item.quantity {
                    return ChangeType::QuantityDecrease;
                }
            }
            return ChangeType::QuantityDecrease;
        }

        if pending.new_size.is_some() {
            return ChangeType::SizeChange;
        }
        if pending.new_color.is_some() {
            return ChangeType::ColorChange;
        }

        ChangeType::QuantityDecrease
    }

    async fn denial_response(
        &self,
        order: &EnrichedOrder,
        pending: &PendingModification,
        evaluation: &PolicyEvaluationResult,
    ) -> String {
        let prompt = self.prompts.load(prompts::POLICY_DENIAL);
        let context = serde_json::json!({
            "order_details": order,
            "pending_modification": pending,
            "policy_evaluation": evaluation,
        });
        let messages = vec![
            Message::system(prompt),
            Message::user(format!("Context:\n{}", context)),
        ];
        match self.llm.complete(&messages).await {
            Ok(text) => text,
            Err(_) => {
                let reason = evaluation
                    .denial_reason
                    .as_deref()
                    .unwrap_or("this change is not allowed at the current stage of your order");
                format!(
                    "I'm sorry, I can't make that change: {}. If you need further help, please \
                     call our customer service team at 888-888-8888.",
                    reason
                )
            }
        }
    }

    async fn condition_response(
        &self,
        order: &EnrichedOrder,
        pending: &PendingModification,
        evaluation: &PolicyEvaluationResult,
    ) -> String {
        let prompt = self.prompts.load(prompts::POLICY_RESPONSE);
        let context = serde_json::json!({
            "order_details": order,
            "pending_modification": pending,
            "policy_evaluation": evaluation,
        });
        let messages = vec![
            Message::system(prompt),
            Message::user(format!("Context:\n{}", context)),
        ];
        match self.llm.complete(&messages).await {
            Ok(text) => text,
            Err(_) => Self::fallback_condition_text(evaluation),
        }
    }

    /// LLM 不可用时按评估字段拼条件说明
    fn fallback_condition_text(evaluation: &PolicyEvaluationResult) -> String {
        let mut conditions = Vec::new();
        if let Some(cost) = evaluation.cost_impact {
            match &evaluation.cost_description {
                Some(desc) => conditions.push(format!("an additional cost of ${:.2} ({})", cost, desc)),
                None => conditions.push(format!("an additional cost of ${:.2}", cost)),
            }
        } else if let Some(desc) = &evaluation.cost_description {
            conditions.push(desc.clone());
        }
        if let Some(days) = evaluation.delivery_impact_days {
            match &evaluation.delivery_description {
                Some(desc) => {
                    conditions.push(format!("a delivery delay of {} business days ({})", days, desc))
                }
                None => conditions.push(format!("a delivery delay of {} business days", days)),
            }
        } else if let Some(desc) = &evaluation.delivery_description {
            conditions.push(desc.clone());
        }

        let conditions_text = if conditions.is_empty() {
            "additional conditions".to_string()
        } else {
            conditions.join(" and ")
        };
        format!(
            "I can make that change, but it comes with {}. Would you like me to proceed? (yes/no)",
            conditions_text
        )
    }

    // --- 策略条件确认 ---

    async fn handle_policy_confirmation(&self, state: &mut DialogueState, message: &str) -> String {
        tracing::debug!("Processing policy condition confirmation: {}", message);

        let Some(pending) = state.pending_modification.clone() else {
            state.policy_confirmation_status = None;
            return responses::NO_PENDING_POLICY.to_string();
        };
        if state.policy_confirmation_status != Some(PolicyConfirmationStatus::Pending) {
            state.policy_confirmation_status = None;
            return responses::NO_PENDING_POLICY.to_string();
        }

        let interpretation = self
            .understanding
            .interpret_confirmation(&pending, message)
            .await;

        match interpretation.interpretation {
            ConfirmationInterpretation::Confirmed => {
                state.policy_confirmation_status = Some(PolicyConfirmationStatus::Accepted);
                self.execute(state).await
            }
            ConfirmationInterpretation::Rejected => {
                state.policy_confirmation_status = Some(PolicyConfirmationStatus::Rejected);
                state.close_pending(PendingModificationStatus::Cancelled);
                responses::CHANGE_CANCELLED.to_string()
            }
            // CORRECTION 在条件协商里没有意义，按 UNCLEAR 重问
            _ => responses::POLICY_YES_NO.to_string(),
        }
    }

    // --- 执行 ---

    async fn execute(&self, state: &mut DialogueState) -> String {
        let Some(pending) = state.pending_modification.clone() else {
            return responses::NO_PENDING_EXECUTE.to_string();
        };

        tracing::info!(
            "Executing modification: action={:?}, product={}, size={}, color={}, \
             new_quantity={:?}, new_size={:?}, new_color={:?}",
            pending.action,
            pending.product_name,
            pending.size_name,
            pending.color_name,
            pending.new_quantity,
            pending.new_size,
            pending.new_color
        );

        match self.apply_modification(state.order_id, &pending) {
            Ok(response) => {
                state.close_pending(PendingModificationStatus::Executed);
                state.policy_confirmation_status = None;
                if let Ok(order) = self.store.get_enriched_order(state.order_id) {
                    state.order_details = Some(order);
                }
                response
            }
            Err(e) => {
                tracing::warn!("Modification failed: {}", e);
                // 执行期失败强制重新走完整确认流程
                state.close_pending(PendingModificationStatus::Cancelled);
                state.policy_confirmation_status = None;
                match e {
                    OrderError::LineItemNotFound { .. } => {
                        responses::LINE_ITEM_NOT_FOUND.to_string()
                    }
                    OrderError::InvalidSize { .. } | OrderError::InvalidColor { .. } => {
                        e.to_string()
                    }
                    other => responses::execution_failure(&other.to_string()),
                }
            }
        }
    }

    fn apply_modification(
        &self,
        order_id: Uuid,
        pending: &PendingModification,
    ) -> Result<String, OrderError> {
        let selector = match pending
            .line_item_id
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw).ok())
        {
            Some(id) => LineItemSelector::ById(id),
            None => LineItemSelector::ByNames {
                product: pending.product_name.clone(),
                size: pending.size_name.clone(),
                color: pending.color_name.clone(),
            },
        };
        let item = self.store.find_line_item(order_id, &selector)?;

        match pending.action {
            ModificationAction::RemoveItem => {
                self.store.remove_line_item(order_id, item.id)?;
                Ok(responses::removal_success(
                    &pending.size_name,
                    &pending.color_name,
                    &pending.product_name,
                ))
            }
            ModificationAction::Modify => {
                let request = ModifyLineItem {
                    new_quantity: pending.new_quantity,
                    new_size_name: pending.new_size.clone(),
                    new_color_name: pending.new_color.clone(),
                };
                self.store.modify_line_item(order_id, item.id, &request)?;
                Ok(responses::success_message(
                    &pending.product_name,
                    &pending.size_name,
                    &pending.color_name,
                    pending.new_quantity,
                    pending.new_size.as_deref(),
                    pending.new_color.as_deref(),
                ))
            }
            ModificationAction::Unsupported => Ok(responses::UNSUPPORTED_CHANGE.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::outputs::ModificationAction;

    fn pending_quantity(new_quantity: u32) -> PendingModification {
        PendingModification {
            action: ModificationAction::Modify,
            line_item_id: None,
            product_name: "Gildan T-Shirt".to_string(),
            size_name: "Small".to_string(),
            color_name: "Navy".to_string(),
            current_quantity: Some(50),
            new_quantity: Some(new_quantity),
            new_size: None,
            new_color: None,
            reason: None,
        }
    }

    fn order_with_item(quantity: u32) -> EnrichedOrder {
        EnrichedOrder {
            id: Uuid::new_v4(),
            status: crate::store::OrderStatus::Created,
            total_amount: Decimal::new(24950, 2),
            line_items: vec![crate::store::EnrichedLineItem {
                id: Uuid::new_v4(),
                inventory_id: Uuid::new_v4(),
                product_name: "Gildan T-Shirt".to_string(),
                size: "Small".to_string(),
                color: "Navy".to_string(),
                quantity,
                unit_price: Decimal::new(499, 2),
            }],
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_change_type_increase_and_decrease() {
        let order = order_with_item(50);
        assert_eq!(
            DialogueStateMachine::determine_change_type(&pending_quantity(75), &order),
            ChangeType::QuantityIncrease
        );
        assert_eq!(
            DialogueStateMachine::determine_change_type(&pending_quantity(20), &order),
            ChangeType::QuantityDecrease
        );
    }

    #[test]
    fn test_change_type_tie_defaults_to_decrease() {
        let order = order_with_item(50);
        assert_eq!(
            DialogueStateMachine::determine_change_type(&pending_quantity(50), &order),
            ChangeType::QuantityDecrease
        );
    }

    #[test]
    fn test_change_type_missing_item_defaults_to_decrease() {
        let mut pending = pending_quantity(75);
        pending.product_name = "Nonexistent Hoodie".to_string();
        let order = order_with_item(50);
        assert_eq!(
            DialogueStateMachine::determine_change_type(&pending, &order),
            ChangeType::QuantityDecrease
        );
    }

    #[test]
    fn test_change_type_size_only_when_quantity_unchanged() {
        let order = order_with_item(50);
        let mut pending = pending_quantity(75);
        pending.new_size = Some("Large".to_string());
        // 数量在变时优先按数量判定
        assert_eq!(
            DialogueStateMachine::determine_change_type(&pending, &order),
            ChangeType::QuantityIncrease
        );

        pending.new_quantity = None;
        assert_eq!(
            DialogueStateMachine::determine_change_type(&pending, &order),
            ChangeType::SizeChange
        );

        pending.new_size = None;
        pending.new_color = Some("Red".to_string());
        assert_eq!(
            DialogueStateMachine::determine_change_type(&pending, &order),
            ChangeType::ColorChange
        );
    }
}
