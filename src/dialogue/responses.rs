//! 固定应答文本与执行结果消息拼装
//!
//! 对话失败一律退化为「请客户说清楚」或「转人工 888-888-8888」，
//! 不把技术性错误原文抛给客户。

/// 意图不明时的引导
pub const UNCLEAR_INTENT: &str = "I can help with your order. Do you want an order summary/status \
     update, or would you like to change a line item (quantity, size, color, or remove an item)?";

/// 修改请求抽取失败（含一次修复后仍失败）
pub const EXTRACTION_FAILED: &str = "I couldn't understand the exact change you want. Please tell \
     me which item (product name, size, color) and what you want to change (new quantity/size/color), \
     or say 'remove it'.";

/// 请求的变更类型不在能力范围内
pub const UNSUPPORTED_CHANGE: &str = "I understand you'd like to make a change to your order, but \
     I'm only able to help with modifying quantities, sizes, or colors of line items, or removing \
     items from your order. For other changes like shipping address or artwork modifications, please \
     contact our customer service team at 888-888-8888 for assistance.";

/// 幂等重入：修改已执行
pub const ALREADY_APPLIED: &str =
    "That change was already applied. Is there anything else you want to update?";

/// 幂等重入：修改已取消
pub const ALREADY_CANCELLED: &str =
    "That change was cancelled. Is there anything else I can help with on your order?";

/// 没有待确认修改时收到确认
pub const NO_PENDING_CHANGE: &str =
    "I don't have a pending change to confirm. What would you like to change in your order?";

/// 用户拒绝了待确认修改
pub const CHANGE_CANCELLED: &str = "No problem, I've cancelled that change. Is there something \
     else I can help you with regarding your order?";

/// 确认答复含糊，请求明确的是/否
pub const CONFIRMATION_UNCLEAR: &str = "I'm not quite sure what you'd like to do. Could you please \
     clarify - would you like me to proceed with the change, or would you prefer something different?";

/// 策略条件确认需要明确的是/否
pub const POLICY_YES_NO: &str = "I need a clear yes or no. Would you like me to proceed with the \
     change given the conditions I mentioned?";

/// 策略确认态却没有待确认修改
pub const NO_PENDING_POLICY: &str = "I don't have a pending change. What would you like to do?";

/// 没有可执行的修改
pub const NO_PENDING_EXECUTE: &str = "No pending modification to execute.";

/// 行项目不存在
pub const LINE_ITEM_NOT_FOUND: &str = "I couldn't find that item in your order. Could you please \
     verify the product name, size, and color? You can ask me to show your order details if you'd \
     like to review what's in your order.";

/// 取单失败
pub const ORDER_LOOKUP_FAILED: &str = "I'm having trouble accessing your order right now. Please \
     try again in a moment, or contact our customer service team at 888-888-8888.";

/// 执行期领域错误的通用道歉 + 转人工
pub fn execution_failure(message: &str) -> String {
    format!(
        "I wasn't able to complete that change: {}. Please contact our customer service team at \
         888-888-8888 for assistance.",
        message
    )
}

/// 移除行项目成功
pub fn removal_success(size: &str, color: &str, product: &str) -> String {
    format!(
        "Done! I've removed the {} {} {} from your order. Is there anything else I can help you with?",
        size, color, product
    )
}

/// 修改成功：按 1/2/3+ 项变化拼正确的英文连接词
pub fn success_message(
    product_name: &str,
    size_name: &str,
    color_name: &str,
    new_quantity: Option<u32>,
    new_size: Option<&str>,
    new_color: Option<&str>,
) -> String {
    let mut changes = Vec::new();

    if let Some(quantity) = new_quantity {
        changes.push(format!("quantity to {}", quantity));
    }
    if let Some(size) = new_size {
        changes.push(format!("size from {} to {}", size_name, size));
    }
    if let Some(color) = new_color {
        changes.push(format!("color from {} to {}", color_name, color));
    }

    let change_desc = match changes.len() {
        1 => changes[0].clone(),
        2 => format!("{} and {}", changes[0], changes[1]),
        _ => format!("{}, {}, and {}", changes[0], changes[1], changes[2]),
    };

    format!(
        "Done! I've updated the {}: {}. Is there anything else I can help you with?",
        product_name, change_desc
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_message_single_change() {
        let msg = success_message("Gildan T-Shirt", "Small", "Navy", Some(75), None, None);
        assert!(msg.contains("updated the Gildan T-Shirt: quantity to 75."));
    }

    #[test]
    fn test_success_message_two_changes() {
        let msg = success_message("Tee", "Small", "Navy", Some(75), Some("Large"), None);
        assert!(msg.contains("quantity to 75 and size from Small to Large"));
    }

    #[test]
    fn test_success_message_three_changes() {
        let msg = success_message("Tee", "Small", "Navy", Some(75), Some("Large"), Some("Red"));
        assert!(msg.contains("quantity to 75, size from Small to Large, and color from Navy to Red"));
    }
}
