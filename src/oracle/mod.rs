//! 理解预言机层：文本进、结构化出
//!
//! LLM 输出按固定 Schema 立即校验（恢复纪律：修复一次，再失败落安全默认），
//! 状态机内部只流转强类型值，不携带松散字典。

pub mod outputs;
pub mod parser;
pub mod understanding;

pub use outputs::{
    ConfirmationInterpretation, ConfirmationInterpretationOutput, Intent,
    IntentClassificationOutput, ModificationAction, PendingModification,
};
pub use understanding::UnderstandingOracle;
