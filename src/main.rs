//! Clerk - Rust B2B 订单客服智能体
//!
//! 入口：初始化日志与配置，内置一张演示订单，起一个 stdin REPL
//! 驱动单个对话会话（有 OPENAI_API_KEY 时走真实 LLM，否则 Mock）。

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use clerk::config::{load_config, AppConfig};
use clerk::dialogue::DialogueStateMachine;
use clerk::llm::create_llm_from_config;
use clerk::prompts::PromptService;
use clerk::service::AgentService;
use clerk::session::create_session_store;
use clerk::store::{InventoryLedger, OrderStatus, OrderStore};

/// 演示数据：Gildan T-Shirt（Navy/Red × Small/Medium/Large），
/// 订单含 Navy Small 50 件 @ $4.99 与 Navy Large 40 件
fn seed_demo_store(min_order_quantity: u32) -> anyhow::Result<(Arc<OrderStore>, Uuid)> {
    let ledger = Arc::new(InventoryLedger::new());
    let mut store = OrderStore::new(ledger, min_order_quantity);

    let tee = store.add_product("Gildan T-Shirt", Decimal::new(499, 2));
    let small = store.add_size("Small");
    let medium = store.add_size("Medium");
    let large = store.add_size("Large");
    let navy = store.add_color("Navy");
    let red = store.add_color("Red");

    let navy_small = store.add_inventory(tee, navy, small, 200);
    store.add_inventory(tee, navy, medium, 150);
    let navy_large = store.add_inventory(tee, navy, large, 100);
    store.add_inventory(tee, red, small, 80);
    store.add_inventory(tee, red, medium, 80);
    store.add_inventory(tee, red, large, 80);

    let order_id = store.create_order(OrderStatus::Created, &[(navy_small, 50), (navy_large, 40)])?;

    Ok((Arc::new(store), order_id))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with(fmt::layer())
        .init();

    let cfg = load_config(None).unwrap_or_else(|_| AppConfig::default());

    let llm = create_llm_from_config(&cfg);
    let prompts = Arc::new(PromptService::new(cfg.app.prompts_dir.clone()));
    let (store, order_id) = seed_demo_store(cfg.store.min_order_quantity)?;
    let machine = DialogueStateMachine::new(store, llm, prompts, cfg.policy.rules_path.clone());
    let sessions = create_session_store(cfg.session.db_path.as_deref());
    let service = AgentService::new(machine, sessions);

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(
            format!(
                "Clerk order support agent. Demo order: {}\nType a message (or 'quit' to exit).\n",
                order_id
            )
            .as_bytes(),
        )
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut session_id: Option<String> = None;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message, "quit" | "exit") {
            break;
        }

        match service.handle(message, session_id.as_deref(), order_id).await {
            Ok(turn) => {
                session_id = Some(turn.session_id.clone());
                stdout
                    .write_all(format!("{}\n", turn.response).as_bytes())
                    .await?;
            }
            Err(e) => {
                tracing::error!("Turn failed: {}", e);
                stdout
                    .write_all(b"Something went wrong. Please try again.\n")
                    .await?;
            }
        }
    }

    Ok(())
}
