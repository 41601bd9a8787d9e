// ==========================================
// 周计划排产分配引擎 - 命令行入口
// ==========================================
// 用法: pcp-board [db_path] [week] [op] [yes|no]
// 输出: 周看板 JSON (stdout)
// ==========================================

use anyhow::Context;
use pcp_board::app::{get_default_db_path, AppState};
use pcp_board::logging;

fn main() -> anyhow::Result<()> {
    // 初始化日志系统 (输出到 stderr,不污染 JSON)
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", pcp_board::APP_NAME, pcp_board::VERSION);
    tracing::info!("==================================================");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let arg = |idx: usize| args.get(idx).map(String::as_str).filter(|s| !s.is_empty());

    let db_path = arg(0)
        .map(str::to_string)
        .unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;

    let board = state
        .board_api
        .get_weekly_board(arg(1), arg(2), arg(3))
        .context("周看板生成失败")?;

    println!("{}", serde_json::to_string_pretty(&board)?);
    Ok(())
}
