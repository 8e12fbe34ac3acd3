//! ULCS 命令行
//!
//! 用法：
//!   ulcs [--config <path>] [--user <id>] <command...>   单次执行并输出报告
//!   ulcs [--config <path>] [--user <id>]                交互模式（:stats 查看统计，:quit 退出）

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use ulcs::config::load_config_or_default;
use ulcs::core::{build_orchestrator, Orchestrator};

#[derive(Debug, Parser)]
#[command(name = "ulcs", about = "ULCS 命令编排器")]
struct Cli {
    /// 额外的配置文件（叠加在 config/default.toml 之上）
    #[arg(long)]
    config: Option<PathBuf>,
    /// 用户 id，缺省取 app.default_user_id
    #[arg(long)]
    user: Option<String>,
    /// 单次执行的命令；为空时进入交互模式
    #[arg(value_name = "COMMAND", trailing_var_arg = true)]
    command: Vec<String>,
}

async fn repl(orchestrator: &Orchestrator, user_id: &str) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"ulcs> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            ":quit" | ":q" | "exit" => break,
            ":stats" => match orchestrator.analytics_dashboard(user_id).await {
                Ok(summary) => println!("{}", summary),
                Err(e) => println!("❌ Error: {}", e),
            },
            _ => {
                let report = orchestrator.handle_command(line, user_id).await;
                println!("{}\n", report);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ulcs::observability::init();

    let args = Cli::parse();
    let cfg = load_config_or_default(args.config);
    let user_id = args.user.unwrap_or_else(|| cfg.app.default_user_id.clone());
    let orchestrator = build_orchestrator(&cfg)?;

    if args.command.is_empty() {
        repl(&orchestrator, &user_id).await.context("REPL failed")?;
    } else {
        let report = orchestrator
            .handle_command(&args.command.join(" "), &user_id)
            .await;
        println!("{}", report);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags_and_command() {
        let cli = Cli::try_parse_from([
            "ulcs", "--user", "alice", "--config", "my.toml", "remind", "me", "tomorrow",
        ])
        .unwrap();
        assert_eq!(cli.user.as_deref(), Some("alice"));
        assert_eq!(cli.config, Some(PathBuf::from("my.toml")));
        assert_eq!(cli.command.join(" "), "remind me tomorrow");
    }

    #[test]
    fn test_no_command_means_repl() {
        let cli = Cli::try_parse_from(["ulcs"]).unwrap();
        assert!(cli.command.is_empty());
        assert!(cli.user.is_none());
    }
}
