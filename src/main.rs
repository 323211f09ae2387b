// ==========================================
// 宿舍轮值排班系统 - 命令行入口
// ==========================================
// 用法:
//   guide-roster-aps <year> <month> [--dry-run] [--seed N] [--db PATH]
// 输出: 排班报告（JSON）
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use guide_roster_aps::app::{get_default_db_path, AppState};
use guide_roster_aps::engine::ScheduleRunRequest;

const USAGE: &str = "用法: guide-roster-aps <year> <month> [--dry-run] [--seed N] [--db PATH]";

/// 命令行参数
#[derive(Debug, PartialEq)]
struct CliArgs {
    request: ScheduleRunRequest,
    db_path: Option<String>,
}

fn parse_args<I>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = String>,
{
    let mut positional = Vec::new();
    let mut dry_run = false;
    let mut seed = None;
    let mut db_path = None;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--dry-run" => dry_run = true,
            "--seed" => {
                let raw = iter.next().ok_or_else(|| anyhow!("--seed 缺少参数"))?;
                seed = Some(
                    raw.parse::<u64>()
                        .with_context(|| format!("无效的种子: {}", raw))?,
                );
            }
            "--db" => {
                db_path = Some(iter.next().ok_or_else(|| anyhow!("--db 缺少参数"))?);
            }
            other if other.starts_with("--") => bail!("未知参数: {}\n{}", other, USAGE),
            _ => positional.push(arg),
        }
    }

    if positional.len() != 2 {
        bail!("{}", USAGE);
    }
    let year = positional[0]
        .parse::<i32>()
        .with_context(|| format!("无效的年份: {}", positional[0]))?;
    let month = positional[1]
        .parse::<u32>()
        .with_context(|| format!("无效的月份: {}", positional[1]))?;

    let mut request = ScheduleRunRequest::new(year, month);
    request.dry_run = dry_run;
    request.tie_break_seed = seed;
    Ok(CliArgs { request, db_path })
}

#[tokio::main]
async fn main() -> Result<()> {
    guide_roster_aps::logging::init();
    guide_roster_aps::i18n::init_from_env();

    let cli = parse_args(std::env::args().skip(1))?;

    tracing::info!("==================================================");
    tracing::info!("{} v{}", guide_roster_aps::APP_NAME, guide_roster_aps::VERSION);
    tracing::info!("==================================================");

    let db_path = cli.db_path.unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;
    let report = state
        .schedule_api
        .run_auto_schedule(cli.request)
        .await
        .context("自动排班失败")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
