// ==========================================
// 库存台账分析系统 - 命令行入口
// ==========================================
// 用法: stock-ledger [--db <path>] [--schema <path>] <command> [args]
// 数据库路径: --db > STOCK_LEDGER_DB_PATH > 用户数据目录
// 建库脚本: --schema > STOCK_LEDGER_SCHEMA_PATH > 工作目录 / 可执行文件目录下的 schema/
// 输出: 分析类命令输出 JSON
// ==========================================

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::Path;
use stock_ledger_analytics::db::{default_db_path, default_schema_path};
use stock_ledger_analytics::{logging, DashboardApi, ImportApi, LoadMode, TrendMetric};

const USAGE: &str = "\
用法: stock-ledger [--db <path>] [--schema <path>] <command> [args]

命令:
  init                           建库（业务表已存在时跳过）
  import <file>                  整文件导入台账
  import-chunked <file> [size]   分块导入台账（默认块大小取配置）
  kpis                           KPI 汇总
  abc                            累计金额 ABC 分类
  suggestions                    采购建议
  alerts                         库存告警
  trend <material> [cost|quantity]
  reorder <material>             单物料再订货点
  wipe                           清空全部数据表";

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// 取出 `--name <value>` 选项（从参数列表中移除）
fn take_option(args: &mut Vec<String>, name: &str) -> Result<Option<String>> {
    let Some(pos) = args.iter().position(|a| a == name) else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        bail!("{} 需要指定路径", name);
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(value))
}

fn parse_material_code(arg: Option<&String>) -> Result<i64> {
    let raw = arg.context("缺少物料编码")?;
    raw.trim()
        .parse::<i64>()
        .with_context(|| format!("物料编码无效: {}", raw))
}

fn main() -> Result<()> {
    logging::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let db_path = take_option(&mut args, "--db")?.unwrap_or_else(default_db_path);
    let schema_path = take_option(&mut args, "--schema")?.unwrap_or_else(default_schema_path);

    let Some(command) = args.first().cloned() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    tracing::info!(command = %command, db_path = %db_path, "{} v{}", stock_ledger_analytics::APP_NAME, stock_ledger_analytics::VERSION);
    let import_api = ImportApi::with_schema_path(db_path.clone(), schema_path);

    match command.as_str() {
        "init" => {
            let created = import_api.initialize_store()?;
            if created {
                println!("已建库: {}", db_path);
            } else {
                println!("数据库已建库，跳过: {}", db_path);
            }
        }
        "import" => {
            let file = args.get(1).context("缺少台账文件路径")?;
            import_api.initialize_store()?;
            let summary = import_api.import_file(Path::new(file), LoadMode::WholeFile)?;
            print_json(&summary)?;
        }
        "import-chunked" => {
            let file = args.get(1).context("缺少台账文件路径")?;
            import_api.initialize_store()?;
            let summary = match args.get(2) {
                Some(size) => {
                    let chunk_size: usize = size
                        .parse()
                        .with_context(|| format!("块大小无效: {}", size))?;
                    if chunk_size == 0 {
                        bail!("块大小必须大于 0");
                    }
                    import_api.import_file(Path::new(file), LoadMode::Chunked { chunk_size })?
                }
                None => import_api.import_file_chunked(Path::new(file))?,
            };
            print_json(&summary)?;
        }
        "kpis" => print_json(&DashboardApi::open(&db_path)?.kpis())?,
        "abc" => print_json(&DashboardApi::open(&db_path)?.abc_classification())?,
        "suggestions" => print_json(&DashboardApi::open(&db_path)?.purchase_suggestions())?,
        "alerts" => print_json(&DashboardApi::open(&db_path)?.alerts())?,
        "trend" => {
            let code = parse_material_code(args.get(1))?;
            let metric = match args.get(2).map(|s| s.to_ascii_lowercase()) {
                None => TrendMetric::Quantity,
                Some(m) if m == "quantity" => TrendMetric::Quantity,
                Some(m) if m == "cost" => TrendMetric::Cost,
                Some(other) => bail!("未知趋势指标: {}", other),
            };
            print_json(&DashboardApi::open(&db_path)?.trend(code, metric))?;
        }
        "reorder" => {
            let code = parse_material_code(args.get(1))?;
            print_json(&DashboardApi::open(&db_path)?.reorder_point(code))?;
        }
        "wipe" => {
            import_api.wipe_all_tables()?;
            println!("已清空全部数据表: {}", db_path);
        }
        "help" | "--help" | "-h" => println!("{}", USAGE),
        other => {
            eprintln!("{}", USAGE);
            bail!("未知命令: {}", other);
        }
    }

    Ok(())
}
