//! CLI entry point for local recommendation runs.
//!
//! # Responsibility
//! - Open a task database, generate recommendations for one user and print
//!   them together with the user's top ranked tasks.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `tasklens_cli <db_path> <user_id> [config.json]`
//! Set `TASKLENS_LOG_DIR` (absolute path) to enable file logging.

use std::process::ExitCode;
use tasklens_core::db::open_db;
use tasklens_core::{
    core_version, default_log_level, init_logging, now_epoch_ms, EngineConfig,
    RecommendationService, SqliteRecommendationRepository, SqliteTaskRepository, TaskRanker,
    DEFAULT_TOP_K,
};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (db_path, user_id) = match (args.first(), args.get(1)) {
        (Some(db_path), Some(user_id)) => (db_path, user_id),
        _ => {
            eprintln!("usage: tasklens_cli <db_path> <user_id> [config.json]");
            return ExitCode::from(2);
        }
    };

    match run(db_path, user_id, args.get(2).map(String::as_str)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(
    db_path: &str,
    user_id: &str,
    config_path: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Ok(log_dir) = std::env::var("TASKLENS_LOG_DIR") {
        init_logging(default_log_level(), &log_dir)?;
    }
    let config = match config_path {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    let conn = open_db(db_path)?;

    let service = RecommendationService::with_policy(
        SqliteTaskRepository::try_new(&conn)?,
        SqliteRecommendationRepository::try_new(&conn)?,
        config.policy,
    );
    let created = service.generate_recommendations(user_id)?;
    log::info!(
        "event=cli_generate module=cli status=ok emitted={}",
        created.len()
    );

    println!("tasklens_core version={}", core_version());
    println!("recommendations:");
    for recommendation in service.get_user_recommendations(user_id)? {
        let marker = if recommendation.is_read { " " } else { "*" };
        println!(
            "{marker} [{:?}] {}",
            recommendation.category, recommendation.text
        );
    }

    let ranker = TaskRanker::new(SqliteTaskRepository::try_new(&conn)?, config.scoring);
    println!("top tasks:");
    for ranked in ranker.rank_scored_at(user_id, DEFAULT_TOP_K, now_epoch_ms())? {
        println!("  {:.4} {} {}", ranked.score, ranked.task.id, ranked.task.title);
    }

    Ok(())
}
