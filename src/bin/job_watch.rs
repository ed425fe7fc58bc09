use std::path::PathBuf;
use std::sync::{Arc, mpsc};

use anyhow::{Context, Result, anyhow};

use matchvision_terminal::api::{BackendApi, HttpBackend, JobId};
use matchvision_terminal::config::AppConfig;
use matchvision_terminal::job::JobStatus;
use matchvision_terminal::job_poller::{PollerConfig, spawn_job_poller};
use matchvision_terminal::match_stats::{
    MatchStats, NOT_AVAILABLE, TEAM_A, TEAM_B, fmt_or_na, goals_label,
};
use matchvision_terminal::session::SessionStore;
use matchvision_terminal::state::Delta;

enum Target {
    Upload(PathBuf),
    Job(JobId),
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = AppConfig::from_env();
    let target = parse_target_arg()
        .context("usage: job_watch <video-file> | job_watch --job <id> [--token <token>]")?;
    let token = parse_flag_arg("--token").or_else(|| {
        SessionStore::new(config.session_path.clone())
            .load()
            .token()
            .map(str::to_string)
    });
    let api: Arc<dyn BackendApi> = Arc::new(HttpBackend::new(&config));

    let job_id = match target {
        Target::Job(id) => id,
        Target::Upload(path) => {
            println!("Uploading {}", path.display());
            let response = api
                .upload_video(&path, token.as_deref())
                .with_context(|| format!("upload {}", path.display()))?;
            println!("Job {} submitted ({})", response.id, response.status);
            response.id
        }
    };

    let (tx, rx) = mpsc::channel();
    let handle = spawn_job_poller(
        Arc::clone(&api),
        token,
        job_id,
        PollerConfig {
            api_base: config.api_base.clone(),
            interval: config.poll_interval,
        },
        tx,
    );

    let mut last_status: Option<JobStatus> = None;
    let mut stats: Option<MatchStats> = None;
    let mut failure: Option<String> = None;
    // The channel closes when the poll thread exits.
    for delta in rx.iter() {
        match delta {
            Delta::JobStatus { record, .. } => {
                let status = JobStatus::parse(&record.status);
                if status != last_status {
                    println!("status: {}", record.status);
                    last_status = status;
                }
            }
            Delta::JobCompleted { results, .. } => {
                println!(
                    "video: {}",
                    results.output_video_url.as_deref().unwrap_or(NOT_AVAILABLE)
                );
                println!(
                    "summary: {}",
                    results.summary_json_url.as_deref().unwrap_or(NOT_AVAILABLE)
                );
            }
            Delta::JobFailed { error, .. } => failure = Some(error),
            Delta::SetMatchStats { stats: parsed, .. } => stats = Some(*parsed),
            Delta::SummaryUnavailable { reason, .. } => {
                println!("summary not available: {reason}");
            }
            Delta::Log(msg) => eprintln!("{msg}"),
            _ => {}
        }
    }
    handle.stop();

    if let Some(error) = failure {
        return Err(anyhow!("job {job_id} failed: {error}"));
    }
    print_summary(stats.as_ref());
    Ok(())
}

fn print_summary(stats: Option<&MatchStats>) {
    println!("{}", goals_label(stats, TEAM_A));
    println!("{}", goals_label(stats, TEAM_B));
    let Some(stats) = stats else {
        return;
    };
    let possession = stats.possession_split();
    println!(
        "Possession: {} / {}",
        fmt_or_na(possession.map(|p| p.0), "%"),
        fmt_or_na(possession.map(|p| p.1), "%")
    );
    println!(
        "Passes: {} / {}",
        stats.passes_for(TEAM_A),
        stats.passes_for(TEAM_B)
    );
    println!(
        "Shots (on target): {} ({}) / {} ({})",
        stats.shots_for(TEAM_A),
        stats.shots_on_target_for(TEAM_A),
        stats.shots_for(TEAM_B),
        stats.shots_on_target_for(TEAM_B)
    );
    match stats.top_speed() {
        Some(top) => println!(
            "Top speed: {:.1} km/h (player {} {})",
            top.speed_kmph, top.player_id, top.team
        ),
        None => println!("Top speed: {NOT_AVAILABLE}"),
    }
}

fn parse_target_arg() -> Option<Target> {
    if let Some(raw) = parse_flag_arg("--job") {
        return raw.trim().parse::<JobId>().ok().map(Target::Job);
    }
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut skip_next = false;
    for arg in &args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--token" {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        return Some(Target::Upload(PathBuf::from(arg)));
    }
    None
}

fn parse_flag_arg(flag: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.to_string());
            }
        }
    }
    None
}
