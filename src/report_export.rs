use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::api::JobId;
use crate::match_stats::{
    DEFAULT_FPS, MatchStats, NOT_AVAILABLE, TEAM_A, TEAM_B, fmt_or_na, frame_clock,
};

pub struct ReportSheet {
    pub name: &'static str,
    pub rows: Vec<Vec<String>>,
}

pub struct ExportReport {
    pub path: PathBuf,
    pub sheets: usize,
    pub rows: usize,
}

pub struct ExportProgress {
    pub current: usize,
    pub total: usize,
    pub message: String,
}

pub fn default_report_path(dir: &Path, job_id: Option<JobId>) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let name = match job_id {
        Some(id) => format!("match_report_{id}_{stamp}.xlsx"),
        None => format!("match_report_{stamp}.xlsx"),
    };
    dir.join(name)
}

pub fn build_report_sheets(stats: &MatchStats, job_id: Option<JobId>) -> Vec<ReportSheet> {
    vec![
        ReportSheet {
            name: "Summary",
            rows: summary_rows(stats, job_id),
        },
        ReportSheet {
            name: "Goals",
            rows: goal_rows(stats),
        },
        ReportSheet {
            name: "Shots",
            rows: shot_rows(stats),
        },
        ReportSheet {
            name: "Passes",
            rows: pass_rows(stats),
        },
        ReportSheet {
            name: "Players",
            rows: player_rows(stats),
        },
        ReportSheet {
            name: "Rankings",
            rows: ranking_rows(stats),
        },
    ]
}

pub fn export_match_report_with_progress(
    path: &Path,
    stats: &MatchStats,
    job_id: Option<JobId>,
    mut on_progress: impl FnMut(ExportProgress),
) -> Result<ExportReport> {
    let sheets = build_report_sheets(stats, job_id);
    let total = sheets.len();
    let mut workbook = Workbook::new();
    let mut rows = 0usize;

    for (idx, sheet) in sheets.iter().enumerate() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name)?;
        write_rows(worksheet, &sheet.rows)?;
        rows += sheet.rows.len().saturating_sub(1);
        on_progress(ExportProgress {
            current: idx + 1,
            total,
            message: format!("Wrote {}", sheet.name),
        });
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    workbook
        .save(path)
        .with_context(|| format!("save {}", path.display()))?;

    Ok(ExportReport {
        path: path.to_path_buf(),
        sheets: total,
        rows,
    })
}

fn header(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

fn summary_rows(stats: &MatchStats, job_id: Option<JobId>) -> Vec<Vec<String>> {
    let (goals_a, goals_b) = stats.score_line();
    let possession = stats.possession_split();
    let share = stats.pass_share();
    let mut rows = vec![header(&["Metric", TEAM_A, TEAM_B])];
    rows.push(vec![
        "Job".to_string(),
        job_id.map(|id| id.to_string()).unwrap_or_default(),
        String::new(),
    ]);
    rows.push(vec![
        "Goals".to_string(),
        goals_a.to_string(),
        goals_b.to_string(),
    ]);
    rows.push(vec![
        "Possession %".to_string(),
        fmt_or_na(possession.map(|p| p.0), ""),
        fmt_or_na(possession.map(|p| p.1), ""),
    ]);
    rows.push(vec![
        "Passes".to_string(),
        stats.passes_for(TEAM_A).to_string(),
        stats.passes_for(TEAM_B).to_string(),
    ]);
    rows.push(vec![
        "Pass share %".to_string(),
        fmt_or_na(share.map(|p| p.0), ""),
        fmt_or_na(share.map(|p| p.1), ""),
    ]);
    rows.push(vec![
        "Pass accuracy %".to_string(),
        fmt_or_na(stats.pass_accuracy(TEAM_A), ""),
        fmt_or_na(stats.pass_accuracy(TEAM_B), ""),
    ]);
    rows.push(vec![
        "Shots".to_string(),
        stats.shots_for(TEAM_A).to_string(),
        stats.shots_for(TEAM_B).to_string(),
    ]);
    rows.push(vec![
        "Shots on target".to_string(),
        stats.shots_on_target_for(TEAM_A).to_string(),
        stats.shots_on_target_for(TEAM_B).to_string(),
    ]);
    rows.push(vec![
        "Distance (km)".to_string(),
        format!("{:.2}", stats.team_distance_km(TEAM_A)),
        format!("{:.2}", stats.team_distance_km(TEAM_B)),
    ]);
    rows
}

fn goal_rows(stats: &MatchStats) -> Vec<Vec<String>> {
    let mut rows = vec![header(&["Clock", "Frame", "Team", "Player"])];
    rows.extend(stats.goals.iter().map(|g| {
        vec![
            frame_clock(g.frame, DEFAULT_FPS),
            g.frame.to_string(),
            g.team.clone(),
            opt_id(g.player_id),
        ]
    }));
    rows
}

fn shot_rows(stats: &MatchStats) -> Vec<Vec<String>> {
    let mut rows = vec![header(&[
        "Clock",
        "Frame",
        "Team",
        "Player",
        "Ball speed (km/h)",
        "On target",
    ])];
    rows.extend(stats.shots.iter().map(|s| {
        vec![
            frame_clock(s.frame, DEFAULT_FPS),
            s.frame.to_string(),
            s.team.clone(),
            opt_id(s.player_id),
            format!("{:.2}", s.ball_speed_kmph),
            if s.on_target { "yes" } else { "no" }.to_string(),
        ]
    }));
    rows
}

fn pass_rows(stats: &MatchStats) -> Vec<Vec<String>> {
    let mut rows = vec![header(&[
        "Clock",
        "Frame",
        "From",
        "To",
        "From team",
        "To team",
        "Ball speed (km/h)",
    ])];
    rows.extend(stats.passes.iter().map(|p| {
        vec![
            frame_clock(p.frame, DEFAULT_FPS),
            p.frame.to_string(),
            opt_id(p.from_player),
            opt_id(p.to_player),
            p.from_team.clone(),
            p.to_team.clone(),
            format!("{:.2}", p.ball_speed_kmph),
        ]
    }));
    rows
}

fn player_rows(stats: &MatchStats) -> Vec<Vec<String>> {
    let mut rows = vec![header(&[
        "Player",
        "Team",
        "Distance (m)",
        "Max speed (km/h)",
        "Avg speed (km/h)",
        "Passes",
        "Shots",
        "Goals",
    ])];
    for team in [TEAM_A, TEAM_B] {
        for (id, _) in stats.players_for_team(team) {
            let Some(summary) = stats.player_summary(id) else {
                continue;
            };
            let distance_m = stats.player(id).map(|p| p.total_distance_m).unwrap_or(0.0);
            rows.push(vec![
                id.to_string(),
                summary.team,
                format!("{distance_m:.2}"),
                format!("{:.2}", summary.max_speed_kmph),
                format!("{:.2}", summary.avg_speed_kmph),
                summary.passes_made.to_string(),
                summary.shots.to_string(),
                summary.goals.to_string(),
            ]);
        }
    }
    rows
}

fn ranking_rows(stats: &MatchStats) -> Vec<Vec<String>> {
    let mut rows = vec![header(&["Ranking", "Rank", "Player", "Team", "Value"])];
    let rankings = &stats.rankings;
    for (idx, r) in rankings.distance.iter().enumerate() {
        rows.push(rank_row("Distance (m)", idx, r.player_id, &r.team, format!("{:.2}", r.distance_m)));
    }
    for (idx, r) in rankings.max_speed.iter().enumerate() {
        rows.push(rank_row("Max speed (km/h)", idx, r.player_id, &r.team, format!("{:.2}", r.speed_kmph)));
    }
    for (idx, r) in rankings.avg_speed.iter().enumerate() {
        rows.push(rank_row("Avg speed (km/h)", idx, r.player_id, &r.team, format!("{:.2}", r.speed_kmph)));
    }
    for (idx, r) in rankings.top_shooters.iter().enumerate() {
        rows.push(rank_row(
            "Shots (on target)",
            idx,
            r.player_id,
            &r.team,
            format!("{} ({})", r.shots, r.on_target),
        ));
    }
    if rows.len() == 1 {
        rows.push(vec![
            NOT_AVAILABLE.to_string(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ]);
    }
    rows
}

fn rank_row(label: &str, idx: usize, player_id: u64, team: &str, value: String) -> Vec<String> {
    vec![
        label.to_string(),
        (idx + 1).to_string(),
        player_id.to_string(),
        team.to_string(),
        value,
    ]
}

fn opt_id(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
