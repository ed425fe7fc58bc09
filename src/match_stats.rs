use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const TEAM_A: &str = "Team A";
pub const TEAM_B: &str = "Team B";
pub const NOT_AVAILABLE: &str = "N/A";

/// Frame rate assumed when turning frame indices into match clock time.
pub const DEFAULT_FPS: f64 = 25.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchStats {
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub goals: Vec<Goal>,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub passes: Vec<Pass>,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub shots: Vec<Shot>,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub possessions: Vec<PossessionSample>,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub team_stats: BTreeMap<String, TeamStats>,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub player_stats: BTreeMap<String, PlayerStats>,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub rankings: Rankings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub frame: u64,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub team: String,
    #[serde(default)]
    pub player_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pass {
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub frame: u64,
    #[serde(default)]
    pub from_player: Option<u64>,
    #[serde(default)]
    pub to_player: Option<u64>,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub from_team: String,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub to_team: String,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub ball_speed_kmph: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub frame: u64,
    #[serde(default)]
    pub player_id: Option<u64>,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub team: String,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub ball_speed_kmph: f64,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub on_target: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PossessionSample {
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub frame: u64,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub team: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamStats {
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub possession: u64,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub passes: u64,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub shots: u64,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub possession_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub team: String,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub total_distance_m: f64,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub max_speed_kmph: f64,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub avg_speed_kmph: f64,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub speed_history: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rankings {
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub distance: Vec<DistanceRank>,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub max_speed: Vec<SpeedRank>,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub avg_speed: Vec<SpeedRank>,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub top_shooters: Vec<ShooterRank>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistanceRank {
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub player_id: u64,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub distance_m: f64,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub team: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedRank {
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub player_id: u64,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub speed_kmph: f64,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub team: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShooterRank {
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub player_id: u64,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub shots: u64,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub on_target: u64,
    #[serde(default, deserialize_with = "crate::api::null_as_default")]
    pub team: String,
}

pub fn parse_match_stats_json(raw: &str) -> Result<MatchStats> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(MatchStats::default());
    }
    serde_json::from_str(trimmed).context("invalid match summary json")
}

impl MatchStats {
    pub fn goals_for(&self, team: &str) -> usize {
        self.goals.iter().filter(|g| g.team == team).count()
    }

    /// (Team A, Team B) goals.
    pub fn score_line(&self) -> (usize, usize) {
        (self.goals_for(TEAM_A), self.goals_for(TEAM_B))
    }

    /// Passes credited to `team`; falls back to the team counter when the
    /// pass list is absent.
    pub fn passes_for(&self, team: &str) -> u64 {
        if self.passes.is_empty() {
            return self.team_stats.get(team).map(|t| t.passes).unwrap_or(0);
        }
        self.passes.iter().filter(|p| p.from_team == team).count() as u64
    }

    /// Share of all passes, in percent, for (Team A, Team B).
    pub fn pass_share(&self) -> Option<(f64, f64)> {
        split_percent(self.passes_for(TEAM_A) as f64, self.passes_for(TEAM_B) as f64)
    }

    /// Percent of a team's passes that reached a teammate.
    pub fn pass_accuracy(&self, team: &str) -> Option<f64> {
        let made: Vec<&Pass> = self.passes.iter().filter(|p| p.from_team == team).collect();
        if made.is_empty() {
            return None;
        }
        let completed = made.iter().filter(|p| p.to_team == team).count();
        Some(round1(completed as f64 * 100.0 / made.len() as f64))
    }

    pub fn possession_split(&self) -> Option<(f64, f64)> {
        let a = self.team_stats.get(TEAM_A);
        let b = self.team_stats.get(TEAM_B);
        if let (Some(a), Some(b)) = (a, b) {
            if a.possession_percentage > 0.0 || b.possession_percentage > 0.0 {
                return Some((a.possession_percentage, b.possession_percentage));
            }
            if let Some(split) = split_percent(a.possession as f64, b.possession as f64) {
                return Some(split);
            }
        }
        let count = |team: &str| self.possessions.iter().filter(|p| p.team == team).count() as f64;
        split_percent(count(TEAM_A), count(TEAM_B))
    }

    pub fn shots_for(&self, team: &str) -> u64 {
        if self.shots.is_empty() {
            return self.team_stats.get(team).map(|t| t.shots).unwrap_or(0);
        }
        self.shots.iter().filter(|s| s.team == team).count() as u64
    }

    pub fn shots_on_target_for(&self, team: &str) -> u64 {
        self.shots
            .iter()
            .filter(|s| s.team == team && s.on_target)
            .count() as u64
    }

    pub fn team_distance_km(&self, team: &str) -> f64 {
        let metres: f64 = self
            .player_stats
            .values()
            .filter(|p| p.team == team)
            .map(|p| p.total_distance_m)
            .sum();
        round2(metres / 1000.0)
    }

    /// Fastest player, preferring the backend's own ranking.
    pub fn top_speed(&self) -> Option<SpeedRank> {
        if let Some(top) = self.rankings.max_speed.first() {
            return Some(top.clone());
        }
        self.player_stats
            .iter()
            .filter(|(_, p)| p.max_speed_kmph > 0.0)
            .max_by(|a, b| a.1.max_speed_kmph.total_cmp(&b.1.max_speed_kmph))
            .map(|(id, p)| SpeedRank {
                player_id: id.parse().unwrap_or(0),
                speed_kmph: p.max_speed_kmph,
                team: p.team.clone(),
            })
    }

    /// Players of one team ordered by numeric tracker id.
    pub fn players_for_team(&self, team: &str) -> Vec<(u64, &PlayerStats)> {
        let mut rows: Vec<(u64, &PlayerStats)> = self
            .player_stats
            .iter()
            .filter(|(_, p)| p.team == team)
            .filter_map(|(id, p)| id.parse::<u64>().ok().map(|id| (id, p)))
            .collect();
        rows.sort_by_key(|(id, _)| *id);
        rows
    }

    pub fn player(&self, player_id: u64) -> Option<&PlayerStats> {
        self.player_stats.get(&player_id.to_string())
    }

    pub fn player_summary(&self, player_id: u64) -> Option<PlayerSummary> {
        let stats = self.player(player_id)?;
        let passes_made = self
            .passes
            .iter()
            .filter(|p| p.from_player == Some(player_id))
            .count();
        let passes_received = self
            .passes
            .iter()
            .filter(|p| p.to_player == Some(player_id))
            .count();
        let shots = self
            .shots
            .iter()
            .filter(|s| s.player_id == Some(player_id))
            .count();
        let goals = self
            .goals
            .iter()
            .filter(|g| g.player_id == Some(player_id))
            .count();
        Some(PlayerSummary {
            player_id,
            team: stats.team.clone(),
            distance_km: round2(stats.total_distance_m / 1000.0),
            max_speed_kmph: stats.max_speed_kmph,
            avg_speed_kmph: stats.avg_speed_kmph,
            passes_made,
            passes_received,
            shots,
            goals,
        })
    }

    /// Goals, shots and passes ordered by frame.
    pub fn timeline(&self) -> Vec<TimelineEvent> {
        let mut events = Vec::with_capacity(self.goals.len() + self.shots.len() + self.passes.len());
        events.extend(self.goals.iter().map(|g| TimelineEvent {
            frame: g.frame,
            kind: TimelineKind::Goal,
            team: g.team.clone(),
            player_id: g.player_id,
            detail: "Goal".to_string(),
        }));
        events.extend(self.shots.iter().map(|s| TimelineEvent {
            frame: s.frame,
            kind: TimelineKind::Shot,
            team: s.team.clone(),
            player_id: s.player_id,
            detail: format!(
                "{} ({:.1} km/h)",
                if s.on_target { "Shot on target" } else { "Shot" },
                s.ball_speed_kmph
            ),
        }));
        events.extend(self.passes.iter().map(|p| TimelineEvent {
            frame: p.frame,
            kind: TimelineKind::Pass,
            team: p.from_team.clone(),
            player_id: p.from_player,
            detail: match (p.from_player, p.to_player) {
                (Some(from), Some(to)) => format!("Pass #{from} -> #{to}"),
                _ => "Pass".to_string(),
            },
        }));
        // Goals first when they share a frame with the shot that produced them.
        events.sort_by_key(|e| (e.frame, e.kind.order()));
        events
    }

    /// Team A possession share per window of `buckets` equal frame ranges.
    pub fn possession_windows(&self, buckets: usize) -> Vec<Option<f64>> {
        if buckets == 0 || self.possessions.is_empty() {
            return Vec::new();
        }
        let last = self.possessions.iter().map(|p| p.frame).max().unwrap_or(0);
        let width = (last / buckets as u64).max(1) + 1;
        let mut counts = vec![(0u64, 0u64); buckets];
        for sample in &self.possessions {
            let idx = ((sample.frame / width) as usize).min(buckets - 1);
            if sample.team == TEAM_A {
                counts[idx].0 += 1;
            } else if sample.team == TEAM_B {
                counts[idx].1 += 1;
            }
        }
        counts
            .into_iter()
            .map(|(a, b)| split_percent(a as f64, b as f64).map(|(a, _)| a))
            .collect()
    }

    /// Most frequent passer -> receiver pairs within one team.
    pub fn pass_links(&self, team: &str, limit: usize) -> Vec<PassLink> {
        let mut counts: HashMap<(u64, u64), usize> = HashMap::new();
        for pass in self
            .passes
            .iter()
            .filter(|p| p.from_team == team && p.to_team == team)
        {
            if let (Some(from), Some(to)) = (pass.from_player, pass.to_player) {
                *counts.entry((from, to)).or_default() += 1;
            }
        }
        let mut links: Vec<PassLink> = counts
            .into_iter()
            .map(|((from, to), count)| PassLink { from, to, count })
            .collect();
        links.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then(a.from.cmp(&b.from))
                .then(a.to.cmp(&b.to))
        });
        links.truncate(limit);
        links
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
            && self.passes.is_empty()
            && self.shots.is_empty()
            && self.possessions.is_empty()
            && self.team_stats.is_empty()
            && self.player_stats.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSummary {
    pub player_id: u64,
    pub team: String,
    pub distance_km: f64,
    pub max_speed_kmph: f64,
    pub avg_speed_kmph: f64,
    pub passes_made: usize,
    pub passes_received: usize,
    pub shots: usize,
    pub goals: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineKind {
    Goal,
    Shot,
    Pass,
}

impl TimelineKind {
    fn order(self) -> u8 {
        match self {
            Self::Goal => 0,
            Self::Shot => 1,
            Self::Pass => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Goal => "GOAL",
            Self::Shot => "SHOT",
            Self::Pass => "PASS",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEvent {
    pub frame: u64,
    pub kind: TimelineKind,
    pub team: String,
    pub player_id: Option<u64>,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassLink {
    pub from: u64,
    pub to: u64,
    pub count: usize,
}

/// `mm:ss` match clock for a frame index.
pub fn frame_clock(frame: u64, fps: f64) -> String {
    let fps = if fps > 0.0 { fps } else { DEFAULT_FPS };
    let secs = (frame as f64 / fps).floor() as u64;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub fn goals_label(stats: Option<&MatchStats>, team: &str) -> String {
    match stats {
        Some(stats) => format!("{team} Goals: {}", stats.goals_for(team)),
        None => format!("{team} Goals: {NOT_AVAILABLE}"),
    }
}

pub fn fmt_or_na(value: Option<f64>, suffix: &str) -> String {
    match value {
        Some(v) => format!("{v:.1}{suffix}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn short_team(team: &str) -> &str {
    match team {
        TEAM_A => "A",
        TEAM_B => "B",
        _ => "?",
    }
}

fn split_percent(a: f64, b: f64) -> Option<(f64, f64)> {
    let total = a + b;
    if total <= 0.0 {
        return None;
    }
    let a_pct = round1(a * 100.0 / total);
    Some((a_pct, round1(100.0 - a_pct)))
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
