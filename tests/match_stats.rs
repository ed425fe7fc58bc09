use std::fs;
use std::path::PathBuf;

use matchvision_terminal::match_stats::{
    MatchStats, TEAM_A, TEAM_B, TimelineKind, fmt_or_na, goals_label, parse_match_stats_json,
};

fn fixture_stats() -> MatchStats {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("match_summary.json");
    let raw = fs::read_to_string(&path).unwrap();
    parse_match_stats_json(&raw).unwrap()
}

#[test]
fn team_aggregates_from_summary() {
    let stats = fixture_stats();
    assert_eq!(stats.score_line(), (1, 0));
    assert_eq!(goals_label(Some(&stats), TEAM_A), "Team A Goals: 1");
    assert_eq!(stats.passes_for(TEAM_A), 3);
    assert_eq!(stats.passes_for(TEAM_B), 1);
    assert_eq!(stats.pass_accuracy(TEAM_A), Some(66.7));
    assert_eq!(stats.pass_accuracy(TEAM_B), Some(100.0));
    assert_eq!(stats.possession_split(), Some((58.3, 41.7)));
    assert_eq!(stats.shots_for(TEAM_A), 1);
    assert_eq!(stats.shots_on_target_for(TEAM_A), 1);
    assert_eq!(stats.shots_on_target_for(TEAM_B), 0);
    assert_eq!(stats.team_distance_km(TEAM_B), 3.45);
}

#[test]
fn possession_falls_back_to_samples() {
    let mut stats = fixture_stats();
    stats.team_stats.clear();
    assert_eq!(stats.possession_split(), Some((75.0, 25.0)));
    assert_eq!(stats.possession_windows(2), vec![Some(100.0), Some(50.0)]);

    stats.possessions.clear();
    assert_eq!(stats.possession_split(), None);
    assert_eq!(fmt_or_na(stats.possession_split().map(|p| p.0), "%"), "N/A");
}

#[test]
fn player_lookups() {
    let stats = fixture_stats();
    let ids: Vec<u64> = stats
        .players_for_team(TEAM_B)
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(ids, vec![21, 23]);

    let top = stats.top_speed().unwrap();
    assert_eq!((top.player_id, top.speed_kmph), (9, 31.2));

    let summary = stats.player_summary(9).unwrap();
    assert_eq!(summary.team, TEAM_A);
    assert_eq!(summary.distance_km, 2.21);
    assert_eq!(summary.passes_made, 1);
    assert_eq!(summary.passes_received, 2);
    assert_eq!((summary.shots, summary.goals), (1, 1));
    assert!(stats.player_summary(77).is_none());
    assert!(stats.player(23).unwrap().speed_history.is_empty());
}

#[test]
fn timeline_orders_by_frame() {
    let stats = fixture_stats();
    let events = stats.timeline();
    assert_eq!(events.len(), 7);
    let frames: Vec<u64> = events.iter().map(|e| e.frame).collect();
    assert_eq!(frames, vec![120, 260, 400, 700, 1500, 1510, 2200]);
    assert_eq!(events[5].kind, TimelineKind::Goal);
    assert_eq!(events[4].detail, "Shot on target (88.1 km/h)");
    assert_eq!(events[0].detail, "Pass #4 -> #9");
}

#[test]
fn pass_links_only_count_completed_team_passes() {
    let stats = fixture_stats();
    let links = stats.pass_links(TEAM_A, 5);
    assert_eq!(links.len(), 1);
    assert_eq!((links[0].from, links[0].to, links[0].count), (4, 9, 2));
    assert_eq!(stats.pass_links(TEAM_B, 5).len(), 1);
}

#[test]
fn empty_and_partial_payloads_parse() {
    assert!(parse_match_stats_json("null").unwrap().is_empty());
    assert!(parse_match_stats_json("  ").unwrap().is_empty());
    assert!(parse_match_stats_json("{not json").is_err());

    let partial = parse_match_stats_json(r#"{"team_stats": {"Team A": {"passes": 12}}}"#).unwrap();
    assert_eq!(partial.passes_for(TEAM_A), 12);
    assert_eq!(partial.passes_for(TEAM_B), 0);
    assert_eq!(goals_label(Some(&partial), TEAM_B), "Team B Goals: 0");
    assert!(partial.top_speed().is_none());
}

#[test]
fn null_sections_read_as_empty() {
    let stats = parse_match_stats_json(
        r#"{"goals":[{"frame":300,"team":"Team A","player_id":null}],"passes":null,"rankings":null,
            "team_stats":{"Team A":{"passes":null,"possession_percentage":null}},
            "player_stats":{"7":{"team":"Team B","speed_history":null,"max_speed_kmph":null}}}"#,
    )
    .unwrap();
    assert_eq!(goals_label(Some(&stats), TEAM_A), "Team A Goals: 1");
    assert_eq!(stats.goals[0].player_id, None);
    assert!(stats.passes.is_empty());
    assert!(stats.rankings.max_speed.is_empty());
    assert_eq!(stats.passes_for(TEAM_A), 0);
    assert!(stats.player(7).unwrap().speed_history.is_empty());
    assert!(stats.top_speed().is_none());
}
