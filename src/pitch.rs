use rand::Rng;

use crate::match_stats::{MatchStats, TEAM_A, TEAM_B};

pub const PITCH_LENGTH: f64 = 105.0;
pub const PITCH_WIDTH: f64 = 68.0;
const MAX_DRIFT: f64 = 6.0;

// 1-4-3-3 slots for the left-hand side, as fractions of (length, width).
const FORMATION: [(f64, f64); 11] = [
    (0.05, 0.50),
    (0.20, 0.15),
    (0.18, 0.38),
    (0.18, 0.62),
    (0.20, 0.85),
    (0.32, 0.30),
    (0.30, 0.50),
    (0.32, 0.70),
    (0.44, 0.20),
    (0.46, 0.50),
    (0.44, 0.80),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PitchDot {
    pub player_id: u64,
    pub side: Side,
    pub anchor: (f64, f64),
    pub x: f64,
    pub y: f64,
}

/// Place up to eleven tracked players per team onto formation slots.
/// Team A attacks left to right, Team B is mirrored.
pub fn layout_players(stats: &MatchStats) -> Vec<PitchDot> {
    let mut dots = Vec::new();
    for (team, side) in [(TEAM_A, Side::Home), (TEAM_B, Side::Away)] {
        let players = stats.players_for_team(team);
        for ((player_id, _), (fx, fy)) in players.into_iter().zip(FORMATION) {
            let (x, y) = match side {
                Side::Home => (fx * PITCH_LENGTH, fy * PITCH_WIDTH),
                Side::Away => ((1.0 - fx) * PITCH_LENGTH, (1.0 - fy) * PITCH_WIDTH),
            };
            dots.push(PitchDot {
                player_id,
                side,
                anchor: (x, y),
                x,
                y,
            });
        }
    }
    dots
}

/// Random walk around each dot's anchor, bounded by the pitch and by a
/// maximum drift from the anchor.
pub fn jitter_dots(dots: &mut [PitchDot], rng: &mut impl Rng) {
    for dot in dots {
        let x = dot.x + rng.gen_range(-1.2..1.2);
        let y = dot.y + rng.gen_range(-0.8..0.8);
        dot.x = x
            .clamp(dot.anchor.0 - MAX_DRIFT, dot.anchor.0 + MAX_DRIFT)
            .clamp(0.0, PITCH_LENGTH);
        dot.y = y
            .clamp(dot.anchor.1 - MAX_DRIFT, dot.anchor.1 + MAX_DRIFT)
            .clamp(0.0, PITCH_WIDTH);
    }
}
