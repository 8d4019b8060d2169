//! Output formatting utilities for CLI.

use std::fmt::Write;

use bytewar::game::{EndReason, Team};
use bytewar::tournament::{MatchResult, SeriesSummary, TeamStats};
use serde::Serialize;

/// JSON-serializable match result.
#[derive(Debug, Serialize)]
pub(super) struct JsonMatchResult<'a> {
    /// Random seed used.
    seed: u64,
    /// Winning team.
    winner: Team,
    /// Winning strategy.
    winner_strategy: &'a str,
    /// How the match ended.
    reason: EndReason,
    /// Rounds played.
    rounds: u32,
    /// Per-team results.
    teams: Vec<JsonTeamResult<'a>>,
}

/// JSON-serializable team result.
#[derive(Debug, Serialize)]
pub(super) struct JsonTeamResult<'a> {
    /// Team.
    team: Team,
    /// Strategy name.
    strategy: &'a str,
    /// Statistics.
    #[serde(flatten)]
    stats: TeamStats,
}

impl<'a> JsonMatchResult<'a> {
    /// Create from a `MatchResult`.
    pub(super) fn new(result: &MatchResult, names: &'a [String; 2]) -> Self {
        Self {
            seed: result.seed,
            winner: result.winner,
            winner_strategy: &names[slot(result.winner)],
            reason: result.reason,
            rounds: result.rounds,
            teams: Team::PLAYERS
                .iter()
                .map(|&team| JsonTeamResult {
                    team,
                    strategy: &names[slot(team)],
                    stats: result.stats[slot(team)],
                })
                .collect(),
        }
    }
}

const fn slot(team: Team) -> usize {
    match team {
        Team::B => 1,
        Team::A | Team::Neutral => 0,
    }
}

/// Format a match result as human-readable text.
pub(super) fn format_text(result: &MatchResult, names: &[String; 2]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Match Result (seed: {})", result.seed);
    let _ = writeln!(
        output,
        "  Winner: Team {} ({}) by {:?}",
        result.winner,
        names[slot(result.winner)],
        result.reason
    );
    let _ = writeln!(output, "  Rounds: {}\n", result.rounds);

    for team in Team::PLAYERS {
        let stats = &result.stats[slot(team)];
        let _ = writeln!(
            output,
            "  Team {team} ({}): {} spawned, {} instructions, {} suspensions, {:.1} yield credit, {:.1} power left",
            names[slot(team)],
            stats.units_spawned,
            stats.instructions_used,
            stats.suspensions,
            stats.yield_credit,
            stats.final_power,
        );
    }

    output
}

/// JSON-serializable series result.
#[derive(Debug, Serialize)]
pub(super) struct JsonSeriesResult<'a> {
    /// Strategy names, A then B.
    strategies: [&'a str; 2],
    /// Win rates, A then B.
    win_rates: [f64; 2],
    /// Average match length in rounds.
    avg_rounds: f64,
    /// Raw aggregate.
    #[serde(flatten)]
    summary: &'a SeriesSummary,
}

impl<'a> JsonSeriesResult<'a> {
    /// Create from a summary and strategy names.
    pub(super) fn new(summary: &'a SeriesSummary, names: &'a [String; 2]) -> Self {
        Self {
            strategies: [names[0].as_str(), names[1].as_str()],
            win_rates: [summary.win_rate(Team::A), summary.win_rate(Team::B)],
            avg_rounds: summary.average_rounds(),
            summary,
        }
    }
}

/// Format a series summary as human-readable text.
pub(super) fn format_series_text(summary: &SeriesSummary, names: &[String; 2]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Tournament Results ({} games)", summary.games_played);
    output.push_str("========================================\n\n");

    output.push_str("Win Rates:\n");
    for team in Team::PLAYERS {
        let _ = writeln!(
            output,
            "  Team {team} ({}): {:.1}% ({} wins)",
            names[slot(team)],
            summary.win_rate(team) * 100.0,
            summary.wins[slot(team)]
        );
    }
    if summary.games_failed > 0 {
        let _ = writeln!(output, "  Failed: {}", summary.games_failed);
    }

    output.push_str("\nEnd Reasons:\n");
    let reasons = ["HQ destroyed", "Resigned", "Nuke", "Round limit"];
    for (label, count) in reasons.iter().zip(summary.by_reason) {
        let _ = writeln!(output, "  {label}: {count}");
    }

    let _ = writeln!(output, "\nAverage Match Length: {:.0} rounds", summary.average_rounds());

    output
}

/// Format a series summary as CSV.
pub(super) fn format_series_csv(summary: &SeriesSummary, names: &[String; 2]) -> String {
    let mut output = String::new();

    // Header
    output.push_str("team,strategy,wins,win_rate,instructions,suspensions,yield_credit,units_spawned\n");

    // Data rows
    for team in Team::PLAYERS {
        let stats = &summary.totals[slot(team)];
        let _ = writeln!(
            output,
            "{team},{},{},{:.4},{},{},{:.2},{}",
            names[slot(team)],
            summary.wins[slot(team)],
            summary.win_rate(team),
            stats.instructions_used,
            stats.suspensions,
            stats.yield_credit,
            stats.units_spawned
        );
    }

    output
}
