//! End-to-end tests for the ROO pipeline

use crate::config::{MatchupParams, RooConfig, VolatilityParams};
use crate::distribution::{adjusted_std, lognormal_params};
use crate::matchup::{matchup_multiplier, LeagueAverages};
use crate::percentiles::player_percentiles;
use crate::volatility::{blend_weight, effective_std};
use crate::{
    EfficiencyMetrics, MatchupContext, PlayerHistoryRecord, PlayerKey, Position, RooEngine, RooError, RooInputs,
    SlateEntry, TeamMatchup, VolatilitySource,
};

fn history(name: &str, team: &str, position: Position, points: &[f64]) -> Vec<PlayerHistoryRecord> {
    points
        .iter()
        .enumerate()
        .map(|(i, &p)| PlayerHistoryRecord {
            key: PlayerKey::new(name, team, position),
            week: i as u32 + 1,
            fantasy_points: p,
        })
        .collect()
}

fn slate(name: &str, team: &str, position: Position, salary: u32, median: f64) -> SlateEntry {
    SlateEntry {
        key: PlayerKey::new(name, team, position),
        salary,
        opponent: None,
        implied_total: None,
        spread: None,
        median_proj: median,
        proj_own: None,
    }
}

fn reference_config(n_simulations: usize) -> RooConfig {
    let mut config = RooConfig::default();
    config.simulation.n_simulations = n_simulations;
    // Three games with sample std exactly 6.0 count as an established player
    config.volatility.min_games_for_player = 3;
    config
}

fn reference_inputs() -> RooInputs {
    RooInputs {
        history: history("Reference Player", "BUF", Position::WR, &[14.0, 20.0, 26.0]),
        slate: vec![slate("Reference Player", "BUF", Position::WR, 7000, 20.0)],
        ..Default::default()
    }
}

#[cfg(test)]
mod scenario_tests {
    use super::*;

    #[test]
    fn test_single_player_reference_scenario() {
        let engine = RooEngine::new(reference_config(10_000)).unwrap();
        let run = engine.run(&reference_inputs()).unwrap();
        let projection = &run.projections[0];
        let player = &projection.player;

        assert_eq!(player.volatility_source, VolatilitySource::Exact);
        assert_eq!(player.effective_std, 6.0);
        assert_eq!(player.matchup_vol_multiplier, 1.0);
        assert_eq!(player.adj_std, 6.0);
        assert!((player.params.mu_log - 2.9957).abs() < 1e-4);
        assert!((player.params.sigma_log - 0.2612).abs() < 1e-4);

        let p50 = projection.percentiles.get(50).unwrap();
        assert!((p50 - 20.0).abs() / 20.0 < 0.05, "P50 {p50} too far from 20.0");
        assert_eq!(projection.floor, projection.percentiles.get(15).unwrap());
        assert_eq!(projection.ceiling, projection.percentiles.get(85).unwrap());
    }

    #[test]
    fn test_identical_runs_are_identical() {
        let engine = RooEngine::new(reference_config(10_000)).unwrap();
        let first = engine.run(&reference_inputs()).unwrap();
        let second = engine.run(&reference_inputs()).unwrap();
        assert_eq!(first.projections, second.projections);
    }

    #[test]
    fn test_median_error_shrinks_with_more_simulations() {
        let error_at = |n: usize| {
            let run = RooEngine::new(reference_config(n)).unwrap().run(&reference_inputs()).unwrap();
            (run.projections[0].percentiles.get(50).unwrap() - 20.0).abs() / 20.0
        };
        assert!(error_at(1_000) < 0.10);
        assert!(error_at(10_000) < 0.05);
        assert!(error_at(40_000) < 0.02);
    }

    #[test]
    fn test_average_matchup_yields_exactly_neutral_multiplier() {
        let average = EfficiencyMetrics {
            epa_play: Some(0.0625),
            explosive_play_rate: Some(0.125),
            points_per_drive: Some(2.0),
        };
        let team = |team: &str, opp: &str| TeamMatchup {
            team: team.to_string(),
            opponent: Some(opp.to_string()),
            implied_total: Some(22.5),
            spread: Some(0.0),
            total: Some(45.0),
            location: None,
            offense: average,
            defense_allowed: average,
        };

        let mut inputs = reference_inputs();
        inputs.matchups = vec![team("BUF", "MIA"), team("MIA", "BUF")];
        inputs.slate[0].implied_total = Some(22.5);

        let engine = RooEngine::new(reference_config(100)).unwrap();
        let prepared = engine.prepare_slate(&inputs).unwrap();
        let player = &prepared.players[0];
        assert_eq!(player.matchup_vol_multiplier, 1.0);
        assert_eq!(player.opponent, "MIA");
        assert_eq!(player.location, "Home");
        assert_eq!(player.spread, 0.0);
    }

    #[test]
    fn test_unmatched_player_falls_back_to_position_premium() {
        let mut inputs = reference_inputs();
        inputs.slate.push(slate("Rookie Receiver", "KC", Position::WR, 3000, 6.0));

        let engine = RooEngine::new(reference_config(200)).unwrap();
        let run = engine.run(&inputs).unwrap();
        assert_eq!(run.fallback_players, 1);
        assert_eq!(run.summary.fallback_players, 1);

        let rookie = run.projections.iter().find(|p| p.player.entry.key.name == "Rookie Receiver").unwrap();
        assert_eq!(rookie.player.volatility_source, VolatilitySource::PositionFallback);
        assert!(rookie.player.profile.is_none());
        // Position std of the three WR rows is 6.0
        assert!((rookie.player.effective_std - 7.2).abs() < 1e-9);
    }

    #[test]
    fn test_missing_position_baseline_is_validation_error() {
        let mut inputs = reference_inputs();
        inputs.slate.push(slate("Lonely Tight End", "BUF", Position::TE, 4000, 8.0));

        let engine = RooEngine::new(reference_config(100)).unwrap();
        assert!(matches!(engine.run(&inputs), Err(RooError::DataValidation(_))));
    }

    #[test]
    fn test_non_positive_projections_are_dropped() {
        let mut inputs = reference_inputs();
        inputs.slate.push(slate("Injured Player", "BUF", Position::WR, 5000, 0.0));

        let run = RooEngine::new(reference_config(100)).unwrap().run(&inputs).unwrap();
        assert_eq!(run.projections.len(), 1);
        assert_eq!(run.dropped_players, 1);
    }

    #[test]
    fn test_projections_sorted_by_position_then_salary() {
        let mut inputs = reference_inputs();
        inputs.history.extend(history("Quarterback", "BUF", Position::QB, &[18.0, 24.0, 30.0]));
        inputs.history.extend(history("Bills", "BUF", Position::DST, &[4.0, 9.0, 12.0]));
        inputs.slate.push(slate("Bills", "BUF", Position::DST, 3500, 7.0));
        inputs.slate.push(slate("Cheap Receiver", "BUF", Position::WR, 3000, 5.0));
        inputs.slate.push(slate("Quarterback", "BUF", Position::QB, 8000, 22.0));

        let run = RooEngine::new(reference_config(200)).unwrap().run(&inputs).unwrap();
        let order: Vec<&str> = run.projections.iter().map(|p| p.player.entry.key.name.as_str()).collect();
        assert_eq!(order, vec!["Quarterback", "Reference Player", "Cheap Receiver", "Bills"]);

        let rows = run.rows();
        assert_eq!(rows[0].position, "QB");
        assert_eq!(rows[3].position, "DST");
        assert_eq!(run.summary.positions.len(), 3);
    }

    #[test]
    fn test_empty_slate_is_rejected() {
        let mut inputs = reference_inputs();
        inputs.slate.clear();
        assert!(RooEngine::new(reference_config(100)).unwrap().run(&inputs).is_err());
    }

    const SLATE_HEADER: &str = "Player,Team,Position,Salary,Opp,ITT,Spread,OWS_Median_Proj,OWS_Proj_Own";

    fn write_data_dir(dir: &std::path::Path, slate: &str) {
        let write = |name: &str, body: &str| std::fs::write(dir.join(name), body).unwrap();
        write(
            "Player_Mapping.csv",
            "Weekly_Stats,DK_Salaries,OneWeekSeason\nGabe Davis,Gabriel Davis,G. Davis\nBills,Buffalo Bills,\n",
        );
        write(
            "Weekly_Stats.csv",
            "Player,Team,Position,Week,DK_Points\n\
             Gabe Davis,BUF,WR,1,4.5\nGabe Davis,BUF,WR,2,21.0\nGabe Davis,BUF,WR,3,9.8\nGabe Davis,BUF,WR,4,15.2\n\
             Tyreek Hill,MIA,WR,1,30.1\nTyreek Hill,MIA,WR,2,12.4\nTyreek Hill,MIA,WR,3,25.0\nTyreek Hill,MIA,WR,4,8.0\n",
        );
        write("Weekly_DST_Stats.csv", "Player,Team,Week,DK_Points\nBills,BUF,1,12\nBills,BUF,2,3\nBills,BUF,3,7\nBills,BUF,4,9\n");
        write("Matchup.csv", "Init,Opp,ITT,Spread,Total\nBUF,MIA,25.5,-3.5,47.5\nMIA,BUF,22.0,3.5,47.5\n");
        write("Slate.csv", slate);
    }

    #[test]
    fn test_inputs_load_from_data_dir_with_name_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let slate = format!(
            "{SLATE_HEADER}\n\
             G. Davis,BUF,WR,5200,MIA,25.5,-3.5,12.5,8\n\
             Buffalo Bills,BUF,DST,3500,MIA,25.5,-3.5,7.0,11\n\
             Jaylen Waddle,MIA,WR,6100,BUF,22.0,3.5,14.0,\n"
        );
        write_data_dir(dir.path(), &slate);

        let paths = crate::InputPaths::in_dir(dir.path());
        assert!(paths.name_map.is_some());
        assert!(paths.dst_history.is_some());
        assert!(paths.proe.is_none());

        let inputs = RooInputs::load(&paths).unwrap();
        assert_eq!(inputs.slate[0].key, PlayerKey::new("Gabriel Davis", "BUF", Position::WR));
        assert_eq!(inputs.dst_history[0].key, PlayerKey::new("Buffalo Bills", "BUF", Position::DST));

        let engine = RooEngine::new(RooConfig::default()).unwrap();
        let prepared = engine.prepare_slate(&inputs).unwrap();
        let source = |name: &str| {
            prepared.players.iter().find(|p| p.entry.key.name == name).map(|p| p.volatility_source).unwrap()
        };
        assert_eq!(source("Gabriel Davis"), VolatilitySource::Exact);
        assert_eq!(source("Buffalo Bills"), VolatilitySource::Exact);
        assert_eq!(source("Jaylen Waddle"), VolatilitySource::TeamPosition);
        assert_eq!(prepared.fallback_players, 0);
    }

    #[test]
    fn test_slate_without_median_column_fails_at_load() {
        let dir = tempfile::tempdir().unwrap();
        write_data_dir(
            dir.path(),
            "Player,Team,Position,Salary,Opp,ITT,Spread,OWS_Proj_Own\nG. Davis,BUF,WR,5200,MIA,25.5,-3.5,8\n",
        );

        let err = RooInputs::load(&crate::InputPaths::in_dir(dir.path())).unwrap_err();
        assert!(matches!(err, RooError::MissingColumn { ref column, .. } if column == "OWS_Median_Proj"));
        assert_eq!(err.to_string(), "Missing column 'OWS_Median_Proj' in slate table");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_derived_values_respect_bounds(
            median in 0.5f64..60.0,
            raw_std in 0.0f64..60.0,
            epa in -0.3f64..0.3,
            explosive in 0.02f64..0.3,
            itt in 5.0f64..40.0,
            proe in proptest::option::of(-0.3f64..0.3),
        ) {
            let vol = VolatilityParams::default();
            let league = LeagueAverages {
                offense: EfficiencyMetrics { epa_play: Some(0.0), explosive_play_rate: Some(0.1), points_per_drive: Some(2.0) },
                defense_allowed: EfficiencyMetrics { epa_play: Some(0.0), explosive_play_rate: Some(0.1), points_per_drive: Some(2.0) },
                implied_total: 22.0,
            };
            let ctx = MatchupContext {
                offense: EfficiencyMetrics { epa_play: Some(epa), explosive_play_rate: Some(explosive), points_per_drive: None },
                implied_total: Some(itt),
                proe,
                ..Default::default()
            };
            let multiplier = matchup_multiplier(&ctx, &league, &MatchupParams::default());
            prop_assert!((0.8..=1.3).contains(&multiplier));

            let effective = effective_std(6, raw_std, 5.0, &vol);
            let adj = adjusted_std(effective, multiplier, &vol);
            prop_assert!((vol.min_std..=vol.max_std).contains(&adj));

            let params = lognormal_params(median, adj, &RooConfig::default().distribution);
            prop_assert!((0.2..=1.5).contains(&params.sigma_log));
        }

        #[test]
        fn prop_percentiles_monotone_and_index_non_negative(
            outcomes in proptest::collection::vec(0.0f64..80.0, 1..300),
            median in 0.5f64..40.0,
        ) {
            let set = player_percentiles(outcomes, &crate::config::OUTPUT_PERCENTILES);
            let values: Vec<f64> = set.iter().map(|(_, v)| *v).collect();
            prop_assert!(values.windows(2).all(|w| w[0] <= w[1]));

            let floor = set.get(15).unwrap();
            let ceiling = set.get(85).unwrap();
            prop_assert!(crate::percentiles::volatility_index(floor, ceiling, median, 0.01) >= 0.0);
        }

        #[test]
        fn prop_blend_weight_monotone(min_games in 2usize..10, games in 0usize..12) {
            let params = VolatilityParams { min_games_for_player: min_games, ..Default::default() };
            let here = blend_weight(games, &params);
            let next = blend_weight(games + 1, &params);
            prop_assert!(next >= here);
            prop_assert!((0.0..=1.0).contains(&here));
            if games >= min_games {
                prop_assert_eq!(here, 1.0);
            }
        }
    }
}
