//! Ranked standings for every partition.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use beyondwork_core::{SportType, UserId};

use crate::accumulator::UserAccountSummary;
use crate::config::{AggregationConfig, EmptyPartitionPolicy};
use crate::partition::{Partition, PartitionKey, SportFilter};

/// One row of a leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    /// 1-based position.
    pub rank: u32,
    pub user_id: UserId,
    pub user_name: String,
    pub company: String,
    pub score: u64,
    pub events_attended: u64,
}

/// Ordered entries of one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    pub partition: Partition,
    pub entries: Vec<RankingEntry>,
}

impl Ranking {
    pub fn key(&self) -> PartitionKey {
        self.partition.key()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the ranking of every partition.
///
/// `observed_sports` holds the sport of every completed event, including
/// events with no participants; it drives which global per-sport partitions
/// exist. Corporate partitions exist for every non-empty company among the
/// participants, and per-sport only where that company has attendance.
///
/// Ordering within a ranking is score descending, then events attended
/// descending, then user id ascending. The result is sorted by partition.
pub fn build_rankings(
    summaries: &[UserAccountSummary],
    observed_sports: &BTreeSet<SportType>,
    config: &AggregationConfig,
) -> Vec<Ranking> {
    let mut partitions: BTreeSet<Partition> = BTreeSet::new();
    partitions.insert(Partition::global(SportFilter::All));
    for sport in observed_sports {
        partitions.insert(Partition::global(SportFilter::Sport(sport.clone())));
    }

    let mut company_sports: BTreeMap<&str, BTreeSet<&SportType>> = BTreeMap::new();
    for summary in summaries.iter().filter(|s| !s.company.is_empty()) {
        let sports = company_sports.entry(summary.company.as_str()).or_default();
        sports.extend(summary.by_sport.iter().filter(|(_, n)| **n > 0).map(|(s, _)| s));
    }
    for (company, sports) in company_sports {
        partitions.insert(Partition::corporate(company, SportFilter::All));
        for sport in sports {
            partitions.insert(Partition::corporate(
                company,
                SportFilter::Sport(sport.clone()),
            ));
        }
    }

    partitions
        .into_iter()
        .map(|partition| {
            let entries = rank_partition(summaries, &partition, config);
            Ranking { partition, entries }
        })
        .filter(|ranking| {
            !ranking.is_empty() || config.empty_partition_policy == EmptyPartitionPolicy::PublishEmpty
        })
        .collect()
}

fn rank_partition(
    summaries: &[UserAccountSummary],
    partition: &Partition,
    config: &AggregationConfig,
) -> Vec<RankingEntry> {
    let mut members: Vec<(&UserAccountSummary, u64)> = summaries
        .iter()
        .filter(|s| match &partition.company {
            Some(company) => &s.company == company,
            None => true,
        })
        .map(|s| (s, s.attended(&partition.sport)))
        .filter(|(_, attended)| *attended > 0)
        .collect();

    let score = |attended: u64| attended.saturating_mul(config.points_per_event);
    members.sort_by(|(a, a_attended), (b, b_attended)| {
        (Reverse(score(*a_attended)), Reverse(*a_attended), &a.user_id).cmp(&(
            Reverse(score(*b_attended)),
            Reverse(*b_attended),
            &b.user_id,
        ))
    });
    if let Some(cap) = config.max_ranking_size {
        members.truncate(cap);
    }

    members
        .into_iter()
        .enumerate()
        .map(|(idx, (summary, attended))| RankingEntry {
            rank: u32::try_from(idx + 1).unwrap_or(u32::MAX),
            user_id: summary.user_id.clone(),
            user_name: summary.display_name.clone(),
            company: summary.company.clone(),
            score: score(attended),
            events_attended: attended,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;
    use crate::accumulator::{CompletedEvent, ResolvedProfile, accumulate};
    use beyondwork_core::EventId;

    fn event(id: &str, sport: &str, roster: &[&str]) -> CompletedEvent {
        CompletedEvent {
            id: EventId::new(id),
            sport: SportType::new(sport),
            company: None,
            participants: roster.iter().map(|u| UserId::new(*u)).collect(),
        }
    }

    fn run(events: &[CompletedEvent], profiles: &HashMap<UserId, ResolvedProfile>) -> Vec<Ranking> {
        let observed = events.iter().map(|e| e.sport.clone()).collect();
        let summaries = accumulate(events).finalize(profiles);
        build_rankings(&summaries, &observed, &AggregationConfig::default())
    }

    fn find<'a>(rankings: &'a [Ranking], key: &str) -> Option<&'a Ranking> {
        rankings.iter().find(|r| r.key().as_str() == key)
    }

    fn ids(ranking: &Ranking) -> Vec<&str> {
        ranking.entries.iter().map(|e| e.user_id.as_str()).collect()
    }

    fn employees() -> HashMap<UserId, ResolvedProfile> {
        [
            ("a1", "Ann", "Acme"),
            ("a2", "Abe", "Acme"),
            ("g1", "Gus", "Globex"),
            ("g2", "Gia", "Globex"),
        ]
        .into_iter()
        .map(|(id, name, company)| {
            (UserId::new(id), ResolvedProfile::new(name, Some(company.to_string())))
        })
        .collect()
    }

    #[test]
    fn repeat_attendee_ranks_first() {
        let events = vec![
            event("e1", "Cricket", &["U1", "U2"]),
            event("e2", "Cricket", &["U2", "U3"]),
        ];
        let rankings = run(&events, &HashMap::new());

        let all = find(&rankings, "global_all").unwrap();
        assert_eq!(ids(all), vec!["U2", "U1", "U3"]);
        assert_eq!(all.entries[0].rank, 1);
        assert_eq!(all.entries[0].score, 20);
        assert_eq!(all.entries[1].score, 10);

        let cricket = find(&rankings, "global_cricket").unwrap();
        let counts: Vec<u64> = cricket.entries.iter().map(|e| e.events_attended).collect();
        assert_eq!(counts, vec![2, 1, 1]);
    }

    #[test]
    fn score_follows_configured_multiplier() {
        let events = vec![
            event("e1", "Cricket", &["U1", "U2"]),
            event("e2", "Cricket", &["U2"]),
        ];
        let observed = events.iter().map(|e| e.sport.clone()).collect();
        let summaries = accumulate(&events).finalize(&HashMap::new());
        let config = AggregationConfig::default().with_points_per_event(3);
        let rankings = build_rankings(&summaries, &observed, &config);

        let scores: Vec<u64> = find(&rankings, "global_all")
            .unwrap()
            .entries
            .iter()
            .map(|e| e.score)
            .collect();
        assert_eq!(scores, vec![6, 3]);
    }

    #[test]
    fn empty_roster_contributes_no_entries() {
        let events = vec![
            event("e1", "Cricket", &["U1"]),
            event("e2", "Football", &[]),
        ];
        let rankings = run(&events, &HashMap::new());
        assert_eq!(ids(find(&rankings, "global_all").unwrap()), vec!["U1"]);
        // Published empty under the default policy.
        assert!(find(&rankings, "global_football").unwrap().is_empty());

        let observed = events.iter().map(|e| e.sport.clone()).collect();
        let summaries = accumulate(&events).finalize(&HashMap::new());
        let config = AggregationConfig::default().with_empty_partition_policy(EmptyPartitionPolicy::Skip);
        let skipped = build_rankings(&summaries, &observed, &config);
        assert!(find(&skipped, "global_football").is_none());
    }

    #[test]
    fn unknown_participant_is_ranked_not_dropped() {
        let events = vec![event("e1", "Cricket", &["ghost"])];
        let rankings = run(&events, &HashMap::new());
        let entry = &find(&rankings, "global_all").unwrap().entries[0];
        assert_eq!(entry.user_name, "Unknown");
        assert_eq!(entry.company, "");
        // No company means no corporate partition.
        assert!(rankings.iter().all(|r| r.partition.company.is_none()));
    }

    #[test]
    fn corporate_rankings_only_contain_their_own_employees() {
        let events = vec![
            event("e1", "Cricket", &["a1", "g1"]),
            event("e2", "Football", &["a2", "g2", "g1"]),
        ];
        let rankings = run(&events, &employees());

        let global = find(&rankings, "global_all").unwrap();
        assert_eq!(global.entries.len(), 4);

        let acme = find(&rankings, "corporate_acme_all").unwrap();
        assert_eq!(ids(acme), vec!["a1", "a2"]);
        assert!(acme.entries.iter().all(|e| e.company == "Acme"));

        let globex = find(&rankings, "corporate_globex_all").unwrap();
        assert_eq!(ids(globex), vec!["g1", "g2"]);

        assert_eq!(ids(find(&rankings, "corporate_acme_cricket").unwrap()), vec!["a1"]);
        assert_eq!(ids(find(&rankings, "corporate_acme_football").unwrap()), vec!["a2"]);
    }

    #[test]
    fn ties_break_by_user_id() {
        let events = vec![event("e1", "Cricket", &["zed", "amy", "kim"])];
        let rankings = run(&events, &HashMap::new());
        let all = find(&rankings, "global_all").unwrap();
        assert_eq!(ids(all), vec!["amy", "kim", "zed"]);
        let ranks: Vec<u32> = all.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn rankings_are_capped() {
        let roster: Vec<String> = (0..150).map(|i| format!("u{i:03}")).collect();
        let roster: Vec<&str> = roster.iter().map(String::as_str).collect();
        let events = vec![event("e1", "Cricket", &roster)];
        let rankings = run(&events, &HashMap::new());
        assert_eq!(find(&rankings, "global_all").unwrap().entries.len(), 100);

        let observed = events.iter().map(|e| e.sport.clone()).collect();
        let summaries = accumulate(&events).finalize(&HashMap::new());
        let uncapped = build_rankings(
            &summaries,
            &observed,
            &AggregationConfig::default().with_max_ranking_size(None),
        );
        assert_eq!(find(&uncapped, "global_all").unwrap().entries.len(), 150);
    }

    #[test]
    fn missing_sport_is_bucketed_under_other() {
        let mut e = event("e1", "ignored", &["u1"]);
        e.sport = SportType::from_raw(None);
        let rankings = run(&[e], &HashMap::new());
        assert!(find(&rankings, "global_other").is_some());
    }

    fn arb_events() -> impl Strategy<Value = Vec<CompletedEvent>> {
        let sports = prop::sample::select(vec!["Cricket", "Football", "Padel"]);
        let hosts = prop::option::of(prop::sample::select(vec!["Acme", "Globex"]));
        let roster = prop::collection::vec(prop::sample::select(vec!["u1", "u2", "u3", "u4", "u5"]), 0..5);
        prop::collection::vec((sports, hosts, roster), 0..12).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (sport, host, roster))| CompletedEvent {
                    id: EventId::new(format!("e{i:02}")),
                    sport: SportType::new(sport),
                    company: host.map(str::to_string),
                    participants: roster.into_iter().map(UserId::new).collect(),
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn event_order_does_not_change_rankings(events in arb_events(), seed in any::<u64>()) {
            let profiles = HashMap::new();
            let mut shuffled = events.clone();
            // Deterministic rotation + reversal keyed by the seed.
            if !shuffled.is_empty() {
                let len = shuffled.len();
                shuffled.rotate_left((seed as usize) % len);
            }
            if seed % 2 == 0 {
                shuffled.reverse();
            }
            prop_assert_eq!(run(&events, &profiles), run(&shuffled, &profiles));
        }

        #[test]
        fn another_completed_event_never_lowers_anyone(events in arb_events(), extra in prop::collection::vec(prop::sample::select(vec!["u1", "u2", "u6"]), 1..4)) {
            let profiles = HashMap::new();
            let before = run(&events, &profiles);
            let mut more = events.clone();
            more.push(event("zz", "Cricket", &extra));
            let after = run(&more, &profiles);

            let score_in = |rankings: &[Ranking], user: &UserId| {
                find(rankings, "global_all")
                    .and_then(|r| r.entries.iter().find(|e| &e.user_id == user))
                    .map(|e| e.score)
                    .unwrap_or(0)
            };
            for entry in &find(&before, "global_all").unwrap().entries {
                let now = score_in(&after, &entry.user_id);
                if extra.contains(&entry.user_id.as_str()) {
                    prop_assert!(now > entry.score);
                } else {
                    prop_assert_eq!(now, entry.score);
                }
            }
        }

        #[test]
        fn corporate_entries_match_their_partition(events in arb_events()) {
            let rankings = run(&events, &HashMap::new());
            for ranking in &rankings {
                if let Some(company) = &ranking.partition.company {
                    prop_assert!(!ranking.is_empty());
                    prop_assert!(ranking.entries.iter().all(|e| &e.company == company));
                }
                if let SportFilter::Sport(_) = ranking.partition.sport {
                    prop_assert!(ranking.entries.iter().all(|e| e.events_attended > 0));
                }
                let scores: Vec<u64> = ranking.entries.iter().map(|e| e.score).collect();
                prop_assert!(scores.windows(2).all(|w| w[0] >= w[1]));
            }
        }
    }
}
