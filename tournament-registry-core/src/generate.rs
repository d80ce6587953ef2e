use std::cmp;

use crate::options::{BracketType, GenerateOptions};
use crate::{
    Error, Match, MatchNumber, MatchStatus, Result, Segment, Slot, SlotIndex, MIN_TEAMS,
};

/// A generated bracket: the ordered match list of one generation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bracket<T> {
    matches: Vec<Match<T>>,
    teams: usize,
}

impl<T> Bracket<T> {
    /// Returns the matches of the bracket in creation order.
    #[inline]
    pub fn matches(&self) -> &[Match<T>] {
        &self.matches
    }

    /// Returns the matches of the bracket, consuming it.
    #[inline]
    pub fn into_matches(self) -> Vec<Match<T>> {
        self.matches
    }

    /// Returns the number of matches created.
    #[inline]
    pub fn matches_created(&self) -> usize {
        self.matches.len()
    }

    /// Returns the number of teams seeded into the bracket.
    #[inline]
    pub fn teams(&self) -> usize {
        self.teams
    }

    /// Returns the match with the given `number`.
    pub fn get(&self, number: MatchNumber) -> Option<&Match<T>> {
        self.matches.iter().find(|m| m.number == number)
    }

    /// Rebuilds a `Bracket` from previously generated matches.
    pub fn resume(matches: Vec<Match<T>>, teams: usize) -> Self {
        Self { matches, teams }
    }

    /// Reports the result of the match with the given `number` and resolves
    /// every dependent `winner of match #K` placeholder to the winning team.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMatch`] if no match with `number` exists and
    /// [`Error::UnresolvedSlot`] if the winning slot does not hold a team
    /// yet.
    pub fn report_result(
        &mut self,
        number: MatchNumber,
        scores: [u64; 2],
        winner: SlotIndex,
    ) -> Result<()>
    where
        T: Clone,
    {
        let m = self
            .matches
            .iter_mut()
            .find(|m| m.number == number)
            .ok_or(Error::UnknownMatch { number })?;

        let team = match m.slot(winner) {
            Slot::Team(team) => team.clone(),
            _ => {
                return Err(Error::UnresolvedSlot {
                    number,
                    slot: winner,
                })
            }
        };

        m.scores = scores;
        m.winner = Some(winner);
        m.status = MatchStatus::Finished;

        log::debug!("match {} finished, winner in {} slot", number, winner);

        for m in &mut self.matches {
            for slot in &mut m.slots {
                if matches!(slot, Slot::Winner(n) if *n == number) {
                    *slot = Slot::Team(team.clone());
                }
            }
        }

        Ok(())
    }

    /// Places `team` into a slot directly. Used to wire upper-bracket losers
    /// into lower-bracket spots, which generation leaves unwired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMatch`] if no match with `number` exists.
    pub fn assign_slot(&mut self, number: MatchNumber, index: SlotIndex, team: T) -> Result<()> {
        let m = self
            .matches
            .iter_mut()
            .find(|m| m.number == number)
            .ok_or(Error::UnknownMatch { number })?;

        m.slots[index.index()] = Slot::Team(team);
        Ok(())
    }
}

/// Generates a bracket from `teams` in their given order.
///
/// See [`generate_with`] for details.
pub fn generate<T>(teams: Vec<T>, options: GenerateOptions) -> Result<Bracket<T>> {
    generate_with(teams, options, |_| {})
}

/// Generates a bracket from `teams`, applying `shuffle` to the seed order
/// first.
///
/// `shuffle` is an injected permutation so that callers can seed randomly in
/// production and deterministically in tests.
///
/// Round 1 of the upper bracket pairs the teams two at a time. An odd team
/// count gives the last team a bye: its match is created already finished
/// with that team as winner, and it feeds later rounds like any other match.
/// Every later spot is a `winner of match #K` placeholder; lower-bracket
/// spots waiting for an upper-bracket loser stay [`Slot::Tbd`] until wired
/// during play.
///
/// # Errors
///
/// Returns [`Error::NotEnoughTeams`] if fewer than two teams are given. No
/// other input fails: any team count ≥ 2 produces a structurally valid,
/// fully numbered bracket.
pub fn generate_with<T, F>(mut teams: Vec<T>, options: GenerateOptions, shuffle: F) -> Result<Bracket<T>>
where
    F: FnOnce(&mut [T]),
{
    let count = teams.len();
    if count < MIN_TEAMS {
        return Err(Error::NotEnoughTeams { found: count });
    }

    shuffle(&mut teams);

    log::debug!(
        "Generating {:?} bracket for {} teams",
        options.bracket_type,
        count
    );

    // ceil(log2(count)), the number of upper bracket rounds.
    let rounds = count.next_power_of_two().trailing_zeros();
    let first_round = (count + 1) / 2;

    let mut matches = Vec::new();
    let mut number: MatchNumber = 0;

    // Upper round 1: pair teams in seed order. The odd team out gets a bye
    // and advances immediately.
    let mut pending: Vec<MatchNumber> = Vec::with_capacity(first_round);
    let mut iter = teams.into_iter();
    loop {
        match (iter.next(), iter.next()) {
            (Some(first), Some(second)) => {
                number += 1;
                matches.push(Match::new(
                    number,
                    Segment::Upper,
                    1,
                    [Slot::Team(first), Slot::Team(second)],
                ));
                pending.push(number);
            }
            (Some(first), None) => {
                number += 1;
                let mut m = Match::new(number, Segment::Upper, 1, [Slot::Team(first), Slot::Bye]);
                m.status = MatchStatus::Finished;
                m.winner = Some(SlotIndex::First);
                matches.push(m);
                pending.push(number);
                break;
            }
            (None, _) => break,
        }
    }

    // Later upper rounds: pair the pending feeders in order. Newly created
    // matches queue ahead of an odd leftover feeder, so the leftover meets
    // the next round's winner in the second slot.
    let mut round = 1;
    while pending.len() > 1 {
        round += 1;

        let feeders = std::mem::take(&mut pending);
        pending = Vec::with_capacity(feeders.len() / 2 + 1);

        for pair in feeders.chunks_exact(2) {
            number += 1;
            matches.push(Match::new(
                number,
                Segment::Upper,
                round,
                [Slot::Winner(pair[0]), Slot::Winner(pair[1])],
            ));
            pending.push(number);
        }

        pending.extend_from_slice(feeders.chunks_exact(2).remainder());
    }

    debug_assert_eq!(round, rounds);
    let upper_final = pending[0];

    if options.bracket_type == BracketType::Double {
        // The lower bracket alternates rounds of equal size (lower winner
        // meets an incoming upper loser) and halving rounds (two lower
        // winners meet). Sizing is an approximation of the true double
        // elimination shape, not a derived optimum.
        let lower_rounds = cmp::max(1, (rounds - 1) * 2);

        let mut prev: Vec<MatchNumber> = Vec::new();
        for lower_round in 1..=lower_rounds {
            let size = cmp::max(1, first_round >> ((lower_round + 1) / 2));

            let mut current = Vec::with_capacity(size);
            for i in 0..size {
                number += 1;
                let slots = if lower_round == 1 {
                    // Fed by upper round 1 losers, known only during play.
                    [Slot::Tbd, Slot::Tbd]
                } else if size == prev.len() {
                    [Slot::Winner(prev[i]), Slot::Tbd]
                } else {
                    [Slot::Winner(prev[2 * i]), Slot::Winner(prev[2 * i + 1])]
                };

                matches.push(Match::new(number, Segment::Lower, lower_round, slots));
                current.push(number);
            }

            prev = current;
        }

        if let (Some(&lower_final), true) = (prev.last(), options.grand_final) {
            number += 1;
            matches.push(Match::new(
                number,
                Segment::GrandFinal,
                1,
                [Slot::Winner(upper_final), Slot::Winner(lower_final)],
            ));
        }
    }

    log::debug!("Generated bracket with {} matches", matches.len());

    Ok(Bracket {
        matches,
        teams: count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{BracketType, GenerateOptions};

    fn teams(n: usize) -> Vec<u32> {
        (0..n as u32).collect()
    }

    fn single() -> GenerateOptions {
        GenerateOptions::new(BracketType::Single)
    }

    fn double() -> GenerateOptions {
        GenerateOptions::new(BracketType::Double)
    }

    #[test]
    fn test_generate_rejects_too_few_teams() {
        assert_eq!(
            generate(Vec::<u32>::new(), single()).unwrap_err(),
            Error::NotEnoughTeams { found: 0 }
        );
        assert_eq!(
            generate(vec![1u32], single()).unwrap_err(),
            Error::NotEnoughTeams { found: 1 }
        );
        assert_eq!(
            generate(vec![1u32], double()).unwrap_err(),
            Error::NotEnoughTeams { found: 1 }
        );
    }

    #[test]
    fn test_generate_two_teams() {
        let bracket = generate(teams(2), single()).unwrap();

        assert_eq!(bracket.teams(), 2);
        assert_eq!(
            bracket.matches(),
            [Match::new(
                1,
                Segment::Upper,
                1,
                [Slot::Team(0), Slot::Team(1)]
            )]
        );
    }

    #[test]
    fn test_generate_five_teams_single() {
        let bracket = generate(vec!["a", "b", "c", "d", "e"], single()).unwrap();

        let mut bye = Match::new(3, Segment::Upper, 1, [Slot::Team("e"), Slot::Bye]);
        bye.status = MatchStatus::Finished;
        bye.winner = Some(SlotIndex::First);

        assert_eq!(
            bracket.matches(),
            [
                Match::new(1, Segment::Upper, 1, [Slot::Team("a"), Slot::Team("b")]),
                Match::new(2, Segment::Upper, 1, [Slot::Team("c"), Slot::Team("d")]),
                bye,
                Match::new(4, Segment::Upper, 2, [Slot::Winner(1), Slot::Winner(2)]),
                Match::new(5, Segment::Upper, 3, [Slot::Winner(4), Slot::Winner(3)]),
            ]
        );
    }

    #[test]
    fn test_generate_four_teams_double() {
        let bracket = generate(teams(4), double()).unwrap();

        assert_eq!(
            bracket.matches(),
            [
                Match::new(1, Segment::Upper, 1, [Slot::Team(0), Slot::Team(1)]),
                Match::new(2, Segment::Upper, 1, [Slot::Team(2), Slot::Team(3)]),
                Match::new(3, Segment::Upper, 2, [Slot::Winner(1), Slot::Winner(2)]),
                Match::new(4, Segment::Lower, 1, [Slot::Tbd, Slot::Tbd]),
                Match::new(5, Segment::Lower, 2, [Slot::Winner(4), Slot::Tbd]),
                Match::new(6, Segment::GrandFinal, 1, [Slot::Winner(3), Slot::Winner(5)]),
            ]
        );
    }

    #[test]
    fn test_generate_double_without_grand_final() {
        let mut options = double();
        options.grand_final = false;

        let bracket = generate(teams(4), options).unwrap();

        assert!(bracket
            .matches()
            .iter()
            .all(|m| m.segment != Segment::GrandFinal));
        assert_eq!(bracket.matches_created(), 5);
    }

    #[test]
    fn test_generate_single_has_no_lower_bracket() {
        for n in 2..=17 {
            let bracket = generate(teams(n), single()).unwrap();

            assert!(
                bracket.matches().iter().all(|m| m.segment == Segment::Upper),
                "single elimination with {} teams produced non-upper matches",
                n
            );
        }
    }

    #[test]
    fn test_generate_double_has_one_grand_final() {
        for n in 2..=17 {
            let bracket = generate(teams(n), double()).unwrap();

            let finals: Vec<_> = bracket
                .matches()
                .iter()
                .filter(|m| m.segment == Segment::GrandFinal)
                .collect();

            assert_eq!(finals.len(), 1, "{} teams", n);
            assert!(finals[0].slots.iter().all(Slot::is_winner));
            assert!(bracket
                .matches()
                .iter()
                .any(|m| m.segment == Segment::Lower));
        }
    }

    #[test]
    fn test_generate_lower_bracket_is_symbolic() {
        for n in 2..=17 {
            let bracket = generate(teams(n), double()).unwrap();

            for m in bracket.matches() {
                if m.segment == Segment::Lower {
                    assert!(
                        m.slots.iter().all(|s| s.is_winner() || s.is_tbd()),
                        "{} teams: lower match {} holds a seeded slot",
                        n,
                        m.number
                    );
                }
            }
        }
    }

    #[test]
    fn test_generate_numbering_and_round_sizes() {
        for n in 2..=33 {
            let bracket = generate(teams(n), single()).unwrap();
            let matches = bracket.matches();

            // Contiguous numbering starting at 1.
            for (i, m) in matches.iter().enumerate() {
                assert_eq!(m.number, i as u64 + 1);
            }

            let first_round = matches.iter().filter(|m| m.round == 1).count();
            assert_eq!(first_round, (n + 1) / 2, "{} teams", n);

            // One real elimination per team except the champion; odd counts
            // add the bye record on top.
            let expected = n - 1 + n % 2;
            assert_eq!(matches.len(), expected, "{} teams", n);

            // The final round has exactly one match and the round count is
            // ceil(log2(n)).
            let rounds = matches.iter().map(|m| m.round).max().unwrap();
            assert_eq!(rounds, n.next_power_of_two().trailing_zeros());
            assert_eq!(matches.iter().filter(|m| m.round == rounds).count(), 1);

            // The counter keeps running across lower bracket and grand
            // final, without gaps or repeats.
            let bracket = generate(teams(n), double()).unwrap();
            for (i, m) in bracket.matches().iter().enumerate() {
                assert_eq!(m.number, i as u64 + 1);
            }
        }
    }

    #[test]
    fn test_generate_placeholders_reference_earlier_matches() {
        for n in 2..=33 {
            for options in [single(), double()] {
                let bracket = generate(teams(n), options).unwrap();

                for m in bracket.matches() {
                    for slot in &m.slots {
                        if let Slot::Winner(k) = slot {
                            assert!(*k < m.number, "{} teams: match {} references {}", n, m.number, k);
                            assert!(bracket.get(*k).is_some());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_generate_bye_resolved_immediately() {
        let bracket = generate(teams(7), single()).unwrap();

        let bye = bracket.get(4).unwrap();
        assert_eq!(bye.slots, [Slot::Team(6), Slot::Bye]);
        assert_eq!(bye.status, MatchStatus::Finished);
        assert_eq!(bye.winner, Some(SlotIndex::First));

        // All other round-1 matches are still upcoming.
        for m in bracket.matches().iter().filter(|m| m.number < 4) {
            assert_eq!(m.status, MatchStatus::Upcoming);
        }
    }

    #[test]
    fn test_generate_is_deterministic() {
        for options in [single(), double()] {
            let first = generate(teams(9), options).unwrap();
            let second = generate(teams(9), options).unwrap();

            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_generate_with_injected_shuffle() {
        let bracket = generate_with(teams(4), single(), |teams| teams.reverse()).unwrap();

        assert_eq!(
            bracket.get(1).unwrap().slots,
            [Slot::Team(3), Slot::Team(2)]
        );
        assert_eq!(
            bracket.get(2).unwrap().slots,
            [Slot::Team(1), Slot::Team(0)]
        );
    }

    #[test]
    fn test_report_result_propagates_winner() {
        let mut bracket = generate(vec!["a", "b", "c", "d", "e"], single()).unwrap();

        bracket.report_result(1, [2, 1], SlotIndex::First).unwrap();

        let m = bracket.get(1).unwrap();
        assert_eq!(m.status, MatchStatus::Finished);
        assert_eq!(m.scores, [2, 1]);
        assert_eq!(m.winner_team(), Some(&"a"));

        // Match 4 was (winner#1, winner#2); the first slot is now resolved.
        assert_eq!(
            bracket.get(4).unwrap().slots,
            [Slot::Team("a"), Slot::Winner(2)]
        );

        bracket.report_result(2, [0, 2], SlotIndex::Second).unwrap();
        assert_eq!(
            bracket.get(4).unwrap().slots,
            [Slot::Team("a"), Slot::Team("d")]
        );

        // The bye winner already sits in the final via match 3.
        bracket.report_result(4, [3, 2], SlotIndex::First).unwrap();
        bracket.report_result(3, [0, 0], SlotIndex::First).unwrap();
        assert_eq!(
            bracket.get(5).unwrap().slots,
            [Slot::Team("a"), Slot::Team("e")]
        );
    }

    #[test]
    fn test_report_result_errors() {
        let mut bracket = generate(teams(4), single()).unwrap();

        assert_eq!(
            bracket.report_result(9, [1, 0], SlotIndex::First).unwrap_err(),
            Error::UnknownMatch { number: 9 }
        );

        // Match 3 holds two unresolved placeholders.
        assert_eq!(
            bracket.report_result(3, [1, 0], SlotIndex::First).unwrap_err(),
            Error::UnresolvedSlot {
                number: 3,
                slot: SlotIndex::First
            }
        );
    }

    #[test]
    fn test_assign_slot_wires_lower_bracket() {
        let mut bracket = generate(teams(4), double()).unwrap();

        bracket.assign_slot(4, SlotIndex::First, 1).unwrap();
        bracket.assign_slot(4, SlotIndex::Second, 3).unwrap();

        assert_eq!(
            bracket.get(4).unwrap().slots,
            [Slot::Team(1), Slot::Team(3)]
        );

        assert_eq!(
            bracket.assign_slot(42, SlotIndex::First, 0).unwrap_err(),
            Error::UnknownMatch { number: 42 }
        );
    }
}
