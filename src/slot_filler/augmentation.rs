use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

use itertools::Itertools;
use log::debug;

use crate::entity_parser::BuiltinEntity;
use crate::errors::*;
use crate::slot_filler::crf_utils::{positive_tagging, Tag};
use crate::slot_filler::Tagger;
use crate::slot_utils::ParsedSlot;
use crate::tokenization::Token;
use crate::utils::{ranges_overlap, substring_with_char_range, EntityName, SlotName};

/// Indexes of the tokens overlapping each span
pub fn spans_to_tokens_indexes(spans: &[Range<usize>], tokens: &[Token]) -> Vec<Vec<usize>> {
    spans
        .iter()
        .map(|span| {
            tokens
                .iter()
                .enumerate()
                .filter(|(_, token)| ranges_overlap(span, &token.char_range))
                .map(|(i, _)| i)
                .collect()
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    value: String,
    range: Range<usize>,
    entity: EntityName,
    token_indexes: Vec<usize>,
    compatible_slots: Vec<usize>,
}

/// Pairs of (candidate index, slot index)
type Assignment = Vec<(usize, usize)>;

/// Resolves missing slots with builtin entities, keeping the assignment of
/// entities to slots which the tagger finds the most probable.
///
/// Returns only the newly resolved slots, ordered like the builtin entities.
pub fn augment_slots(
    text: &str,
    tokens: &[Token],
    tags: &[Tag],
    tagger: &dyn Tagger,
    intent_slots_mapping: &HashMap<SlotName, EntityName>,
    builtin_entities: Vec<BuiltinEntity>,
    missing_slots: &BTreeSet<SlotName>,
    max_exhaustive_assignments: usize,
) -> Result<Vec<ParsedSlot>> {
    assert_eq!(
        tokens.len(),
        tags.len(),
        "Tags and tokens must have the same length"
    );
    let slots: Vec<(&SlotName, &EntityName)> = missing_slots
        .iter()
        .filter_map(|name| intent_slots_mapping.get(name).map(|entity| (name, entity)))
        .collect();
    if slots.is_empty() || builtin_entities.is_empty() {
        return Ok(vec![]);
    }

    let candidates = build_candidates(text, tokens, tags, builtin_entities, &slots);
    if candidates.is_empty() {
        return Ok(vec![]);
    }

    let assignments = enumerate_assignments(
        &candidates,
        slots.len(),
        tokens.len(),
        max_exhaustive_assignments,
    );
    let assignment = match assignments {
        Some(assignments) => {
            debug!("Scoring {} builtin slots assignments", assignments.len());
            best_assignment(assignments, &candidates, &slots, tokens, tags, tagger)?
        }
        None => {
            debug!(
                "More than {} builtin slots assignments, falling back to greedy matching",
                max_exhaustive_assignments
            );
            greedy_assignment(&candidates, &slots, tokens, tags, tagger)?
        }
    };

    Ok(assignment
        .into_iter()
        .sorted_by_key(|(candidate_index, _)| *candidate_index)
        .map(|(candidate_index, slot_index)| {
            let candidate = &candidates[candidate_index];
            ParsedSlot {
                value: candidate.value.clone(),
                match_range: candidate.range.clone(),
                entity: candidate.entity.clone(),
                slot_name: slots[slot_index].0.clone(),
            }
        })
        .collect())
}

fn build_candidates(
    text: &str,
    tokens: &[Token],
    tags: &[Tag],
    builtin_entities: Vec<BuiltinEntity>,
    slots: &[(&SlotName, &EntityName)],
) -> Vec<Candidate> {
    let text_length = text.chars().count();
    builtin_entities
        .into_iter()
        .filter_map(|entity| {
            let range = trim_range(&entity.value, &entity.range)?;
            if range.end > text_length {
                return None;
            }
            let compatible_slots = slots
                .iter()
                .enumerate()
                .filter(|(_, (_, slot_entity))| **slot_entity == entity.entity_kind)
                .map(|(i, _)| i)
                .collect_vec();
            if compatible_slots.is_empty() {
                return None;
            }
            let token_indexes = spans_to_tokens_indexes(&[range.clone()], tokens)
                .pop()
                .unwrap_or_default();
            if token_indexes.is_empty() {
                return None;
            }
            // Tokens already tagged with a slot are left untouched
            if token_indexes.iter().any(|i| !tags[*i].is_outside()) {
                return None;
            }
            Some(Candidate {
                value: substring_with_char_range(text, &range),
                range,
                entity: entity.entity_kind,
                token_indexes,
                compatible_slots,
            })
        })
        .collect()
}

/// Shifts the range inward by the whitespaces surrounding the value
fn trim_range(value: &str, range: &Range<usize>) -> Option<Range<usize>> {
    let nb_chars = value.chars().count();
    let leading = nb_chars - value.trim_start().chars().count();
    let trailing = nb_chars - value.trim_end().chars().count();
    let start = range.start + leading;
    let end = range.end.checked_sub(trailing)?;
    if start >= end {
        None
    } else {
        Some(start..end)
    }
}

struct AssignmentsExplorer<'a> {
    candidates: &'a [Candidate],
    used_slots: Vec<bool>,
    used_tokens: Vec<bool>,
    current: Assignment,
    assignments: Vec<Assignment>,
    nb_explored: usize,
    max_assignments: usize,
}

impl<'a> AssignmentsExplorer<'a> {
    fn is_free(&self, candidate: &Candidate) -> bool {
        candidate.token_indexes.iter().all(|i| !self.used_tokens[*i])
    }

    fn set_tokens(&mut self, candidate_index: usize, used: bool) {
        for i in self.candidates[candidate_index].token_indexes.iter() {
            self.used_tokens[*i] = used;
        }
    }

    /// Candidates are explored in input order, each one trying its slots in
    /// lexical order before being left unassigned
    fn explore(&mut self, candidate_index: usize) -> bool {
        if candidate_index == self.candidates.len() {
            self.nb_explored += 1;
            if self.nb_explored > self.max_assignments {
                return false;
            }
            self.assignments.push(self.current.clone());
            return true;
        }
        let candidates = self.candidates;
        let candidate = &candidates[candidate_index];
        if self.is_free(candidate) {
            for slot_index in candidate.compatible_slots.iter().cloned() {
                if self.used_slots[slot_index] {
                    continue;
                }
                self.used_slots[slot_index] = true;
                self.set_tokens(candidate_index, true);
                self.current.push((candidate_index, slot_index));
                let completed = self.explore(candidate_index + 1);
                self.current.pop();
                self.set_tokens(candidate_index, false);
                self.used_slots[slot_index] = false;
                if !completed {
                    return false;
                }
            }
        }
        self.explore(candidate_index + 1)
    }
}

/// Every non-conflicting assignment of maximal size, in exploration order.
/// When token conflicts prevent assigning every candidate or every slot, the
/// largest partial assignments are kept instead of none.
/// Returns `None` when more than `max_assignments` assignments exist.
fn enumerate_assignments(
    candidates: &[Candidate],
    nb_slots: usize,
    nb_tokens: usize,
    max_assignments: usize,
) -> Option<Vec<Assignment>> {
    let mut explorer = AssignmentsExplorer {
        candidates,
        used_slots: vec![false; nb_slots],
        used_tokens: vec![false; nb_tokens],
        current: vec![],
        assignments: vec![],
        nb_explored: 0,
        max_assignments,
    };
    if !explorer.explore(0) {
        return None;
    }
    let max_size = explorer
        .assignments
        .iter()
        .map(|a| a.len())
        .max()
        .unwrap_or(0);
    Some(
        explorer
            .assignments
            .into_iter()
            .filter(|a| max_size > 0 && a.len() == max_size)
            .collect(),
    )
}

fn assigned_tags(
    assignment: &[(usize, usize)],
    candidates: &[Candidate],
    slots: &[(&SlotName, &EntityName)],
    tags: &[Tag],
    tagger: &dyn Tagger,
) -> Vec<Tag> {
    let tagging_scheme = tagger.get_tagging_scheme();
    let mut updated_tags = tags.to_vec();
    for (candidate_index, slot_index) in assignment.iter() {
        let indexes = &candidates[*candidate_index].token_indexes;
        let slot_tags = positive_tagging(tagging_scheme, slots[*slot_index].0, indexes.len());
        for (index, tag) in indexes.iter().zip(slot_tags.into_iter()) {
            updated_tags[*index] = tag;
        }
    }
    updated_tags
}

/// Ties are broken in favor of the first assignment
fn best_assignment(
    assignments: Vec<Assignment>,
    candidates: &[Candidate],
    slots: &[(&SlotName, &EntityName)],
    tokens: &[Token],
    tags: &[Tag],
    tagger: &dyn Tagger,
) -> Result<Assignment> {
    let mut best: Option<(f64, Assignment)> = None;
    for assignment in assignments {
        let updated_tags = assigned_tags(&assignment, candidates, slots, tags, tagger);
        let score = tagger.get_sequence_probability(tokens, &updated_tags)?;
        let is_better = best
            .as_ref()
            .map(|(best_score, _)| score > *best_score)
            .unwrap_or(true);
        if is_better {
            best = Some((score, assignment));
        }
    }
    Ok(best.map(|(_, assignment)| assignment).unwrap_or_default())
}

/// Scores each (candidate, slot) pair on its own and keeps the best
/// compatible pairs first. This is not a maximum-weight matching: the result
/// carries no optimality guarantee.
fn greedy_assignment(
    candidates: &[Candidate],
    slots: &[(&SlotName, &EntityName)],
    tokens: &[Token],
    tags: &[Tag],
    tagger: &dyn Tagger,
) -> Result<Assignment> {
    let mut edges: Vec<((usize, usize), f64)> = vec![];
    for (candidate_index, candidate) in candidates.iter().enumerate() {
        for slot_index in candidate.compatible_slots.iter().cloned() {
            let edge = (candidate_index, slot_index);
            let updated_tags = assigned_tags(&[edge], candidates, slots, tags, tagger);
            let score = tagger.get_sequence_probability(tokens, &updated_tags)?;
            edges.push((edge, score));
        }
    }
    // Stable sort keeps the exploration order among equal scores
    edges.sort_by(|(_, lhs), (_, rhs)| {
        rhs.partial_cmp(lhs).unwrap_or(::std::cmp::Ordering::Equal)
    });

    let mut used_candidates = vec![false; candidates.len()];
    let mut used_slots = vec![false; slots.len()];
    let mut used_tokens = vec![false; tokens.len()];
    let mut assignment = vec![];
    for ((candidate_index, slot_index), _) in edges {
        let candidate = &candidates[candidate_index];
        if used_candidates[candidate_index]
            || used_slots[slot_index]
            || candidate.token_indexes.iter().any(|i| used_tokens[*i])
        {
            continue;
        }
        used_candidates[candidate_index] = true;
        used_slots[slot_index] = true;
        for i in candidate.token_indexes.iter() {
            used_tokens[*i] = true;
        }
        assignment.push((candidate_index, slot_index));
    }
    Ok(assignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::slot_filler::crf_utils::{TagPrefix, TaggingScheme};
    use crate::testutils::MockedTagger;
    use crate::tokenization::tokenize;
    use failure::format_err;
    use maplit::{btreeset, hashmap};
    use std::sync::{Arc, Mutex};

    const TEXT: &str = "Find me a flight before 10pm and after 8pm";

    fn datetime(value: &str, range: Range<usize>) -> BuiltinEntity {
        BuiltinEntity {
            value: value.to_string(),
            range,
            entity_kind: "snips/datetime".to_string(),
        }
    }

    fn dates_mapping() -> HashMap<SlotName, EntityName> {
        hashmap! {
            "start_date".to_string() => "snips/datetime".to_string(),
            "end_date".to_string() => "snips/datetime".to_string(),
        }
    }

    fn dates_entities() -> Vec<BuiltinEntity> {
        vec![
            datetime(" before 10pm", 16..28),
            datetime("after 8pm", 33..42),
        ]
    }

    fn dates_tags(first: &str, second: &str, nb_tokens: usize) -> Vec<Tag> {
        let mut tags = vec![Tag::Outside; nb_tokens];
        tags[4] = Tag::new(TagPrefix::Begin, first);
        tags[5] = Tag::new(TagPrefix::Inside, first);
        tags[7] = Tag::new(TagPrefix::Begin, second);
        tags[8] = Tag::new(TagPrefix::Inside, second);
        tags
    }

    fn unexpected_tagger() -> MockedTagger {
        MockedTagger::new(TaggingScheme::BIO, |tags| {
            Err(format_err!("Unexpected tags: {:?}", tags))
        })
    }

    #[test]
    fn spans_to_tokens_indexes_works() {
        // Given
        let spans = vec![0..1, 2..6, 5..6, 9..15];
        let tokens = vec![
            Token::new("abc".to_string(), 0..3, 0..3),
            Token::new("def".to_string(), 4..7, 4..7),
            Token::new("ghi".to_string(), 10..13, 10..13),
        ];

        // When
        let actual_indexes = spans_to_tokens_indexes(&spans, &tokens);

        // Then
        let expected_indexes = vec![vec![0], vec![0, 1], vec![1], vec![2]];
        assert_eq!(expected_indexes, actual_indexes);
    }

    #[test]
    fn spans_overlapping_no_token_have_no_indexes() {
        let tokens = vec![Token::new("abc".to_string(), 0..3, 0..3)];
        assert_eq!(
            vec![Vec::<usize>::new()],
            spans_to_tokens_indexes(&[3..5], &tokens)
        );
    }

    #[test]
    fn augment_slots_keeps_most_probable_assignment() {
        // Given
        let tokens = tokenize(TEXT, Language::EN);
        let tags = vec![Tag::Outside; tokens.len()];
        let first_tags = dates_tags("start_date", "end_date", tokens.len());
        let second_tags = dates_tags("end_date", "start_date", tokens.len());
        let tagger = MockedTagger::new(TaggingScheme::BIO, move |tags| {
            if tags == &*first_tags {
                Ok(0.6)
            } else if tags == &*second_tags {
                Ok(0.8)
            } else {
                Err(format_err!("Unexpected tags: {:?}", tags))
            }
        });
        let missing_slots = btreeset! {"start_date".to_string(), "end_date".to_string()};

        // When
        let augmented_slots = augment_slots(
            TEXT,
            &tokens,
            &tags,
            &tagger,
            &dates_mapping(),
            dates_entities(),
            &missing_slots,
            1000,
        )
        .unwrap();

        // Then
        let expected_slots = vec![
            ParsedSlot {
                value: "before 10pm".to_string(),
                match_range: 17..28,
                entity: "snips/datetime".to_string(),
                slot_name: "end_date".to_string(),
            },
            ParsedSlot {
                value: "after 8pm".to_string(),
                match_range: 33..42,
                entity: "snips/datetime".to_string(),
                slot_name: "start_date".to_string(),
            },
        ];
        assert_eq!(expected_slots, augmented_slots);
    }

    #[test]
    fn augment_slots_breaks_ties_with_first_assignment() {
        // Given
        let tokens = tokenize(TEXT, Language::EN);
        let tags = vec![Tag::Outside; tokens.len()];
        let tagger = MockedTagger::new(TaggingScheme::BIO, |_| Ok(0.5));
        let missing_slots = btreeset! {"start_date".to_string(), "end_date".to_string()};

        // When
        let augmented_slots = augment_slots(
            TEXT,
            &tokens,
            &tags,
            &tagger,
            &dates_mapping(),
            dates_entities(),
            &missing_slots,
            1000,
        )
        .unwrap();

        // Then
        let slot_names = augmented_slots.into_iter().map(|s| s.slot_name).collect_vec();
        assert_eq!(vec!["end_date", "start_date"], slot_names);
    }

    #[test]
    fn augment_slots_does_not_fabricate_slots() {
        // Given
        let tokens = tokenize(TEXT, Language::EN);
        let tags = vec![Tag::Outside; tokens.len()];
        let mapping = hashmap! {
            "number_of_cups".to_string() => "snips/number".to_string(),
        };
        let missing_slots = btreeset! {"number_of_cups".to_string()};

        // When
        let augmented_slots = augment_slots(
            TEXT,
            &tokens,
            &tags,
            &unexpected_tagger(),
            &mapping,
            dates_entities(),
            &missing_slots,
            1000,
        )
        .unwrap();

        // Then
        assert!(augmented_slots.is_empty());
    }

    #[test]
    fn augment_slots_without_candidates_or_missing_slots_is_empty() {
        // Given
        let tokens = tokenize(TEXT, Language::EN);
        let tags = vec![Tag::Outside; tokens.len()];
        let missing_slots = btreeset! {"start_date".to_string()};

        // When
        let without_candidates = augment_slots(
            TEXT,
            &tokens,
            &tags,
            &unexpected_tagger(),
            &dates_mapping(),
            vec![],
            &missing_slots,
            1000,
        )
        .unwrap();
        let without_missing_slots = augment_slots(
            TEXT,
            &tokens,
            &tags,
            &unexpected_tagger(),
            &dates_mapping(),
            dates_entities(),
            &BTreeSet::new(),
            1000,
        )
        .unwrap();

        // Then
        assert!(without_candidates.is_empty());
        assert!(without_missing_slots.is_empty());
    }

    #[test]
    fn augment_slots_rejects_conflicting_candidates() {
        // Given
        let tokens = tokenize(TEXT, Language::EN);
        let tags = vec![Tag::Outside; tokens.len()];
        let entities = vec![
            datetime("before 10pm", 17..28),
            datetime("10pm", 24..28),
        ];
        let tagger = MockedTagger::new(TaggingScheme::BIO, |tags| {
            Ok(if tags[4].is_outside() { 0.7 } else { 0.2 })
        });
        let missing_slots = btreeset! {"start_date".to_string(), "end_date".to_string()};

        // When
        let augmented_slots = augment_slots(
            TEXT,
            &tokens,
            &tags,
            &tagger,
            &dates_mapping(),
            entities,
            &missing_slots,
            1000,
        )
        .unwrap();

        // Then
        let expected_slots = vec![ParsedSlot {
            value: "10pm".to_string(),
            match_range: 24..28,
            entity: "snips/datetime".to_string(),
            slot_name: "end_date".to_string(),
        }];
        assert_eq!(expected_slots, augmented_slots);
    }

    #[test]
    fn augment_slots_skips_degenerate_and_tagged_candidates() {
        // Given
        let tokens = tokenize(TEXT, Language::EN);
        let mut tags = vec![Tag::Outside; tokens.len()];
        tags[8] = Tag::new(TagPrefix::Begin, "start_date");
        let entities = vec![datetime("   ", 16..19), datetime("8pm", 39..42)];
        let missing_slots = btreeset! {"end_date".to_string()};

        // When
        let augmented_slots = augment_slots(
            TEXT,
            &tokens,
            &tags,
            &unexpected_tagger(),
            &dates_mapping(),
            entities,
            &missing_slots,
            1000,
        )
        .unwrap();

        // Then
        assert!(augmented_slots.is_empty());
    }

    #[test]
    fn augment_slots_falls_back_to_greedy_matching() {
        // Given
        let tokens = tokenize(TEXT, Language::EN);
        let tags = vec![Tag::Outside; tokens.len()];
        let end_date = Tag::new(TagPrefix::Begin, "end_date");
        let start_date = Tag::new(TagPrefix::Begin, "start_date");
        let tagger = MockedTagger::new(TaggingScheme::BIO, move |tags| {
            if tags[4] == end_date {
                Ok(0.9)
            } else if tags[7] == start_date {
                Ok(0.7)
            } else if tags[7] == end_date {
                Ok(0.5)
            } else if tags[4] == start_date {
                Ok(0.3)
            } else {
                Err(format_err!("Unexpected tags: {:?}", tags))
            }
        });
        let missing_slots = btreeset! {"start_date".to_string(), "end_date".to_string()};

        // When
        let augmented_slots = augment_slots(
            TEXT,
            &tokens,
            &tags,
            &tagger,
            &dates_mapping(),
            dates_entities(),
            &missing_slots,
            0,
        )
        .unwrap();

        // Then
        let slot_names = augmented_slots.into_iter().map(|s| s.slot_name).collect_vec();
        assert_eq!(vec!["end_date", "start_date"], slot_names);
    }

    #[test]
    #[should_panic]
    fn augment_slots_requires_one_tag_per_token() {
        let tokens = tokenize(TEXT, Language::EN);
        let missing_slots = btreeset! {"start_date".to_string()};
        let _ = augment_slots(
            TEXT,
            &tokens,
            &[Tag::Outside],
            &unexpected_tagger(),
            &dates_mapping(),
            dates_entities(),
            &missing_slots,
            1000,
        );
    }

    fn tagged(nb_tokens: usize, tagged_tokens: &[(usize, TagPrefix, &str)]) -> Vec<Tag> {
        let mut tags = vec![Tag::Outside; nb_tokens];
        for (index, prefix, slot_name) in tagged_tokens {
            tags[*index] = Tag::new(*prefix, *slot_name);
        }
        tags
    }

    #[test]
    fn augment_slots_keeps_best_candidate_for_a_single_slot() {
        // Given
        let text = "wake me at 7am or 8am or 9am";
        let tokens = tokenize(text, Language::EN);
        let tags = vec![Tag::Outside; tokens.len()];
        let at_7am = tagged(tokens.len(), &[(3, TagPrefix::Unit, "alarm_time")]);
        let at_8am = tagged(tokens.len(), &[(5, TagPrefix::Unit, "alarm_time")]);
        let at_9am = tagged(tokens.len(), &[(7, TagPrefix::Unit, "alarm_time")]);
        let scored_tags: Vec<(Vec<Tag>, f64)> = vec![
            (at_7am.clone(), 0.4),
            (at_8am.clone(), 0.9),
            (at_9am.clone(), 0.2),
        ];
        let received_tags = Arc::new(Mutex::new(Vec::<Vec<Tag>>::new()));
        let tagger_received_tags = received_tags.clone();
        let tagger = MockedTagger::new(TaggingScheme::BILOU, move |tags| {
            tagger_received_tags.lock().unwrap().push(tags.to_vec());
            scored_tags
                .iter()
                .find(|(scored, _)| scored.as_slice() == tags)
                .map(|(_, score)| *score)
                .ok_or_else(|| format_err!("Unexpected tags: {:?}", tags))
        });
        let mapping = hashmap! {
            "alarm_time".to_string() => "snips/datetime".to_string(),
        };
        let missing_slots = btreeset! {"alarm_time".to_string()};
        let entities = vec![
            datetime("7am", 11..14),
            datetime("8am", 18..21),
            datetime("9am", 25..28),
        ];

        // When
        let augmented_slots = augment_slots(
            text,
            &tokens,
            &tags,
            &tagger,
            &mapping,
            entities,
            &missing_slots,
            1000,
        )
        .unwrap();

        // Then
        let expected_slots = vec![ParsedSlot {
            value: "8am".to_string(),
            match_range: 18..21,
            entity: "snips/datetime".to_string(),
            slot_name: "alarm_time".to_string(),
        }];
        assert_eq!(expected_slots, augmented_slots);
        assert_eq!(vec![at_7am, at_8am, at_9am], *received_tags.lock().unwrap());
    }

    #[test]
    fn augment_slots_fills_one_of_several_slots_with_a_single_candidate() {
        let text = "leave at 7am";
        let tokens = tokenize(text, Language::EN);
        let schemes = vec![
            (TaggingScheme::IO, TagPrefix::Inside, TagPrefix::Inside),
            (TaggingScheme::BIO, TagPrefix::Begin, TagPrefix::Inside),
            (TaggingScheme::BILOU, TagPrefix::Begin, TagPrefix::Last),
        ];
        for (scheme, first_prefix, last_prefix) in schemes {
            // Given
            let tags = vec![Tag::Outside; tokens.len()];
            let arrival = tagged(
                tokens.len(),
                &[(1, first_prefix, "arrival_time"), (2, last_prefix, "arrival_time")],
            );
            let departure = tagged(
                tokens.len(),
                &[(1, first_prefix, "departure_time"), (2, last_prefix, "departure_time")],
            );
            let scored_tags: Vec<(Vec<Tag>, f64)> =
                vec![(arrival.clone(), 0.3), (departure.clone(), 0.7)];
            let received_tags = Arc::new(Mutex::new(Vec::<Vec<Tag>>::new()));
            let tagger_received_tags = received_tags.clone();
            let tagger = MockedTagger::new(scheme, move |tags| {
                tagger_received_tags.lock().unwrap().push(tags.to_vec());
                scored_tags
                    .iter()
                    .find(|(scored, _)| scored.as_slice() == tags)
                    .map(|(_, score)| *score)
                    .ok_or_else(|| format_err!("Unexpected tags: {:?}", tags))
            });
            let mapping = hashmap! {
                "arrival_time".to_string() => "snips/datetime".to_string(),
                "departure_time".to_string() => "snips/datetime".to_string(),
            };
            let missing_slots =
                btreeset! {"arrival_time".to_string(), "departure_time".to_string()};

            // When
            let augmented_slots = augment_slots(
                text,
                &tokens,
                &tags,
                &tagger,
                &mapping,
                vec![datetime("at 7am", 6..12)],
                &missing_slots,
                1000,
            )
            .unwrap();

            // Then
            let expected_slots = vec![ParsedSlot {
                value: "at 7am".to_string(),
                match_range: 6..12,
                entity: "snips/datetime".to_string(),
                slot_name: "departure_time".to_string(),
            }];
            assert_eq!(expected_slots, augmented_slots);
            assert_eq!(vec![arrival, departure], *received_tags.lock().unwrap());
        }
    }

    #[test]
    fn trim_range_works() {
        assert_eq!(Some(17..28), trim_range(" before 10pm", &(16..28)));
        assert_eq!(Some(3..5), trim_range("ab  ", &(3..7)));
        assert_eq!(None, trim_range("  ", &(3..5)));
    }
}
