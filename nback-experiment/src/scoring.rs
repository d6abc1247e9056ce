use nback_core::{Modality, SessionResult, Timestamp};

use crate::state::SessionState;

/// Judges every scored slot of a finished session.
///
/// A slot counts as correct in a modality when the recorded claim equals
/// the ground truth, so withholding input on a non-match is correct and
/// a missed match is incorrect. Warm-up slots are skipped, and the
/// reported level is the one the sequence was built and judged at.
pub fn score(state: &SessionState, completed_at: Timestamp) -> SessionResult {
    let sequence = &state.sequence;
    let mut tally = [(0u32, 0u32); 2];

    for i in sequence.n_level()..sequence.len() {
        for (slot, modality) in Modality::ALL.into_iter().enumerate() {
            let Some(truth) = sequence.is_match(i, modality) else {
                continue;
            };
            if truth == state.responses.get(modality, i) {
                tally[slot].0 += 1;
            } else {
                tally[slot].1 += 1;
            }
        }
    }

    let [(visual_correct, visual_incorrect), (audio_correct, audio_incorrect)] = tally;
    let total = visual_correct + visual_incorrect + audio_correct + audio_incorrect;
    let accuracy_percent = if total > 0 {
        100.0 * (visual_correct + audio_correct) as f64 / total as f64
    } else {
        0.0
    };

    SessionResult {
        visual_correct,
        visual_incorrect,
        audio_correct,
        audio_incorrect,
        accuracy_percent,
        n_level: sequence.n_level(),
        completed_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nback_core::{Position, Symbol, Trial, TrialSequence};

    fn trial(row: u8, col: u8, symbol: Symbol) -> Trial {
        Trial {
            position: Position::new(row, col),
            symbol,
            created_at: 0,
        }
    }

    /// n=2, trial 2 repeats trial 0's position but not its letter.
    fn visual_match_state() -> SessionState {
        SessionState::new(TrialSequence::new(
            2,
            vec![
                trial(0, 0, Symbol::C),
                trial(1, 2, Symbol::H),
                trial(0, 0, Symbol::K),
            ],
        ))
    }

    #[test]
    fn claimed_match_and_withheld_non_match_are_both_correct() {
        let mut state = visual_match_state();
        state.responses.record(Modality::Visual, 2);

        let result = score(&state, 99);
        assert_eq!(result.visual_correct, 1);
        assert_eq!(result.visual_incorrect, 0);
        assert_eq!(result.audio_correct, 1);
        assert_eq!(result.audio_incorrect, 0);
        assert_eq!(result.accuracy_percent, 100.0);
        assert_eq!(result.n_level, 2);
        assert_eq!(result.completed_at, 99);
    }

    #[test]
    fn missed_match_is_incorrect() {
        let state = visual_match_state();
        let result = score(&state, 0);

        assert_eq!(result.visual_correct, 0);
        assert_eq!(result.visual_incorrect, 1);
        assert_eq!(result.audio_correct, 1);
        assert_eq!(result.accuracy_percent, 50.0);
    }

    #[test]
    fn false_alarm_is_incorrect() {
        let mut state = visual_match_state();
        state.responses.record(Modality::Audio, 2);
        state.responses.record(Modality::Visual, 2);

        let result = score(&state, 0);
        assert_eq!(result.audio_correct, 0);
        assert_eq!(result.audio_incorrect, 1);
        assert_eq!(result.visual_correct, 1);
    }

    #[test]
    fn warm_up_responses_are_ignored() {
        let mut state = visual_match_state();
        // Never set through the state machine, but must not count either way.
        state.responses.record(Modality::Visual, 0);
        state.responses.record(Modality::Audio, 1);
        state.responses.record(Modality::Visual, 2);

        let result = score(&state, 0);
        assert_eq!(result.total_answers(), 2);
        assert_eq!(result.accuracy_percent, 100.0);
    }

    #[test]
    fn empty_session_scores_zero_without_dividing() {
        let state = SessionState::new(TrialSequence::new(2, vec![trial(0, 0, Symbol::C)]));
        let result = score(&state, 0);

        assert_eq!(result.total_answers(), 0);
        assert_eq!(result.accuracy_percent, 0.0);
    }

    #[test]
    fn scoring_twice_gives_the_same_result() {
        let mut state = visual_match_state();
        state.responses.record(Modality::Visual, 2);

        assert_eq!(score(&state, 5), score(&state, 5));
    }
}
