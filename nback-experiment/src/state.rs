use crate::config::SessionConfig;
use crate::generator::StimulusGenerator;
use crate::scoring::score;
use nback_core::{
    Feedback, Modality, Position, SessionPhase, SessionResult, Symbol, Trial, TrialSequence,
};
use nback_timing::{Clock, Scheduler, TimerHandle, TimerToken};
use rand::Rng;

/// Everything that can change a session, funnelled through one queue
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Start(SessionConfig),
    Input(Modality),
    Tick(TimerToken),
}

impl From<TimerToken> for SessionEvent {
    fn from(token: TimerToken) -> Self {
        SessionEvent::Tick(token)
    }
}

/// Per-slot match claims, one flag per modality
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Responses {
    pub visual: Vec<bool>,
    pub audio: Vec<bool>,
}

impl Responses {
    pub fn new(len: usize) -> Self {
        Self {
            visual: vec![false; len],
            audio: vec![false; len],
        }
    }

    fn flags(&self, modality: Modality) -> &[bool] {
        match modality {
            Modality::Visual => &self.visual,
            Modality::Audio => &self.audio,
        }
    }

    /// Returns false when the claim was already recorded or `index` is out of range.
    pub fn record(&mut self, modality: Modality, index: usize) -> bool {
        let flags = match modality {
            Modality::Visual => &mut self.visual,
            Modality::Audio => &mut self.audio,
        };
        match flags.get_mut(index) {
            Some(flag) if !*flag => {
                *flag = true;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, modality: Modality, index: usize) -> bool {
        self.flags(modality).get(index).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.visual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visual.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub is_running: bool,
    pub current_index: usize,
    pub sequence: TrialSequence,
    pub responses: Responses,
    pub feedback: Option<Feedback>,
}

impl SessionState {
    /// Fresh running state positioned on the first trial.
    pub fn new(sequence: TrialSequence) -> Self {
        let responses = Responses::new(sequence.len());
        Self {
            is_running: true,
            current_index: 0,
            sequence,
            responses,
            feedback: None,
        }
    }

    pub fn current_trial(&self) -> Option<&Trial> {
        if !self.is_running {
            return None;
        }
        self.sequence.get(self.current_index)
    }

    pub fn phase(&self) -> SessionPhase {
        if !self.is_running {
            SessionPhase::Idle
        } else if self.sequence.is_warm_up(self.current_index) {
            SessionPhase::WarmUp
        } else if self.feedback.is_some() {
            SessionPhase::Feedback
        } else {
            SessionPhase::Presenting
        }
    }
}

/// Owned read-only projection for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub position: Option<Position>,
    pub symbol: Option<Symbol>,
    /// 1-based trial counter that skips the warm-up slots.
    pub displayed_index: usize,
    pub total_trials: usize,
    pub n_level: usize,
    pub grid_size: usize,
    pub feedback: Option<Feedback>,
}

pub type SessionEndCallback = Box<dyn FnMut(&SessionResult) + Send>;

/// Single-writer owner of a dual N-back session.
///
/// All mutation goes through [`start_session`](Self::start_session),
/// [`submit_input`](Self::submit_input) and [`advance`](Self::advance)
/// (or [`handle_event`](Self::handle_event), which dispatches to them).
pub struct SessionStateMachine<C, S, R>
where
    C: Clock,
    S: Scheduler,
    R: Rng,
{
    pub clock: C,
    pub scheduler: S,
    pub rng: R,
    pub generator: StimulusGenerator,
    config: SessionConfig,
    state: SessionState,
    generation: u64,
    pending_timer: Option<TimerHandle>,
    last_result: Option<SessionResult>,
    on_session_end: Option<SessionEndCallback>,
}

impl<C, S, R> SessionStateMachine<C, S, R>
where
    C: Clock,
    S: Scheduler,
    R: Rng,
{
    pub fn new(clock: C, scheduler: S, rng: R) -> Self {
        Self {
            clock,
            scheduler,
            rng,
            generator: StimulusGenerator::default(),
            config: SessionConfig::default(),
            state: SessionState::default(),
            generation: 0,
            pending_timer: None,
            last_result: None,
            on_session_end: None,
        }
    }

    pub fn with_generator(mut self, generator: StimulusGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn on_session_end<F>(&mut self, callback: F)
    where
        F: FnMut(&SessionResult) + Send + 'static,
    {
        self.on_session_end = Some(Box::new(callback));
    }

    /// Generates a new sequence and starts presenting it. A session that
    /// is still running is dropped without producing a result.
    pub fn start_session(&mut self, config: SessionConfig) {
        let sequence = self
            .generator
            .generate(&config, &mut self.rng, self.clock.now());
        self.start_with_sequence(config, sequence);
    }

    /// Starts a session over a prepared sequence. The sequence's own
    /// n-level governs scoring and input windows and replaces the
    /// configured one.
    pub fn start_with_sequence(&mut self, config: SessionConfig, sequence: TrialSequence) {
        self.cancel_timer();
        if self.state.is_running {
            println!(
                "Session {} abandoned at slot {}/{}",
                self.generation,
                self.state.current_index,
                self.state.sequence.len()
            );
        }

        self.config = SessionConfig {
            n_level: sequence.n_level(),
            ..config.sanitized()
        };
        self.generation += 1;
        self.state = SessionState::new(sequence);

        println!(
            "Session {} started: {}-back, {} trials ({} warm-up), {}x{} grid, {} ms per trial",
            self.generation,
            self.config.n_level,
            self.state.sequence.scored_len(),
            self.state.sequence.n_level(),
            self.config.grid_size,
            self.config.grid_size,
            self.config.trial_duration_ms,
        );

        if self.state.sequence.is_empty() {
            self.finish();
        } else {
            self.arm_timer();
        }
    }

    /// Records a match claim for the current trial and returns the
    /// immediate feedback. Ignored while idle or during warm-up.
    pub fn submit_input(&mut self, modality: Modality) -> Option<Feedback> {
        if !self.state.phase().allows_input() {
            return None;
        }

        let index = self.state.current_index;
        let correct = self.state.sequence.is_match(index, modality)?;
        self.state.responses.record(modality, index);

        let feedback = Feedback::from_correct(correct);
        self.state.feedback = Some(feedback);
        Some(feedback)
    }

    /// Moves to the next trial when `token` belongs to the current one.
    /// Returns the result if this ended the session. Stale tokens are ignored.
    pub fn advance(&mut self, token: TimerToken) -> Option<SessionResult> {
        if !self.state.is_running || token != self.current_token() {
            return None;
        }
        self.pending_timer = None;

        self.state.current_index += 1;
        if self.state.current_index >= self.state.sequence.len() {
            return Some(self.finish());
        }

        self.state.feedback = None;
        self.arm_timer();
        None
    }

    /// Dispatches a queued event. Returns false when it had no effect.
    pub fn handle_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Start(config) => {
                self.start_session(config);
                true
            }
            SessionEvent::Input(modality) => self.submit_input(modality).is_some(),
            SessionEvent::Tick(token) => {
                let before = (self.generation, self.state.current_index);
                self.advance(token);
                before != (self.generation, self.state.current_index)
            }
        }
    }

    fn finish(&mut self) -> SessionResult {
        self.cancel_timer();
        self.state.is_running = false;
        self.state.feedback = None;

        let result = score(&self.state, self.clock.now());
        println!(
            "Session {} complete: {:.1}% (visual {}/{}, audio {}/{}) at {}-back",
            self.generation,
            result.accuracy_percent,
            result.visual_correct,
            result.visual_correct + result.visual_incorrect,
            result.audio_correct,
            result.audio_correct + result.audio_incorrect,
            result.n_level,
        );

        if let Some(callback) = self.on_session_end.as_mut() {
            callback(&result);
        }
        self.last_result = Some(result.clone());
        result
    }

    fn arm_timer(&mut self) {
        self.cancel_timer();
        let token = self.current_token();
        self.pending_timer = Some(self.scheduler.schedule(self.config.trial_duration(), token));
    }

    fn cancel_timer(&mut self) {
        if let Some(handle) = self.pending_timer.take() {
            self.scheduler.cancel(handle);
        }
    }

    /// Token the currently armed timer carries.
    pub fn current_token(&self) -> TimerToken {
        TimerToken {
            generation: self.generation,
            slot: self.state.current_index,
        }
    }

    pub fn snapshot(&self) -> SessionView {
        let trial = self.state.current_trial();
        let n_level = self.state.sequence.n_level();
        SessionView {
            phase: self.state.phase(),
            position: trial.map(|t| t.position),
            symbol: trial.map(|t| t.symbol),
            displayed_index: (self.state.current_index + 1)
                .saturating_sub(n_level)
                .min(self.state.sequence.scored_len()),
            total_trials: self.state.sequence.scored_len(),
            n_level,
            grid_size: self.config.grid_size,
            feedback: self.state.feedback,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_result(&self) -> Option<&SessionResult> {
        self.last_result.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nback_timing::ManualTimer;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    type Machine = SessionStateMachine<ManualTimer, ManualTimer, StdRng>;

    fn machine(seed: u64) -> (Machine, ManualTimer) {
        let timer = ManualTimer::new(1_000);
        let m = SessionStateMachine::new(timer.clone(), timer.clone(), StdRng::seed_from_u64(seed));
        (m, timer)
    }

    fn config(n_level: usize, total_trials: usize) -> SessionConfig {
        SessionConfig {
            n_level,
            total_trials,
            trial_duration_ms: 2_000,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn starts_idle() {
        let (m, timer) = machine(1);
        assert_eq!(m.phase(), SessionPhase::Idle);
        assert_eq!(m.snapshot().position, None);
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn input_before_start_is_ignored() {
        let (mut m, _) = machine(1);
        assert_eq!(m.submit_input(Modality::Visual), None);
        assert_eq!(m.state(), &SessionState::default());
    }

    #[test]
    fn start_arms_one_timer_for_first_trial() {
        let (mut m, timer) = machine(1);
        m.start_session(config(2, 10));

        assert!(m.is_running());
        assert_eq!(m.state().current_index, 0);
        assert_eq!(m.state().responses.len(), 12);
        assert_eq!(timer.pending(), 1);
        assert_eq!(timer.next_due(), Some(3_000));
        assert_eq!(m.phase(), SessionPhase::WarmUp);
    }

    #[test]
    fn warm_up_input_is_discarded() {
        let (mut m, _) = machine(2);
        m.start_session(config(2, 10));

        assert_eq!(m.submit_input(Modality::Visual), None);
        assert_eq!(m.submit_input(Modality::Audio), None);
        assert!(!m.state().responses.visual.contains(&true));
        assert_eq!(m.state().feedback, None);
    }

    #[test]
    fn input_after_warm_up_records_and_gives_feedback() {
        let (mut m, timer) = machine(3);
        m.start_session(config(1, 10));
        let token = timer.fire_next().unwrap();
        assert_eq!(m.advance(token), None);

        let expected = m.state().sequence.is_match(1, Modality::Audio).unwrap();
        let feedback = m.submit_input(Modality::Audio).unwrap();

        assert_eq!(feedback.is_correct(), expected);
        assert!(m.state().responses.audio[1]);
        assert!(!m.state().responses.visual[1]);
        assert_eq!(m.phase(), SessionPhase::Feedback);

        // Repeat claims change nothing.
        assert_eq!(m.submit_input(Modality::Audio), Some(feedback));
        assert_eq!(m.state().responses.audio.iter().filter(|f| **f).count(), 1);
    }

    #[test]
    fn advancing_clears_feedback_and_rearms() {
        let (mut m, timer) = machine(4);
        m.start_session(config(1, 10));
        m.advance(timer.fire_next().unwrap());
        m.submit_input(Modality::Visual);

        m.advance(timer.fire_next().unwrap());
        assert_eq!(m.state().current_index, 2);
        assert_eq!(m.state().feedback, None);
        assert_eq!(m.phase(), SessionPhase::Presenting);
        assert_eq!(timer.pending(), 1);
    }

    #[test]
    fn stale_token_is_a_no_op() {
        let (mut m, timer) = machine(5);
        m.start_session(config(2, 10));
        let stale = m.current_token();
        m.advance(timer.fire_next().unwrap());

        assert_eq!(m.advance(stale), None);
        assert_eq!(m.state().current_index, 1);
    }

    #[test]
    fn token_from_previous_session_is_a_no_op() {
        let (mut m, timer) = machine(6);
        m.start_session(config(2, 10));
        let old = m.current_token();
        m.start_session(config(2, 10));

        assert_eq!(m.generation(), old.generation + 1);
        assert_eq!(old.slot, m.current_token().slot);
        assert_eq!(m.advance(old), None);
        assert_eq!(m.state().current_index, 0);
        // The first session's timer was cancelled on restart.
        assert_eq!(timer.pending(), 1);
    }

    #[test]
    fn restart_resets_everything_and_emits_nothing() {
        let (mut m, timer) = machine(7);
        let ended = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = ended.clone();
        m.on_session_end(move |_| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        m.start_session(config(3, 40));
        for _ in 0..5 {
            m.advance(timer.fire_next().unwrap());
        }
        m.submit_input(Modality::Visual);

        m.start_session(config(1, 10));
        assert_eq!(m.state().sequence.len(), 11);
        assert_eq!(m.state().responses.visual.len(), 11);
        assert_eq!(m.state().responses.audio.len(), 11);
        assert!(!m.state().responses.visual.contains(&true));
        assert_eq!(m.state().current_index, 0);
        assert_eq!(ended.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert!(m.last_result().is_none());
    }

    #[test]
    fn last_tick_ends_session_and_notifies() {
        let (mut m, timer) = machine(8);
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        m.on_session_end(move |r| sink.lock().unwrap().push(r.clone()));

        m.start_session(config(2, 10));
        let mut result = None;
        while let Some(token) = timer.fire_next() {
            result = m.advance(token);
        }

        let result = result.expect("session should end");
        assert!(!m.is_running());
        assert_eq!(m.phase(), SessionPhase::Idle);
        assert_eq!(result.total_answers(), 20);
        assert_eq!(result.completed_at, 1_000 + 12 * 2_000);
        assert_eq!(seen.lock().unwrap().as_slice(), &[result.clone()]);
        assert_eq!(m.last_result(), Some(&result));
        assert_eq!(timer.pending(), 0);
        assert_eq!(m.submit_input(Modality::Visual), None);
    }

    #[test]
    fn snapshot_counts_only_scored_trials() {
        let (mut m, timer) = machine(9);
        m.start_session(config(3, 10));

        let view = m.snapshot();
        assert_eq!(view.displayed_index, 0);
        assert_eq!(view.total_trials, 10);
        assert_eq!(view.position, m.state().sequence.get(0).map(|t| t.position));

        for _ in 0..2 {
            m.advance(timer.fire_next().unwrap());
        }
        assert_eq!(m.snapshot().displayed_index, 0);
        m.advance(timer.fire_next().unwrap());
        assert_eq!(m.snapshot().displayed_index, 1);
        assert_eq!(m.snapshot().phase, SessionPhase::Presenting);
    }

    #[test]
    fn custom_generator_sets_match_probabilities() {
        let (m, timer) = machine(11);
        let mut m = m.with_generator(StimulusGenerator::new(1.0, 0.0));
        assert_eq!(m.generator.visual_match_probability(), 1.0);

        m.start_session(config(1, 10));
        m.advance(timer.fire_next().unwrap());

        assert_eq!(m.submit_input(Modality::Visual), Some(Feedback::Correct));
        for i in 1..m.state().sequence.len() {
            assert_eq!(m.state().sequence.is_match(i, Modality::Visual), Some(true));
        }
    }

    #[test]
    fn handle_event_reports_effect() {
        let (mut m, timer) = machine(10);
        assert!(!m.handle_event(SessionEvent::Input(Modality::Visual)));
        assert!(m.handle_event(SessionEvent::Start(config(1, 10))));
        assert!(!m.handle_event(SessionEvent::Input(Modality::Visual)));

        let token = timer.fire_next().unwrap();
        assert!(m.handle_event(token.into()));
        assert!(!m.handle_event(token.into()));
        assert!(m.handle_event(SessionEvent::Input(Modality::Visual)));
    }
}
