use anyhow::{anyhow, Context, Result};
use nback_core::{Feedback, Modality, SessionPhase};
use nback_experiment::{next_config, SessionConfig, SessionEvent, SessionStateMachine, SessionView};
use nback_history::{HistoryStats, HistoryStore, JsonFileHistory, DEFAULT_RECENT_WINDOW};
use nback_timing::{ChannelScheduler, SystemClock, TimerToken};
use rand::rngs::ThreadRng;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

/// Everything the driver loop consumes, timer ticks and keyboard alike
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Session(SessionEvent),
    StartRequested,
    ShowStats,
    ClearHistory,
    Quit,
}

impl From<TimerToken> for AppEvent {
    fn from(token: TimerToken) -> Self {
        AppEvent::Session(SessionEvent::Tick(token))
    }
}

/// Maps one input line to an event.
pub fn parse_command(line: &str) -> Option<AppEvent> {
    match line.trim().to_ascii_lowercase().as_str() {
        "a" => Some(AppEvent::Session(SessionEvent::Input(Modality::Visual))),
        "l" => Some(AppEvent::Session(SessionEvent::Input(Modality::Audio))),
        "s" | "" => Some(AppEvent::StartRequested),
        "h" => Some(AppEvent::ShowStats),
        "c" => Some(AppEvent::ClearHistory),
        "q" => Some(AppEvent::Quit),
        _ => None,
    }
}

pub fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let file =
        File::open(path).with_context(|| format!("cannot open config {}", path.display()))?;
    let config: SessionConfig = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("cannot parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

pub struct App {
    experiment: SessionStateMachine<SystemClock, ChannelScheduler<AppEvent>, ThreadRng>,
    events: Receiver<AppEvent>,
    sender: Sender<AppEvent>,
    history: Arc<Mutex<JsonFileHistory>>,
    config: SessionConfig,
    should_exit: bool,
}

impl App {
    pub fn new(config: SessionConfig, history_path: &Path) -> Result<Self> {
        let (sender, events) = mpsc::channel();
        let scheduler = ChannelScheduler::new(sender.clone());
        let mut experiment = SessionStateMachine::new(SystemClock, scheduler, rand::rng());

        let history = Arc::new(Mutex::new(JsonFileHistory::new(history_path)));
        let sink = Arc::clone(&history);
        experiment.on_session_end(move |result| match sink.lock() {
            Ok(mut history) => {
                if let Err(e) = history.append(result.clone()) {
                    eprintln!("Failed to save result: {}", e);
                }
            }
            Err(_) => eprintln!("History store unavailable, result not saved"),
        });

        Ok(Self {
            experiment,
            events,
            sender,
            history,
            config,
            should_exit: false,
        })
    }

    pub fn run(mut self) -> Result<()> {
        println!("=== DUAL N-BACK ===");
        println!(
            "{}-back, {} trials, {} ms per trial, {}x{} grid",
            self.config.n_level,
            self.config.total_trials,
            self.config.trial_duration_ms,
            self.config.grid_size,
            self.config.grid_size
        );
        println!("Commands: s = start, a = position match, l = letter match, h = stats, c = clear history, q = quit\n");

        self.spawn_input_reader();

        while !self.should_exit {
            let event = self
                .events
                .recv()
                .map_err(|_| anyhow!("event queue closed"))?;
            self.handle(event)?;
        }

        println!("\nGoodbye.");
        Ok(())
    }

    fn spawn_input_reader(&self) {
        let sender = self.sender.clone();
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match parse_command(&line) {
                    Some(event) => {
                        if sender.send(event).is_err() {
                            return;
                        }
                    }
                    None => eprintln!("Unknown command: {}", line.trim()),
                }
            }
            let _ = sender.send(AppEvent::Quit);
        });
    }

    fn handle(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::StartRequested => {
                if self.experiment.is_running() {
                    println!("Restarting session.");
                }
                self.apply(SessionEvent::Start(self.config.clone()));
            }
            AppEvent::Session(event) => self.apply(event),
            AppEvent::ShowStats => self.show_stats()?,
            AppEvent::ClearHistory => {
                self.history()?.clear()?;
                println!("History cleared.");
            }
            AppEvent::Quit => self.should_exit = true,
        }
        Ok(())
    }

    fn apply(&mut self, event: SessionEvent) {
        let was_running = self.experiment.is_running();
        if !self.experiment.handle_event(event) {
            return;
        }

        if was_running && !self.experiment.is_running() {
            self.session_ended();
        } else {
            println!("{}", describe(&self.experiment.snapshot()));
        }
    }

    fn session_ended(&mut self) {
        let Some(result) = self.experiment.last_result().cloned() else {
            return;
        };
        println!(
            "\nAccuracy: {:.1}%  (position {} right / {} wrong, letter {} right / {} wrong)",
            result.accuracy_percent,
            result.visual_correct,
            result.visual_incorrect,
            result.audio_correct,
            result.audio_incorrect
        );

        let next = next_config(&self.config, &result);
        if next.n_level != self.config.n_level {
            println!("N-level adjusted: {} -> {}", self.config.n_level, next.n_level);
        }
        self.config = next;
        println!("Press s to play again.\n");
    }

    fn show_stats(&self) -> Result<()> {
        let results = self.history()?.list()?;
        let stats = HistoryStats::from_results(&results, DEFAULT_RECENT_WINDOW);
        println!("Sessions played: {}", stats.total_sessions);
        println!("Best accuracy: {:.1}%", stats.best_accuracy);
        println!(
            "Average of last {}: {:.1}%",
            stats.recent.len(),
            stats.recent_average_accuracy
        );
        for r in &stats.recent {
            println!("  {}-back  {:.1}%  at {}", r.n_level, r.accuracy_percent, r.completed_at);
        }
        Ok(())
    }

    fn history(&self) -> Result<std::sync::MutexGuard<'_, JsonFileHistory>> {
        self.history
            .lock()
            .map_err(|_| anyhow!("history store lock poisoned"))
    }
}

/// One status line for the current trial.
pub fn describe(view: &SessionView) -> String {
    let (Some(position), Some(symbol)) = (view.position, view.symbol) else {
        return "Idle.".to_string();
    };
    let progress = match view.phase {
        SessionPhase::WarmUp => "warm-up".to_string(),
        _ => format!("{}/{}", view.displayed_index, view.total_trials),
    };
    let feedback = match view.feedback {
        Some(Feedback::Correct) => "  correct",
        Some(Feedback::Incorrect) => "  wrong",
        None => "",
    };
    format!("[{}] cell {}  letter {}{}", progress, position, symbol, feedback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nback_core::Position;

    #[test]
    fn commands_map_to_events() {
        assert_eq!(
            parse_command(" A \n"),
            Some(AppEvent::Session(SessionEvent::Input(Modality::Visual)))
        );
        assert_eq!(
            parse_command("l"),
            Some(AppEvent::Session(SessionEvent::Input(Modality::Audio)))
        );
        assert_eq!(parse_command(""), Some(AppEvent::StartRequested));
        assert_eq!(parse_command("q"), Some(AppEvent::Quit));
        assert_eq!(parse_command("x"), None);
    }

    #[test]
    fn missing_config_path_means_defaults() {
        assert_eq!(load_config(None).unwrap(), SessionConfig::default());
    }

    #[test]
    fn unreadable_config_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/nback.json"))).unwrap_err();
        assert!(err.to_string().contains("cannot open config"));
    }

    #[test]
    fn describe_shows_progress_and_feedback() {
        let view = SessionView {
            phase: SessionPhase::Feedback,
            position: Some(Position::new(1, 2)),
            symbol: Some(nback_core::Symbol::K),
            displayed_index: 3,
            total_trials: 20,
            n_level: 2,
            grid_size: 3,
            feedback: Some(Feedback::Correct),
        };
        assert_eq!(describe(&view), "[3/20] cell (1, 2)  letter K  correct");

        let warm = SessionView {
            phase: SessionPhase::WarmUp,
            feedback: None,
            ..view.clone()
        };
        assert_eq!(describe(&warm), "[warm-up] cell (1, 2)  letter K");
    }
}
