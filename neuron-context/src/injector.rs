//! Rule-based system prompt injection.
//!
//! Complements the compaction strategies: where those shrink the
//! transcript, [`SystemInjector`] adds transient reminders back in —
//! e.g. "you're running low on budget" or "stay concise" every few
//! turns — without the caller hand-rolling the trigger bookkeeping.

/// A condition under which an injection rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionTrigger {
    /// Fires on every `n`-th turn (turn 0 never fires).
    EveryNTurns(usize),
    /// Fires once the running token count reaches `threshold`.
    OnTokenThreshold(usize),
}

impl InjectionTrigger {
    fn fires(&self, turn: usize, tokens: usize) -> bool {
        match *self {
            InjectionTrigger::EveryNTurns(n) => n > 0 && turn > 0 && turn % n == 0,
            InjectionTrigger::OnTokenThreshold(threshold) => tokens >= threshold,
        }
    }
}

/// Evaluates a set of injection rules against the current turn/token state.
#[derive(Debug, Default)]
pub struct SystemInjector {
    rules: Vec<(InjectionTrigger, String)>,
}

impl SystemInjector {
    /// Create an injector with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Register a rule: inject `content` whenever `trigger` fires.
    pub fn add_rule(&mut self, trigger: InjectionTrigger, content: String) {
        self.rules.push((trigger, content));
    }

    /// Evaluate all rules, returning the content of every rule that fires,
    /// in registration order.
    #[must_use]
    pub fn check(&self, turn: usize, tokens: usize) -> Vec<String> {
        self.rules
            .iter()
            .filter(|(trigger, _)| trigger.fires(turn, tokens))
            .map(|(_, content)| content.clone())
            .collect()
    }
}
