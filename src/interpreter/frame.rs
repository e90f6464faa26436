use super::{Env, EvalError, Expression, Result, parse_script};

/// Outcome of evaluating a script for one frame.
#[derive(Debug)]
pub struct FrameReport {
    /// Frame number, starting at zero.
    pub frame: u64,
    /// Per-form results, in script order.
    pub results: Vec<std::result::Result<Expression, EvalError>>,
}

impl FrameReport {
    /// Number of forms that failed this frame.
    pub fn error_count(&self) -> usize {
        self.results.iter().filter(|result| result.is_err()).count()
    }
}

/// Re-evaluates a page script once per rendered frame.
///
/// A failing form is reported for that frame only; the remaining forms still
/// run and the next frame starts afresh.
pub struct FrameLoop {
    forms: Vec<Expression>,
    frame: u64,
}

impl FrameLoop {
    /// Parse `source` into a frame loop.
    pub fn new(source: &str) -> Result<Self> {
        Ok(Self::from_forms(parse_script(source)?))
    }

    /// Build a loop from already parsed forms.
    pub fn from_forms(forms: Vec<Expression>) -> Self {
        Self { forms, frame: 0 }
    }

    /// Number of frames evaluated so far.
    pub fn frames_run(&self) -> u64 {
        self.frame
    }

    /// Evaluate every form once against `env`.
    pub fn step(&mut self, env: &Env) -> FrameReport {
        let frame = self.frame;
        self.frame += 1;

        let results: Vec<_> = self.forms.iter().map(|form| env.eval(form)).collect();
        for (index, result) in results.iter().enumerate() {
            if let Err(err) = result {
                tracing::warn!(frame, form = index, error = %err, "script form failed");
            }
        }
        tracing::debug!(frame, forms = results.len(), "frame evaluated");

        FrameReport { frame, results }
    }
}
