use std::fmt;

/// Stages of a forcefield application run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    RegroupResidues,
    BuildTopology,
    AssignTypes,
    AssignParameters,
    WriteReferences,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Self::RegroupResidues => "Regrouping residues",
            Self::BuildTopology => "Building topology",
            Self::AssignTypes => "Assigning atom types",
            Self::AssignParameters => "Assigning parameters",
            Self::WriteReferences => "Writing references",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { phase: Phase },
    PhaseFinish,

    /// A countable unit of work inside the current phase (atoms or residue templates).
    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    /// Runs `work` between `PhaseStart` and `PhaseFinish` events.
    ///
    /// `PhaseFinish` is reported even when `work` fails so that renderers can close
    /// their indicators.
    pub fn phase<T>(&self, phase: Phase, work: impl FnOnce() -> T) -> T {
        self.report(Progress::PhaseStart { phase });
        let result = work();
        self.report(Progress::PhaseFinish);
        result
    }
}
