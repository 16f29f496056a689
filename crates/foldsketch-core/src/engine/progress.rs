#[derive(Debug, Clone)]
pub enum Progress {
    RunStart { total_runs: u64 },
    RunIncrement,
    RunFinish,

    /// Periodic snapshot of the search loop state.
    Status {
        samples: u64,
        non_improving: u64,
        step_size: usize,
        scores: Vec<f64>,
        solutions: f64,
    },

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
}
