use foldsketch::engine::progress::{Progress, ProgressCallback};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Renders engine progress events on stderr with indicatif. The engine calls
/// the callback from worker threads, so the bar handle sits behind a mutex.
pub struct DesignUi {
    bars: MultiProgress,
    runs: Mutex<Option<ProgressBar>>,
}

impl DesignUi {
    pub fn new() -> Self {
        Self {
            bars: MultiProgress::new(),
            runs: Mutex::new(None),
        }
    }

    pub fn callback(&self) -> ProgressCallback<'_> {
        Box::new(move |event| self.handle(event))
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }

    fn handle(&self, event: Progress) {
        let Ok(mut runs) = self.runs.lock() else {
            return;
        };
        match event {
            Progress::RunStart { total_runs } => {
                let bar = self.bars.add(ProgressBar::new(total_runs));
                bar.set_style(Self::bar_style());
                *runs = Some(bar);
            }
            Progress::RunIncrement => {
                if let Some(bar) = runs.as_ref() {
                    bar.inc(1);
                }
            }
            Progress::RunFinish => {
                if let Some(bar) = runs.take() {
                    bar.finish_and_clear();
                }
            }
            Progress::Status {
                samples,
                non_improving,
                step_size,
                scores,
                solutions,
            } => {
                if let Some(bar) = runs.as_ref() {
                    let scores = scores
                        .iter()
                        .map(|s| format!("{:5.2}", s))
                        .collect::<Vec<_>>()
                        .join("; ");
                    bar.set_message(format!(
                        "mutate {:7} | count {:5} | steps {:3} | scores {} | nos {:.3e}",
                        samples, non_improving, step_size, scores, solutions
                    ));
                }
            }
            Progress::Message(msg) => {
                self.bars.println(msg).ok();
            }
        }
    }
}

impl Default for DesignUi {
    fn default() -> Self {
        Self::new()
    }
}
