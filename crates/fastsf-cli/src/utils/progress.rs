use fastsf::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 100;

/// Renders engine progress events on stderr for the root rank.
#[derive(Clone)]
pub struct SweepProgressBar {
    bar: Arc<Mutex<ProgressBar>>,
    phase: Arc<Mutex<&'static str>>,
}

impl SweepProgressBar {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr())
            .with_style(Self::spinner_style())
            .with_message("Starting");
        bar.finish_and_clear();

        Self {
            bar: Arc::new(Mutex::new(bar)),
            phase: Arc::new(Mutex::new("")),
        }
    }

    pub fn callback(&self) -> ProgressCallback<'static> {
        let bar = self.bar.clone();
        let phase = self.phase.clone();

        Box::new(move |progress: Progress| {
            let (Ok(bar), Ok(mut phase)) = (bar.lock(), phase.lock()) else {
                warn!("Progress display lock was poisoned; dropping progress event.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    *phase = name;
                    bar.reset();
                    bar.set_length(0);
                    bar.set_style(Self::spinner_style());
                    bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    bar.set_message(name);
                }
                Progress::PhaseFinish => {
                    bar.disable_steady_tick();
                    bar.finish_with_message(format!("{} done", *phase));
                }
                Progress::TaskStart { total_steps } => {
                    bar.disable_steady_tick();
                    bar.reset();
                    bar.set_length(total_steps);
                    bar.set_position(0);
                    bar.set_style(Self::bar_style());
                    bar.set_message(*phase);
                }
                Progress::TaskIncrement => bar.inc(1),
                Progress::TaskFinish => {
                    let total = bar.length().unwrap_or(0);
                    if bar.position() < total {
                        bar.set_position(total);
                    }
                    bar.finish();
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .expect("Failed to create spinner style template")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<12} [{bar:40.cyan/blue}] {pos}/{len} lags ({eta})")
            .expect("Failed to create bar style template")
            .with_key(
                "eta",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
                },
            )
            .progress_chars("=>-")
    }
}

impl Default for SweepProgressBar {
    fn default() -> Self {
        Self::new()
    }
}
