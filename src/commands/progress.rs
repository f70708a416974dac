//! Progress reporting with indicatif

use indicatif::{ProgressBar, ProgressStyle};
use parburn_serial::{Phase, Progress};

/// Progress reporter using indicatif progress bars
pub struct IndicatifProgress {
    current_bar: Option<ProgressBar>,
    phase: Option<Phase>,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self {
            current_bar: None,
            phase: None,
        }
    }

    fn create_bar(&mut self, total: u64, phase: Phase) {
        self.phase = Some(phase);
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                    phase
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        self.current_bar = Some(pb);
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for IndicatifProgress {
    fn start(&mut self, phase: Phase, total_bytes: usize) {
        self.create_bar(total_bytes as u64, phase);
    }

    fn advance(&mut self, bytes_done: usize) {
        if let Some(pb) = &self.current_bar {
            pb.set_position(bytes_done as u64);
        }
    }

    fn retry(&mut self, addr: u16, attempt: u32) {
        if let Some(pb) = &self.current_bar {
            pb.println(format!(
                "Block at 0x{:04X} rejected, resending (attempt {})",
                addr,
                attempt + 1
            ));
        }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            let message = match self.phase {
                Some(Phase::Writing) => "Write complete",
                Some(Phase::Reading) => "Read complete",
                Some(Phase::Verifying) => "Verify complete",
                None => "Done",
            };
            pb.finish_with_message(message);
        }
    }
}
