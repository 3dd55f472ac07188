//! Terminal progress for plan and review runs

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Mutex, PoisonError};
use stepwise_application::OrchestrationProgress;
use stepwise_domain::{Plan, ReviewCycle, Step, StepStatus};

/// Progress bar over the steps of a plan, plus one line per verification
/// and review cycle.
pub struct ProgressReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn plan_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    /// Print above the bar, or straight to stderr when there is none.
    fn line(&self, text: String) {
        match self.bar.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            Some(bar) => bar.println(text),
            None => eprintln!("{}", text),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestrationProgress for ProgressReporter {
    fn on_plan_created(&self, plan: &Plan) {
        let bar = ProgressBar::new(plan.steps().len() as u64);
        bar.set_style(Self::plan_style());
        bar.set_prefix("Plan");
        bar.set_message("starting...");
        for step in plan.steps() {
            let tag = step
                .executor_tag
                .as_deref()
                .map(|t| format!(" [{}]", t))
                .unwrap_or_default();
            bar.println(format!("  {} {}{}", step.id.dimmed(), step.description, tag.cyan()));
        }
        *self.bar.lock().unwrap_or_else(PoisonError::into_inner) = Some(bar);
    }

    fn on_step_start(&self, step: &Step, attempt: usize) {
        if let Some(bar) = self.bar.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            bar.set_message(format!("{} (attempt {})", step.id, attempt));
        }
    }

    fn on_step_verified(&self, step: &Step, passed: bool, feedback: &str) {
        if passed {
            self.line(format!("  {} {} verified", "v".green(), step.id));
        } else {
            let first = feedback.lines().next().unwrap_or_default();
            self.line(format!("  {} {} rejected: {}", "x".red(), step.id, first));
        }
    }

    fn on_step_finished(&self, step: &Step) {
        let guard = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bar) = guard.as_ref() {
            bar.inc(1);
            if step.status() == StepStatus::Failed {
                bar.println(format!("  {} {} failed", "x".red().bold(), step.id));
            }
            if bar.position() >= bar.length().unwrap_or(0) {
                bar.finish_with_message("done".green().to_string());
            }
        }
    }

    fn on_branch_finished(&self, branch: &str, success: bool) {
        let mark = if success { "v".green() } else { "x".red() };
        self.line(format!("  {} branch {}", mark, branch));
    }

    fn on_review_cycle(&self, cycle: &ReviewCycle) {
        let grade = if cycle.passed() {
            cycle.grade.as_str().green()
        } else {
            cycle.grade.as_str().red()
        };
        self.line(format!(
            "{} review cycle {}: {}",
            "->".cyan(),
            cycle.iteration + 1,
            grade
        ));
    }
}
