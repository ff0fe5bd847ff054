//! Run tally
//!
//! Completed/failed counters for one invocation of the runner, plus the
//! wording of the progress banner and the final summary.

use super::job::JobOutcome;

/// Counters for one invocation of the runner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    pub completed: usize,
    pub failed: usize,
}

impl RunTally {
    /// Counts one job outcome
    pub fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Completed => self.completed += 1,
            JobOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn attempted(&self) -> usize {
        self.completed + self.failed
    }

    /// Lines of the summary block, without the surrounding rules
    ///
    /// The completed line is always present; the failure line only when
    /// at least one job failed.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} completed {}",
            self.completed,
            pluralize(self.completed, "job")
        )];
        if self.failed > 0 {
            lines.push(format!(
                "{} {}",
                self.failed,
                pluralize(self.failed, "failure")
            ));
        }
        lines
    }
}

/// Banner printed before the first job starts
pub fn jobs_banner(count: usize) -> String {
    format!("Running {} {}", count, pluralize(count, "job"))
}

fn pluralize(count: usize, word: &str) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcomes() {
        let mut tally = RunTally::default();
        tally.record(&JobOutcome::Completed);
        tally.record(&JobOutcome::failed("oops"));
        tally.record(&JobOutcome::Completed);

        assert_eq!(tally.completed, 2);
        assert_eq!(tally.failed, 1);
        assert_eq!(tally.attempted(), 3);
    }

    #[test]
    fn test_summary_without_failures() {
        let tally = RunTally {
            completed: 1,
            failed: 0,
        };
        assert_eq!(tally.summary_lines(), vec!["1 completed job".to_string()]);
    }

    #[test]
    fn test_summary_pluralisation() {
        let tally = RunTally {
            completed: 0,
            failed: 1,
        };
        assert_eq!(
            tally.summary_lines(),
            vec!["0 completed jobs".to_string(), "1 failure".to_string()]
        );

        let tally = RunTally {
            completed: 3,
            failed: 2,
        };
        assert_eq!(
            tally.summary_lines(),
            vec!["3 completed jobs".to_string(), "2 failures".to_string()]
        );
    }

    #[test]
    fn test_jobs_banner() {
        assert_eq!(jobs_banner(1), "Running 1 job");
        assert_eq!(jobs_banner(4), "Running 4 jobs");
    }
}
