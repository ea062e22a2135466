use crate::model::Expected;
use chrono::{DateTime, Local};
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets, Attribute, Cell, Color, Table};
use std::ops::AddAssign;

/// Per-step result counts produced by the executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub successes: usize,
    pub failures: usize,
    pub timeouts: usize,
}

impl AddAssign for Tally {
    fn add_assign(&mut self, other: Self) {
        self.successes += other.successes;
        self.failures += other.failures;
        self.timeouts += other.timeouts;
    }
}

#[derive(Debug, Clone)]
pub struct Summary {
    pub start: DateTime<Local>,
    pub end: Option<DateTime<Local>>,
    pub tally: Tally,
    pub tests_to_run: usize,
    pub tests_ran: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Met,
    NotMet,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Met => 0,
            Outcome::NotMet => 1,
        }
    }
}

impl Summary {
    pub fn start(tests_to_run: usize) -> Self {
        Self {
            start: Local::now(),
            end: None,
            tally: Tally::default(),
            tests_to_run,
            tests_ran: 0,
        }
    }

    pub fn absorb(&mut self, tally: Tally) {
        self.tally += tally;
    }

    pub fn finish(&mut self) {
        self.end = Some(Local::now());
    }

    /// All three counters must match exactly.
    pub fn evaluate(&self, expected: &Expected) -> Outcome {
        let met = self.tally.successes == expected.successes
            && self.tally.failures == expected.failures
            && self.tally.timeouts == expected.timeouts;
        if met {
            Outcome::Met
        } else {
            Outcome::NotMet
        }
    }

    pub fn report(&self, expected: &Expected) -> String {
        let header = |title: &str| {
            Cell::new(title)
                .add_attribute(Attribute::Bold)
                .fg(Color::Cyan)
        };
        let count = |actual: usize, wanted: usize| {
            let cell = Cell::new(actual);
            if actual == wanted {
                cell.fg(Color::Green)
            } else {
                cell.fg(Color::Red)
            }
        };

        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![header("Result"), header("Count"), header("Expected")]);
        table.add_row(vec![
            Cell::new("Successes"),
            count(self.tally.successes, expected.successes),
            Cell::new(expected.successes),
        ]);
        table.add_row(vec![
            Cell::new("Failures"),
            count(self.tally.failures, expected.failures),
            Cell::new(expected.failures),
        ]);
        table.add_row(vec![
            Cell::new("Timeouts"),
            count(self.tally.timeouts, expected.timeouts),
            Cell::new(expected.timeouts),
        ]);

        let ended = self
            .end
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let verdict = match self.evaluate(expected) {
            Outcome::Met => "Expectations were met".green().bold(),
            Outcome::NotMet => "Expectations were not met".red().bold(),
        };

        format!(
            "{}\nStarted: {}\nEnded:   {}\nRuns:    {}/{}\n{}\n{}",
            "Test Summary".bold(),
            self.start.format("%Y-%m-%d %H:%M:%S"),
            ended,
            self.tests_ran,
            self.tests_to_run,
            table,
            verdict
        )
    }
}
