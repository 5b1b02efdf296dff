use crate::bridge::model::KioskView;
use anyhow::Context;
use log::debug;
use std::sync::Arc;
use streckcore::input::KeyEvent;
use streckcore::session::{CheckoutOutcome, ScanOutcome};
use streckcore::KioskApp;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub codes: usize,
    pub failures: usize,
}

/// Replays keystrokes into the kiosk, one input line per scan.
#[derive(Clone)]
pub struct Runner {
    app: Arc<KioskApp>,
}

impl Runner {
    pub fn new(app: Arc<KioskApp>) -> Self {
        Self { app }
    }

    /// Reads until EOF. Each line is typed character by character and then
    /// terminated, the way a keyboard-wedge scanner delivers a code.
    pub async fn run<R: AsyncBufRead + Unpin>(&self, input: R) -> anyhow::Result<RunSummary> {
        let mut lines = input.lines();
        let mut summary = RunSummary::default();
        while let Some(line) = lines.next_line().await.context("reading scanner input")? {
            let keys = line
                .chars()
                .map(KeyEvent::Char)
                .chain(std::iter::once(KeyEvent::Enter));
            for key in keys {
                let Some(result) = self.app.press(key).await else {
                    continue;
                };
                summary.codes += 1;
                match result {
                    Ok(outcome) => println!("[KIOSK] {}", describe(outcome)),
                    Err(err) => {
                        summary.failures += 1;
                        println!("[KIOSK] {}", err);
                    }
                }
                println!("[KIOSK] {}", KioskView::capture(&self.app).status_line());
            }
        }
        debug!("scanner input closed after {} codes", summary.codes);
        Ok(summary)
    }
}

fn describe(outcome: ScanOutcome) -> &'static str {
    match outcome {
        ScanOutcome::UserSelected => "user selected",
        ScanOutcome::ProductSelected => "product selected",
        ScanOutcome::CheckedOut(CheckoutOutcome::Applied) => "streck registered",
        ScanOutcome::CheckedOut(CheckoutOutcome::Discarded) => "streck reply discarded",
    }
}
