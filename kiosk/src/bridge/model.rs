use serde::Serialize;
use streckcore::chart::ChartView;
use streckcore::model::{LeaderboardEntry, Presence};
use streckcore::notify::Toast;
use streckcore::session::SessionView;
use streckcore::telemetry::MetricsSnapshot;
use streckcore::KioskApp;

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct KioskView {
    pub session: SessionView,
    pub chart: ChartView,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub toasts: Vec<Toast>,
    pub presence: Option<Presence>,
    pub metrics: MetricsSnapshot,
}

impl KioskView {
    pub fn capture(app: &KioskApp) -> Self {
        Self {
            session: app.session(),
            chart: app.chart(),
            leaderboard: app.leaderboard(),
            toasts: app.toasts(),
            presence: app.presence(),
            metrics: app.metrics(),
        }
    }

    /// One-line status for the terminal.
    pub fn status_line(&self) -> String {
        let user = self
            .session
            .session
            .selected_user
            .as_ref()
            .map(|u| format!("{} ({:.2} kr)", u.user.name, u.balance.remaining_credits))
            .unwrap_or_else(|| "-".into());
        let product = self
            .session
            .session
            .selected_product
            .as_ref()
            .map(|p| format!("{} [{} i lager]", p.product.name, p.product.total_stock))
            .unwrap_or_else(|| "-".into());
        let mut line = format!(
            "user {} | product {} | {}s left | {} series",
            user,
            product,
            self.session.seconds_left,
            self.chart.series.len()
        );
        if let Some(error) = &self.session.error {
            line.push_str(&format!(" | error: {}", error));
        }
        line
    }
}
