use crate::bridge::model::KioskView;
use anyhow::Context;
use log::info;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use streckcore::model::Presence;
use streckcore::KioskApp;
use tokio::task::JoinHandle;
use warp::{http::StatusCode, Filter};

/// JSON routes a renderer polls, plus the push endpoints for a remote service.
pub fn routes(
    app: Arc<KioskApp>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let app_filter = warp::any().map(move || Arc::clone(&app));

    let view = warp::path("view")
        .and(warp::path::end())
        .and(warp::get())
        .and(app_filter.clone())
        .map(|app: Arc<KioskApp>| warp::reply::json(&KioskView::capture(&app)));

    let session = warp::path("session")
        .and(warp::path::end())
        .and(warp::get())
        .and(app_filter.clone())
        .map(|app: Arc<KioskApp>| warp::reply::json(&app.session()));

    let dismiss_session = warp::path!("session" / "dismiss")
        .and(warp::post())
        .and(app_filter.clone())
        .map(|app: Arc<KioskApp>| {
            app.dismiss_user();
            warp::reply::json(&json!({"status": "ok"}))
        });

    let chart = warp::path("chart")
        .and(warp::path::end())
        .and(warp::get())
        .and(app_filter.clone())
        .map(|app: Arc<KioskApp>| warp::reply::json(&app.chart()));

    let leaderboard = warp::path("leaderboard")
        .and(warp::path::end())
        .and(warp::get())
        .and(app_filter.clone())
        .map(|app: Arc<KioskApp>| warp::reply::json(&app.leaderboard()));

    let toasts = warp::path("toasts")
        .and(warp::path::end())
        .and(warp::get())
        .and(app_filter.clone())
        .map(|app: Arc<KioskApp>| warp::reply::json(&app.toasts()));

    let dismiss_toast = warp::path!("toasts" / u64)
        .and(warp::delete())
        .and(app_filter.clone())
        .map(|id: u64, app: Arc<KioskApp>| {
            let dismissed = app.dismiss_toast(id);
            let status = if dismissed {
                StatusCode::OK
            } else {
                StatusCode::NOT_FOUND
            };
            warp::reply::with_status(warp::reply::json(&json!({ "dismissed": dismissed })), status)
        });

    let presence = warp::path("presence")
        .and(warp::path::end())
        .and(warp::get())
        .and(app_filter.clone())
        .map(|app: Arc<KioskApp>| warp::reply::json(&app.presence()));

    let metrics = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .and(app_filter.clone())
        .map(|app: Arc<KioskApp>| warp::reply::json(&app.metrics()));

    let notify_data = warp::path!("notify" / "data-changed")
        .and(warp::post())
        .and(app_filter.clone())
        .map(|app: Arc<KioskApp>| {
            let subscribers = app.bus().publish_data_changed();
            warp::reply::json(&json!({ "subscribers": subscribers }))
        });

    let notify_presence = warp::path!("notify" / "presence")
        .and(warp::post())
        .and(warp::body::json())
        .and(app_filter)
        .map(|presence: Option<Presence>, app: Arc<KioskApp>| {
            let subscribers = app.bus().publish_presence(presence);
            warp::reply::json(&json!({ "subscribers": subscribers }))
        });

    view.or(session)
        .or(dismiss_session)
        .or(chart)
        .or(leaderboard)
        .or(toasts)
        .or(dismiss_toast)
        .or(presence)
        .or(metrics)
        .or(notify_data)
        .or(notify_presence)
}

/// Serves [`routes`] on a background task until stopped.
pub struct KioskBridge {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl KioskBridge {
    /// Binds immediately so address errors surface here; port 0 picks a free port.
    pub fn start(app: Arc<KioskApp>, addr: SocketAddr) -> anyhow::Result<Self> {
        let (addr, server) = warp::serve(routes(app))
            .try_bind_ephemeral(addr)
            .with_context(|| format!("binding bridge to {}", addr))?;
        let task = tokio::spawn(server);
        info!("bridge listening on {}", addr);
        Ok(Self { addr, task })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn publish_status(&self, message: &str) {
        println!("[BRIDGE] {}", message);
    }

    pub async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
        info!("bridge on {} stopped", self.addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DemoBackend, DemoConfig};
    use serde_json::Value;
    use streckcore::model::ScannedCode;
    use streckcore::sync::EventBus;

    fn demo_app() -> Arc<KioskApp> {
        let bus = EventBus::new();
        let backend = Arc::new(DemoBackend::new(&DemoConfig::default(), bus.clone()));
        Arc::new(KioskApp::start(backend, bus, Default::default()))
    }

    fn body(response: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn session_route_follows_scans_and_dismiss() {
        let app = demo_app();
        let filter = routes(Arc::clone(&app));
        app.handle_scan(ScannedCode::new("2001")).await.unwrap();

        let res = warp::test::request().path("/session").reply(&filter).await;
        assert_eq!(res.status(), 200);
        assert_eq!(body(&res)["session"]["selected_user"]["user"]["name"], "Alva");

        let res = warp::test::request()
            .method("POST")
            .path("/session/dismiss")
            .reply(&filter)
            .await;
        assert_eq!(res.status(), 200);
        assert!(app.session().session.selected_user.is_none());
        app.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn view_route_bundles_every_output() {
        let app = demo_app();
        let filter = routes(Arc::clone(&app));
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let res = warp::test::request().path("/view").reply(&filter).await;
        let view = body(&res);
        assert!(view["chart"]["series"].is_array());
        assert!(view["leaderboard"].is_array());
        assert_eq!(view["metrics"]["refetches"], 1);
        assert!(view["presence"].is_null());
        app.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn presence_push_reaches_tracker() {
        let app = demo_app();
        let filter = routes(Arc::clone(&app));

        let res = warp::test::request()
            .method("POST")
            .path("/notify/presence")
            .json(&json!({"icon_url": "https://cdn.example/bot.png", "name": "JämK botten"}))
            .reply(&filter)
            .await;
        assert_eq!(body(&res)["subscribers"], 1);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let res = warp::test::request().path("/presence").reply(&filter).await;
        assert_eq!(body(&res)["name"], "JämK botten");

        warp::test::request()
            .method("POST")
            .path("/notify/presence")
            .json(&Value::Null)
            .reply(&filter)
            .await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(app.presence().is_none());
        app.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn toasts_can_be_dismissed_by_id() {
        let app = demo_app();
        let filter = routes(Arc::clone(&app));
        app.handle_scan(ScannedCode::new("1001")).await.unwrap();
        app.handle_scan(ScannedCode::new("2001")).await.unwrap();
        app.handle_scan(ScannedCode::new("1001")).await.unwrap();

        let res = warp::test::request().path("/toasts").reply(&filter).await;
        let toasts = body(&res);
        assert_eq!(toasts[0]["message"], "Streckade Cola för Alva");
        let id = toasts[0]["id"].as_u64().unwrap();

        let res = warp::test::request()
            .method("DELETE")
            .path(&format!("/toasts/{}", id))
            .reply(&filter)
            .await;
        assert_eq!(res.status(), 200);
        let res = warp::test::request()
            .method("DELETE")
            .path(&format!("/toasts/{}", id))
            .reply(&filter)
            .await;
        assert_eq!(res.status(), 404);
        assert!(app.toasts().is_empty());
        app.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn data_changed_push_triggers_refetch() {
        let app = demo_app();
        let filter = routes(Arc::clone(&app));
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let res = warp::test::request()
            .method("POST")
            .path("/notify/data-changed")
            .reply(&filter)
            .await;
        assert_eq!(body(&res)["subscribers"], 1);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let res = warp::test::request().path("/metrics").reply(&filter).await;
        assert_eq!(body(&res)["refetches"], 2);
        app.shutdown().await;
    }
}
