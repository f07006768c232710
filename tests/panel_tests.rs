use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use actix_web::dev::ServerHandle;
use actix_web::{App, HttpResponse, HttpServer, web};
use netrelay::client::{Command, RelayClient};
use netrelay::panel::{ControlPanel, PanelCommand, PanelState};
use netrelay::{AppConfig, AppState, MockOutputSink, RelayController, api_scope};

fn sample_config() -> AppConfig {
    AppConfig::from_yaml(
        r#"
api: {host: "127.0.0.1", port: 0}
relays:
    pins: {1: 31, 2: 33, 3: 35, 4: 37}
logging: {level: "DEBUG", file: null}
system: {version: "2.1.0", version_file: "/nonexistent/version.txt"}
"#,
    )
    .expect("valid sample config")
}

struct TestServer {
    state: AppState,
    port: u16,
    handle: ServerHandle,
}

impl TestServer {
    fn stop(&self) {
        actix_web::rt::System::new().block_on(self.handle.stop(false));
    }
}

async fn garbled_version() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/json")
        .body("{\"version\": ")
}

/// Serves the API on an ephemeral port from its own thread.
fn spawn_server_with(garble_version: bool) -> TestServer {
    let cfg = sample_config();
    let controller =
        RelayController::new(cfg.relays.pins.clone(), Box::new(MockOutputSink::default()))
            .unwrap();
    let state = AppState::new(Arc::new(controller), Arc::new(cfg));
    let server_state = state.clone();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        actix_web::rt::System::new().block_on(async move {
            let server = HttpServer::new(move || {
                let mut app = App::new().app_data(web::Data::new(server_state.clone()));
                if garble_version {
                    // registered ahead of the api scope so it wins the match
                    app = app.service(
                        web::resource("/system/version").route(web::get().to(garbled_version)),
                    );
                }
                app.service(api_scope())
            })
            .workers(1)
            .disable_signals()
            .bind(("127.0.0.1", 0))
            .unwrap();
            let port = server.addrs()[0].port();
            let server = server.run();
            tx.send((port, server.handle())).unwrap();
            server.await
        })
    });

    let (port, handle) = rx.recv().unwrap();
    TestServer {
        state,
        port,
        handle,
    }
}

fn spawn_server() -> (AppState, u16) {
    let server = spawn_server_with(false);
    (server.state, server.port)
}

fn quiet_panel(port: u16) -> ControlPanel {
    let client = RelayClient::new("127.0.0.1", port).unwrap();
    ControlPanel::new(client, 4, Arc::new(|_: &PanelState| {}))
}

#[test]
fn client_talks_to_live_server() {
    let (_, port) = spawn_server();
    let client = RelayClient::new("127.0.0.1", port).unwrap();

    assert!(client.health());
    assert_eq!(client.version().unwrap().unwrap().version, "2.1.0");
    assert!(client.switch(3, Command::On).unwrap());
    assert!(!client.switch(42, Command::On).unwrap());
    assert!(client.switch_all(Command::Off).unwrap());

    let status = client.status().unwrap().unwrap();
    assert_eq!(status.relays.len(), 4);
    assert!(status.relays.iter().all(|r| !r.state.is_on()));
}

#[test]
fn startup_connects_and_mirrors_status() {
    let (state, port) = spawn_server();
    state.controller.turn_on(4).unwrap();

    let panel = quiet_panel(port);
    panel.start().join().unwrap();
    let view = panel.snapshot();

    assert!(view.connected);
    assert_eq!(view.status_line, "Status: Connected ✓");
    assert_eq!(view.header, "Network Relay Controller - v2.1.0");
    assert!(view.indicator(4).unwrap().on);
    assert!(!view.indicator(1).unwrap().on);
}

#[test]
fn toggle_uses_cached_state() {
    let (state, port) = spawn_server();
    let panel = quiet_panel(port);

    assert!(panel.execute(PanelCommand::Toggle(2)));
    assert!(state.controller.is_on(2).unwrap());
    assert!(panel.snapshot().indicator(2).unwrap().on);

    // the panel does not see this change, so the next toggle sends "off" again
    state.controller.turn_off(2).unwrap();
    panel.toggle(2);
    assert!(!state.controller.is_on(2).unwrap());
    assert!(!panel.snapshot().indicator(2).unwrap().on);
}

#[test]
fn rejected_toggle_reports_failure() {
    let (_, port) = spawn_server();
    let client = RelayClient::new("127.0.0.1", port).unwrap();
    let panel = ControlPanel::new(client, 6, Arc::new(|_: &PanelState| {}));

    panel.toggle(6);
    assert_eq!(panel.snapshot().status_line, "Status: Failed to on relay 6");
}

#[test]
fn all_on_refreshes_indicators() {
    let (_, port) = spawn_server();
    let panel = quiet_panel(port);

    panel.all_on();
    let view = panel.snapshot();
    assert!(view.indicators().all(|i| i.on));
    assert_eq!(view.status_line, "Status: Updated successfully");

    assert!(panel.execute(PanelCommand::AllOff));
    assert!(panel.snapshot().indicators().all(|i| !i.on));
    assert!(!panel.execute(PanelCommand::Quit));
}

#[test]
fn unreachable_server_marks_panel_disconnected() {
    let panel = quiet_panel(9);

    panel.start().join().unwrap();
    assert_eq!(panel.snapshot().status_line, "Status: Connection Failed");

    panel.refresh();
    let view = panel.snapshot();
    assert!(view.status_line.starts_with("Error: "));
    assert!(!view.connected);

    panel.toggle(1);
    assert!(panel.snapshot().status_line.starts_with("Error: "));
    panel.all_on();
    assert!(panel.snapshot().status_line.starts_with("Error: "));
    assert!(!panel.snapshot().connected);
}

#[test]
fn lost_server_during_actions_disconnects_panel() {
    let server = spawn_server_with(false);
    let panel = quiet_panel(server.port);
    panel.start().join().unwrap();
    assert!(panel.snapshot().connected);

    server.stop();

    panel.toggle(1);
    let view = panel.snapshot();
    assert!(view.status_line.starts_with("Error: "), "{}", view.status_line);
    assert!(!view.connected);

    for action in [PanelCommand::AllOn, PanelCommand::AllOff] {
        assert!(panel.execute(action));
        let view = panel.snapshot();
        assert!(view.status_line.starts_with("Error: "), "{}", view.status_line);
        assert!(!view.connected);
    }
}

#[test]
fn version_failure_does_not_stop_startup() {
    let server = spawn_server_with(true);
    server.state.controller.turn_on(3).unwrap();

    let lines = Arc::new(Mutex::new(Vec::new()));
    let seen = lines.clone();
    let client = RelayClient::new("127.0.0.1", server.port).unwrap();
    let panel = ControlPanel::new(
        client,
        4,
        Arc::new(move |state: &PanelState| {
            seen.lock().unwrap().push(state.status_line.clone());
        }),
    );
    panel.start().join().unwrap();

    let lines = lines.lock().unwrap();
    let failed = lines
        .iter()
        .position(|l| l.starts_with("Error: Version check failed: "))
        .expect("version failure reported");
    let updated = lines
        .iter()
        .position(|l| l == "Status: Updated successfully")
        .expect("status fetched after version failure");
    assert!(failed < updated);

    let view = panel.snapshot();
    assert_eq!(view.header, "Network Relay Controller");
    assert!(view.indicator(3).unwrap().on);
}
