use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use serde_json::{json, Value};

use uhi_sync::{
    ImpactMetrics, Intervention, InterventionType, Location, NetworkError, RemoteDataClient,
    Session, SimulationController, SimulationError, Transport, UhiError,
};

/// Records POST bodies and answers after an optional gate opens.
struct GatedTransport {
    posts: Mutex<Vec<Value>>,
    calls: AtomicUsize,
    reply: Result<Value, NetworkError>,
    entered: Option<Sender<()>>,
    release: Option<Receiver<()>>,
}

impl GatedTransport {
    fn immediate(reply: Result<Value, NetworkError>) -> Arc<Self> {
        Arc::new(Self {
            posts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            reply,
            entered: None,
            release: None,
        })
    }

    fn gated(reply: Result<Value, NetworkError>) -> (Arc<Self>, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = bounded(1);
        let (release_tx, release_rx) = bounded(1);
        let transport = Arc::new(Self {
            posts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            reply,
            entered: Some(entered_tx),
            release: Some(release_rx),
        });
        (transport, entered_rx, release_tx)
    }
}

impl Transport for GatedTransport {
    fn get(&self, _path: &str, _query: &[(&'static str, String)]) -> Result<Value, NetworkError> {
        Err(NetworkError::protocol("no GET in this test"))
    }

    fn post(&self, _path: &str, body: &Value) -> Result<Value, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.posts.lock().unwrap().push(body.clone());
        if let Some(entered) = &self.entered {
            entered.send(()).unwrap();
        }
        if let Some(release) = &self.release {
            release.recv_timeout(Duration::from_secs(5)).unwrap();
        }
        self.reply.clone()
    }

    fn base_url(&self) -> &str {
        "http://sim.test"
    }
}

fn full_response() -> Value {
    json!({
        "average_temperature": 34.2,
        "temperature_reduction": 0.8,
        "energy_saving": 12.3,
        "co2_reduction": 450.0,
        "health_score": 7.5,
        "intervention_count": 3
    })
}

#[test]
fn one_request_per_simulation_with_defaults_applied() {
    let transport = GatedTransport::immediate(Ok(full_response()));
    let controller = SimulationController::new(RemoteDataClient::new(transport.clone()));
    let session = Session::new(38.5);

    session
        .interventions()
        .add(Intervention::place(InterventionType::Trees, 18.5, 73.8));
    session
        .interventions()
        .add(Intervention::new(InterventionType::CoolRoof, Location::new(18.6, 73.9)));
    session.interventions().add(
        Intervention::new(InterventionType::Park, Location::new(18.7, 73.7))
            .with_area(1200.0)
            .with_base_temperature(40.1),
    );

    let outcome = controller.run_simulation(&session).unwrap();
    assert_eq!(outcome.items, 3);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

    let posts = transport.posts.lock().unwrap();
    let items = posts[0]["interventions"].as_array().unwrap();
    assert_eq!(items.len(), 3);

    assert_eq!(items[0]["type"], "trees");
    assert_eq!(items[0]["count"], 20);
    assert_eq!(items[0]["base_temperature"], 35.0);

    // Bare intervention: every default kicks in.
    assert_eq!(items[1]["type"], "cool_roof");
    assert_eq!(items[1]["count"], 0);
    assert_eq!(items[1]["area"], 0.0);
    assert_eq!(items[1]["base_temperature"], 38.5);
    assert_eq!(items[1]["location"], json!([18.6, 73.9]));

    assert_eq!(items[2]["area"], 1200.0);
    assert_eq!(items[2]["base_temperature"], 40.1);
}

#[test]
fn empty_store_sends_nothing() {
    let transport = GatedTransport::immediate(Ok(full_response()));
    let controller = SimulationController::new(RemoteDataClient::new(transport.clone()));
    let session = Session::new(38.5);

    let err = controller.run_simulation(&session).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    assert_eq!(session.metrics().current, ImpactMetrics::baseline(38.5));
}

#[test]
fn previous_is_a_copy_of_the_prior_current() {
    let transport = GatedTransport::immediate(Ok(full_response()));
    let controller = SimulationController::new(RemoteDataClient::new(transport));
    let session = Session::new(35.0);
    session
        .interventions()
        .add(Intervention::place(InterventionType::GreenRoof, 18.5, 73.8));

    let before = session.metrics().current;
    controller.run_simulation(&session).unwrap();

    let view = session.metrics();
    assert_eq!(view.previous, Some(before));
    assert_eq!(view.current.average_temperature, 34.2);
    assert_eq!(view.deltas().temperature, "-0.8°C vs last simulation");
    assert!(view.simulated);
}

#[test]
fn partial_response_falls_back_per_field() {
    let transport = GatedTransport::immediate(Ok(json!({
        "temperature_reduction": "n/a",
        "energy_saving": 4.0,
        "health_score": null
    })));
    let controller = SimulationController::new(RemoteDataClient::new(transport));
    let session = Session::new(37.0);
    session
        .interventions()
        .add(Intervention::place(InterventionType::Trees, 18.5, 73.8));

    let outcome = controller.run_simulation(&session).unwrap();
    assert_eq!(
        outcome.metrics,
        ImpactMetrics {
            average_temperature: 37.0,
            temperature_reduction: 0.0,
            energy_saving: 4.0,
            co2_reduction: 0.0,
            health_score: 7.2,
        }
    );
}

#[test]
fn concurrent_second_call_is_rejected_synchronously() {
    let (transport, entered, release) = GatedTransport::gated(Ok(full_response()));
    let controller = SimulationController::new(RemoteDataClient::new(transport.clone()));
    let session = Arc::new(Session::new(38.5));
    session
        .interventions()
        .add(Intervention::place(InterventionType::Trees, 18.5, 73.8));

    let handle = controller.run_simulation_async(Arc::clone(&session)).unwrap();
    entered.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(controller.is_running());

    let err = controller.run_simulation(&session).unwrap_err();
    assert_eq!(err, UhiError::Simulation(SimulationError::AlreadyRunning));
    let err = controller.run_simulation_async(Arc::clone(&session)).unwrap_err();
    assert_eq!(err, UhiError::Simulation(SimulationError::AlreadyRunning));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

    release.send(()).unwrap();
    let outcome = handle.join_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(outcome.metrics.average_temperature, 34.2);
    assert!(!controller.is_running());

    // Latch released: the next call goes through.
    release.send(()).unwrap();
    controller.run_simulation(&session).unwrap();
    assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn latch_released_after_failure() {
    let transport = GatedTransport::immediate(Err(NetworkError::status(500, "boom")));
    let controller = SimulationController::new(RemoteDataClient::new(transport.clone()));
    let session = Session::new(38.5);
    session
        .interventions()
        .add(Intervention::place(InterventionType::Park, 18.5, 73.8));

    for _ in 0..2 {
        let err = controller.run_simulation(&session).unwrap_err();
        let UhiError::Simulation(SimulationError::Request(cause)) = &err else {
            panic!("expected request failure, got {err:?}");
        };
        assert_eq!(cause.status, Some(500));
        assert!(!controller.is_running());
    }
    assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    assert!(!session.has_simulated());
}

#[test]
fn simulation_uses_baseline_adopted_later() {
    let transport = GatedTransport::immediate(Ok(json!({})));
    let controller = SimulationController::new(RemoteDataClient::new(transport.clone()));
    let session = Session::new(38.5);
    session.seed_baseline(36.4, true);
    session
        .interventions()
        .add(Intervention::new(InterventionType::Trees, Location::new(18.5, 73.8)));

    let outcome = controller.run_simulation(&session).unwrap();
    assert_eq!(outcome.metrics.average_temperature, 36.4);

    let posts = transport.posts.lock().unwrap();
    assert_eq!(posts[0]["interventions"][0]["base_temperature"], 36.4);
}
