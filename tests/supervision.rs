use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use cellnet::{
    Behavior, Config, Context, DEFAULT_PAYLOAD, Environment, Error, Event, Fault, Payload, Result,
};

#[derive(Default)]
struct Probes {
    recovered: AtomicUsize,
    panics: AtomicUsize,
    terminated: AtomicUsize,
}

/// Fails on "fail", panics on "panic", counts everything else.
struct Faulty {
    probes: Arc<Probes>,
    processed: u64,
    give_up: bool,
}

impl Faulty {
    fn new(probes: &Arc<Probes>) -> Self {
        Self {
            probes: probes.clone(),
            processed: 0,
            give_up: false,
        }
    }
}

impl Behavior for Faulty {
    async fn process_event(&mut self, event: &Event) -> Result<()> {
        match event.topic() {
            "fail" => Err(Error::external("failed on purpose")),
            "panic" => panic!("boom"),
            "processed?" => event.respond(Ok(Payload::new(self.processed))),
            _ => {
                self.processed += 1;
                Ok(())
            }
        }
    }

    async fn recover(&mut self, fault: &Fault) -> Result<()> {
        self.probes.recovered.fetch_add(1, Ordering::SeqCst);
        if fault.is_panic() {
            self.probes.panics.fetch_add(1, Ordering::SeqCst);
        }
        if self.give_up {
            return Err(Error::external("giving up"));
        }
        Ok(())
    }

    async fn terminate(&mut self) -> Result<()> {
        self.probes.terminated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

async fn processed(env: &Environment, id: &str) -> Result<u64> {
    env.request(id, "processed?", (), None, Duration::from_secs(1))
        .await?
        .decode(DEFAULT_PAYLOAD)
}

/// Polls until the cell rejects or drops requests.
async fn wait_until_stopped(env: &Environment, id: &str) {
    for _ in 0..100 {
        match processed(env, id).await {
            Err(e) if e.is_stopping() || e.is_timeout() => return,
            _ => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    }
    panic!("cell '{id}' is still processing");
}

#[tokio::test]
async fn test_faults_below_limit_are_recovered() {
    let probes = Arc::new(Probes::default());
    let env = Environment::new(Config::default().with_max_faults(3, Duration::from_secs(60)));
    env.start_cell("faulty", Faulty::new(&probes)).await.unwrap();

    env.emit_new("faulty", "work", (), None).await.unwrap();
    env.emit_new("faulty", "fail", (), None).await.unwrap();
    env.emit_new("faulty", "panic", (), None).await.unwrap();
    env.emit_new("faulty", "work", (), None).await.unwrap();

    // State survived both faults.
    assert_eq!(processed(&env, "faulty").await.unwrap(), 2);
    assert_eq!(probes.recovered.load(Ordering::SeqCst), 2);
    assert_eq!(probes.panics.load(Ordering::SeqCst), 1);
    assert_eq!(probes.terminated.load(Ordering::SeqCst), 0);

    env.stop().await.unwrap();
    assert_eq!(probes.terminated.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_too_many_faults_stop_the_cell() {
    let probes = Arc::new(Probes::default());
    let env = Environment::new(Config::default().with_max_faults(3, Duration::from_secs(60)));
    env.start_cell("faulty", Faulty::new(&probes)).await.unwrap();

    for _ in 0..3 {
        env.emit_new("faulty", "fail", (), None).await.unwrap();
    }
    wait_until_stopped(&env, "faulty").await;

    // The third fault is not offered to the behavior.
    assert_eq!(probes.recovered.load(Ordering::SeqCst), 2);

    // Still registered until stopped explicitly, but rejecting events.
    assert!(env.has_cell("faulty"));
    assert!(
        env.emit_new("faulty", "work", (), None)
            .await
            .unwrap_err()
            .is_stopping()
    );

    // Terminated once, by the fault, not again by the stop.
    env.stop_cell("faulty").await.unwrap();
    assert_eq!(probes.terminated.load(Ordering::SeqCst), 1);
    env.stop().await.unwrap();
}

#[tokio::test]
async fn test_spread_out_faults_are_tolerated() {
    let probes = Arc::new(Probes::default());
    let env = Environment::new(Config::default().with_max_faults(2, Duration::from_millis(30)));
    env.start_cell("faulty", Faulty::new(&probes)).await.unwrap();

    for _ in 0..4 {
        env.emit_new("faulty", "fail", (), None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    env.emit_new("faulty", "work", (), None).await.unwrap();

    assert_eq!(processed(&env, "faulty").await.unwrap(), 1);
    assert_eq!(probes.recovered.load(Ordering::SeqCst), 4);
    env.stop().await.unwrap();
}

#[tokio::test]
async fn test_failed_recovery_stops_the_cell() {
    let probes = Arc::new(Probes::default());
    let env = Environment::default();
    let mut faulty = Faulty::new(&probes);
    faulty.give_up = true;
    env.start_cell("faulty", faulty).await.unwrap();
    env.start_cell("healthy", Faulty::new(&probes)).await.unwrap();

    env.emit_new("faulty", "panic", (), None).await.unwrap();
    wait_until_stopped(&env, "faulty").await;
    assert_eq!(probes.recovered.load(Ordering::SeqCst), 1);
    assert_eq!(probes.panics.load(Ordering::SeqCst), 1);

    // Other cells are not affected.
    env.emit_new("healthy", "work", (), None).await.unwrap();
    assert_eq!(processed(&env, "healthy").await.unwrap(), 1);

    env.stop().await.unwrap();
    assert_eq!(probes.terminated.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_stopped_subscriber_does_not_block_fan_out() {
    struct Forwarder(Option<Context>);
    impl Behavior for Forwarder {
        async fn init(&mut self, ctx: Context) -> Result<()> {
            self.0 = Some(ctx);
            Ok(())
        }

        async fn process_event(&mut self, event: &Event) -> Result<()> {
            if let Some(ctx) = &self.0 {
                // "faulty" is reported, "healthy" still gets the event.
                let _ = ctx.emit(event.clone()).await;
            }
            Ok(())
        }
    }

    let probes = Arc::new(Probes::default());
    let env = Environment::new(Config::default().with_max_faults(1, Duration::from_secs(60)));
    env.start_cell("source", Forwarder(None)).await.unwrap();
    env.start_cell("faulty", Faulty::new(&probes)).await.unwrap();
    env.start_cell("healthy", Faulty::new(&probes)).await.unwrap();
    env.subscribe("source", ["faulty", "healthy"]).unwrap();

    // A single fault is enough with a limit of one.
    env.emit_new("faulty", "fail", (), None).await.unwrap();
    wait_until_stopped(&env, "faulty").await;

    env.emit_new("source", "work", (), None).await.unwrap();
    env.emit_new("source", "work", (), None).await.unwrap();

    for _ in 0..100 {
        if processed(&env, "healthy").await.unwrap() == 2 {
            env.stop().await.unwrap();
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("healthy subscriber missed events");
}
