use std::time::Duration;

use cellnet::{
    Behavior, Config, Context, DEFAULT_PAYLOAD, Environment, Event, PROCESSED_TOPIC, Payload,
    Result,
    testing::{TestBehavior, let_it_work},
};

/// Turns every "line" into one "word" event per word.
#[derive(Default)]
struct Splitter {
    ctx: Option<Context>,
}

impl Behavior for Splitter {
    async fn init(&mut self, ctx: Context) -> Result<()> {
        self.ctx = Some(ctx);
        Ok(())
    }

    async fn process_event(&mut self, event: &Event) -> Result<()> {
        let Some(ctx) = &self.ctx else {
            return Ok(());
        };
        let line: String = event.payload().decode(DEFAULT_PAYLOAD)?;
        for word in line.split_whitespace() {
            ctx.emit_child("word", Payload::new(word), event).await?;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let env = Environment::new(Config::default().with_id("pipeline"));
    env.start_cell("splitter", Splitter::default()).await?;
    env.start_cell("collector", TestBehavior::new()).await?;
    env.subscribe("splitter", ["collector"])?;

    for line in ["lorem ipsum dolor", "sit amet"] {
        env.emit_new("splitter", "line", Payload::new(line), None)
            .await?;
    }
    let_it_work().await;

    let collected: Vec<String> = env
        .request("collector", PROCESSED_TOPIC, (), None, Duration::from_secs(1))
        .await?
        .decode(DEFAULT_PAYLOAD)?;
    for entry in collected {
        println!("{entry}");
    }

    env.stop().await
}
