use clap::Parser;
use client::game::{FxEvent, FxSink};
use client::input::{InputFrame, InputSource};
use log::info;
use shared::ability::ActivationKey;
use shared::Vec3;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// How long to run the scripted scenario, seconds
    #[arg(short = 'd', long, default_value = "12")]
    duration: u64,
}

/// Scripted stand-in for a real input device: run toward a point,
/// dash partway, leap at speed, then cycle the remaining abilities.
struct ScriptedSource {
    fired: Vec<&'static str>,
}

impl ScriptedSource {
    fn new() -> Self {
        Self { fired: Vec::new() }
    }

    fn once(&mut self, tag: &'static str) -> bool {
        if self.fired.contains(&tag) {
            false
        } else {
            self.fired.push(tag);
            true
        }
    }
}

impl InputSource for ScriptedSource {
    fn sample(&mut self, now: f64) -> InputFrame {
        let mut frame = InputFrame {
            move_click: None,
            pressed: Vec::new(),
            dash_held: (2.0..3.0).contains(&now),
        };

        if now >= 0.5 && self.once("run") {
            frame.move_click = Some(Vec3::new(12.0, 0.0, 12.0));
        }
        if now >= 2.0 && self.once("dash") {
            frame.pressed.push(ActivationKey::LeftShift);
        }
        // Fresh movement order so the leap launches at speed.
        if now >= 3.05 && self.once("run2") {
            frame.move_click = Some(Vec3::new(-12.0, 0.0, -12.0));
        }
        if now >= 3.6 && self.once("leap") {
            frame.pressed.push(ActivationKey::Q);
        }
        if now >= 6.0 && self.once("jump") {
            frame.pressed.push(ActivationKey::Space);
        }
        if now >= 8.0 && self.once("shield") {
            frame.pressed.push(ActivationKey::E);
        }
        if now >= 9.0 && self.once("bolt") {
            frame.pressed.push(ActivationKey::R);
        }
        frame
    }
}

/// Logs effect cues instead of rendering them.
struct LogFx;

impl FxSink for LogFx {
    fn spawn(&mut self, fx: FxEvent) {
        match fx {
            FxEvent::Impact { at } => info!("fx: impact at ({:.1}, {:.1})", at.x, at.z),
            FxEvent::ShieldRaised { actor } => info!("fx: shield up on {}", actor),
            FxEvent::ShieldDropped { actor } => info!("fx: shield down on {}", actor),
            FxEvent::BoltFired { from, .. } => {
                info!("fx: bolt from ({:.1}, {:.1})", from.x, from.z)
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    info!("starting scripted peer against {}", args.server);
    if args.fake_ping > 0 {
        info!("simulating {}ms latency", args.fake_ping);
    }

    let mut client = client::network::Client::new(&args.server, args.fake_ping).await?;
    let mut source = ScriptedSource::new();
    let mut fx = LogFx;

    client
        .run(
            &mut source,
            &mut fx,
            Some(Duration::from_secs(args.duration)),
        )
        .await?;

    // Final report: where we ended up and what the HUD would show.
    let state = &client.game_state;
    if let Some(actor) = state.own_actor.and_then(|id| state.actors.get(&id)) {
        info!(
            "final position ({:.2}, {:.2}), mana {:.1}",
            actor.position.x, actor.position.z, actor.mana.current
        );
    }
    for entry in state.slot_view() {
        info!(
            "slot {}: {} ready={} remaining={:.1}s",
            entry.slot, entry.kind, entry.ready, entry.remaining_cooldown
        );
    }
    info!("ping {}ms", client.ping_ms());

    Ok(())
}
