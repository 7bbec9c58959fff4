mod args;

use std::process::exit;
use std::time::Duration;

use cmdclaim::{FilterSettings, InboundMessage, MultiInstanceFilter, Verdict};
use cmdclaim_core::{ClaimKind, ClaimStore, Clock, FlowRoot, NoFlows, SystemClock};
use cmdclaim_persistence::open_store;
use log::info;
use tracing_subscriber::EnvFilter;

use args::{Command, FilterArgs, USAGE};

const EXIT_SUPPRESSED: i32 = 3;
const EXIT_USAGE: i32 = 2;
const EXIT_BACKEND: i32 = 5;

fn main() {
    // Cargar .env si existe para obtener BOT_MULTI_INSTANCE_STORE_URI
    let _ = dotenvy::dotenv();
    init_logging();
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let command = match args::parse(&argv) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[cmdclaim] {e}\n{USAGE}");
            exit(EXIT_USAGE);
        }
    };
    let settings = match FilterSettings::from_env() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[cmdclaim] configuración inválida: {e}");
            exit(EXIT_BACKEND);
        }
    };
    let code = match command {
        Command::InstanceId => instance_id(&settings),
        Command::Filter(f) => filter(&settings, f),
        Command::Retention { plain, flow } => retention(&settings, plain, flow),
        Command::Purge => purge(&settings),
    };
    exit(code);
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("CMDCLAIM_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    // `try_init` también instala el puente para los macros de `log`.
    let _ = tracing_subscriber::fmt().with_env_filter(filter)
                                     .with_writer(std::io::stderr)
                                     .compact()
                                     .try_init();
}

fn activate(settings: &FilterSettings) -> Option<cmdclaim::PgMultiInstanceFilter<NoFlows>> {
    match MultiInstanceFilter::activate(settings, NoFlows) {
        Ok(f) => Some(f),
        Err(e) => {
            eprintln!("[cmdclaim] activación fallida: {e}");
            None
        }
    }
}

fn instance_id(settings: &FilterSettings) -> i32 {
    let Some(plugin) = activate(settings) else { return EXIT_BACKEND };
    println!("{}", plugin.show_instance_id());
    plugin.deactivate();
    0
}

fn filter(settings: &FilterSettings, f: FilterArgs) -> i32 {
    let Some(plugin) = activate(settings) else { return EXIT_BACKEND };
    let mut message = InboundMessage::new(f.body, f.from, f.to);
    if let Some(id) = f.message_id {
        message = message.with_message_id(id);
    }
    if let Some(root) = f.flow_root {
        message = message.with_flow_root(FlowRoot::new(root));
    }
    let verdict = plugin.filter(message, f.command, f.args, f.dry_run);
    let instance = plugin.instance_id();
    plugin.deactivate();

    if f.json {
        let out = match &verdict {
            Verdict::Proceed(inv) => serde_json::json!({ "instance": instance, "verdict": "proceed", "invocation": inv }),
            Verdict::Suppressed(reason) => {
                serde_json::json!({ "instance": instance, "verdict": "suppressed", "reason": reason })
            }
        };
        println!("{out}");
    } else {
        match &verdict {
            Verdict::Proceed(inv) => println!("proceed: cmd={} args={:?}", inv.command, inv.args),
            Verdict::Suppressed(reason) => println!("suppressed: {reason:?}"),
        }
    }
    if verdict.is_proceed() {
        0
    } else {
        EXIT_SUPPRESSED
    }
}

fn retention(settings: &FilterSettings, plain: Option<Duration>, flow: Option<Duration>) -> i32 {
    let store = match open_store(&settings.database) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[cmdclaim retention] store error: {e}");
            return EXIT_BACKEND;
        }
    };
    for (kind, ttl) in [(ClaimKind::Plain, plain), (ClaimKind::Flow, flow)] {
        let Some(ttl) = ttl else { continue };
        match store.ensure_retention(kind, ttl) {
            Ok(change) => info!("retention kind={kind} ttl={}s change={change:?}", ttl.as_secs()),
            Err(e) => {
                eprintln!("[cmdclaim retention] {kind}: {e}");
                return EXIT_BACKEND;
            }
        }
    }
    match store.retention() {
        Ok(policy) => {
            println!("plain={}s flow={}s", policy.plain.as_secs(), policy.flow.as_secs());
            0
        }
        Err(e) => {
            eprintln!("[cmdclaim retention] {e}");
            EXIT_BACKEND
        }
    }
}

fn purge(settings: &FilterSettings) -> i32 {
    let store = match open_store(&settings.database) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[cmdclaim purge] store error: {e}");
            return EXIT_BACKEND;
        }
    };
    match store.purge_expired(SystemClock.now()) {
        Ok(n) => {
            println!("purgados: {n}");
            0
        }
        Err(e) => {
            eprintln!("[cmdclaim purge] {e}");
            EXIT_BACKEND
        }
    }
}
