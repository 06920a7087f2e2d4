use std::sync::Arc;

use dotenv::dotenv;
use kb_client::HttpKnowledgeClient;
use kb_console::{Action, DatasetController, LocalStore, SledStore};
use kb_core::KNOWLEDGE_NAME_KEY;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

mod commands;
mod config;
mod render;

use commands::Command;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();
    info!("kb-console starting");

    let cfg = config::load_config()?;
    let controller_cfg = cfg.controller()?;
    let client = HttpKnowledgeClient::new(cfg.http())?;
    let store = Arc::new(SledStore::open(&cfg.storage.path)?);

    let (handle, mut notifications) =
        DatasetController::spawn(Arc::new(client), store.clone(), controller_cfg);
    let mut snapshots = handle.subscribe();
    handle.dispatch(Action::Mount)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_frame = String::new();
    println!("{}", commands::HELP);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match commands::parse(&line) {
                    Ok(Command::Page(action)) => handle.dispatch(action)?,
                    Ok(Command::Use(name)) => {
                        store.set(KNOWLEDGE_NAME_KEY, &name)?;
                        info!(knowledge_base = %name, "knowledge base switched");
                        handle.dispatch(Action::SwitchKnowledgeBase)?;
                    }
                    Ok(Command::Show) => {
                        last_frame = frame(store.as_ref(), &handle.snapshot());
                        print!("{}", last_frame);
                    }
                    Ok(Command::Help) => println!("{}", commands::HELP),
                    Ok(Command::Quit) => break,
                    Err(msg) => println!("{}", msg),
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    warn!("dataset controller exited");
                    break;
                }
                let state = snapshots.borrow_and_update().clone();
                let next = frame(store.as_ref(), &state);
                if next != last_frame {
                    print!("{}", next);
                    last_frame = next;
                }
            }
            Some(note) = notifications.recv() => {
                println!("{}", render::notification(&note));
            }
        }
    }

    handle.shutdown().await?;
    info!("kb-console stopped");
    Ok(())
}

fn frame(store: &dyn LocalStore, state: &kb_console::DatasetState) -> String {
    let name = store.knowledge_name().unwrap_or_default();
    render::page(&name, state)
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).ok();
}
