use anyhow::{bail, Context, Result};
use glcache::{config, parse_commands, GlirContext, RecordingApi};
use log::info;
use simple_logger::SimpleLogger;
use std::rc::Rc;

fn main() -> Result<()> {
    let config = config::load_or_create_config()?;
    SimpleLogger::new().with_level(config.level_filter()).init()?;

    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: glcache-replay <commands.json>");
    };
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read command file {}", path))?;
    let commands = parse_commands(&json)?;
    info!("Replaying {} commands from {}", commands.len(), path);

    let api = Rc::new(RecordingApi::permissive());
    let mut context = GlirContext::from_config(api.clone(), &config);
    for command in commands {
        context.command(command)?;
    }
    let executed = context.execute_pending()?;
    info!("{} queued commands executed", executed);

    for call in api.calls() {
        println!("{:?}", call);
    }
    Ok(())
}
