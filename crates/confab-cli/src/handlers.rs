use anyhow::Result;
use confab_runtime::{EventBus, Registry, WatchDispatcher};
use confab_types::Role;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

pub fn sessions(registry: &Registry, project: &Path, json: bool) -> Result<()> {
    let sessions = registry.sessions(project);

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No sessions found for {}", project.display());
        return Ok(());
    }

    println!(
        "{:<10} {:<14} {:<42} {:<17} {:>5} {:>10}",
        "SOURCE", "ID", "NAME", "UPDATED", "MSGS", "TOKENS"
    );
    for session in &sessions {
        let id: String = session.id.chars().take(12).collect();
        let marker = if session.is_active() { "*" } else { " " };
        println!(
            "{:<10} {:<14} {:<42} {:<17} {:>5} {:>10}{}",
            session.adapter_id,
            id,
            session.name.chars().take(40).collect::<String>(),
            session.updated_at.format("%Y-%m-%d %H:%M"),
            session.message_count,
            session.total_tokens,
            marker,
        );
    }
    println!("{} session(s)", sessions.len());
    Ok(())
}

pub fn messages(registry: &Registry, adapter: &str, session: &str, json: bool) -> Result<()> {
    let messages = registry.messages(adapter, session)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    for message in &messages {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        println!(
            "[{}] {}: {}",
            message.timestamp.format("%H:%M:%S"),
            role,
            message.content
        );
        for tool_use in &message.tool_uses {
            let status = if tool_use.is_error { "error" } else { "ok" };
            println!("  └ {} ({}): {}", tool_use.name, status, tool_use.output);
        }
    }
    println!("{} message(s)", messages.len());
    Ok(())
}

pub fn usage(registry: &Registry, adapter: &str, session: &str) -> Result<()> {
    let stats = registry.usage(adapter, session)?;
    println!("messages:     {}", stats.message_count);
    println!("input:        {}", stats.input_tokens);
    println!("output:       {}", stats.output_tokens);
    println!("cache read:   {}", stats.cache_read_tokens);
    println!("cache write:  {}", stats.cache_write_tokens);
    println!("total:        {}", stats.total_tokens());
    Ok(())
}

pub fn detect(registry: &Registry, project: &Path) -> Result<()> {
    let available = registry.available(project);
    if available.is_empty() {
        println!("none");
    } else {
        for id in available {
            println!("{}", id);
        }
    }
    Ok(())
}

pub fn watch(registry: &Registry, project: &Path) -> Result<()> {
    let bus = Arc::new(EventBus::new());
    let subscription = bus.subscribe();
    let dispatcher = WatchDispatcher::start(registry, project, Arc::clone(&bus));

    if dispatcher.watcher_count() == 0 {
        println!("No watchable sources for {}", project.display());
        return Ok(());
    }

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    println!(
        "Watching {} source(s) for {} (ctrl-c to stop)",
        dispatcher.watcher_count(),
        project.display()
    );

    while running.load(Ordering::SeqCst) {
        match subscription.events.recv_timeout(Duration::from_millis(200)) {
            Ok(event) => {
                let session = if event.change.session_id.is_empty() {
                    "-"
                } else {
                    event.change.session_id.as_str()
                };
                println!("[{}] {:?} {}", event.adapter_id, event.change.kind, session);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    dispatcher.stop();
    Ok(())
}
