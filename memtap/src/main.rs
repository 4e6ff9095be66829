//! Entry point for the memtap CLI. Parses args, resolves a target, runs the REPL.

use std::env;
use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

use memtap::http::{ServerAddress, DEFAULT_TIMEOUT, SERVER_PORT};
use memtap::profiles::{load_profiles, save_profiles, ProfileEntry, ProfileRequest, ResolveProfile};
use memtap::{Session, SessionState};

struct ParsedArgs {
    host: Option<String>,
    profile: Option<String>,
    timeout: Option<u64>,
    save: bool,
    demo: bool,
    dry_run: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "memtap".into());
    let usage = format!(
        "Usage: {prog} [--profile NAME|-P NAME] [--timeout SECS|-T SECS] [--save] [--demo] [--dry-run] [HOST]"
    );
    let mut host: Option<String> = None;
    let mut profile: Option<String> = None;
    let mut timeout: Option<u64> = None;
    let mut save = false; // --save
    let mut demo = false; // --demo
    let mut dry_run = false; // --dry-run

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                return Err(usage);
            }
            "--profile" | "-P" => {
                profile = it.next();
            }
            "--timeout" | "-T" => {
                let v = it.next().ok_or_else(|| format!("--timeout needs a value. {usage}"))?;
                timeout = Some(
                    v.parse::<u64>()
                        .map_err(|_| format!("Invalid --timeout value: {v}"))?,
                );
            }
            "--save" => {
                save = true;
            }
            "--demo" => {
                demo = true;
            }
            "--dry-run" => {
                dry_run = true;
            }
            _ if arg.starts_with("--profile=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        profile = Some(v.to_string());
                    }
                }
            }
            _ if arg.starts_with("--timeout=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        timeout = Some(
                            v.parse::<u64>()
                                .map_err(|_| format!("Invalid --timeout value: {v}"))?,
                        );
                    }
                }
            }
            _ => {
                if host.is_none() {
                    host = Some(arg);
                } else {
                    return Err(format!("Unexpected argument. {usage}"));
                }
            }
        }
    }
    Ok(ParsedArgs {
        host,
        profile,
        timeout,
        save,
        demo,
        dry_run,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("memtap=warn")),
        )
        .with_writer(io::stderr)
        .init();

    // Reuse the same parsing logic for testability
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    // Demo mode short-circuit (ignore other args except conflicting ones)
    if parsed.demo || matches!(parsed.profile.as_deref(), Some("demo")) {
        return run_demo_mode(parsed.timeout).await;
    }

    let profiles_file = load_profiles();
    let req = ProfileRequest {
        profile_name: parsed.profile.clone(),
        host: parsed.host.clone(),
        timeout_secs: parsed.timeout,
    };
    let resolved = req.resolve(&profiles_file);

    // Determine final connection parameters (and maybe mutated profiles to persist)
    let mut profiles_mut = profiles_file.clone();
    let (host, timeout_secs): (Option<String>, Option<u64>) = match resolved {
        ResolveProfile::Direct(h, t) => {
            // Possibly save if profile specified and --save or new entry
            if let Some(name) = parsed.profile.as_ref() {
                let existing = profiles_mut.profiles.get(name);
                match existing {
                    None => {
                        // New profile: auto-save immediately
                        profiles_mut.profiles.insert(
                            name.clone(),
                            ProfileEntry {
                                host: h.clone(),
                                timeout_secs: t,
                            },
                        );
                        let _ = save_profiles(&profiles_mut);
                    }
                    Some(entry) => {
                        let changed = entry.host != h || entry.timeout_secs != t;
                        if changed {
                            let overwrite = if parsed.save {
                                true
                            } else {
                                prompt_yes_no(&format!(
                                    "Overwrite existing profile '{name}'? [y/N]: "
                                ))
                            };
                            if overwrite {
                                profiles_mut.profiles.insert(
                                    name.clone(),
                                    ProfileEntry {
                                        host: h.clone(),
                                        timeout_secs: t,
                                    },
                                );
                                let _ = save_profiles(&profiles_mut);
                            }
                        }
                    }
                }
            }
            (Some(h), t)
        }
        ResolveProfile::Loaded(h, t) => (Some(h), parsed.timeout.or(t)),
        ResolveProfile::PromptSelect(mut names) => {
            // Always add demo option to list
            if !names.iter().any(|n| n == "demo") {
                names.push("demo".into());
            }
            eprintln!("Select profile:");
            for (i, n) in names.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, n);
            }
            eprint!("Enter number (or blank to abort): ");
            let _ = io::stderr().flush();
            let mut line = String::new();
            if io::stdin().read_line(&mut line).is_ok() {
                if let Ok(idx) = line.trim().parse::<usize>() {
                    if idx >= 1 && idx <= names.len() {
                        let name = &names[idx - 1];
                        if name == "demo" {
                            return run_demo_mode(parsed.timeout).await;
                        }
                        if let Some(entry) = profiles_mut.profiles.get(name) {
                            (Some(entry.host.clone()), parsed.timeout.or(entry.timeout_secs))
                        } else {
                            return Ok(());
                        }
                    } else {
                        return Ok(());
                    }
                } else {
                    return Ok(());
                }
            } else {
                return Ok(());
            }
        }
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let host = prompt_string("Enter host (e.g. 192.168.1.20): ")?;
            if host.trim().is_empty() {
                return Ok(());
            }
            let secs = prompt_string("Request timeout in seconds (blank for default): ")?;
            let secs_opt = secs.trim().parse::<u64>().ok();
            profiles_mut.profiles.insert(
                name.clone(),
                ProfileEntry {
                    host: host.trim().to_string(),
                    timeout_secs: secs_opt,
                },
            );
            let _ = save_profiles(&profiles_mut);
            (Some(host.trim().to_string()), secs_opt)
        }
        ResolveProfile::None => (None, parsed.timeout),
    };

    let timeout = timeout_secs.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT);

    if parsed.dry_run {
        match host {
            Some(h) => {
                let address = ServerAddress::parse(&h)?;
                println!(
                    "target: {} (timeout {}s)",
                    address.base_url(),
                    timeout.as_secs()
                );
            }
            None => eprintln!("No host provided and no profiles to select."),
        }
        return Ok(());
    }

    run_repl(host, timeout).await
}

fn prompt_yes_no(prompt: &str) -> bool {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_ok() {
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    } else {
        false
    }
}

fn prompt_string(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}

// --- Interactive loop ---

async fn run_repl(initial_host: Option<String>, timeout: Duration) -> Result<()> {
    let mut session = Session::with_timeout(timeout);
    match initial_host {
        Some(host) => connect_and_refresh(&mut session, &host).await,
        None => eprintln!("Not connected. Use: connect HOST"),
    }

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (cmd, rest) = match line.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };
        match cmd {
            "" => {}
            "help" | "h" | "?" => print_help(),
            "connect" => {
                if rest.is_empty() {
                    eprintln!("usage: connect HOST");
                } else {
                    connect_and_refresh(&mut session, rest).await;
                }
            }
            "info" => match session.server_info() {
                Some(info) => {
                    println!("mode:      {}", info.mode);
                    println!("target:    {}/{}", info.target_os, info.arch);
                    println!("server pid: {}", info.pid);
                    println!("build:     {}", info.git_hash);
                }
                None => eprintln!("not connected"),
            },
            "refresh" => match session.refresh().await {
                Ok(catalog) => println!("{} processes", catalog.len()),
                Err(e) => eprintln!("refresh failed: {e}"),
            },
            "ls" => list_processes(&session, rest),
            "select" => match rest.parse::<i32>() {
                Ok(pid) => {
                    select_pid(&mut session, pid);
                }
                Err(_) => eprintln!("usage: select PID"),
            },
            "open" => {
                let ready = if rest.is_empty() {
                    true
                } else {
                    match rest.parse::<i32>() {
                        Ok(pid) => select_pid(&mut session, pid),
                        Err(_) => {
                            eprintln!("usage: open [PID]");
                            false
                        }
                    }
                };
                if ready {
                    match session.open_selected().await {
                        Ok(p) => println!("opened {} (pid {})", p.name, p.pid),
                        Err(e) => eprintln!("open failed: {e}"),
                    }
                }
            }
            "status" => print_status(&session),
            "quit" | "exit" | "q" => break,
            _ => eprintln!("unknown command: {cmd} (try: help)"),
        }
        prompt();
    }
    Ok(())
}

async fn connect_and_refresh(session: &mut Session, host: &str) {
    match session.connect(host).await {
        Ok(info) => {
            println!(
                "connected to {host} ({}, {}/{}, build {})",
                info.mode, info.target_os, info.arch, info.git_hash
            );
            // A fresh identity means a fresh catalog
            match session.refresh().await {
                Ok(catalog) => println!("{} processes", catalog.len()),
                Err(e) => eprintln!("refresh failed: {e}"),
            }
        }
        Err(e) => eprintln!("connect failed: {e}"),
    }
}

fn list_processes(session: &Session, filter_text: &str) {
    let Some(catalog) = session.catalog() else {
        eprintln!("no catalog loaded (try: refresh)");
        return;
    };
    let mut shown = 0usize;
    for p in catalog.filter(filter_text) {
        let mark = if session.selected().is_some_and(|s| s.pid == p.pid) {
            '*'
        } else {
            ' '
        };
        println!("{mark} {:>8}  {}", p.pid, p.name);
        shown += 1;
    }
    println!("{shown} of {} processes", catalog.len());
}

fn select_pid(session: &mut Session, pid: i32) -> bool {
    let Some(catalog) = session.catalog() else {
        eprintln!("no catalog loaded (try: refresh)");
        return false;
    };
    match catalog.find(pid) {
        Some(p) => {
            let p = p.clone();
            println!("selected {} (pid {})", p.name, p.pid);
            session.select_process(p);
            true
        }
        None => {
            eprintln!("pid {pid} is not in the catalog (try: refresh)");
            false
        }
    }
}

fn print_status(session: &Session) {
    match session.state() {
        SessionState::Disconnected => println!("disconnected"),
        SessionState::Connected(info) => println!(
            "connected to {} ({} {}/{})",
            session.host().unwrap_or("?"),
            info.mode,
            info.target_os,
            info.arch
        ),
        SessionState::CatalogLoaded(catalog) => println!(
            "connected to {}, {} processes",
            session.host().unwrap_or("?"),
            catalog.len()
        ),
        SessionState::ProcessOpened(p) => println!(
            "connected to {}, opened {} (pid {})",
            session.host().unwrap_or("?"),
            p.name,
            p.pid
        ),
    }
    if let Some(sel) = session.selected() {
        println!("selected: {} (pid {})", sel.name, sel.pid);
    }
}

fn print_help() {
    println!("commands:");
    println!("  connect HOST   probe a server and load its process catalog");
    println!("  info           show server identity");
    println!("  refresh        re-fetch the process catalog (clears selection)");
    println!("  ls [TEXT]      list processes, filtered by name substring");
    println!("  select PID     choose a process from the catalog");
    println!("  open [PID]     open the selected process (or select PID first)");
    println!("  status         show session state");
    println!("  quit           exit");
}

fn prompt() {
    eprint!("memtap> ");
    let _ = io::stderr().flush();
}

// --- Demo Mode ---

async fn run_demo_mode(timeout_secs: Option<u64>) -> Result<()> {
    let guard = spawn_demo_stub(SERVER_PORT)?;
    let timeout = timeout_secs.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT);
    // Use select to handle Ctrl-C and normal quit
    tokio::select! {
        res = run_repl(Some("127.0.0.1".into()), timeout) => { drop(guard); res }
        _ = tokio::signal::ctrl_c() => {
            // Drop guard (kills stub) then return
            drop(guard);
            Ok(())
        }
    }
}

struct StubGuard(Option<std::process::Child>);

impl Drop for StubGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.0.take() {
            let _ = child.kill();
        }
    }
}

fn spawn_demo_stub(port: u16) -> Result<StubGuard> {
    let candidate = find_stub_executable();
    let mut cmd = std::process::Command::new(candidate);
    cmd.arg("--port").arg(port.to_string());
    let child = cmd.spawn()?;
    // Give the stub a brief moment to start
    std::thread::sleep(Duration::from_millis(300));
    Ok(StubGuard(Some(child)))
}

fn find_stub_executable() -> std::path::PathBuf {
    let self_exe = std::env::current_exe().ok();
    if let Some(exe) = self_exe {
        if let Some(parent) = exe.parent() {
            #[cfg(windows)]
            let name = "memtap_stub.exe";
            #[cfg(not(windows))]
            let name = "memtap_stub";
            let candidate = parent.join(name);
            if candidate.exists() {
                return candidate;
            }
        }
    }
    // Fallback to relying on PATH
    std::path::PathBuf::from("memtap_stub")
}
