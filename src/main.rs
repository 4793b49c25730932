//! Resonance Arena - Entry Point
//!
//! Interactive console battle. Pick skills by number, or type anything
//! else as a natural-language order for the active character - the
//! decision provider turns it into a concrete skill and an in-character
//! reply, which the speech queue plays back in order.

use clap::Parser;
use resonance_arena::core::config::EngineConfig;
use resonance_arena::core::error::{EngineError, Result};
use resonance_arena::core::types::{Side, SkillId};
use resonance_arena::decision::{DecisionProvider, LlmProvider, ScriptedProvider};
use resonance_arena::engine::{BattleOutcome, BattleRunner, BattleState};
use resonance_arena::roster::{definitions, load_roster_dir, Combatant};
use resonance_arena::speech::{AudioClip, NullSynth, SpeechQueue};

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(
    name = "resonance-arena",
    about = "Turn-based battle engine with natural language commands"
)]
struct Args {
    /// RNG seed for a reproducible battle
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Built-in enemy: shadow_knight, void_stalker, abyssal_monarch
    #[arg(long, default_value = "shadow_knight")]
    enemy: String,

    /// Directory of party member TOML definitions (default: built-in cast)
    #[arg(long)]
    roster: Option<std::path::PathBuf>,

    /// Engine config TOML override
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Run without the LLM; skill selection by number only
    #[arg(long)]
    offline: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("resonance_arena=info")
        .init();

    let args = Args::parse();
    tracing::info!("Resonance Arena starting...");

    let rt = Runtime::new()?;

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let roster = build_roster(&args, &config)?;

    // The LLM is optional: without it, battles still run on direct
    // skill selection.
    let llm = if args.offline {
        None
    } else {
        let provider = LlmProvider::from_env().ok();
        if provider.is_none() {
            tracing::warn!("LLM_API_KEY not set - running without natural language commands");
        }
        provider
    };

    println!("\n=== RESONANCE ARENA ===");
    println!("Speed decides who moves; your words decide what they do.");
    println!();
    println!("Commands:");
    println!("  <number>        - Use that skill directly");
    println!("  log             - Show the full battle log");
    println!("  quit / q        - Concede and exit");
    if llm.is_some() {
        println!("  <any text>      - Order the active character in plain language");
    }
    println!();

    match llm {
        Some(provider) => {
            let runner = BattleRunner::new(roster, config, provider, args.seed)?;
            run_battle(&rt, runner, true)
        }
        None => {
            let placeholder = ScriptedProvider::new("unused", "");
            let runner = BattleRunner::new(roster, config, placeholder, args.seed)?;
            run_battle(&rt, runner, false)
        }
    }
}

fn build_roster(args: &Args, config: &EngineConfig) -> Result<Vec<Combatant>> {
    let mut roster = match &args.roster {
        Some(dir) => load_roster_dir(dir)?
            .into_iter()
            .map(|def| def.into_combatant(Side::Party, config))
            .collect(),
        None => definitions::default_party(),
    };

    let enemy = definitions::enemy_by_id(&args.enemy).ok_or_else(|| {
        EngineError::ConfigError(format!("unknown enemy '{}'", args.enemy))
    })?;
    roster.push(enemy);
    Ok(roster)
}

fn run_battle<P: DecisionProvider>(
    rt: &Runtime,
    mut runner: BattleRunner<P>,
    llm_enabled: bool,
) -> Result<()> {
    // Finalized narrative collects here, then plays through the speech
    // queue in sentence order after each action.
    let narrative: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let narrative_sink = narrative.clone();
    runner.set_narrative_sink(move |text| {
        narrative_sink.lock().unwrap().push(text.to_string());
    });
    runner.set_outcome_handler(|battle, outcome| {
        let verdict = match outcome {
            BattleOutcome::Victory => "VICTORY",
            BattleOutcome::Defeat => "DEFEAT",
        };
        println!("\n=== {} === (battle {})", verdict, battle.0);
    });

    let mut speech = SpeechQueue::new(NullSynth, |clip: &AudioClip| {
        println!("  ~ {}", clip.text);
    });

    let mut printed_logs = 0usize;
    rt.block_on(runner.start())?;
    printed_logs = print_new_logs(runner.state(), printed_logs);

    loop {
        if runner.state().is_terminal() {
            break;
        }

        display_status(runner.state());
        print_skill_menu(runner.state());

        print!("> ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "q" {
            println!("Conceding the field.");
            return Ok(());
        }
        if input == "log" {
            for entry in &runner.state().logs {
                println!("[T{}] {}", entry.turn, entry.message);
            }
            continue;
        }

        let result = if let Ok(choice) = input.parse::<usize>() {
            match skill_by_menu_index(runner.state(), choice) {
                Some(skill_id) => rt.block_on(runner.submit_skill(&skill_id)),
                None => {
                    println!("No such skill number.");
                    continue;
                }
            }
        } else if llm_enabled {
            rt.block_on(runner.submit_command(input))
        } else {
            println!("Natural language commands need LLM_API_KEY. Pick a skill number.");
            continue;
        };

        if let Err(e) = result {
            println!("Rejected: {}", e);
            continue;
        }

        printed_logs = print_new_logs(runner.state(), printed_logs);

        // Play queued narrative strictly in order
        let lines: Vec<String> = narrative.lock().unwrap().drain(..).collect();
        for line in lines {
            rt.block_on(speech.speak(&line));
        }
    }

    print_new_logs(runner.state(), printed_logs);
    Ok(())
}

/// Print log entries that appeared since the last call
fn print_new_logs(state: &BattleState, from: usize) -> usize {
    for entry in &state.logs[from..] {
        let marker = if entry.crit { "*" } else { " " };
        println!("[T{}]{} {}", entry.turn, marker, entry.message);
    }
    state.logs.len()
}

fn display_status(state: &BattleState) {
    println!();
    println!("--- Turn {} ---", state.turn);
    for combatant in &state.roster {
        let bar = hp_bar(combatant.hp_fraction());
        let tag = match combatant.side {
            Side::Party => "ally ",
            Side::Enemy => "enemy",
        };
        println!(
            "  [{}] {:<16} {} {}/{}",
            tag, combatant.name, bar, combatant.current_hp, combatant.max_hp
        );
    }

    let order: Vec<&str> = state
        .action_queue
        .iter()
        .filter_map(|id| state.combatant(id).ok().map(|c| c.name.as_str()))
        .collect();
    if !order.is_empty() {
        println!("  Next up: {}", order.join(" > "));
    }
    println!();
}

fn print_skill_menu(state: &BattleState) {
    let Some(active) = &state.active else { return };
    let Ok(actor) = state.combatant(active) else {
        return;
    };
    println!("{}'s move:", actor.name);
    for (i, skill) in actor.skills.iter().enumerate() {
        println!("  {}. {} - {}", i + 1, skill.name, skill.description);
    }
}

fn skill_by_menu_index(state: &BattleState, choice: usize) -> Option<SkillId> {
    let active = state.active.as_ref()?;
    let actor = state.combatant(active).ok()?;
    actor.skills.get(choice.checked_sub(1)?).map(|s| s.id.clone())
}

fn hp_bar(fraction: f32) -> String {
    const WIDTH: usize = 20;
    let filled = ((fraction * WIDTH as f32).round() as usize).min(WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(WIDTH - filled))
}
