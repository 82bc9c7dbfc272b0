use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use symptoms::parser::{self, Command};
use symptoms::{Db, Ledger, StoreError, Symptom};

#[derive(Parser, Clone, Debug)]
#[clap(name = "symptoms-cli", author, version, about = "Admin shell for a symptoms store", long_about = None)]
struct Args {
    #[clap(long, env = "SYMPTOMS_DB", default_value = "data.db")]
    db_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    print_banner();

    let db = Db::open(&args.db_path)?;
    let ledger = Ledger::new(&db)?;
    println!("[\u{2713}] Opened store at {}", args.db_path.display());
    println!("Type 'HELP' for supported commands or 'EXIT' to quit.\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("symptoms> ");
        io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        if line.trim().is_empty() { continue; }

        match parser::parse_command(&line) {
            Ok(Command::Exit) => break,
            Ok(cmd) => {
                if let Err(e) = execute_command(&ledger, cmd) {
                    println!("[\u{26a0}\u{fe0f} Error] {}", e);
                }
            }
            Err(e) => {
                println!("[\u{2717} Syntax Error] {}", e);
                if line.to_uppercase().starts_with("ADD") {
                    println!("    \u{2139}\u{fe0f}  Hint: ADD \"title\" \"author\" \"description\"");
                } else if line.to_uppercase().starts_with("UPDATE") {
                    println!("    \u{2139}\u{fe0f}  Hint: UPDATE 1 SET TITLE=\"new title\", AUTHOR=\"someone\"");
                }
            }
        }
    }

    db.sync()?;
    Ok(())
}

fn print_banner() {
    println!("\n==================================================");
    println!("   symptoms admin shell");
    println!("==================================================\n");
}

fn print_help() {
    println!("\n--- Available Commands ---");
    println!("1. LIST:    LIST");
    println!("2. GET:     GET 1");
    println!("3. ADD:     ADD \"title\" \"author\" \"description\"");
    println!("4. UPDATE:  UPDATE 1 SET TITLE=\"...\", AUTHOR=\"...\", DESCRIPTION=\"...\"");
    println!("5. DELETE:  DELETE 1");
    println!("6. EVENTS:  EVENTS [1]");
    println!("7. EXIT:    Quit");
    println!("Inside quotes, write \\\" for a quote and \\\\ for a backslash.\n");
}

fn execute_command(ledger: &Ledger, cmd: Command) -> Result<(), StoreError> {
    match cmd {
        Command::Help => { print_help(); Ok(()) },
        Command::List => {
            let symptoms = ledger.symptoms().all()?;
            println!("\n{} symptom(s):", symptoms.len());
            for s in symptoms {
                println!("  #{:<4} {} ({})", s.id, s.title, s.author);
            }
            println!();
            Ok(())
        },
        Command::Get { id } => {
            let symptom = ledger.symptoms().one(id)?;
            print_symptom(&symptom);
            Ok(())
        },
        Command::Add { title, author, description } => {
            let symptom = ledger.create(&title, &author, &description)?;
            println!("[\u{2713} OK] Added symptom #{}", symptom.id);
            Ok(())
        },
        Command::Update { id, title, author, description } => {
            let mut symptom = ledger.symptoms().one(id)?;
            if let Some(title) = title { symptom.title = title; }
            if let Some(author) = author { symptom.author = author; }
            if let Some(description) = description { symptom.description = description; }
            ledger.update(&symptom)?;
            println!("[\u{2713} OK] Updated symptom #{}", id);
            Ok(())
        },
        Command::Delete { id } => {
            ledger.remove(id)?;
            println!("[\u{2713} OK] Deleted symptom #{}", id);
            Ok(())
        },
        Command::Events { id } => {
            let events = match id {
                Some(id) => ledger.events().all_for_symptom(id)?,
                None => ledger.events().all()?,
            };
            println!("\n{} event(s):", events.len());
            for e in events {
                println!("  {} | {:<16} | #{}", e.pretty_time(), e.title(), e.record_id);
            }
            println!();
            Ok(())
        },
        Command::Exit => Ok(()),
    }
}

fn print_symptom(symptom: &Symptom) {
    match serde_json::to_string_pretty(symptom) {
        Ok(json) => println!("{}", json),
        Err(_) => println!("{:?}", symptom),
    }
}
