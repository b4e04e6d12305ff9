//! tailorcv CLI - command-line interface for the CV tailoring pipeline
//!
//! Usage: tailorcv <COMMAND>
//!
//! `generate` produces the editable cv.yaml, `render` typesets it, and
//! `tailor` runs the full loop: generate, render, then re-render after
//! each round of edits to the yaml file.

use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process;

use tailorcv::{
    assemble, detect_kind, extract_corpus, generate, settings::default_config_path,
    AnthropicClient, CommandRenderer, Design, PipelineError, PresentationConfig, Renderer,
    Session, SessionState, Settings,
};

#[derive(Parser)]
#[command(name = "tailorcv", about = "Tailor a résumé to a job description into a rendered CV")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a structured CV document from a résumé and a job description
    Generate {
        /// Résumé file (.pdf or plain text)
        resume: PathBuf,
        /// Job description file (plain text)
        job: PathBuf,
        /// Where to write the editable document
        #[arg(short, long, default_value = "cv.yaml")]
        output: PathBuf,
        /// Theme name passed to the renderer
        #[arg(long)]
        theme: Option<String>,
        /// Model identifier for the completion provider
        #[arg(long)]
        model: Option<String>,
    },
    /// Render an existing CV document to PDF
    Render {
        /// The cv.yaml document (possibly hand-edited)
        doc: PathBuf,
        #[arg(short, long, default_value = "cv.pdf")]
        output: PathBuf,
        /// Renderer binary to invoke
        #[arg(long)]
        renderer: Option<String>,
    },
    /// Full loop: generate, render, then re-render after each edit
    Tailor {
        resume: PathBuf,
        job: PathBuf,
        /// Where the editable document lives during the loop
        #[arg(long, default_value = "cv.yaml")]
        doc: PathBuf,
        #[arg(short, long, default_value = "cv.pdf")]
        output: PathBuf,
        #[arg(long)]
        theme: Option<String>,
    },
    /// Manage the stored API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Store an API key
    Set { key: String },
    /// Show the stored key (masked)
    Show,
    /// Remove the stored key
    Clear,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), String> {
    let config_path = default_config_path();
    let settings = config_path
        .as_deref()
        .map(Settings::load)
        .unwrap_or_default();

    match command {
        Commands::Generate { resume, job, output, theme, model } => {
            let doc = run_generate(&settings, &resume, &job, theme, model)?;
            let text = doc.to_yaml().map_err(|e| e.to_string())?;
            std::fs::write(&output, &text)
                .map_err(|e| format!("Failed to write {}: {}", output.display(), e))?;
            println!("Wrote {}", output.display());
            println!("Edit it freely, then run: tailorcv render {}", output.display());
            Ok(())
        }
        Commands::Render { doc, output, renderer } => {
            let text = std::fs::read_to_string(&doc)
                .map_err(|e| format!("Failed to read {}: {}", doc.display(), e))?;
            let renderer = CommandRenderer::new(
                renderer.unwrap_or_else(|| settings.renderer_command.clone()),
            );
            let bytes = renderer.render(&text).map_err(|e| e.to_string())?;
            std::fs::write(&output, &bytes)
                .map_err(|e| format!("Failed to write {}: {}", output.display(), e))?;
            println!("Wrote {} ({} bytes)", output.display(), bytes.len());
            Ok(())
        }
        Commands::Tailor { resume, job, doc, output, theme } => {
            run_tailor_loop(&settings, &resume, &job, &doc, &output, theme)
        }
        Commands::Key { action } => run_key(settings, config_path, action),
    }
}

/// Extract, generate, assemble. Returns the in-memory document; callers
/// decide where its serialized form goes.
fn run_generate(
    settings: &Settings,
    resume: &PathBuf,
    job: &PathBuf,
    theme: Option<String>,
    model: Option<String>,
) -> Result<tailorcv::RenderDocument, String> {
    let resume_bytes = std::fs::read(resume)
        .map_err(|e| format!("Failed to read {}: {}", resume.display(), e))?;
    let corpus = extract_corpus(&resume_bytes, detect_kind(&resume_bytes))
        .map_err(|e| e.to_string())?;

    let job_text = std::fs::read_to_string(job)
        .map_err(|e| format!("Failed to read {}: {}", job.display(), e))?;

    let api_key = settings
        .api_key()
        .ok_or("No API key. Set ANTHROPIC_API_KEY or run: tailorcv key set <key>")?;
    let provider = AnthropicClient::new(api_key).map_err(|e| e.to_string())?;

    println!("Generating tailored CV (this takes a few seconds)...");
    let model = model.unwrap_or_else(|| settings.model.clone());
    let cv = generate(&provider, &corpus, &job_text, &model).map_err(|e| e.to_string())?;

    let presentation = PresentationConfig {
        design: Design {
            theme: theme.unwrap_or_else(|| settings.theme.clone()),
            ..Design::default()
        },
        ..PresentationConfig::default()
    };
    Ok(assemble(cv, presentation))
}

/// Interactive edit/re-render loop over the on-disk document
fn run_tailor_loop(
    settings: &Settings,
    resume: &PathBuf,
    job: &PathBuf,
    doc_path: &PathBuf,
    output: &PathBuf,
    theme: Option<String>,
) -> Result<(), String> {
    let doc = run_generate(settings, resume, job, theme, None)?;

    let mut session = Session::new();
    session.install_generated(&doc).map_err(|e| e.to_string())?;
    std::fs::write(doc_path, session.displayed_text())
        .map_err(|e| format!("Failed to write {}: {}", doc_path.display(), e))?;
    println!("Wrote {}", doc_path.display());

    let renderer = CommandRenderer::new(settings.renderer_command.clone());
    render_and_save(&mut session, &renderer, output);

    let stdin = std::io::stdin();
    loop {
        print!("Edit {} in your editor, then press Enter to re-render (q to quit): ", doc_path.display());
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.trim() == "q" {
            break;
        }

        let edited = std::fs::read_to_string(doc_path)
            .map_err(|e| format!("Failed to read {}: {}", doc_path.display(), e))?;
        session.update_text(&edited).map_err(|e| e.to_string())?;

        if session.state() == SessionState::Rendered {
            println!("No changes since last render.");
            continue;
        }
        render_and_save(&mut session, &renderer, output);
    }
    Ok(())
}

/// Render the session's current text; a failure keeps the loop (and the
/// user's edits) alive.
fn render_and_save(session: &mut Session, renderer: &dyn Renderer, output: &PathBuf) {
    match session.render(renderer) {
        Ok(()) => {
            if let Some(artifact) = session.artifact() {
                match std::fs::write(output, artifact) {
                    Ok(()) => println!("Wrote {} ({} bytes)", output.display(), artifact.len()),
                    Err(e) => eprintln!("Failed to write {}: {}", output.display(), e),
                }
            }
        }
        Err(PipelineError::Render(msg)) => {
            eprintln!("Render failed: {}", msg);
            eprintln!("Your edits are untouched; fix the document and try again.");
        }
        Err(e) => eprintln!("Render failed: {}", e),
    }
}

fn run_key(
    mut settings: Settings,
    config_path: Option<PathBuf>,
    action: KeyAction,
) -> Result<(), String> {
    let config_path = config_path.ok_or("No config directory available on this platform")?;
    match action {
        KeyAction::Set { key } => {
            settings.set_api_key(key);
            settings.save(&config_path)?;
            println!("API key saved to settings");
        }
        KeyAction::Show => match settings.masked_api_key() {
            Some(masked) => println!("{}", masked),
            None => println!("No API key set"),
        },
        KeyAction::Clear => {
            settings.set_api_key(String::new());
            settings.save(&config_path)?;
            println!("API key cleared");
        }
    }
    Ok(())
}
