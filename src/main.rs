use anyhow::Result;
use confab::config::AssistantConfig;
use confab::messages::MessagePart;
use confab::orchestrator::Orchestrator;
use confab::preview::HtmlPreview;
use confab::sandbox::SandboxRunner;
use confab::speech::{CommandSynthesizer, SpeechInput, SpeechOutput, SpeechSynthesizer};
use std::io::{BufRead, Write};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "confab=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Confab assistant");

    let config = AssistantConfig::from_env();
    let synthesizer =
        CommandSynthesizer::discover().map(|s| Box::new(s) as Box<dyn SpeechSynthesizer>);
    // No CLI recognizer backend; `/listen` reports the affordance as absent
    let mut orchestrator = Orchestrator::new(
        config,
        SpeechInput::unavailable(),
        SpeechOutput::new(synthesizer),
    );
    let sandbox = SandboxRunner::new();

    let mut last_runnable: Option<String> = None;
    let mut last_html: Option<HtmlPreview> = None;

    for message in orchestrator.log().messages() {
        print_parts(&message.parts);
    }

    let stdin = std::io::stdin();
    loop {
        // Drain recognizer events so an updated transcript lands in the
        // draft before the next prompt
        if orchestrator.poll_speech() && !orchestrator.draft().is_empty() {
            println!("heard: {}", orchestrator.draft());
        }

        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        let submission: Option<String> = match line {
            "/quit" => break,
            "/tts" => {
                let enabled = !orchestrator.tts_enabled();
                orchestrator.set_tts_enabled(enabled);
                println!("speech output: {}", if enabled { "on" } else { "off" });
                None
            }
            "/listen" => {
                if orchestrator.speech_input_available() {
                    orchestrator.start_listening()?;
                    println!("listening (/stop to end)");
                } else {
                    println!("speech input unavailable");
                }
                None
            }
            "/stop" => {
                orchestrator.stop_listening();
                None
            }
            "/run" => {
                match &last_runnable {
                    Some(snippet) => {
                        let outcome = sandbox.run(snippet);
                        for line in &outcome.output {
                            println!("  {line}");
                        }
                        if let Some(error) = &outcome.error {
                            println!("  error: {error}");
                        }
                    }
                    None => println!("nothing runnable in the last reply"),
                }
                None
            }
            "/preview" => {
                match &mut last_html {
                    Some(preview) => {
                        preview.toggle();
                        preview.open()?;
                    }
                    None => println!("no HTML in the last reply"),
                }
                None
            }
            // A bare return sends the captured draft, if there is one
            "" => {
                let draft = orchestrator.draft().trim().to_string();
                (!draft.is_empty()).then_some(draft)
            }
            text => Some(text.to_string()),
        };

        let Some(text) = submission else { continue };

        let before = orchestrator.log().len();
        orchestrator.submit(&text).await;

        let appended: Vec<_> = orchestrator.log().messages()[before..]
            .iter()
            .skip(1) // the echoed user message
            .flat_map(|m| m.parts.clone())
            .collect();

        print_parts(&appended);

        for part in &appended {
            if let MessagePart::Code { content, language } = part {
                if SandboxRunner::handles(language) {
                    last_runnable = Some(content.clone());
                    println!("(runnable: /run)");
                }
                if language == "html" {
                    last_html = Some(HtmlPreview::new(content.clone()));
                    println!("(previewable: /preview)");
                }
            }
        }
    }

    orchestrator.shutdown();
    info!("Session ended");
    Ok(())
}

fn print_parts(parts: &[MessagePart]) {
    for part in parts {
        match part {
            MessagePart::Text { content } => println!("{content}"),
            MessagePart::Code { content, language } => {
                println!("--- {language} ---");
                println!("{content}");
                println!("---");
            }
            MessagePart::Image { prompt, data_uri } => {
                println!(
                    "[image generated for \"{prompt}\" ({} bytes)]",
                    data_uri.len()
                );
            }
        }
    }
}
